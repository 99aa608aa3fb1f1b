//! Request handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{error, warn};
use serde_json::json;

use super::types::{DomainsQuery, DomainsResponse, ErrorBody, ForbiddenBody};
use crate::orchestrate::{lookup_domain, LookupError, ServiceContext};

/// `GET /domains?domain=<raw>`, the scan endpoint.
///
/// The lookup runs in its own task: if the hard deadline expires the
/// client gets its 504 while the scan finishes (and cleans up its
/// browsing context, and possibly still populates the cache) in the
/// background.
pub async fn domains_handler(
    State(ctx): State<Arc<ServiceContext>>,
    Query(query): Query<DomainsQuery>,
) -> Response {
    let raw = query.domain.unwrap_or_default();
    let hard_timeout = ctx.config.hard_timeout;

    let lookup_ctx = Arc::clone(&ctx);
    let lookup = tokio::spawn(async move { lookup_domain(&lookup_ctx, &raw).await });

    match tokio::time::timeout(hard_timeout, lookup).await {
        Err(_) => {
            warn!("hard deadline ({hard_timeout:?}) expired before a response was ready");
            (
                StatusCode::GATEWAY_TIMEOUT,
                Json(ErrorBody {
                    error: format!("no result within {}ms", hard_timeout.as_millis()),
                    code: "TIMEOUT",
                }),
            )
                .into_response()
        }
        Ok(Err(join_err)) => {
            error!("lookup task panicked: {join_err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: "internal error".into(),
                    code: "INTERNAL",
                }),
            )
                .into_response()
        }
        Ok(Ok(Ok(report))) => {
            (StatusCode::OK, Json(DomainsResponse::from(report))).into_response()
        }
        Ok(Ok(Err(LookupError::BadDomain(msg)))) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: msg,
                code: "BAD_DOMAIN",
            }),
        )
            .into_response(),
        Ok(Ok(Err(LookupError::Forbidden(report)))) => (
            StatusCode::FORBIDDEN,
            Json(ForbiddenBody {
                code: "FORBIDDEN",
                report: report.into(),
            }),
        )
            .into_response(),
        Ok(Ok(Err(LookupError::Internal(msg)))) => {
            error!("lookup failed: {msg}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: msg,
                    code: "INTERNAL",
                }),
            )
                .into_response()
        }
    }
}

/// `GET /health`
pub async fn health_handler() -> Response {
    (StatusCode::OK, Json(json!({"ok": true}))).into_response()
}
