//! HTTP surface of the reconnaissance service.
//!
//! Two endpoints:
//! - `GET /domains?domain=<raw>`: run (or serve from cache) a scan
//! - `GET /health`: liveness

mod handlers;
mod types;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;

use crate::orchestrate::ServiceContext;
use handlers::{domains_handler, health_handler};

/// Builds the service router. Split from [`start_server`] so tests can
/// drive the router without binding a port.
pub fn router(ctx: Arc<ServiceContext>) -> Router {
    Router::new()
        .route("/domains", get(domains_handler))
        .route("/health", get(health_handler))
        .with_state(ctx)
}

/// Binds the listen port and serves until `shutdown` fires.
pub async fn start_server(
    port: u16,
    ctx: Arc<ServiceContext>,
    shutdown: CancellationToken,
) -> Result<(), anyhow::Error> {
    let app = router(ctx);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind port {}: {}", port, e))?;

    log::info!("Listening on http://0.0.0.0:{}/", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
