//! Wire types of the HTTP surface.

use serde::{Deserialize, Serialize};

use crate::models::RedirectStep;
use crate::orchestrate::DomainReport;

/// Query string of `GET /domains`.
#[derive(Debug, Deserialize)]
pub struct DomainsQuery {
    /// The raw, not-yet-normalised domain input.
    pub domain: Option<String>,
}

/// Successful lookup payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainsResponse {
    /// Canonical hostname.
    pub domain: String,
    /// Final URL after all redirects.
    pub final_url: String,
    /// Sorted related domains.
    pub related_domains: Vec<String>,
    /// Document redirect chain.
    pub redirect_chain: Vec<RedirectStep>,
    /// Whether the payload came from the cache.
    pub cached: bool,
    /// Cache write time (unix seconds), present when cached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<i64>,
    /// Cache expiry time (unix seconds), present when cached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_at: Option<i64>,
    /// `ok`, `skipped` or `blocked`.
    pub status: &'static str,
    /// Pre-check reason tag, present when not `ok`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Marketing-redirect note, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl From<DomainReport> for DomainsResponse {
    fn from(report: DomainReport) -> Self {
        Self {
            domain: report.domain,
            final_url: report.final_url,
            related_domains: report.related_domains,
            redirect_chain: report.redirect_chain,
            cached: report.cached,
            cached_at: report.cached_at,
            ttl_at: report.ttl_at,
            status: report.status.as_str(),
            reason: report.reason,
            note: report.note,
        }
    }
}

/// Error payload with a machine-readable code.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// `BAD_DOMAIN`, `FORBIDDEN`, `INTERNAL` or `TIMEOUT`.
    pub code: &'static str,
}

/// 403 payload: the origin-only fallback report plus the code.
#[derive(Debug, Serialize)]
pub struct ForbiddenBody {
    /// Always `FORBIDDEN`.
    pub code: &'static str,
    /// The origin-only blocked report.
    #[serde(flatten)]
    pub report: DomainsResponse,
}
