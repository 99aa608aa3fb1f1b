//! Scan orchestration: cache → pre-check → browser → persist.
//!
//! One [`lookup_domain`] call services one inbound request. The routing
//! table is the heart of the service: the pre-check classification picks
//! between a synthetic origin-only answer, a browser scan of the original
//! URL, or a browser scan of a pre-resolved marketing-redirect target.

use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use sqlx::{Pool, Sqlite};
use tokio::sync::Semaphore;

use crate::browser::BrowserPool;
use crate::config::Config;
use crate::domain::normalize_hostname;
use crate::models::RedirectStep;
use crate::precheck::{self, Precheck};
use crate::scan;
use crate::storage::{self, CacheEntry};

/// Shared resources behind every lookup.
pub struct ServiceContext {
    /// Runtime configuration.
    pub config: Config,
    /// Cache database pool.
    pub db: Arc<Pool<Sqlite>>,
    /// The shared headless browser.
    pub browser: Arc<BrowserPool>,
    /// Manual-redirect client for the pre-check walk.
    pub precheck_client: Arc<reqwest::Client>,
    /// Bounds concurrent browser scans.
    pub scan_semaphore: Arc<Semaphore>,
}

/// Terminal status of a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    /// A browser scan completed.
    Ok,
    /// The pre-check decided a browser was pointless.
    Skipped,
    /// A browser scan was attempted and failed.
    Blocked,
}

impl ReportStatus {
    /// Wire form of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Ok => "ok",
            ReportStatus::Skipped => "skipped",
            ReportStatus::Blocked => "blocked",
        }
    }
}

/// The outcome handed to the HTTP surface.
#[derive(Debug, Clone)]
pub struct DomainReport {
    /// Canonical hostname the lookup ran for.
    pub domain: String,
    /// Final URL (scan result, cache, or pre-resolved target).
    pub final_url: String,
    /// Related domains (origin-only for synthetic answers).
    pub related_domains: Vec<String>,
    /// Document redirect chain.
    pub redirect_chain: Vec<RedirectStep>,
    /// Whether the answer came from the cache.
    pub cached: bool,
    /// Row write time, when cached.
    pub cached_at: Option<i64>,
    /// Row expiry time, when cached.
    pub ttl_at: Option<i64>,
    /// Terminal status.
    pub status: ReportStatus,
    /// Pre-check reason tag, when the status is not `ok`.
    pub reason: Option<String>,
    /// Marketing-redirect note, when applicable.
    pub note: Option<String>,
}

impl DomainReport {
    fn from_cache(entry: CacheEntry) -> Self {
        Self {
            domain: entry.domain,
            final_url: entry.final_url,
            related_domains: entry.related_domains,
            redirect_chain: entry.redirect_chain,
            cached: true,
            cached_at: Some(entry.updated_at),
            ttl_at: Some(entry.ttl_at),
            status: ReportStatus::Ok,
            reason: None,
            note: None,
        }
    }

    fn origin_only(
        domain: &str,
        final_url: String,
        status: ReportStatus,
        reason: Option<String>,
    ) -> Self {
        Self {
            domain: domain.to_string(),
            final_url,
            related_domains: vec![domain.to_string()],
            redirect_chain: Vec::new(),
            cached: false,
            cached_at: None,
            ttl_at: None,
            status,
            reason,
            note: None,
        }
    }
}

/// Failures the HTTP surface maps to non-200 responses.
#[derive(Debug)]
pub enum LookupError {
    /// Input never became a canonical hostname (→ 400).
    BadDomain(String),
    /// The scan terminated with a forbidden signal (→ 403); the
    /// origin-only fallback body rides along.
    Forbidden(DomainReport),
    /// Unexpected failure (→ 500).
    Internal(String),
}

/// Services one domain lookup end to end.
pub async fn lookup_domain(ctx: &ServiceContext, raw: &str) -> Result<DomainReport, LookupError> {
    let started = std::time::Instant::now();
    let domain =
        normalize_hostname(raw).map_err(|e| LookupError::BadDomain(e.to_string()))?;

    let now = Utc::now().timestamp();
    match storage::lookup(&ctx.db, &domain, now).await {
        Ok(Some(entry)) => {
            info!(
                "{domain}: cache hit ({}ms)",
                started.elapsed().as_millis()
            );
            return Ok(DomainReport::from_cache(entry));
        }
        Ok(None) => {}
        Err(e) => warn!("{domain}: cache lookup failed, scanning anyway: {e}"),
    }

    // One permit per scan, held from before the pre-check until the
    // response is assembled; dropping it on any path below releases it.
    let _permit = ctx
        .scan_semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| LookupError::Internal(format!("semaphore closed: {e}")))?;

    let start_url = format!("https://{domain}/");
    let outcome = precheck::classify(
        &ctx.precheck_client,
        &start_url,
        ctx.config.precheck_max_redirects,
    )
    .await;

    let report = route(ctx, &domain, &start_url, outcome).await?;

    info!(
        "{domain}: {} ({}ms)",
        report.status.as_str(),
        started.elapsed().as_millis()
    );
    Ok(report)
}

/// Routes one pre-check classification to its terminal answer.
async fn route(
    ctx: &ServiceContext,
    domain: &str,
    start_url: &str,
    outcome: Precheck,
) -> Result<DomainReport, LookupError> {
    let reason = outcome.reason();
    let report = match outcome {
        Precheck::Ok | Precheck::Inconclusive(_) => {
            browser_flow(ctx, domain, start_url, reason, None).await?
        }

        Precheck::Attachment | Precheck::NonHtml(_) => DomainReport::origin_only(
            domain,
            start_url.to_string(),
            ReportStatus::Skipped,
            reason,
        ),

        Precheck::RedirectToFile(target) => {
            DomainReport::origin_only(domain, target, ReportStatus::Skipped, reason)
        }

        Precheck::MarketingRedirect(ref target) => {
            let target = target.clone();
            browser_flow(ctx, domain, &target, reason.clone(), reason).await?
        }

        Precheck::Forbidden => {
            match scan::scan_page(&ctx.browser, start_url, domain, &ctx.config).await {
                Ok(result) => persist_and_report(ctx, domain, result, None).await,
                Err(e) => {
                    warn!("{domain}: browser attempt after 403 failed: {e}");
                    return Err(LookupError::Forbidden(DomainReport::origin_only(
                        domain,
                        start_url.to_string(),
                        ReportStatus::Blocked,
                        reason,
                    )));
                }
            }
        }

        Precheck::RedirectLoop { html_seen } | Precheck::HopLimit { html_seen, .. } => {
            if html_seen {
                browser_flow(ctx, domain, start_url, reason, None).await?
            } else {
                DomainReport::origin_only(
                    domain,
                    start_url.to_string(),
                    ReportStatus::Skipped,
                    reason,
                )
            }
        }
    };

    Ok(report)
}

/// Scans `scan_url` in the browser; success persists and reports `ok`
/// (with `note` when a marketing redirect was collapsed), failure
/// recovers into an origin-only `blocked` report, unless the failure
/// carries a forbidden signal, which escalates.
async fn browser_flow(
    ctx: &ServiceContext,
    domain: &str,
    scan_url: &str,
    fallback_reason: Option<String>,
    note: Option<String>,
) -> Result<DomainReport, LookupError> {
    match scan::scan_page(&ctx.browser, scan_url, domain, &ctx.config).await {
        Ok(result) => Ok(persist_and_report(ctx, domain, result, note).await),
        Err(e) if e.is_forbidden() => {
            warn!("{domain}: scan forbidden: {e}");
            Err(LookupError::Forbidden(DomainReport::origin_only(
                domain,
                scan_url.to_string(),
                ReportStatus::Blocked,
                Some("forbidden".into()),
            )))
        }
        Err(e) => {
            warn!("{domain}: scan failed: {e}");
            Ok(DomainReport::origin_only(
                domain,
                scan_url.to_string(),
                ReportStatus::Blocked,
                fallback_reason.or_else(|| Some("blocked".into())),
            ))
        }
    }
}

async fn persist_and_report(
    ctx: &ServiceContext,
    domain: &str,
    result: crate::models::ScanResult,
    note: Option<String>,
) -> DomainReport {
    if result.dropped_domains > 0 {
        warn!(
            "{domain}: {} hosts beyond the per-scan cap were dropped",
            result.dropped_domains
        );
    }

    let now = Utc::now().timestamp();
    if let Err(e) = storage::upsert(
        &ctx.db,
        domain,
        &result,
        now,
        ctx.config.cache_ttl_seconds,
    )
    .await
    {
        // A cache write failure degrades to uncached service, not an error.
        warn!("{domain}: cache write failed: {e}");
    }

    DomainReport {
        domain: domain.to_string(),
        final_url: result.final_url,
        related_domains: result.related_domains,
        redirect_chain: result.redirect_chain,
        cached: false,
        cached_at: None,
        ttl_at: None,
        status: ReportStatus::Ok,
        reason: None,
        note,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initialization::{init_precheck_client, init_semaphore};
    use crate::models::ScanResult;
    use sqlx::SqlitePool;

    async fn test_ctx() -> ServiceContext {
        let config = Config::default();
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::storage::init_schema(&pool).await.unwrap();
        ServiceContext {
            db: Arc::new(pool),
            browser: BrowserPool::new(&config),
            precheck_client: init_precheck_client(&config).unwrap(),
            scan_semaphore: init_semaphore(config.concurrency),
            config,
        }
    }

    #[tokio::test]
    async fn test_invalid_input_is_bad_domain() {
        let ctx = test_ctx().await;
        match lookup_domain(&ctx, "not a domain at all!!!").await {
            Err(LookupError::BadDomain(_)) => {}
            other => panic!("expected BadDomain, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cache_hit_answers_without_scanning() {
        let ctx = test_ctx().await;
        let result = ScanResult {
            final_url: "https://example.com/".into(),
            related_domains: vec!["cdn.example".into(), "example.com".into()],
            redirect_chain: Vec::new(),
            dropped_domains: 0,
        };
        let now = Utc::now().timestamp();
        storage::upsert(&ctx.db, "example.com", &result, now, 21_600)
            .await
            .unwrap();

        let report = lookup_domain(&ctx, "EXAMPLE.com").await.unwrap();
        assert!(report.cached);
        assert_eq!(report.status, ReportStatus::Ok);
        assert_eq!(report.final_url, "https://example.com/");
        assert_eq!(report.cached_at, Some(now));
        assert_eq!(report.ttl_at, Some(now + 21_600));
    }

    #[tokio::test]
    async fn test_attachment_routes_to_origin_only_skip() {
        let ctx = test_ctx().await;
        let report = route(
            &ctx,
            "files.example",
            "https://files.example/",
            Precheck::Attachment,
        )
        .await
        .unwrap();

        assert_eq!(report.status, ReportStatus::Skipped);
        assert_eq!(report.reason.as_deref(), Some("attachment"));
        assert_eq!(report.related_domains, vec!["files.example"]);
        assert!(report.redirect_chain.is_empty());
        assert!(!report.cached);
    }

    #[tokio::test]
    async fn test_redirect_to_file_carries_resolved_target() {
        let ctx = test_ctx().await;
        let target = "https://cdn.example/pkg.zip".to_string();
        let report = route(
            &ctx,
            "dl.example",
            "https://dl.example/",
            Precheck::RedirectToFile(target.clone()),
        )
        .await
        .unwrap();

        assert_eq!(report.status, ReportStatus::Skipped);
        assert_eq!(report.final_url, target);
        assert_eq!(
            report.reason.as_deref(),
            Some("redirect-to-file(https://cdn.example/pkg.zip)")
        );
    }

    #[tokio::test]
    async fn test_non_html_is_skipped_with_mime_reason() {
        let ctx = test_ctx().await;
        let report = route(
            &ctx,
            "api.example",
            "https://api.example/",
            Precheck::NonHtml("application/json".into()),
        )
        .await
        .unwrap();

        assert_eq!(report.status, ReportStatus::Skipped);
        assert_eq!(report.reason.as_deref(), Some("non-HTML (application/json)"));
    }

    #[tokio::test]
    async fn test_loop_without_html_hint_skips_browser() {
        let ctx = test_ctx().await;
        let report = route(
            &ctx,
            "loop.example",
            "https://loop.example/",
            Precheck::RedirectLoop { html_seen: false },
        )
        .await
        .unwrap();

        assert_eq!(report.status, ReportStatus::Skipped);
        assert_eq!(report.reason.as_deref(), Some("redirect-loop"));
    }

    #[tokio::test]
    async fn test_hop_limit_reason_carries_budget() {
        let ctx = test_ctx().await;
        let report = route(
            &ctx,
            "deep.example",
            "https://deep.example/",
            Precheck::HopLimit {
                hops: 15,
                html_seen: false,
            },
        )
        .await
        .unwrap();

        assert_eq!(report.reason.as_deref(), Some("redirect-loop(15)"));
    }

    #[tokio::test]
    async fn test_skip_paths_do_not_populate_cache() {
        let ctx = test_ctx().await;
        route(
            &ctx,
            "files.example",
            "https://files.example/",
            Precheck::Attachment,
        )
        .await
        .unwrap();

        let now = Utc::now().timestamp();
        assert!(storage::lookup(&ctx.db, "files.example", now)
            .await
            .unwrap()
            .is_none());
    }
}
