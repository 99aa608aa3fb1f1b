//! Configuration constants.
//!
//! Defaults for every tunable; each can be overridden through the
//! environment variables documented on [`crate::config::Config`].

use std::time::Duration;

/// Default listen port for the HTTP surface.
pub const DEFAULT_PORT: u16 = 3000;

/// Default cache row TTL in seconds (6 hours).
pub const DEFAULT_CACHE_TTL_SECONDS: i64 = 21_600;

/// Maximum document-navigation redirect hops tolerated inside the browser.
/// Enforced twice: by the in-context redirect limiter (508 sentinel) and by
/// the scan engine's redirect-log overflow check.
pub const DEFAULT_MAX_REDIRECT_STEPS: usize = 20;

/// Maximum hops the browserless pre-check walk will follow.
pub const DEFAULT_PRECHECK_MAX_REDIRECTS: usize = 15;

/// Navigation plus settle wall clock.
pub const DEFAULT_NAV_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Network-idle dwell: the scan settles once no request/response event has
/// been seen for this long while nothing is in flight.
pub const DEFAULT_QUIET_WINDOW: Duration = Duration::from_millis(650);

/// Hard per-request deadline; expiry produces a 504.
pub const DEFAULT_HARD_TIMEOUT: Duration = Duration::from_millis(70_000);

/// Parallel browser scans (semaphore width).
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Cap on distinct hosts recorded per scan; overflow is counted, not stored.
pub const DEFAULT_MAX_DOMAINS: usize = 5_000;

/// Cap on recorded document redirect steps per scan.
pub const DEFAULT_MAX_REDIRECT_LOG: usize = 50;

/// Default cache store location.
pub const DEFAULT_SQLITE_PATH: &str = "./cache.db";

/// Per-hop timeout for the pre-check HTTP client.
pub const PRECHECK_HOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Poll interval of the quiet-window settle loop.
pub const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default User-Agent presented by both the pre-check client and the
/// browser context.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Hostname substrings stripped from scan output.
pub const TRACKER_HOST_SUBSTRINGS: &[&str] = &["doubleclick", "google"];

/// Path suffixes that mark a redirect target as a downloadable asset.
pub const DOWNLOAD_SUFFIXES: &[&str] = &[
    "zip", "pdf", "png", "jpg", "jpeg", "gif", "webp", "svg", "mp4", "mp3", "wav", "csv", "xls",
    "xlsx", "doc", "docx", "ppt", "pptx", "exe", "deb", "rpm", "apk", "tar", "tar.gz", "7z", "gz",
    "bz2",
];

/// Path keywords that mark a redirect target as a download endpoint.
pub const DOWNLOAD_PATH_KEYWORDS: &[&str] = &["download", "file", "export"];

/// Body of the synthetic 508 the redirect limiter fulfills when the
/// document hop budget is exhausted.
pub const REDIRECT_LIMIT_BODY: &str = "Loop Detected: too many redirects";
