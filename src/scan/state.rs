//! Per-scan observation state.
//!
//! One [`ScanState`] per browsing context; CDP event pumps call its
//! methods, the settle loop reads the atomics. Nothing here is shared
//! across scans.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::debug;
use url::Url;

use crate::models::{finalize_related_domains, RedirectStep, ScanResult};

struct Observed {
    seen_domains: HashSet<String>,
    dropped_domains: usize,
    redirect_log: Vec<RedirectStep>,
    seen_pairs: HashSet<(String, String)>,
    document_status: Option<i64>,
}

/// Mutable state of one in-flight scan.
pub struct ScanState {
    origin: String,
    max_domains: usize,
    max_redirect_log: usize,
    started: Instant,
    inflight: AtomicI64,
    last_change_ms: AtomicU64,
    observed: Mutex<Observed>,
}

impl ScanState {
    /// Creates state for a scan whose origin hostname is `origin`.
    ///
    /// The origin is pre-seeded into the seen set: it must appear in the
    /// result even if the page never answers.
    pub fn new(origin: &str, max_domains: usize, max_redirect_log: usize) -> Self {
        let mut seen = HashSet::new();
        seen.insert(origin.to_string());
        Self {
            origin: origin.to_string(),
            max_domains,
            max_redirect_log,
            started: Instant::now(),
            inflight: AtomicI64::new(0),
            last_change_ms: AtomicU64::new(0),
            observed: Mutex::new(Observed {
                seen_domains: seen,
                dropped_domains: 0,
                redirect_log: Vec::new(),
                seen_pairs: HashSet::new(),
                document_status: None,
            }),
        }
    }

    /// A network request left the page. `fresh` is false for the re-sent
    /// request of a redirect hop, which inherits its predecessor's slot in
    /// the inflight ledger.
    pub fn on_request(&self, url: &str, fresh: bool) {
        if fresh {
            self.inflight.fetch_add(1, Ordering::SeqCst);
        }
        self.touch();
        self.record_host(url);
    }

    /// A response arrived. Document responses also record their status so
    /// the engine can spot the limiter's 508 sentinel.
    pub fn on_response(&self, url: &str, status: i64, is_document: bool) {
        // floor at zero: responses can outnumber requests when events
        // raced the listener installation
        let _ = self
            .inflight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some((n - 1).max(0))
            });
        self.touch();
        self.record_host(url);
        if is_document {
            self.observed.lock().unwrap().document_status = Some(status);
        }
    }

    /// A request died without a response; free its inflight slot.
    pub fn on_loading_failed(&self) {
        let _ = self
            .inflight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some((n - 1).max(0))
            });
        self.touch();
    }

    /// A document-level 3xx hop was observed.
    ///
    /// `(from, to)` pairs are deduplicated so a cycling chain cannot grow
    /// the log, and the log is capped.
    pub fn on_document_redirect(&self, from: &str, to: &str, status: i64) {
        if !(300..400).contains(&status) {
            return;
        }
        let mut observed = self.observed.lock().unwrap();
        let pair = (from.to_string(), to.to_string());
        if observed.seen_pairs.contains(&pair) {
            return;
        }
        if observed.redirect_log.len() >= self.max_redirect_log {
            return;
        }
        observed.seen_pairs.insert(pair);
        observed.redirect_log.push(RedirectStep {
            from: from.to_string(),
            to: to.to_string(),
            status: status as u16,
        });
    }

    /// The page started a download. Never an error; just noted.
    pub fn on_download(&self, url: &str) {
        debug!("download ignored: {url}");
    }

    /// Number of document redirect steps recorded so far.
    pub fn redirect_log_len(&self) -> usize {
        self.observed.lock().unwrap().redirect_log.len()
    }

    /// Status of the most recent top-level document response.
    pub fn document_status(&self) -> Option<i64> {
        self.observed.lock().unwrap().document_status
    }

    /// True once nothing is in flight and no event has been seen for
    /// `window`.
    pub fn quiet(&self, window: Duration) -> bool {
        if self.inflight.load(Ordering::SeqCst) > 0 {
            return false;
        }
        let last = Duration::from_millis(self.last_change_ms.load(Ordering::SeqCst));
        self.started.elapsed().saturating_sub(last) >= window
    }

    /// Produces the immutable scan result.
    pub fn finish(&self, final_url: String) -> ScanResult {
        let observed = self.observed.lock().unwrap();
        ScanResult {
            final_url,
            related_domains: finalize_related_domains(
                observed.seen_domains.clone(),
                &self.origin,
            ),
            redirect_chain: observed.redirect_log.clone(),
            dropped_domains: observed.dropped_domains,
        }
    }

    fn touch(&self) {
        self.last_change_ms
            .store(self.started.elapsed().as_millis() as u64, Ordering::SeqCst);
    }

    fn record_host(&self, url: &str) {
        let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string))
        else {
            return;
        };
        let mut observed = self.observed.lock().unwrap();
        if observed.seen_domains.contains(&host) {
            return;
        }
        if observed.seen_domains.len() >= self.max_domains {
            observed.dropped_domains += 1;
            return;
        }
        observed.seen_domains.insert(host);
    }
}
