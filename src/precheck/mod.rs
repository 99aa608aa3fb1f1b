//! Browserless pre-check: classify a target before paying for a browser.
//!
//! A bounded manual-redirect walk from `https://<domain>` using a client
//! with redirects disabled. Each hop's status, `Content-Type`,
//! `Content-Disposition` and `Location` decide whether a browser session
//! is worth starting at all, and if so, at which URL. The classifier
//! exists to keep the browser away from raw downloads and obvious loops,
//! and to collapse marketing-redirect indirection at HTTP level so the
//! session starts on the real landing page.

use std::collections::HashSet;

use log::{debug, warn};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, LOCATION};
use reqwest::Url;

use crate::config::{DOWNLOAD_PATH_KEYWORDS, DOWNLOAD_SUFFIXES};

/// Outcome of the pre-check walk.
///
/// These are classifications, not errors: each variant routes the
/// orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precheck {
    /// The target serves HTML directly: proceed to the browser with the
    /// original start URL.
    Ok,
    /// A hop answered with `Content-Disposition: attachment`: never point
    /// a browser at it.
    Attachment,
    /// A 2xx with a non-HTML `Content-Type` (the payload mime is carried).
    NonHtml(String),
    /// A hop returned 403. The browser may still succeed where the plain
    /// client was blocked, so the orchestrator attempts it anyway.
    Forbidden,
    /// A redirect points at a downloadable asset; the pre-resolved target
    /// is carried as the final URL.
    RedirectToFile(String),
    /// A redirect chain ends in a page that itself serves HTML: re-enter
    /// the browser flow with the resolved URL as the new start.
    MarketingRedirect(String),
    /// The same URL (fragment-stripped) came around twice.
    RedirectLoop {
        /// Whether any hop on the way hinted at HTML content.
        html_seen: bool,
    },
    /// The walk ran out of its hop budget.
    HopLimit {
        /// The exhausted budget, for the reason tag.
        hops: usize,
        /// Whether any hop on the way hinted at HTML content.
        html_seen: bool,
    },
    /// The walk could not reach a verdict (transport error, odd status,
    /// 3xx without Location). Let the browser try.
    Inconclusive(String),
}

impl Precheck {
    /// The reason tag surfaced in API responses, if this class carries one.
    pub fn reason(&self) -> Option<String> {
        match self {
            Precheck::Ok | Precheck::Inconclusive(_) => None,
            Precheck::Attachment => Some("attachment".into()),
            Precheck::NonHtml(ct) => Some(format!("non-HTML ({ct})")),
            Precheck::Forbidden => Some("forbidden".into()),
            Precheck::RedirectToFile(url) => Some(format!("redirect-to-file({url})")),
            Precheck::MarketingRedirect(url) => Some(format!("marketing-redirect({url})")),
            Precheck::RedirectLoop { .. } => Some("redirect-loop".into()),
            Precheck::HopLimit { hops, .. } => Some(format!("redirect-loop({hops})")),
        }
    }
}

/// Walks the redirect chain from `start_url` and classifies the target.
///
/// At most `max_hops` responses are fetched. Loop detection compares URLs
/// after fragment stripping; relative `Location` values are resolved
/// against the current URL.
pub async fn classify(client: &reqwest::Client, start_url: &str, max_hops: usize) -> Precheck {
    let mut current = start_url.to_string();
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(strip_fragment(&current));
    let mut html_seen = false;

    for hop in 0..max_hops {
        let resp = match client.get(&current).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!("precheck: fetch of {current} failed: {e}");
                return Precheck::Inconclusive(e.to_string());
            }
        };

        let status = resp.status();
        let content_type = header_value(resp.headers(), &CONTENT_TYPE);
        let disposition = header_value(resp.headers(), &CONTENT_DISPOSITION);

        if disposition.to_ascii_lowercase().contains("attachment") {
            return Precheck::Attachment;
        }
        if status.as_u16() == 403 {
            return Precheck::Forbidden;
        }

        let is_html = content_type
            .to_ascii_lowercase()
            .starts_with("text/html");
        if is_html {
            html_seen = true;
        }

        if status.is_success() {
            if is_html {
                // Hop 0 is the origin itself; anything later means the
                // chain resolved to a real landing page elsewhere.
                return if hop == 0 {
                    Precheck::Ok
                } else {
                    Precheck::MarketingRedirect(current)
                };
            }
            let mime = content_type
                .split(';')
                .next()
                .unwrap_or("")
                .trim()
                .to_string();
            return Precheck::NonHtml(mime);
        }

        if status.is_redirection() {
            let Some(location) = resp
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
            else {
                warn!("precheck: {status} from {current} without a Location header");
                return Precheck::Inconclusive(format!("{status} without Location"));
            };

            let target = match resolve_location(&current, location) {
                Some(t) => t,
                None => {
                    warn!("precheck: unresolvable Location {location:?} at {current}");
                    return Precheck::Inconclusive(format!("bad Location {location:?}"));
                }
            };

            if looks_like_download(&target) {
                return Precheck::RedirectToFile(target.to_string());
            }

            let mut stripped = target.clone();
            stripped.set_fragment(None);
            if !visited.insert(stripped.to_string()) {
                return Precheck::RedirectLoop { html_seen };
            }

            current = target.to_string();
            continue;
        }

        // 4xx/5xx outside the classified set: an error page still emits
        // observable traffic, so the browser gets its chance.
        return Precheck::Inconclusive(format!("status {}", status.as_u16()));
    }

    Precheck::HopLimit {
        hops: max_hops,
        html_seen,
    }
}

fn header_value(headers: &reqwest::header::HeaderMap, name: &reqwest::header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

fn resolve_location(current: &str, location: &str) -> Option<Url> {
    Url::parse(location)
        .or_else(|_| Url::parse(current).and_then(|base| base.join(location)))
        .ok()
}

fn strip_fragment(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut u) => {
            u.set_fragment(None);
            u.to_string()
        }
        Err(_) => url.split('#').next().unwrap_or(url).to_string(),
    }
}

/// Suffix test against the downloadable-asset set, plus the coarse
/// `download|file|export` path keyword match.
fn looks_like_download(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    if DOWNLOAD_SUFFIXES
        .iter()
        .any(|suffix| path.ends_with(&format!(".{suffix}")))
    {
        return true;
    }
    DOWNLOAD_PATH_KEYWORDS.iter().any(|kw| path.contains(kw))
}
