//! Core data model: scan results and redirect steps.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::TRACKER_HOST_SUBSTRINGS;

/// One document-level redirect hop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectStep {
    /// URL the document was requested at.
    pub from: String,
    /// URL the 3xx pointed to.
    pub to: String,
    /// The 3xx status code of the hop.
    pub status: u16,
}

/// Immutable outcome of one browser scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// Absolute URL reached after all redirects.
    pub final_url: String,
    /// Sorted, deduplicated hostnames observed during the scan, tracker
    /// hosts removed, origin always present.
    pub related_domains: Vec<String>,
    /// Document-level redirect chain, earliest hop first.
    pub redirect_chain: Vec<RedirectStep>,
    /// Hosts observed past the per-scan cap and therefore not recorded.
    pub dropped_domains: usize,
}

/// Whether a hostname belongs to the tracker filter list.
pub fn is_tracker_host(host: &str) -> bool {
    TRACKER_HOST_SUBSTRINGS.iter().any(|s| host.contains(s))
}

/// Produces the final `related_domains` list from raw observed hosts.
///
/// Tracker hosts are removed, the rest sorted ascending and deduplicated,
/// and the origin hostname re-inserted if the filter took it out.
pub fn finalize_related_domains(seen: HashSet<String>, origin: &str) -> Vec<String> {
    let mut domains: Vec<String> = seen.into_iter().filter(|h| !is_tracker_host(h)).collect();
    if !domains.iter().any(|d| d == origin) {
        domains.push(origin.to_string());
    }
    domains.sort();
    domains.dedup();
    domains
}
