//! HTTP client initialization.

use std::sync::Arc;

use reqwest::ClientBuilder;

use crate::config::{Config, PRECHECK_HOP_TIMEOUT};

/// Initializes the pre-check client.
///
/// Redirects are disabled (`Policy::none`) so the classifier can walk the
/// chain hop by hop and inspect every status, `Content-Type`,
/// `Content-Disposition` and `Location` on the way. The same client issues
/// the one-shot probe of a redirect target: that probe is simply the next
/// hop of the walk.
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_precheck_client(config: &Config) -> Result<Arc<reqwest::Client>, reqwest::Error> {
    let client = ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(PRECHECK_HOP_TIMEOUT)
        .user_agent(config.user_agent.clone())
        .build()?;
    Ok(Arc::new(client))
}
