//! In-context document-redirect limiter.
//!
//! Installed on each fresh tab before navigation. Every outbound request
//! is paused at the CDP `Fetch` layer; document requests count against
//! the hop budget and, once it is exhausted, the route is fulfilled with
//! a synthetic **508** carrying the body
//! `"Loop Detected: too many redirects"`. That status is the sentinel the
//! scan engine checks for, so no error-string parsing is needed anywhere.
//! Asset requests (images, scripts, XHR, stylesheets, ...) are continued
//! unmodified and never counted.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chromiumoxide::cdp::browser_protocol::fetch::{
    self, ContinueRequestParams, EventRequestPaused, FulfillRequestParams, RequestPattern,
    RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::ResourceType;
use chromiumoxide::Page;
use futures::StreamExt;
use log::debug;
use tokio::task::JoinHandle;

use crate::config::REDIRECT_LIMIT_BODY;
use crate::error_handling::ScanError;

/// What to do with one paused request.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum RouteDecision {
    /// Let the request through unmodified.
    Continue,
    /// Answer with the 508 sentinel instead of hitting the network.
    FulfillLoopSentinel,
}

/// Counting rule for one paused request.
///
/// Only document requests count: in CDP a `Document`-type request is by
/// definition a frame navigation. A chain of N document redirects pauses
/// N+1 document requests (the initial one plus each redirect target), so
/// the budget is exceeded strictly after `max_redirect_steps + 1`
/// document pauses.
pub(crate) fn route_decision(
    resource_type: &ResourceType,
    document_hops: &mut usize,
    max_redirect_steps: usize,
) -> RouteDecision {
    if *resource_type != ResourceType::Document {
        return RouteDecision::Continue;
    }
    *document_hops += 1;
    if *document_hops > max_redirect_steps + 1 {
        RouteDecision::FulfillLoopSentinel
    } else {
        RouteDecision::Continue
    }
}

/// Enables `Fetch` interception on the tab and spawns the routing task.
///
/// The returned handle must be aborted when the scan is over; the task
/// otherwise ends on its own when the tab closes and the event stream
/// drains.
pub async fn install(page: &Page, max_redirect_steps: usize) -> Result<JoinHandle<()>, ScanError> {
    page.execute(
        fetch::EnableParams::builder()
            .pattern(
                RequestPattern::builder()
                    .url_pattern("*")
                    .request_stage(RequestStage::Request)
                    .build(),
            )
            .build(),
    )
    .await
    .map_err(|e| ScanError::Browser(format!("fetch enable: {e}")))?;

    let mut paused = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(|e| ScanError::Browser(format!("fetch listener: {e}")))?;

    let page = page.clone();
    let task = tokio::spawn(async move {
        let mut document_hops = 0usize;
        while let Some(event) = paused.next().await {
            match route_decision(&event.resource_type, &mut document_hops, max_redirect_steps) {
                RouteDecision::Continue => {
                    if let Err(e) = page
                        .execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await
                    {
                        debug!("continueRequest: {e}");
                    }
                }
                RouteDecision::FulfillLoopSentinel => {
                    debug!(
                        "document hop budget exhausted at {} ({} hops)",
                        event.request.url, document_hops
                    );
                    let mut params = FulfillRequestParams::new(event.request_id.clone(), 508);
                    params.body = Some(BASE64.encode(REDIRECT_LIMIT_BODY).into());
                    params.response_phrase = Some("Loop Detected".to_string());
                    if let Err(e) = page.execute(params).await {
                        debug!("fulfillRequest: {e}");
                    }
                }
            }
        }
    });

    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assets_are_never_counted() {
        let mut hops = 0;
        for ty in [
            ResourceType::Image,
            ResourceType::Script,
            ResourceType::Xhr,
            ResourceType::Stylesheet,
            ResourceType::Fetch,
        ] {
            for _ in 0..100 {
                assert_eq!(
                    route_decision(&ty, &mut hops, 2),
                    RouteDecision::Continue
                );
            }
        }
        assert_eq!(hops, 0);
    }

    #[test]
    fn test_budget_allows_initial_plus_max_hops() {
        let max = 2;
        let mut hops = 0;
        // initial navigation + 2 redirect targets
        for _ in 0..3 {
            assert_eq!(
                route_decision(&ResourceType::Document, &mut hops, max),
                RouteDecision::Continue
            );
        }
        // the 3rd redirect hop breaks the budget
        assert_eq!(
            route_decision(&ResourceType::Document, &mut hops, max),
            RouteDecision::FulfillLoopSentinel
        );
    }

    #[test]
    fn test_everything_past_the_budget_is_fulfilled() {
        let mut hops = 0;
        for _ in 0..21 {
            route_decision(&ResourceType::Document, &mut hops, 20);
        }
        for _ in 0..5 {
            assert_eq!(
                route_decision(&ResourceType::Document, &mut hops, 20),
                RouteDecision::FulfillLoopSentinel
            );
        }
    }

    #[test]
    fn test_sentinel_body_is_stable() {
        assert_eq!(REDIRECT_LIMIT_BODY, "Loop Detected: too many redirects");
    }
}
