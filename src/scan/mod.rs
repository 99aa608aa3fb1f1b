//! Browser-driven scan engine.
//!
//! Drives one tab through a page load while observing every network
//! request and response via CDP event streams, waits for the network to
//! go quiet, and reconstructs the document redirect chain. The tab is
//! closed on every exit path; a failure that smells like a dead browser
//! additionally asks the pool to reap its handle so the next scan
//! relaunches.

mod state;

use std::sync::Arc;
use std::time::Instant;

use chromiumoxide::cdp::browser_protocol::emulation::{
    SetLocaleOverrideParams, SetTimezoneOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventRequestWillBeSent, EventResponseReceived, ResourceType,
};
use chromiumoxide::cdp::browser_protocol::browser::{
    EventDownloadWillBegin, SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use log::debug;
use tokio::task::JoinHandle;

use crate::browser::{limiter, BrowserPool};
use crate::config::{Config, SETTLE_POLL_INTERVAL};
use crate::error_handling::ScanError;
use crate::models::ScanResult;

pub use state::ScanState;

/// Runs one full browser scan of `start_url`.
///
/// `origin` is the canonical hostname the scan was requested for; it is
/// guaranteed to appear in the result's related domains.
pub async fn scan_page(
    pool: &BrowserPool,
    start_url: &str,
    origin: &str,
    config: &Config,
) -> Result<ScanResult, ScanError> {
    let page = pool.page().await?;

    let result = drive(&page, start_url, origin, config).await;

    if let Err(e) = page.clone().close().await {
        debug!("tab close: {e}");
    }
    if result.is_err() {
        pool.reap_if_dead().await;
    }

    result
}

async fn drive(
    page: &Page,
    start_url: &str,
    origin: &str,
    config: &Config,
) -> Result<ScanResult, ScanError> {
    prepare_context(page, config).await?;

    let state = Arc::new(ScanState::new(
        origin,
        config.max_domains,
        config.max_redirect_log,
    ));

    let mut pumps: Vec<JoinHandle<()>> = Vec::with_capacity(5);
    pumps.push(limiter::install(page, config.max_redirect_steps).await?);
    install_observers(page, &state, &mut pumps).await?;

    let outcome = navigate_and_settle(page, start_url, config, &state).await;

    for pump in &pumps {
        pump.abort();
    }

    outcome.map(|final_url| state.finish(final_url))
}

/// Applies the scan's context overrides: user agent, locale `en-US`,
/// timezone `UTC`, and download suppression so a download navigation
/// cannot crash the session (it surfaces as an ignorable event instead).
async fn prepare_context(page: &Page, config: &Config) -> Result<(), ScanError> {
    let ua = SetUserAgentOverrideParams::builder()
        .user_agent(config.user_agent.clone())
        .accept_language("en-US")
        .build()
        .map_err(ScanError::Browser)?;
    page.execute(ua)
        .await
        .map_err(|e| ScanError::Browser(format!("user agent override: {e}")))?;

    page.execute(SetTimezoneOverrideParams::new("UTC"))
        .await
        .map_err(|e| ScanError::Browser(format!("timezone override: {e}")))?;

    page.execute(SetLocaleOverrideParams::builder().locale("en-US").build())
        .await
        .map_err(|e| ScanError::Browser(format!("locale override: {e}")))?;

    page.execute(SetDownloadBehaviorParams::new(
        SetDownloadBehaviorBehavior::Deny,
    ))
    .await
    .map_err(|e| ScanError::Browser(format!("download behavior: {e}")))?;

    Ok(())
}

async fn install_observers(
    page: &Page,
    state: &Arc<ScanState>,
    pumps: &mut Vec<JoinHandle<()>>,
) -> Result<(), ScanError> {
    let listener_err = |e| ScanError::Browser(format!("event listener: {e}"));

    let mut requests = page
        .event_listener::<EventRequestWillBeSent>()
        .await
        .map_err(listener_err)?;
    {
        let state = Arc::clone(state);
        pumps.push(tokio::spawn(async move {
            while let Some(event) = requests.next().await {
                // A redirect hop re-sends under the same request id and
                // carries the previous hop's response; that is where CDP
                // surfaces document-level 3xx answers.
                if let Some(redirect) = &event.redirect_response {
                    if event.r#type == Some(ResourceType::Document) {
                        state.on_document_redirect(
                            &redirect.url,
                            &event.request.url,
                            redirect.status,
                        );
                    }
                }
                state.on_request(&event.request.url, event.redirect_response.is_none());
            }
        }));
    }

    let mut responses = page
        .event_listener::<EventResponseReceived>()
        .await
        .map_err(listener_err)?;
    {
        let state = Arc::clone(state);
        pumps.push(tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                let is_document = event.r#type == ResourceType::Document;
                state.on_response(&event.response.url, event.response.status, is_document);
            }
        }));
    }

    let mut failures = page
        .event_listener::<EventLoadingFailed>()
        .await
        .map_err(listener_err)?;
    {
        let state = Arc::clone(state);
        pumps.push(tokio::spawn(async move {
            while let Some(event) = failures.next().await {
                debug!("request failed: {}", event.error_text);
                state.on_loading_failed();
            }
        }));
    }

    let mut downloads = page
        .event_listener::<EventDownloadWillBegin>()
        .await
        .map_err(listener_err)?;
    {
        let state = Arc::clone(state);
        pumps.push(tokio::spawn(async move {
            while let Some(event) = downloads.next().await {
                state.on_download(&event.url);
            }
        }));
    }

    Ok(())
}

async fn navigate_and_settle(
    page: &Page,
    start_url: &str,
    config: &Config,
    state: &ScanState,
) -> Result<String, ScanError> {
    let nav_started = Instant::now();

    match tokio::time::timeout(config.nav_timeout, page.goto(start_url)).await {
        Err(_) => return Err(ScanError::NavTimeout(config.nav_timeout)),
        Ok(Err(e)) => {
            let msg = e.to_string();
            // The site pushed a file at us; the aborted navigation is the
            // download analog of a successful load.
            if msg.contains("ERR_ABORTED") {
                debug!("navigation aborted by a starting download; continuing");
            } else {
                return Err(ScanError::Navigation(msg));
            }
        }
        Ok(Ok(_)) => {}
    }

    if state.document_status() == Some(508) {
        return Err(ScanError::TooManyRedirects(config.max_redirect_steps));
    }

    let deadline = nav_started + config.nav_timeout;
    while !state.quiet(config.quiet_window) {
        if Instant::now() >= deadline {
            debug!("settle budget exhausted; keeping what was observed");
            break;
        }
        tokio::time::sleep(SETTLE_POLL_INTERVAL).await;
    }

    if state.redirect_log_len() > config.max_redirect_steps {
        return Err(ScanError::TooManyRedirects(config.max_redirect_steps));
    }

    let final_url = page
        .url()
        .await
        .map_err(|e| ScanError::Browser(format!("page url: {e}")))?
        .unwrap_or_else(|| start_url.to_string());

    Ok(final_url)
}
