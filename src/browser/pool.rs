//! Shared headless browser process.
//!
//! One Chromium process serves the whole service. It is launched lazily on
//! the first scan, probed for liveness on every acquisition and relaunched
//! transparently when the process died or the CDP connection was lost.
//! Scans never hold the browser handle itself; the pool vends fresh tabs
//! and each scan closes its own.

use std::sync::Arc;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use log::{debug, info, warn};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error_handling::ScanError;

struct BrowserHandle {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

/// Process-wide pool around the single headless browser.
pub struct BrowserPool {
    chromium_path: Option<std::path::PathBuf>,
    inner: Mutex<Option<BrowserHandle>>,
}

impl BrowserPool {
    /// Creates the pool. The browser itself is launched on first demand.
    pub fn new(config: &Config) -> Arc<Self> {
        Arc::new(Self {
            chromium_path: config.chromium_path.clone(),
            inner: Mutex::new(None),
        })
    }

    /// Opens a fresh, isolated tab for one scan.
    ///
    /// Launches the browser if absent. Opening the tab doubles as the
    /// liveness probe: a handle that no longer answers is torn down and
    /// relaunched once before giving up.
    pub async fn page(&self) -> Result<Page, ScanError> {
        let mut guard = self.inner.lock().await;

        if let Some(handle) = guard.as_ref() {
            match handle.browser.new_page("about:blank").await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    warn!("Browser did not answer ({e}); relaunching");
                    if let Some(old) = guard.take() {
                        teardown(old).await;
                    }
                }
            }
        }

        *guard = Some(self.launch().await?);
        let handle = guard.as_ref().expect("browser present after launch");
        handle
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScanError::Browser(format!("failed to open tab: {e}")))
    }

    /// Drops the stored handle if the browser stopped answering, so the
    /// next [`BrowserPool::page`] call relaunches. Called by scans that
    /// suspect a dead browser behind their failure.
    pub async fn reap_if_dead(&self) {
        let mut guard = self.inner.lock().await;
        let dead = match guard.as_ref() {
            Some(handle) => match handle.browser.new_page("about:blank").await {
                Ok(probe) => {
                    if let Err(e) = probe.close().await {
                        debug!("probe tab close: {e}");
                    }
                    false
                }
                Err(_) => true,
            },
            None => false,
        };
        if dead {
            warn!("Browser reported disconnected; tearing down");
            if let Some(handle) = guard.take() {
                teardown(handle).await;
            }
        }
    }

    /// Closes the browser. Further [`BrowserPool::page`] calls relaunch.
    pub async fn shutdown(&self) {
        let mut guard = self.inner.lock().await;
        if let Some(handle) = guard.take() {
            teardown(handle).await;
            info!("Browser pool shut down");
        }
    }

    async fn launch(&self) -> Result<BrowserHandle, ScanError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-background-networking")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--hide-scrollbars")
            .arg("--mute-audio");

        if let Some(path) = &self.chromium_path {
            builder = builder.chrome_executable(path);
        }

        let config = builder
            .build()
            .map_err(|e| ScanError::Browser(format!("browser config: {e}")))?;

        info!(
            "Launching headless browser{}",
            self.chromium_path
                .as_ref()
                .map(|p| format!(" ({})", p.display()))
                .unwrap_or_default()
        );

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScanError::Browser(format!("launch failed: {e}")))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler: {e}");
                }
            }
        });

        Ok(BrowserHandle {
            browser,
            handler_task,
        })
    }
}

async fn teardown(mut handle: BrowserHandle) {
    if let Err(e) = handle.browser.close().await {
        debug!("Browser close: {e}");
    }
    handle.handler_task.abort();
}
