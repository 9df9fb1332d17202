//! Rendered-page fetching via headless Chrome
//!
//! The trainer detail page fills its download table with JavaScript, so the
//! plain fetcher can miss entries (notably the auto-updating version rows).
//! This module drives a headless browser through chromiumoxide: navigate with
//! image/style sub-resources blocked, wait a bounded interval for the
//! download-table marker, and hand back whatever HTML rendered. The marker
//! timing out degrades to best-effort content; every other failure is a
//! [`RenderError`] that the downloader converts into a plain-fetch fallback.

use crate::config::Config;
use crate::error::RenderError;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, SetBlockedUrLsParams};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;

/// Poll interval while waiting for the download-table marker
const MARKER_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Headless-browser page renderer
#[derive(Clone)]
pub struct PageRenderer {
    config: Arc<Config>,
}

impl PageRenderer {
    /// Create a renderer bound to the given configuration
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Render a page and return its HTML after dynamic content settled
    ///
    /// A fresh browser is launched per call and torn down afterwards, so a
    /// crashed or hung render never poisons later fetches.
    pub async fn render(&self, url: &str) -> Result<String, RenderError> {
        let browser_config = BrowserConfig::builder()
            .build()
            .map_err(RenderError::Launch)?;
        let (mut browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        // The handler stream must be polled for the browser connection to
        // make progress.
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let result = self.render_page(&browser, url).await;

        if let Err(e) = browser.close().await {
            tracing::debug!(error = %e, "browser close failed");
        }
        handler_task.abort();

        result
    }

    async fn render_page(&self, browser: &Browser, url: &str) -> Result<String, RenderError> {
        let navigation_failed = |e: chromiumoxide::error::CdpError| RenderError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(navigation_failed)?;

        // Block heavy sub-resources before navigating.
        let blocked = self.config.render.blocked_resources.clone();
        if !blocked.is_empty() {
            page.execute(EnableParams::default())
                .await
                .map_err(navigation_failed)?;
            page.execute(SetBlockedUrLsParams { urls: blocked })
                .await
                .map_err(navigation_failed)?;
        }

        let navigation = async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<(), chromiumoxide::error::CdpError>(())
        };
        match tokio::time::timeout(self.config.render.nav_timeout, navigation).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(navigation_failed(e)),
            Err(_) => {
                return Err(RenderError::Timeout {
                    url: url.to_string(),
                });
            }
        }

        // Bounded wait for the download-table marker; timing out is not an
        // error, the content below is returned best-effort.
        let marker = self.config.render.marker_selector.as_str();
        let deadline = tokio::time::Instant::now() + self.config.render.marker_timeout;
        loop {
            if page.find_element(marker).await.is_ok() {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                tracing::debug!(url, marker, "marker wait timed out, returning best-effort content");
                break;
            }
            tokio::time::sleep(MARKER_POLL_INTERVAL).await;
        }

        page.content().await.map_err(navigation_failed)
    }
}
