//! Headless Chromium navigator.
//!
//! Launches a browser over the DevTools protocol, loads one URL, waits for
//! the DOM to settle, and returns the rendered markup. The browser process
//! lives only for the duration of a single [`PageSource::fetch_page`] call.
//!
//! # Settling
//!
//! After the load event the page is polled every `poll_interval_ms`. It is
//! considered settled once `document.readyState` is `"complete"` and the
//! length of the serialized DOM has been unchanged for `stable_polls`
//! consecutive polls. If that never happens within `settle_timeout_secs`
//! the markup captured at the deadline is used.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::BrowserConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::models::PageDocument;
use crate::traits::PageSource;

/// Serialized DOM length once the document has finished loading, else -1.
const DOM_PROBE: &str = "document.readyState === 'complete' \
    ? document.documentElement.outerHTML.length : -1";

/// [`PageSource`] backed by a locally launched Chromium.
pub struct ChromeNavigator {
    config: BrowserConfig,
}

impl ChromeNavigator {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PageSource for ChromeNavigator {
    fn name(&self) -> &str {
        "chromium"
    }

    async fn fetch_page(&self, url: &str) -> ScrapeResult<PageDocument> {
        let session = BrowserSession::launch(&self.config, url).await?;
        let result = session.capture(&self.config, url).await;
        session.shutdown().await;
        result
    }
}

/// A running browser plus the task that drives its DevTools connection.
///
/// Call [`shutdown`](BrowserSession::shutdown) to close the browser. If the
/// session is dropped without it (cancellation, panic), the handler task is
/// aborted and chromiumoxide kills the child process.
struct BrowserSession {
    browser: Browser,
    handler: Option<JoinHandle<()>>,
}

impl BrowserSession {
    async fn launch(config: &BrowserConfig, url: &str) -> ScrapeResult<Self> {
        let cdp_config = build_cdp_config(config).map_err(|e| ScrapeError::navigation(url, e))?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| ScrapeError::navigation(url, format!("browser failed to start: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "devtools handler event error");
                }
            }
        });

        Ok(Self {
            browser,
            handler: Some(handler),
        })
    }

    async fn capture(&self, config: &BrowserConfig, url: &str) -> ScrapeResult<PageDocument> {
        let navigation = async {
            let page = self.browser.new_page("about:blank").await?;
            page.goto(url).await?;
            Ok::<Page, chromiumoxide::error::CdpError>(page)
        };

        let page = tokio::time::timeout(
            Duration::from_secs(config.navigation_timeout_secs),
            navigation,
        )
        .await
        .map_err(|_| {
            ScrapeError::navigation(
                url,
                format!("timed out after {}s", config.navigation_timeout_secs),
            )
        })?
        .map_err(|e| ScrapeError::navigation(url, e))?;

        wait_for_settle(&page, config).await;

        let markup = page
            .content()
            .await
            .map_err(|e| ScrapeError::navigation(url, format!("failed to read page content: {}", e)))?;

        Ok(PageDocument {
            url: url.to_string(),
            markup,
        })
    }

    async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!(error = %e, "browser close command failed");
        }
        if let Err(e) = self.browser.wait().await {
            tracing::debug!(error = %e, "waiting for browser exit failed");
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

fn build_cdp_config(config: &BrowserConfig) -> Result<CdpBrowserConfig, String> {
    let mut builder = CdpBrowserConfig::builder();

    if let Some(ref exe) = config.executable {
        if !exe.exists() {
            return Err(format!("browser executable not found: {}", exe.display()));
        }
        builder = builder.chrome_executable(exe);
    }
    if !config.headless {
        builder = builder.with_head();
    }
    for arg in &config.extra_args {
        builder = builder.arg(arg.clone());
    }

    builder.build()
}

async fn wait_for_settle(page: &Page, config: &BrowserConfig) {
    let deadline = Instant::now() + Duration::from_secs(config.settle_timeout_secs);
    let interval = Duration::from_millis(config.poll_interval_ms);
    let mut tracker = SettleTracker::new(config.stable_polls);

    loop {
        let dom_len = match page.evaluate(DOM_PROBE).await {
            Ok(result) => result.into_value::<i64>().unwrap_or(-1),
            Err(e) => {
                // Expected while a client-side redirect swaps the document.
                tracing::debug!(error = %e, "DOM probe failed");
                -1
            }
        };

        if tracker.observe(dom_len) {
            tracing::debug!(dom_len, "page settled");
            return;
        }
        if Instant::now() >= deadline {
            tracing::debug!(dom_len, "settle timeout reached, capturing current DOM");
            return;
        }
        tokio::time::sleep(interval).await;
    }
}

/// Counts consecutive identical DOM-length observations.
#[derive(Debug)]
pub struct SettleTracker {
    required: u32,
    last: Option<i64>,
    stable: u32,
}

impl SettleTracker {
    pub fn new(required: u32) -> Self {
        Self {
            required,
            last: None,
            stable: 0,
        }
    }

    /// Record one poll. A negative length means "still loading".
    /// Returns true once the page counts as settled.
    pub fn observe(&mut self, dom_len: i64) -> bool {
        if dom_len < 0 {
            self.last = None;
            self.stable = 0;
            return false;
        }
        if self.last == Some(dom_len) {
            self.stable += 1;
        } else {
            self.last = Some(dom_len);
            self.stable = 0;
        }
        self.stable >= self.required
    }
}
