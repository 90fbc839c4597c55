use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use chrono::Utc;
use futures::{Stream, StreamExt};
use sitescan_core::config::CrawlerConfig;
use sitescan_core::error::CrawlError;
use sitescan_core::models::{FetchedPage, StrategyKind};
use sitescan_core::traits::FetchStrategy;
use tokio::sync::OnceCell;

use crate::capability::find_chrome_binary;

/// Page opened before the target so the tab has a browsing history.
const WARMUP_URL: &str = "about:blank";

/// Longest wait for the network to settle after the load event.
const NETWORK_IDLE_WAIT: Duration = Duration::from_secs(5);

/// Headless Chromium render via the Chrome DevTools Protocol.
///
/// Last strategy in the chain, used only when both HTTP strategies fail at
/// the transport level. The browser is launched on first use and shared by
/// all clones; each fetch opens a tab, warms it up, pauses briefly,
/// navigates to the target, waits for network idle and captures the
/// rendered DOM. The tab is closed afterwards, also on timeout.
///
/// If Chromium cannot be launched the strategy reports
/// [`CrawlError::RenderFallbackUnavailable`], which the chain skips.
#[derive(Clone)]
pub struct HeadlessRenderStrategy {
    browser: Arc<OnceCell<Browser>>,
    timeout: Duration,
    pause_min: Duration,
    pause_max: Duration,
}

impl HeadlessRenderStrategy {
    pub fn new(config: &CrawlerConfig) -> Self {
        Self {
            browser: Arc::new(OnceCell::new()),
            // Rendering is slower than a bare GET; give navigation twice the budget.
            timeout: config.timeout * 2,
            pause_min: Duration::from_millis(500),
            pause_max: Duration::from_millis(1500),
        }
    }

    async fn browser(&self) -> Result<&Browser, CrawlError> {
        self.browser
            .get_or_try_init(launch_browser)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Failed to launch headless browser");
                CrawlError::RenderFallbackUnavailable
            })
    }

    fn pause(&self) -> Duration {
        let spread = self.pause_max.saturating_sub(self.pause_min);
        self.pause_min + spread.mul_f64(fastrand::f64())
    }

    async fn render(&self, browser: &Browser, url: &str) -> Result<String, CrawlError> {
        let page = tokio::time::timeout(self.timeout, browser.new_page(WARMUP_URL))
            .await
            .map_err(|_| CrawlError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| CrawlError::Transport(format!("Failed to open tab: {e}")))?;

        let tab = page.clone();
        run_then_cleanup(self.timeout, self.navigate(&page, url), async move {
            if let Err(e) = tab.close().await {
                tracing::debug!(error = %e, "Failed to close tab");
            }
        })
        .await
    }

    async fn navigate(&self, page: &Page, url: &str) -> Result<String, CrawlError> {
        let failed = |e: chromiumoxide::error::CdpError| {
            CrawlError::Transport(format!("Render of {url} failed: {e}"))
        };

        tokio::time::sleep(self.pause()).await;

        page.execute(SetLifecycleEventsEnabledParams::new(true))
            .await
            .map_err(failed)?;
        // Subscribed before navigating so no lifecycle event of the target is missed.
        let lifecycle = page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(failed)?;

        page.goto(url).await.map_err(failed)?;
        page.wait_for_navigation().await.map_err(failed)?;

        let names = lifecycle.map(|event| event.name.clone());
        if !wait_for_network_idle(names, NETWORK_IDLE_WAIT).await {
            tracing::debug!(%url, "Network not idle in time, capturing DOM as is");
        }

        page.content().await.map_err(failed)
    }
}

/// Runs `work` under `budget`, then `cleanup` whether `work` finished or not.
async fn run_then_cleanup<T>(
    budget: Duration,
    work: impl Future<Output = Result<T, CrawlError>>,
    cleanup: impl Future<Output = ()>,
) -> Result<T, CrawlError> {
    let outcome = tokio::time::timeout(budget, work).await;
    cleanup.await;
    outcome.map_err(|_| CrawlError::Timeout(budget.as_secs()))?
}

/// Consumes lifecycle event names until a `networkIdle` that follows the
/// navigation's `init`. Returns false when `limit` passes or the stream ends
/// first.
async fn wait_for_network_idle(events: impl Stream<Item = String>, limit: Duration) -> bool {
    let mut events = std::pin::pin!(events);
    let idle = async {
        let mut navigated = false;
        while let Some(name) = events.next().await {
            match name.as_str() {
                "init" => navigated = true,
                "networkIdle" if navigated => return true,
                _ => {}
            }
        }
        false
    };
    tokio::time::timeout(limit, idle).await.unwrap_or(false)
}

async fn launch_browser() -> Result<Browser, String> {
    let mut builder = BrowserConfig::builder().no_sandbox().disable_default_args();
    if let Some(bin) = find_chrome_binary() {
        tracing::info!("Using Chrome binary: {}", bin.display());
        builder = builder.chrome_executable(bin);
    }

    let config = builder
        .arg("--headless=new")
        .arg("--disable-gpu")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--disable-popup-blocking")
        .arg("--no-first-run")
        .build()?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| e.to_string())?;

    // The CDP handler must be polled continuously for the connection to work.
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                tracing::warn!("Browser CDP handler error: {event:?}");
                break;
            }
        }
    });

    Ok(browser)
}

impl FetchStrategy for HeadlessRenderStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::HeadlessRender
    }

    async fn fetch(&self, url: &str) -> Result<FetchedPage, CrawlError> {
        let browser = self.browser().await?;

        let document = self.render(browser, url).await?;

        // CDP does not expose the response status of the main frame here; a
        // completed navigation with a DOM is treated as a 200 HTML page.
        Ok(FetchedPage {
            url: url.to_string(),
            status_code: 200,
            content_type: "text/html".to_string(),
            document,
            headers: BTreeMap::new(),
            fetched_at: Utc::now(),
            strategy: StrategyKind::HeadlessRender,
        })
    }
}
