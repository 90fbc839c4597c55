use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, COOKIE, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use reqwest::redirect::Policy;
use sitescan_core::config::CrawlerConfig;
use sitescan_core::error::CrawlError;
use sitescan_core::models::{FetchedPage, StrategyKind};
use sitescan_core::traits::FetchStrategy;
use url::Url;

use crate::response::{MAX_REDIRECTS, into_page, map_reqwest_error};

/// Desktop browser identities rotated per request.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
];

/// Pre-accepted cookie-consent banners for the common consent managers.
const CONSENT_COOKIES: &str =
    "cookieconsent_status=dismiss; CookieConsent=true; OptanonAlertBoxClosed=true; euconsent-v2=accepted";

/// HTTP GET dressed up as a desktop browser.
///
/// Second strategy in the chain, used after the direct fetch fails at the
/// transport level. Each request gets a rotated user agent, a search-engine
/// referrer derived from the target host, consent cookies, and a short
/// random pause before it is sent.
#[derive(Clone)]
pub struct EmulatedBrowserStrategy {
    client: Client,
    timeout: Duration,
    delay_min: Duration,
    delay_max: Duration,
}

impl EmulatedBrowserStrategy {
    pub fn new(config: &CrawlerConfig) -> Result<Self, CrawlError> {
        let client = Client::builder()
            .default_headers(browser_headers())
            .timeout(config.timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| CrawlError::Config(format!("HTTP client error: {e}")))?;

        Ok(Self {
            client,
            timeout: config.timeout,
            delay_min: Duration::from_millis(500),
            delay_max: Duration::from_millis(2500),
        })
    }

    /// Bounds of the random pause before each request. Equal bounds give a
    /// fixed pause.
    pub fn with_pre_request_delay(mut self, min: Duration, max: Duration) -> Self {
        self.delay_min = min.min(max);
        self.delay_max = max.max(min);
        self
    }

    fn pre_request_delay(&self) -> Duration {
        let spread = self.delay_max.saturating_sub(self.delay_min);
        self.delay_min + spread.mul_f64(fastrand::f64())
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert("upgrade-insecure-requests", HeaderValue::from_static("1"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("cross-site"));
    headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
    headers
}

/// Random entry from the user-agent pool.
pub fn random_user_agent() -> &'static str {
    USER_AGENTS[fastrand::usize(..USER_AGENTS.len())]
}

/// `https://www.google.com/search?q=<label>` where `label` is the first
/// host label that is not `www`.
pub fn search_referer(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let label = host.split('.').find(|label| !label.eq_ignore_ascii_case("www"))?;
    Some(format!("https://www.google.com/search?q={label}"))
}

impl FetchStrategy for EmulatedBrowserStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::EmulatedBrowser
    }

    async fn fetch(&self, url: &str) -> Result<FetchedPage, CrawlError> {
        let delay = self.pre_request_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let user_agent = random_user_agent();
        tracing::debug!(%url, %user_agent, "Emulated browser request");

        let mut request = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .header(COOKIE, CONSENT_COOKIES);
        if let Some(referer) = search_referer(url) {
            request = request.header(REFERER, referer);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        into_page(response, url, StrategyKind::EmulatedBrowser, self.timeout).await
    }
}
