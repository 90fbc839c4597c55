use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use sitescan_core::config::CrawlerConfig;
use sitescan_core::error::CrawlError;
use sitescan_core::models::{FetchedPage, StrategyKind};
use sitescan_core::traits::FetchStrategy;

use crate::response::{MAX_REDIRECTS, into_page, map_reqwest_error};

/// Plain HTTP GET with the configured crawler identity.
///
/// First strategy in the chain. Follows redirects and requires a `200 OK`
/// HTML response.
#[derive(Clone)]
pub struct DirectStrategy {
    client: Client,
    timeout: Duration,
}

impl DirectStrategy {
    pub fn new(config: &CrawlerConfig) -> Result<Self, CrawlError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(default_headers())
            .timeout(config.timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| CrawlError::Config(format!("HTTP client error: {e}")))?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    // Do Not Track
    headers.insert("dnt", HeaderValue::from_static("1"));
    headers
}

impl FetchStrategy for DirectStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Direct
    }

    async fn fetch(&self, url: &str) -> Result<FetchedPage, CrawlError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        into_page(response, url, StrategyKind::Direct, self.timeout).await
    }
}
