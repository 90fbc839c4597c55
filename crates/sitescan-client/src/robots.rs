use std::time::Duration;

use reqwest::{Client, StatusCode};
use sitescan_core::error::CrawlError;
use sitescan_core::origin::Origin;
use sitescan_core::robots::ROBOTS_FETCH_TIMEOUT;
use sitescan_core::traits::RobotsSource;

use crate::response::map_reqwest_error;

/// Fetches `{origin}/robots.txt` over HTTP.
#[derive(Clone)]
pub struct HttpRobotsSource {
    client: Client,
    timeout: Duration,
}

impl HttpRobotsSource {
    pub fn new(user_agent: &str) -> Result<Self, CrawlError> {
        Self::with_timeout(user_agent, ROBOTS_FETCH_TIMEOUT)
    }

    pub fn with_timeout(user_agent: &str, timeout: Duration) -> Result<Self, CrawlError> {
        let timeout = timeout.min(ROBOTS_FETCH_TIMEOUT);
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| CrawlError::Config(format!("HTTP client error: {e}")))?;
        Ok(Self { client, timeout })
    }
}

impl RobotsSource for HttpRobotsSource {
    async fn fetch_robots(&self, origin: &Origin) -> Result<Option<String>, CrawlError> {
        let url = origin.robots_url();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        if response.status() != StatusCode::OK {
            tracing::debug!(%url, status = %response.status(), "robots.txt not available");
            return Ok(None);
        }

        response
            .text()
            .await
            .map(Some)
            .map_err(|e| map_reqwest_error(e, self.timeout))
    }
}
