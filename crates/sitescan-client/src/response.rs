//! Shared reqwest plumbing for the HTTP strategies.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Response, StatusCode};
use sitescan_core::error::CrawlError;
use sitescan_core::models::{FetchedPage, StrategyKind};

/// Maximum redirects followed by the HTTP strategies.
pub(crate) const MAX_REDIRECTS: usize = 10;

/// Map a reqwest failure onto the crawl error taxonomy.
///
/// Anything that happened on the wire is a transport failure, which lets the
/// strategy chain escalate.
pub(crate) fn map_reqwest_error(e: reqwest::Error, timeout: Duration) -> CrawlError {
    if e.is_timeout() {
        CrawlError::Timeout(timeout.as_secs())
    } else if e.is_builder() {
        CrawlError::InvalidUrl(e.to_string())
    } else if e.is_connect() {
        CrawlError::Transport(format!("Connection failed: {e}"))
    } else {
        CrawlError::Transport(e.to_string())
    }
}

/// Accept only `200 OK` HTML responses and capture them unaltered.
pub(crate) async fn into_page(
    response: Response,
    url: &str,
    strategy: StrategyKind,
    timeout: Duration,
) -> Result<FetchedPage, CrawlError> {
    let status = response.status();
    if status != StatusCode::OK {
        return Err(CrawlError::HttpStatus {
            code: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if !content_type.contains("text/html") {
        return Err(CrawlError::UnsupportedContentType { content_type });
    }

    let headers = header_map(response.headers());
    let document = response
        .text()
        .await
        .map_err(|e| map_reqwest_error(e, timeout))?;

    Ok(FetchedPage {
        url: url.to_string(),
        status_code: status.as_u16(),
        content_type,
        document,
        headers,
        fetched_at: Utc::now(),
        strategy,
    })
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            map.entry(name.as_str().to_string())
                .and_modify(|existing: &mut String| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }
    }
    map
}
