use std::fmt;

use url::Url;

use crate::error::CrawlError;

/// Scheme + host + port triple identifying a politeness domain.
///
/// Keys both the rate limiter buckets and the robots.txt cache. The port is
/// always explicit, so `https://example.com` and `https://example.com:443`
/// are the same origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    scheme: String,
    host: String,
    port: u16,
}

impl Origin {
    pub fn from_url(url: &Url) -> Result<Self, CrawlError> {
        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(CrawlError::InvalidUrl(format!(
                    "URL scheme '{scheme}' is not allowed (only http/https)"
                )));
            }
        }
        let host = url
            .host_str()
            .ok_or_else(|| CrawlError::InvalidUrl(format!("URL has no host: {url}")))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| CrawlError::InvalidUrl(format!("URL has no port: {url}")))?;

        Ok(Self {
            scheme: url.scheme().to_string(),
            host: host.to_ascii_lowercase(),
            port,
        })
    }

    pub fn parse(url: &str) -> Result<Self, CrawlError> {
        let parsed = Url::parse(url).map_err(|e| CrawlError::InvalidUrl(format!("{url}: {e}")))?;
        Self::from_url(&parsed)
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Location of this origin's robots.txt.
    pub fn robots_url(&self) -> String {
        format!("{self}/robots.txt")
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}
