use std::str::FromStr;
use std::time::Duration;

use crate::error::CrawlError;
use crate::job::RetryConfig;

pub const DEFAULT_USER_AGENT: &str = "SitescanBot/1.0";

/// Crawler configuration.
///
/// Built from [`Default`], then environment overrides via [`from_env`](Self::from_env),
/// then explicit call-site overrides via the `with_*` setters. Later layers win.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlerConfig {
    /// Minimum interval between two requests to the same origin.
    pub request_delay: Duration,
    pub user_agent: String,
    pub respect_robots: bool,
    /// Escalate to the emulated-browser strategy on transport failures.
    pub browser_emulation: bool,
    /// Escalate to headless rendering when the capability is present.
    pub use_render_fallback: bool,
    pub max_attempts: u32,
    /// Per-request timeout for every fetch strategy.
    pub timeout: Duration,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_delay: Duration::from_secs(1),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            respect_robots: true,
            browser_emulation: true,
            use_render_fallback: true,
            max_attempts: 3,
            timeout: Duration::from_secs(15),
        }
    }
}

impl CrawlerConfig {
    /// Read overrides from the process environment.
    ///
    /// - `SITESCAN_REQUEST_DELAY` (seconds, fractional allowed)
    /// - `SITESCAN_USER_AGENT`
    /// - `SITESCAN_RESPECT_ROBOTS`, `SITESCAN_BROWSER_EMULATION`,
    ///   `SITESCAN_USE_RENDER_FALLBACK` (`true`/`false`)
    /// - `SITESCAN_MAX_ATTEMPTS` (at least 1)
    /// - `SITESCAN_TIMEOUT` (seconds)
    pub fn from_env() -> Result<Self, CrawlError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CrawlError> {
        let mut config = Self::default();

        if let Some(secs) = parse_var::<f64>(&lookup, "SITESCAN_REQUEST_DELAY")? {
            config.request_delay = seconds("SITESCAN_REQUEST_DELAY", secs)?;
        }
        if let Some(ua) = lookup("SITESCAN_USER_AGENT").filter(|ua| !ua.trim().is_empty()) {
            config.user_agent = ua;
        }
        if let Some(v) = parse_bool(&lookup, "SITESCAN_RESPECT_ROBOTS")? {
            config.respect_robots = v;
        }
        if let Some(v) = parse_bool(&lookup, "SITESCAN_BROWSER_EMULATION")? {
            config.browser_emulation = v;
        }
        if let Some(v) = parse_bool(&lookup, "SITESCAN_USE_RENDER_FALLBACK")? {
            config.use_render_fallback = v;
        }
        if let Some(max) = parse_var::<u32>(&lookup, "SITESCAN_MAX_ATTEMPTS")? {
            if max == 0 {
                return Err(CrawlError::Config(
                    "SITESCAN_MAX_ATTEMPTS must be at least 1".into(),
                ));
            }
            config.max_attempts = max;
        }
        if let Some(secs) = parse_var::<f64>(&lookup, "SITESCAN_TIMEOUT")? {
            config.timeout = seconds("SITESCAN_TIMEOUT", secs)?;
        }

        Ok(config)
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_respect_robots(mut self, respect: bool) -> Self {
        self.respect_robots = respect;
        self
    }

    pub fn with_browser_emulation(mut self, enabled: bool) -> Self {
        self.browser_emulation = enabled;
        self
    }

    pub fn with_render_fallback(mut self, enabled: bool) -> Self {
        self.use_render_fallback = enabled;
        self
    }

    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Job-level retry policy derived from this config.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::default().with_max_attempts(self.max_attempts)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, CrawlError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CrawlError::Config(format!("Invalid {key} '{raw}'"))),
    }
}

fn parse_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<bool>, CrawlError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(CrawlError::Config(format!(
                "Invalid {key} '{raw}': expected true or false"
            ))),
        },
    }
}

fn seconds(key: &str, secs: f64) -> Result<Duration, CrawlError> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| CrawlError::Config(format!("Invalid {key} '{secs}': must be non-negative")))
}
