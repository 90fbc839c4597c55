//! Per-origin robots.txt policy cache.
//!
//! The first query for an origin fetches `{origin}/robots.txt` through a
//! [`RobotsSource`]; every later query for that origin is answered from the
//! cache for the lifetime of the process. Concurrent first queries for the
//! same origin coalesce into a single fetch, while different origins never
//! wait on each other.
//!
//! A missing, unreachable, non-200 or slow robots.txt means "allow all".

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use robotstxt::DefaultMatcher;
use url::Url;

use crate::error::CrawlError;
use crate::origin::Origin;
use crate::traits::RobotsSource;

/// Upper bound on a robots.txt fetch before falling back to "allow all".
pub const ROBOTS_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Parsed crawl rules for one origin.
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    /// Raw robots.txt body; `None` means allow all.
    rules: Option<String>,
}

impl RobotsPolicy {
    pub fn from_rules(body: impl Into<String>) -> Self {
        Self {
            rules: Some(body.into()),
        }
    }

    /// Permissive policy used when robots.txt cannot be obtained.
    pub fn allow_all() -> Self {
        Self { rules: None }
    }

    pub fn is_allow_all(&self) -> bool {
        self.rules.as_deref().is_none_or(|r| r.trim().is_empty())
    }

    /// Whether `url` may be fetched by `user_agent`. Groups are matched on
    /// the agent's product token, falling back to the `*` group when no group
    /// names it.
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        match self.rules.as_deref() {
            Some(rules) if !rules.trim().is_empty() => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(rules, product_token(user_agent), url)
            }
            _ => true,
        }
    }
}

/// `SitescanBot/1.0 (+https://...)` is matched as `SitescanBot`.
fn product_token(user_agent: &str) -> &str {
    let agent = user_agent.trim();
    let end = agent
        .find(|c: char| c == '/' || c.is_whitespace())
        .unwrap_or(agent.len());
    if end == 0 { "*" } else { &agent[..end] }
}

/// Memoizes one [`RobotsPolicy`] per [`Origin`].
pub struct RobotsPolicyCache<S> {
    source: S,
    policies: Cache<Origin, Arc<RobotsPolicy>>,
    respect_robots: bool,
    fetch_timeout: Duration,
}

impl<S: RobotsSource> RobotsPolicyCache<S> {
    pub fn new(source: S, respect_robots: bool) -> Self {
        Self {
            source,
            // Unbounded and without TTL: policies live as long as the process.
            policies: Cache::builder().build(),
            respect_robots,
            fetch_timeout: ROBOTS_FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout.min(ROBOTS_FETCH_TIMEOUT);
        self
    }

    pub fn respects_robots(&self) -> bool {
        self.respect_robots
    }

    /// Returns false only when robots.txt explicitly disallows `url` for
    /// `user_agent`. Always true, without any network call, when robots
    /// handling is disabled.
    pub async fn authorize(&self, url: &str, user_agent: &str) -> Result<bool, CrawlError> {
        if !self.respect_robots {
            return Ok(true);
        }
        self.check(url, user_agent).await
    }

    /// Consults the rules regardless of the `respect_robots` setting.
    pub async fn check(&self, url: &str, user_agent: &str) -> Result<bool, CrawlError> {
        let parsed =
            Url::parse(url).map_err(|e| CrawlError::InvalidUrl(format!("{url}: {e}")))?;
        let origin = Origin::from_url(&parsed)?;
        let policy = self.policy_for(&origin).await;

        let allowed = policy.is_allowed(parsed.as_str(), user_agent);
        if !allowed {
            tracing::debug!(%origin, path = %parsed.path(), %user_agent, "Disallowed by robots.txt");
        }
        Ok(allowed)
    }

    /// Cached policy for `origin`, fetching it on first use.
    pub async fn policy_for(&self, origin: &Origin) -> Arc<RobotsPolicy> {
        self.policies
            .get_with(origin.clone(), async {
                Arc::new(self.load(origin).await)
            })
            .await
    }

    async fn load(&self, origin: &Origin) -> RobotsPolicy {
        tracing::debug!(%origin, "Fetching robots.txt");
        match tokio::time::timeout(self.fetch_timeout, self.source.fetch_robots(origin)).await {
            Ok(Ok(Some(body))) => {
                tracing::info!(%origin, bytes = body.len(), "Loaded robots.txt");
                RobotsPolicy::from_rules(body)
            }
            Ok(Ok(None)) => {
                tracing::debug!(%origin, "No robots.txt, allowing all");
                RobotsPolicy::allow_all()
            }
            Ok(Err(e)) => {
                tracing::warn!(%origin, error = %e, "Error fetching robots.txt, allowing all");
                RobotsPolicy::allow_all()
            }
            Err(_) => {
                tracing::warn!(
                    %origin,
                    timeout_secs = self.fetch_timeout.as_secs(),
                    "robots.txt fetch timed out, allowing all"
                );
                RobotsPolicy::allow_all()
            }
        }
    }
}
