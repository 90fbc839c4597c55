use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CrawlError, ErrorKind};

/// Identifies which fetch mechanism produced an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Direct,
    EmulatedBrowser,
    HeadlessRender,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Direct => "direct",
            StrategyKind::EmulatedBrowser => "emulated_browser",
            StrategyKind::HeadlessRender => "headless_render",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A successfully fetched HTML document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedPage {
    pub url: String,
    pub status_code: u16,
    pub content_type: String,
    /// Raw document body exactly as returned by the winning strategy.
    pub document: String,
    pub headers: BTreeMap<String, String>,
    pub fetched_at: DateTime<Utc>,
    pub strategy: StrategyKind,
}

/// Failure payload handed to the lifecycle store and API consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub url: String,
    pub error_kind: ErrorKind,
    pub message: String,
}

impl FetchFailure {
    pub fn new(url: impl Into<String>, error: &CrawlError) -> Self {
        Self {
            url: url.into(),
            error_kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// One pass through the strategy chain. Never persisted.
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    pub url: String,
    /// The last strategy that ran.
    pub strategy: StrategyKind,
    pub outcome: Result<FetchedPage, CrawlError>,
}

impl FetchAttempt {
    pub fn success(page: FetchedPage) -> Self {
        Self {
            url: page.url.clone(),
            strategy: page.strategy,
            outcome: Ok(page),
        }
    }

    pub fn failure(url: impl Into<String>, strategy: StrategyKind, error: CrawlError) -> Self {
        Self {
            url: url.into(),
            strategy,
            outcome: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}
