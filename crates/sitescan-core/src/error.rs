use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::job::JobStatus;

/// Error types for the crawl pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrawlError {
    /// robots.txt disallows the URL for our user agent.
    #[error("URL disallowed by robots.txt: {url}")]
    PolicyDenied { url: String },

    /// The server answered with something other than HTTP 200.
    #[error("HTTP error: {code}")]
    HttpStatus { code: u16 },

    /// The response was not an HTML document.
    #[error("Not HTML content: {content_type}")]
    UnsupportedContentType { content_type: String },

    /// Connection refused, reset, DNS or TLS failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// No headless browser backend is available in this runtime.
    #[error("Render fallback unavailable")]
    RenderFallbackUnavailable,

    /// Job-level retry budget exhausted.
    #[error("Maximum retry attempts reached ({attempts}): {last}")]
    MaxAttemptsExceeded { attempts: u32, last: Box<CrawlError> },

    /// The job was cancelled between attempts.
    #[error("Job cancelled")]
    Cancelled,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A lifecycle transition the state machine does not allow.
    #[error("Job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),
}

/// Serializable tag for a [`CrawlError`], used in failure payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PolicyDenied,
    HttpStatusError,
    UnsupportedContentType,
    TransportError,
    RenderFallbackUnavailable,
    MaxAttemptsExceeded,
    Cancelled,
    InvalidUrl,
    Internal,
}

impl CrawlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CrawlError::PolicyDenied { .. } => ErrorKind::PolicyDenied,
            CrawlError::HttpStatus { .. } => ErrorKind::HttpStatusError,
            CrawlError::UnsupportedContentType { .. } => ErrorKind::UnsupportedContentType,
            CrawlError::Transport(_) | CrawlError::Timeout(_) => ErrorKind::TransportError,
            CrawlError::RenderFallbackUnavailable => ErrorKind::RenderFallbackUnavailable,
            CrawlError::MaxAttemptsExceeded { .. } => ErrorKind::MaxAttemptsExceeded,
            CrawlError::Cancelled => ErrorKind::Cancelled,
            CrawlError::InvalidUrl(_) => ErrorKind::InvalidUrl,
            CrawlError::Config(_)
            | CrawlError::InvalidTransition { .. }
            | CrawlError::JobNotFound(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if this error is transient and worth another job-level attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            CrawlError::Transport(_) | CrawlError::Timeout(_) => true,
            CrawlError::HttpStatus { code } => *code == 429 || *code >= 500,
            _ => false,
        }
    }

    /// Returns true if the strategy chain should try the next fetch mechanism.
    ///
    /// Only connectivity failures escalate: a different client will not change
    /// a server-side status decision.
    pub fn escalates(&self) -> bool {
        matches!(self, CrawlError::Transport(_) | CrawlError::Timeout(_))
    }
}
