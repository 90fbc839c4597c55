use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sitescan_core::analysis::{Classification, PageMetadata};
use sitescan_core::error::ErrorKind;
use sitescan_core::job::{CrawlJob, JobStatus};
use sitescan_core::models::{FetchFailure, FetchedPage, StrategyKind};

// ---------------------------------------------------------------------------
// Crawl
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CrawlRequest {
    /// Absolute http(s) URL to crawl
    pub url: String,
    /// Override the server's robots.txt setting for this job
    pub respect_robots: Option<bool>,
}

/// Coarse request state exposed to pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Processing,
    Completed,
    Failed,
}

impl From<JobStatus> for RequestStatus {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending | JobStatus::Running => RequestStatus::Processing,
            JobStatus::Completed => RequestStatus::Completed,
            JobStatus::Failed => RequestStatus::Failed,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CrawlResponse {
    pub request_id: Uuid,
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CrawlResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureResponse>,
}

impl CrawlResponse {
    pub fn processing(request_id: Uuid) -> Self {
        Self {
            request_id,
            status: RequestStatus::Processing,
            result: None,
            error: None,
        }
    }
}

/// Analysis of a completed crawl. The raw document is not included.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CrawlResult {
    pub url: String,
    #[schema(value_type = Object)]
    pub metadata: PageMetadata,
    #[schema(value_type = Object)]
    pub classification: Classification,
    pub fetch: FetchInfo,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FetchInfo {
    pub status_code: u16,
    pub content_type: String,
    /// Strategy that produced the document
    #[schema(value_type = String, example = "direct")]
    pub strategy: StrategyKind,
    pub attempts: u32,
    pub fetched_at: DateTime<Utc>,
}

impl FetchInfo {
    pub fn new(page: &FetchedPage, attempts: u32) -> Self {
        Self {
            status_code: page.status_code,
            content_type: page.content_type.clone(),
            strategy: page.strategy,
            attempts,
            fetched_at: page.fetched_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FailureResponse {
    #[schema(value_type = String, example = "policy_denied")]
    pub kind: ErrorKind,
    pub message: String,
}

impl From<FetchFailure> for FailureResponse {
    fn from(failure: FetchFailure) -> Self {
        Self {
            kind: failure.error_kind,
            message: failure.message,
        }
    }
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct JobResponse {
    pub id: Uuid,
    pub url: String,
    pub status: String,
    pub attempts: u32,
    pub respect_robots: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<FailureResponse>,
}

impl From<CrawlJob> for JobResponse {
    fn from(job: CrawlJob) -> Self {
        Self {
            id: job.id,
            url: job.url,
            status: job.status.to_string(),
            attempts: job.attempts,
            respect_robots: job.options.respect_robots,
            created_at: job.created_at,
            updated_at: job.updated_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            error: job.error.map(FailureResponse::from),
        }
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListJobsQuery {
    /// One of pending, running, completed, failed
    pub status: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct JobListResponse {
    pub jobs: Vec<JobResponse>,
    pub total: usize,
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RootResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub components: HealthComponents,
    pub active_jobs: usize,
    pub jobs: JobCounts,
}

/// Stored jobs per status.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct JobCounts {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthComponents {
    pub crawler: &'static str,
    pub metadata_extractor: &'static str,
    pub content_classifier: &'static str,
    /// `available` when a headless browser was found at startup
    pub render_fallback: &'static str,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
