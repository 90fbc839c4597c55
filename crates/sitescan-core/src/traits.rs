use std::future::Future;

use uuid::Uuid;

use crate::analysis::{Classification, PageMetadata};
use crate::error::CrawlError;
use crate::job::{CrawlJob, JobOptions, JobStatus};
use crate::models::{FetchAttempt, FetchFailure, FetchedPage, StrategyKind};
use crate::origin::Origin;

/// A single mechanism for fetching a page (plain HTTP, emulated browser, headless render).
pub trait FetchStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedPage, CrawlError>> + Send;
}

/// Produces one [`FetchAttempt`] per call. Implemented by the strategy chain.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = FetchAttempt> + Send;
}

/// Retrieves raw robots.txt bodies.
pub trait RobotsSource: Send + Sync {
    /// `Ok(Some(body))` on HTTP 200, `Ok(None)` for any other status.
    fn fetch_robots(
        &self,
        origin: &Origin,
    ) -> impl Future<Output = Result<Option<String>, CrawlError>> + Send;
}

/// Job lifecycle store polled by the boundary API.
///
/// Implementations must reject transitions out of terminal states with
/// [`CrawlError::InvalidTransition`].
pub trait JobStore: Send + Sync + Clone {
    fn create_job(
        &self,
        url: &str,
        options: JobOptions,
    ) -> impl Future<Output = Result<CrawlJob, CrawlError>> + Send;

    /// `Pending -> Running`.
    fn start_job(&self, job_id: Uuid) -> impl Future<Output = Result<(), CrawlError>> + Send;

    /// Record that attempt `attempt` is about to run.
    fn record_attempt(
        &self,
        job_id: Uuid,
        attempt: u32,
    ) -> impl Future<Output = Result<(), CrawlError>> + Send;

    /// `Running -> Completed`.
    fn complete_job(
        &self,
        job_id: Uuid,
        page: FetchedPage,
    ) -> impl Future<Output = Result<(), CrawlError>> + Send;

    /// `Pending | Running -> Failed`.
    fn fail_job(
        &self,
        job_id: Uuid,
        failure: FetchFailure,
    ) -> impl Future<Output = Result<(), CrawlError>> + Send;

    fn get_job(
        &self,
        job_id: Uuid,
    ) -> impl Future<Output = Result<Option<CrawlJob>, CrawlError>> + Send;

    /// Newest first.
    fn list_jobs(
        &self,
        status: Option<JobStatus>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<CrawlJob>, CrawlError>> + Send;

    fn count_by_status(
        &self,
        status: JobStatus,
    ) -> impl Future<Output = Result<usize, CrawlError>> + Send;
}

/// Extracts SEO metadata from a fetched HTML document.
pub trait MetadataExtractor: Send + Sync + Clone {
    fn extract(&self, document: &str, url: &str) -> Result<PageMetadata, CrawlError>;
}

/// Stateless scoring of extracted page content.
pub trait ContentClassifier: Send + Sync + Clone {
    fn classify(&self, metadata: &PageMetadata) -> Classification;
}
