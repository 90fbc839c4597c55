use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::CrawlError;
use crate::job::{CrawlJob, JobOptions, JobStatus};
use crate::models::{FetchFailure, FetchedPage};
use crate::traits::JobStore;

/// Process-local job store backed by a sharded concurrent map.
///
/// Jobs never share an entry, so concurrent updates to different jobs do
/// not contend on a single lock.
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobStore {
    jobs: Arc<DashMap<Uuid, CrawlJob>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn transition(
        &self,
        job_id: Uuid,
        to: JobStatus,
        apply: impl FnOnce(&mut CrawlJob),
    ) -> Result<(), CrawlError> {
        let mut job = self
            .jobs
            .get_mut(&job_id)
            .ok_or(CrawlError::JobNotFound(job_id))?;

        if !job.status.can_transition_to(to) {
            return Err(CrawlError::InvalidTransition {
                id: job_id,
                from: job.status,
                to,
            });
        }

        job.status = to;
        job.updated_at = Utc::now();
        apply(&mut *job);
        Ok(())
    }
}

impl JobStore for InMemoryJobStore {
    async fn create_job(&self, url: &str, options: JobOptions) -> Result<CrawlJob, CrawlError> {
        let job = CrawlJob::new(url, options);
        self.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn start_job(&self, job_id: Uuid) -> Result<(), CrawlError> {
        self.transition(job_id, JobStatus::Running, |job| {
            job.started_at = Some(job.updated_at);
        })
    }

    async fn record_attempt(&self, job_id: Uuid, attempt: u32) -> Result<(), CrawlError> {
        let mut job = self
            .jobs
            .get_mut(&job_id)
            .ok_or(CrawlError::JobNotFound(job_id))?;
        if job.status != JobStatus::Running {
            return Err(CrawlError::InvalidTransition {
                id: job_id,
                from: job.status,
                to: JobStatus::Running,
            });
        }
        job.attempts = attempt;
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn complete_job(&self, job_id: Uuid, page: FetchedPage) -> Result<(), CrawlError> {
        self.transition(job_id, JobStatus::Completed, |job| {
            job.completed_at = Some(job.updated_at);
            job.result = Some(page);
        })
    }

    async fn fail_job(&self, job_id: Uuid, failure: FetchFailure) -> Result<(), CrawlError> {
        self.transition(job_id, JobStatus::Failed, |job| {
            job.completed_at = Some(job.updated_at);
            job.error = Some(failure);
        })
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<CrawlJob>, CrawlError> {
        Ok(self.jobs.get(&job_id).map(|job| job.clone()))
    }

    async fn list_jobs(
        &self,
        status: Option<JobStatus>,
        limit: usize,
    ) -> Result<Vec<CrawlJob>, CrawlError> {
        let mut jobs: Vec<CrawlJob> = self
            .jobs
            .iter()
            .filter(|job| status.is_none_or(|s| job.status == s))
            .map(|job| job.clone())
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        Ok(jobs)
    }

    async fn count_by_status(&self, status: JobStatus) -> Result<usize, CrawlError> {
        Ok(self.jobs.iter().filter(|job| job.status == status).count())
    }
}
