use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::CrawlerConfig;
use crate::error::CrawlError;
use crate::job::{CrawlJob, JobOptions, JobStatus, RetryConfig};
use crate::models::{FetchFailure, FetchedPage, StrategyKind};
use crate::origin::Origin;
use crate::robots::RobotsPolicyCache;
use crate::throttle::DomainRateLimiter;
use crate::traits::{JobStore, PageFetcher, RobotsSource};

/// Events emitted by the orchestrator for monitoring/logging.
#[derive(Debug, Clone)]
pub enum JobEvent<'a> {
    Submitted {
        job_id: Uuid,
        url: &'a str,
    },
    Started {
        job_id: Uuid,
        url: &'a str,
    },
    AttemptStarted {
        job_id: Uuid,
        attempt: u32,
    },
    AttemptFailed {
        job_id: Uuid,
        attempt: u32,
        error: &'a CrawlError,
        will_retry: bool,
    },
    BackingOff {
        job_id: Uuid,
        next_attempt: u32,
        delay: Duration,
    },
    Completed {
        job_id: Uuid,
        attempts: u32,
        strategy: StrategyKind,
    },
    Failed {
        job_id: Uuid,
        error: &'a CrawlError,
    },
    Cancelled {
        job_id: Uuid,
    },
}

impl JobEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            JobEvent::Submitted { .. } => "submitted",
            JobEvent::Started { .. } => "started",
            JobEvent::AttemptStarted { .. } => "attempt_started",
            JobEvent::AttemptFailed { .. } => "attempt_failed",
            JobEvent::BackingOff { .. } => "backing_off",
            JobEvent::Completed { .. } => "completed",
            JobEvent::Failed { .. } => "failed",
            JobEvent::Cancelled { .. } => "cancelled",
        }
    }
}

/// Trait for receiving job events (decoupled logging).
pub trait JobReporter: Send + Sync {
    fn report(&self, event: JobEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingJobReporter;

impl JobReporter for TracingJobReporter {
    fn report(&self, event: JobEvent<'_>) {
        match event {
            JobEvent::Submitted { job_id, url } => {
                tracing::info!(%job_id, %url, "Crawl job submitted");
            }
            JobEvent::Started { job_id, url } => {
                tracing::info!(%job_id, %url, "Processing crawl job");
            }
            JobEvent::AttemptStarted { job_id, attempt } => {
                tracing::debug!(%job_id, %attempt, "Fetch attempt started");
            }
            JobEvent::AttemptFailed {
                job_id,
                attempt,
                error,
                will_retry,
            } => {
                tracing::warn!(%job_id, %attempt, %error, %will_retry, "Fetch attempt failed");
            }
            JobEvent::BackingOff {
                job_id,
                next_attempt,
                delay,
            } => {
                tracing::info!(
                    %job_id,
                    %next_attempt,
                    delay_ms = %delay.as_millis(),
                    "Backing off before retry"
                );
            }
            JobEvent::Completed {
                job_id,
                attempts,
                strategy,
            } => {
                tracing::info!(%job_id, %attempts, %strategy, "Crawl job completed");
            }
            JobEvent::Failed { job_id, error } => {
                tracing::warn!(%job_id, kind = ?error.kind(), %error, "Crawl job failed");
            }
            JobEvent::Cancelled { job_id } => {
                tracing::info!(%job_id, "Crawl job cancelled");
            }
        }
    }
}

/// Drives crawl jobs through the lifecycle store.
///
/// Every attempt waits on the per-origin rate limiter, then (first attempt
/// only) asks the robots cache for permission, then runs the fetcher once.
/// Retryable verdicts back off exponentially with jitter; everything else
/// ends the job. Each job runs as its own task, so jobs never share mutable
/// state apart from the rate limiter and the robots cache.
pub struct CrawlOrchestrator<P, S, J> {
    fetcher: Arc<P>,
    robots: Arc<RobotsPolicyCache<S>>,
    limiter: DomainRateLimiter,
    store: J,
    user_agent: Arc<str>,
    retry: RetryConfig,
    reporter: Arc<dyn JobReporter>,
    tokens: Arc<DashMap<Uuid, CancellationToken>>,
    shutdown: CancellationToken,
}

impl<P, S, J: Clone> Clone for CrawlOrchestrator<P, S, J> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            robots: Arc::clone(&self.robots),
            limiter: self.limiter.clone(),
            store: self.store.clone(),
            user_agent: Arc::clone(&self.user_agent),
            retry: self.retry.clone(),
            reporter: Arc::clone(&self.reporter),
            tokens: Arc::clone(&self.tokens),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<P, S, J> CrawlOrchestrator<P, S, J>
where
    P: PageFetcher + 'static,
    S: RobotsSource + 'static,
    J: JobStore + 'static,
{
    pub fn new(fetcher: P, robots_source: S, store: J, config: &CrawlerConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            robots: Arc::new(RobotsPolicyCache::new(robots_source, config.respect_robots)),
            limiter: DomainRateLimiter::new(config.request_delay),
            store,
            user_agent: Arc::from(config.user_agent.as_str()),
            retry: config.retry_config(),
            reporter: Arc::new(TracingJobReporter),
            tokens: Arc::new(DashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_reporter(mut self, reporter: impl JobReporter + 'static) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    pub fn store(&self) -> &J {
        &self.store
    }

    pub fn robots(&self) -> &RobotsPolicyCache<S> {
        &self.robots
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Jobs submitted but not yet finished.
    pub fn active_jobs(&self) -> usize {
        self.tokens.len()
    }

    /// Create a `Pending` job and run it in the background.
    ///
    /// Returns as soon as the job is stored; poll the store for the outcome.
    pub async fn submit(&self, url: &str, options: JobOptions) -> Result<Uuid, CrawlError> {
        let (job, token) = self.prepare(url, options).await?;
        let job_id = job.id;

        let this = self.clone();
        tokio::spawn(async move {
            this.run_job(job, token).await;
        });

        Ok(job_id)
    }

    /// Create a job and drive it to a terminal state on the current task.
    pub async fn crawl(&self, url: &str, options: JobOptions) -> Result<CrawlJob, CrawlError> {
        let (job, token) = self.prepare(url, options).await?;
        let job_id = job.id;
        self.run_job(job, token).await;

        self.store
            .get_job(job_id)
            .await?
            .ok_or(CrawlError::JobNotFound(job_id))
    }

    /// Stop a job at its next suspension point. It ends `Failed` with
    /// [`CrawlError::Cancelled`]. Terminal jobs cannot be cancelled.
    pub async fn cancel(&self, job_id: Uuid) -> Result<(), CrawlError> {
        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or(CrawlError::JobNotFound(job_id))?;

        if job.status.is_terminal() {
            return Err(CrawlError::InvalidTransition {
                id: job_id,
                from: job.status,
                to: JobStatus::Failed,
            });
        }

        let token = self.tokens.get(&job_id).map(|t| t.clone());
        match token {
            Some(token) => token.cancel(),
            None => {
                // No task owns this job; finish it here.
                self.store
                    .fail_job(job_id, FetchFailure::new(&job.url, &CrawlError::Cancelled))
                    .await?;
                self.reporter.report(JobEvent::Cancelled { job_id });
            }
        }
        Ok(())
    }

    /// Cancel every in-flight job.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    async fn prepare(
        &self,
        url: &str,
        options: JobOptions,
    ) -> Result<(CrawlJob, CancellationToken), CrawlError> {
        Origin::parse(url)?;
        let job = self.store.create_job(url, options).await?;
        let token = self.shutdown.child_token();
        self.tokens.insert(job.id, token.clone());
        self.reporter.report(JobEvent::Submitted {
            job_id: job.id,
            url: &job.url,
        });
        Ok((job, token))
    }

    async fn run_job(&self, job: CrawlJob, token: CancellationToken) {
        let job_id = job.id;

        if let Err(e) = self.store.start_job(job_id).await {
            tracing::debug!(%job_id, error = %e, "Job no longer startable");
            self.tokens.remove(&job_id);
            return;
        }
        self.reporter.report(JobEvent::Started {
            job_id,
            url: &job.url,
        });

        let outcome = self.execute(&job, &token).await;

        let stored = match outcome {
            Ok((page, attempts)) => {
                self.reporter.report(JobEvent::Completed {
                    job_id,
                    attempts,
                    strategy: page.strategy,
                });
                self.store.complete_job(job_id, page).await
            }
            Err(e) => {
                if e == CrawlError::Cancelled {
                    self.reporter.report(JobEvent::Cancelled { job_id });
                } else {
                    self.reporter.report(JobEvent::Failed { job_id, error: &e });
                }
                self.store
                    .fail_job(job_id, FetchFailure::new(&job.url, &e))
                    .await
            }
        };

        // The token stays registered until the outcome is stored, so a
        // concurrent `cancel` never finishes the job on its own.
        self.tokens.remove(&job_id);

        if let Err(e) = stored {
            tracing::error!(%job_id, error = %e, "Failed to record job outcome");
        }
    }

    /// The retry loop. Returns the page and the number of attempts used.
    async fn execute(
        &self,
        job: &CrawlJob,
        token: &CancellationToken,
    ) -> Result<(FetchedPage, u32), CrawlError> {
        let job_id = job.id;
        let url = job.url.as_str();
        let origin = Origin::parse(url)?;
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            if token.is_cancelled() {
                return Err(CrawlError::Cancelled);
            }

            tokio::select! {
                () = self.limiter.wait_for_slot(&origin) => {}
                () = token.cancelled() => return Err(CrawlError::Cancelled),
            }

            if attempt == 1 && !self.authorize(url, job.options).await? {
                return Err(CrawlError::PolicyDenied {
                    url: url.to_string(),
                });
            }

            self.store.record_attempt(job_id, attempt).await?;
            self.reporter
                .report(JobEvent::AttemptStarted { job_id, attempt });

            let fetched = tokio::select! {
                fetched = self.fetcher.fetch(url) => fetched,
                () = token.cancelled() => return Err(CrawlError::Cancelled),
            };

            let error = match fetched.outcome {
                Ok(page) => return Ok((page, attempt)),
                Err(e) => e,
            };

            let retryable = error.is_retryable();
            let will_retry = retryable && attempt < max_attempts;
            self.reporter.report(JobEvent::AttemptFailed {
                job_id,
                attempt,
                error: &error,
                will_retry,
            });

            if !retryable {
                return Err(error);
            }
            if !will_retry {
                return Err(CrawlError::MaxAttemptsExceeded {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            let delay = self.retry.delay_after_attempt(attempt);
            attempt += 1;
            self.reporter.report(JobEvent::BackingOff {
                job_id,
                next_attempt: attempt,
                delay,
            });
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = token.cancelled() => return Err(CrawlError::Cancelled),
            }
        }
    }

    /// A per-job `respect_robots` override beats the configured default.
    async fn authorize(&self, url: &str, options: JobOptions) -> Result<bool, CrawlError> {
        match options.respect_robots {
            Some(true) => self.robots.check(url, &self.user_agent).await,
            Some(false) => Ok(true),
            None => self.robots.authorize(url, &self.user_agent).await,
        }
    }
}
