pub mod analysis;
pub mod capability;
pub mod chain;
pub mod config;
pub mod error;
pub mod job;
pub mod job_store;
pub mod models;
pub mod orchestrator;
pub mod origin;
pub mod robots;
pub mod throttle;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use capability::Capabilities;
pub use chain::{StrategyChain, Unavailable};
pub use config::CrawlerConfig;
pub use error::{CrawlError, ErrorKind};
pub use job::{CrawlJob, JobOptions, JobStatus, RetryConfig};
pub use job_store::InMemoryJobStore;
pub use models::{FetchAttempt, FetchFailure, FetchedPage, StrategyKind};
pub use orchestrator::{CrawlOrchestrator, JobEvent, JobReporter, TracingJobReporter};
pub use origin::Origin;
pub use robots::{RobotsPolicy, RobotsPolicyCache};
pub use throttle::DomainRateLimiter;
pub use traits::{ContentClassifier, FetchStrategy, JobStore, MetadataExtractor, PageFetcher, RobotsSource};
