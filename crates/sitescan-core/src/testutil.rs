//! Test utilities: mock implementations of the core traits.
//!
//! All mocks share their state through `Arc<Mutex<_>>`, so a clone handed to
//! the code under test still reports calls back to the test.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;

use crate::error::CrawlError;
use crate::models::{FetchAttempt, FetchedPage, StrategyKind};
use crate::orchestrator::{JobEvent, JobReporter};
use crate::origin::Origin;
use crate::traits::{FetchStrategy, PageFetcher, RobotsSource};

pub fn html_page(url: &str, strategy: StrategyKind, document: &str) -> FetchedPage {
    FetchedPage {
        url: url.to_string(),
        status_code: 200,
        content_type: "text/html; charset=utf-8".to_string(),
        document: document.to_string(),
        headers: BTreeMap::new(),
        fetched_at: Utc::now(),
        strategy,
    }
}

// ---------------------------------------------------------------------------
// MockStrategy
// ---------------------------------------------------------------------------

/// Fetch strategy with scripted outcomes.
///
/// Each call pops the first queued response; once the queue is empty every
/// call returns the fallback.
#[derive(Clone)]
pub struct MockStrategy {
    kind: StrategyKind,
    responses: Arc<Mutex<Vec<Result<String, CrawlError>>>>,
    fallback: Result<String, CrawlError>,
    calls: Arc<Mutex<usize>>,
}

impl MockStrategy {
    pub fn succeeding(kind: StrategyKind, document: &str) -> Self {
        Self::with_responses(kind, Vec::new(), Ok(document.to_string()))
    }

    pub fn failing(kind: StrategyKind, error: CrawlError) -> Self {
        Self::with_responses(kind, Vec::new(), Err(error))
    }

    pub fn with_responses(
        kind: StrategyKind,
        responses: Vec<Result<String, CrawlError>>,
        fallback: Result<String, CrawlError>,
    ) -> Self {
        Self {
            kind,
            responses: Arc::new(Mutex::new(responses)),
            fallback,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl FetchStrategy for MockStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn fetch(&self, url: &str) -> Result<FetchedPage, CrawlError> {
        *self.calls.lock().unwrap() += 1;
        let next = {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                self.fallback.clone()
            } else {
                responses.remove(0)
            }
        };
        next.map(|document| html_page(url, self.kind, &document))
    }
}

// ---------------------------------------------------------------------------
// MockPageFetcher
// ---------------------------------------------------------------------------

/// Page fetcher with scripted outcomes that records when it was called.
///
/// Returns a default document once the queue is drained.
#[derive(Clone)]
pub struct MockPageFetcher {
    outcomes: Arc<Mutex<Vec<Result<String, CrawlError>>>>,
    calls: Arc<Mutex<Vec<(String, Instant)>>>,
}

impl MockPageFetcher {
    pub fn new(document: &str) -> Self {
        Self::with_outcomes(vec![Ok(document.to_string())])
    }

    pub fn with_outcomes(outcomes: Vec<Result<String, CrawlError>>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fails the first `times` calls with `error`.
    pub fn failing_times(error: CrawlError, times: usize) -> Self {
        Self::with_outcomes(vec![Err(error); times])
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }

    pub fn called_urls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }
}

impl PageFetcher for MockPageFetcher {
    async fn fetch(&self, url: &str) -> FetchAttempt {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));
        let next = {
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                Ok("<html><body>default</body></html>".to_string())
            } else {
                outcomes.remove(0)
            }
        };
        match next {
            Ok(document) => FetchAttempt::success(html_page(url, StrategyKind::Direct, &document)),
            Err(e) => FetchAttempt::failure(url, StrategyKind::Direct, e),
        }
    }
}

// ---------------------------------------------------------------------------
// MockRobotsSource
// ---------------------------------------------------------------------------

/// robots.txt source returning a fixed answer for every origin.
#[derive(Clone)]
pub struct MockRobotsSource {
    response: Result<Option<String>, CrawlError>,
    latency: Duration,
    requested: Arc<Mutex<Vec<String>>>,
}

impl MockRobotsSource {
    pub fn with_body(body: &str) -> Self {
        Self::new(Ok(Some(body.to_string())))
    }

    pub fn not_found() -> Self {
        Self::new(Ok(None))
    }

    pub fn with_error(error: CrawlError) -> Self {
        Self::new(Err(error))
    }

    fn new(response: Result<Option<String>, CrawlError>) -> Self {
        Self {
            response,
            latency: Duration::ZERO,
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.requested.lock().unwrap().len()
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl RobotsSource for MockRobotsSource {
    async fn fetch_robots(&self, origin: &Origin) -> Result<Option<String>, CrawlError> {
        self.requested.lock().unwrap().push(origin.robots_url());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Reporter that keeps the name of every event plus the backoff delays.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<&'static str>>>,
    backoffs: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| **e == name).count()
    }

    pub fn backoffs(&self) -> Vec<Duration> {
        self.backoffs.lock().unwrap().clone()
    }
}

impl JobReporter for RecordingReporter {
    fn report(&self, event: JobEvent<'_>) {
        if let JobEvent::BackingOff { delay, .. } = &event {
            self.backoffs.lock().unwrap().push(*delay);
        }
        self.events.lock().unwrap().push(event.name());
    }
}
