//! Per-origin request spacing for polite crawling.
//!
//! Every job attempt asks [`DomainRateLimiter::wait_for_slot`] for
//! permission before touching the network. Requests to the same origin
//! are granted in arrival order, at least `min_interval` apart; requests
//! to different origins never wait on each other.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::origin::Origin;

/// Last grant time for one origin. The tokio mutex queues waiters FIFO,
/// which gives arrival-order grants.
type Slot = Arc<Mutex<Option<Instant>>>;

#[derive(Debug, Clone)]
pub struct DomainRateLimiter {
    min_interval: Duration,
    slots: Arc<DashMap<Origin, Slot>>,
}

impl DomainRateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            slots: Arc::new(DashMap::new()),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Number of origins seen so far.
    pub fn tracked_origins(&self) -> usize {
        self.slots.len()
    }

    /// Suspends until a request to `origin` may start, then records the
    /// grant. The first request to an origin is granted immediately.
    ///
    /// Dropping the returned future while it waits gives up the place in
    /// line without consuming a slot.
    pub async fn wait_for_slot(&self, origin: &Origin) {
        // Clone the slot out so the map shard is not held across the await.
        let slot = self.slots.entry(origin.clone()).or_default().clone();

        let mut last = slot.lock().await;
        if let Some(previous) = *last {
            let required = self.min_interval;
            let elapsed = previous.elapsed();
            if elapsed < required {
                let wait = required - elapsed;
                tracing::debug!(
                    %origin,
                    wait_ms = %wait.as_millis(),
                    "Throttling request"
                );
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}

impl Default for DomainRateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
