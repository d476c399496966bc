//! Global politeness gate
//!
//! One [`RateLimiter`] spaces every outbound request of a crawler instance by
//! a minimum interval, regardless of host. `throttle` takes `&mut self`;
//! concurrent fetchers would have to share it behind a mutex.

use std::time::Duration;
use tokio::time::Instant;

/// Default spacing between two requests
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Time left before the next request may start, or `None` if it may start now
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        let last = self.last_request?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.min_interval {
            Some(self.min_interval - elapsed)
        } else {
            None
        }
    }

    /// Waits until the minimum interval has passed since the previous call
    ///
    /// Every call stamps the current time, whether it waited or not.
    pub async fn throttle(&mut self) {
        if let Some(wait) = self.time_until_next(Instant::now()) {
            tracing::trace!("Throttling next request for {:?}", wait);
            tokio::time::sleep(wait).await;
        }
        self.last_request = Some(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}
