//! Pacing between consecutive generation calls.
//!
//! The service enforces a rate limit it never advertises, so the
//! orchestrator waits a fixed interval between calls. The interval is a
//! floor: an explicit 429 from the service stretches the next wait.

use guppshupp::Error;
use std::time::Duration;

/// Default wait between two generation calls.
pub const DEFAULT_PACING_INTERVAL: Duration = Duration::from_secs(4);

/// Default multiplier applied to the interval after a rate-limited call.
pub const DEFAULT_RATE_LIMIT_BACKOFF: u32 = 3;

/// Decides how long to wait before the next call in a run.
pub trait Pacing: Send + Sync {
    /// Delay to apply after a call finished. `failure` is `None` on success.
    fn delay_after(&self, failure: Option<&Error>) -> Duration;
}

/// Constant delay, stretched after an explicit rate-limit rejection.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    interval: Duration,
    rate_limit_backoff: u32,
}

impl FixedDelay {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            rate_limit_backoff: DEFAULT_RATE_LIMIT_BACKOFF,
        }
    }

    /// Set the multiplier used after a 429. Values below 1 are treated as 1.
    pub fn with_rate_limit_backoff(mut self, factor: u32) -> Self {
        self.rate_limit_backoff = factor.max(1);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(DEFAULT_PACING_INTERVAL)
    }
}

impl Pacing for FixedDelay {
    fn delay_after(&self, failure: Option<&Error>) -> Duration {
        match failure {
            Some(e) if e.is_rate_limited() => self.interval.saturating_mul(self.rate_limit_backoff),
            _ => self.interval,
        }
    }
}

/// No pacing at all. For tests and local fakes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Pacing for NoDelay {
    fn delay_after(&self, _failure: Option<&Error>) -> Duration {
        Duration::ZERO
    }
}
