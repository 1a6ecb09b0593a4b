//! Bounded retry policies
//!
//! The device offers no notification primitive, so every wait is a poll:
//! a fixed number of attempts spaced by an interval. The policy only
//! describes the schedule; the async driver that sleeps lives in `qrpos`.

use std::time::Duration;

use crate::constants::{ACK_ATTEMPTS, POLL_INTERVAL, SENTINEL_ATTEMPTS};

/// Attempt budget and spacing for a polled wait
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts (the first one is immediate)
    pub attempts: u32,

    /// Delay between the first and second attempt
    pub interval: Duration,

    /// Growth factor applied to the interval after every attempt
    pub backoff: f64,

    /// Upper bound for a single delay
    pub max_interval: Duration,
}

impl RetryPolicy {
    /// Chunk acknowledgment: 50 reads, 100 ms apart
    pub const ACK: Self = Self::fixed(ACK_ATTEMPTS, POLL_INTERVAL);

    /// Multi-line response: 100 reads, 100 ms apart
    pub const SENTINEL: Self = Self::fixed(SENTINEL_ATTEMPTS, POLL_INTERVAL);

    /// Constant-interval policy
    pub const fn fixed(attempts: u32, interval: Duration) -> Self {
        Self {
            attempts,
            interval,
            backoff: 1.0,
            max_interval: interval,
        }
    }

    /// Grow the interval geometrically, capped at `max_interval`
    pub fn with_backoff(mut self, factor: f64, max_interval: Duration) -> Self {
        self.backoff = factor.max(1.0);
        self.max_interval = max_interval.max(self.interval);
        self
    }

    /// Delay to wait before attempt `attempt` (0-based)
    ///
    /// The first attempt never waits.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        // NaN, negative or sub-unit factors fall back to a constant interval
        let backoff = if self.backoff >= 1.0 { self.backoff } else { 1.0 };
        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let factor = backoff.powi(exponent);

        let scaled = self.interval.as_secs_f64() * factor;
        if !scaled.is_finite() || scaled >= self.max_interval.as_secs_f64() {
            return self.max_interval.max(self.interval);
        }

        self.interval.mul_f64(factor)
    }

    /// Time spent sleeping if every attempt fails
    pub fn ceiling(&self) -> Duration {
        (0..self.attempts)
            .map(|n| self.delay_before(n))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::ACK
    }
}
