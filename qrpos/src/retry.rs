//! Async driver for polled waits

use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use qrpos_core::{Error, RetryPolicy};

// Stand-in deadline for delays past the end of the clock
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Steps through the attempts of a `RetryPolicy`
///
/// Attempts run at a fixed rate: attempt `k` starts no earlier than the
/// sum of the delays before it, measured from creation. Time spent inside
/// an attempt counts against the next delay.
///
/// ```ignore
/// let mut retry = Retry::new(RetryPolicy::ACK, cancel);
/// while retry.next().await? {
///     if poll().await? {
///         break;
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Retry {
    policy: RetryPolicy,
    cancel: CancellationToken,
    attempt: u32,
    next_at: Instant,
}

impl Retry {
    pub fn new(policy: RetryPolicy, cancel: CancellationToken) -> Self {
        Self {
            policy,
            cancel,
            attempt: 0,
            next_at: Instant::now(),
        }
    }

    /// Wait for the next attempt
    ///
    /// Returns `false` once every attempt is used.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` as soon as the token fires, even mid-sleep.
    pub async fn next(&mut self) -> Result<bool, Error> {
        if self.attempt >= self.policy.attempts {
            return Ok(false);
        }
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let delay = self.policy.delay_before(self.attempt);
        self.next_at = self
            .next_at
            .checked_add(delay)
            .unwrap_or_else(|| Instant::now() + FAR_FUTURE);

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
            _ = sleep_until(self.next_at) => {}
        }

        self.attempt += 1;
        Ok(true)
    }

    /// Attempts started so far
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}
