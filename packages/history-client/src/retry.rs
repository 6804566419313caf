//! Explicit retry policy for provider requests
//!
//! The policy is a plain value composed around the network call, so the
//! backoff schedule can be tested without any I/O.

use std::time::Duration;

/// Default number of total attempts (first try included)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base backoff delay
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default backoff multiplier applied per attempt
pub const DEFAULT_MULTIPLIER: u32 = 2;

/// Default cap on any single backoff delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(4);

/// Bounded exponential-backoff retry policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Multiplier applied to the delay after each retry
    pub multiplier: u32,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// A policy with millisecond-scale delays for tests
    pub fn fast() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(1),
            multiplier: DEFAULT_MULTIPLIER,
            max_delay: Duration::from_millis(4),
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    ///
    /// Attempt 1 waits `base_delay`, attempt 2 waits `base_delay *
    /// multiplier`, and so on, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// The full backoff schedule (one delay per retry)
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts)
            .map(|attempt| self.delay_for(attempt))
            .collect()
    }
}
