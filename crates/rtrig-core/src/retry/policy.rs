use std::time::Duration;

use crate::error::TriggerError;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Terminal error; propagate as is.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
    /// Transient error, but the retry budget is spent.
    Exhausted,
}

/// Fixed-interval retry policy.
///
/// `retry_limit` counts retries, not attempts: a limit of `N` allows `N + 1`
/// attempts in total, and `0` means a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait between attempts.
    pub poll_interval: Duration,
    /// Maximum number of retries after the first attempt.
    pub retry_limit: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            retry_limit: 5,
        }
    }
}

impl RetryPolicy {
    pub fn new(poll_interval: Duration, retry_limit: u32) -> Self {
        Self {
            poll_interval,
            retry_limit,
        }
    }

    /// What to do after `attempt` (1-based) failed with `err`.
    pub fn decide(&self, attempt: u32, err: &TriggerError) -> RetryDecision {
        if !err.is_transient() {
            return RetryDecision::NoRetry;
        }
        if attempt <= self.retry_limit {
            RetryDecision::RetryAfter(self.poll_interval)
        } else {
            RetryDecision::Exhausted
        }
    }
}
