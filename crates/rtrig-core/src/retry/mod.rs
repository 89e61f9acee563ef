//! Bounded, fixed-interval retry around single requests.
//!
//! Only transport failures are retried. Classified errors (401/403/404,
//! configuration and protocol errors) and cancellation end the loop at once.
//! Once `retry_limit` retries have failed, the result is
//! [`TriggerError::RetryLimitExceeded`](crate::error::TriggerError::RetryLimitExceeded).
//!
//! Retrying a POST may trigger the remote job twice when an earlier attempt
//! reached the server but its response was lost.

mod policy;
mod run;

pub use policy::{RetryDecision, RetryPolicy};
pub use run::run_with_retry;
