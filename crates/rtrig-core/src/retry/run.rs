//! Retry loop: run a closure until success, a terminal error, or the limit.

use super::policy::{RetryDecision, RetryPolicy};
use crate::context::CallContext;
use crate::control::CancelToken;
use crate::error::TriggerError;
use crate::url_model::url_without_parameters;

/// Runs `f` until it succeeds or the retry policy says to stop.
///
/// `f` receives the 1-based attempt number. Attempts are strictly
/// sequential; between them the loop sleeps on `cancel`, and an interrupted
/// sleep ends the call with [`TriggerError::Cancelled`].
pub fn run_with_retry<T, F>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    ctx: &CallContext,
    url: &str,
    mut f: F,
) -> Result<T, TriggerError>
where
    F: FnMut(u32) -> Result<T, TriggerError>,
{
    let clean_url = url_without_parameters(url);
    let mut attempt = 1u32;
    loop {
        let err = match f(attempt) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        match policy.decide(attempt, &err) {
            RetryDecision::NoRetry => return Err(err),
            RetryDecision::Exhausted => {
                tracing::warn!(attempt, url = %clean_url, "retry limit exceeded: {}", err);
                ctx.log(&format!(
                    "Connection to remote server failed on attempt #{attempt}, retry limit of {} reached. URL: {clean_url}",
                    policy.retry_limit
                ));
                return Err(TriggerError::RetryLimitExceeded {
                    url: clean_url,
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
            RetryDecision::RetryAfter(delay) => {
                tracing::warn!(attempt, url = %clean_url, "transient failure: {}", err);
                ctx.log(&format!(
                    "Connection to remote server failed on attempt #{attempt}, waiting {} seconds until next attempt. URL: {clean_url}",
                    delay.as_secs_f64()
                ));
                if cancel.sleep(delay).is_err() {
                    ctx.log("Interrupted while waiting to retry, giving up.");
                    return Err(TriggerError::Cancelled);
                }
                ctx.log(&format!(
                    "Retry attempt #{attempt} out of {}",
                    policy.retry_limit
                ));
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{MemorySink, RemoteServer};
    use crate::transport::{TransportError, TransportErrorKind};
    use std::sync::Arc;
    use std::time::Duration;

    fn ctx() -> (CallContext, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (
            CallContext::new(RemoteServer::new("ci", "http://h"), sink.clone()),
            sink,
        )
    }

    fn transient() -> TriggerError {
        TriggerError::Transient {
            url: "http://h/job/a/build".to_string(),
            source: TransportError::new(TransportErrorKind::Timeout, "timed out"),
        }
    }

    fn policy(limit: u32) -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(1), limit)
    }

    #[test]
    fn always_transient_runs_limit_plus_one_times() {
        let (c, _) = ctx();
        for limit in 0..4u32 {
            let mut calls = 0u32;
            let result: Result<(), _> =
                run_with_retry(&policy(limit), &CancelToken::new(), &c, "http://h/x", |attempt| {
                    calls += 1;
                    assert_eq!(attempt, calls);
                    assert!(attempt <= limit + 1);
                    Err(transient())
                });
            assert_eq!(calls, limit + 1);
            match result {
                Err(TriggerError::RetryLimitExceeded { attempts, last, .. }) => {
                    assert_eq!(attempts, limit + 1);
                    assert!(last.is_transient());
                }
                other => panic!("expected retry limit exceeded, got {other:?}"),
            }
        }
    }

    #[test]
    fn success_on_attempt_k_stops_there() {
        let (c, _) = ctx();
        let limit = 4;
        for k in 1..=limit + 1 {
            let mut calls = 0u32;
            let result = run_with_retry(&policy(limit), &CancelToken::new(), &c, "http://h/x", |attempt| {
                calls += 1;
                if attempt == k {
                    Ok(attempt)
                } else {
                    Err(transient())
                }
            });
            assert_eq!(result.unwrap(), k);
            assert_eq!(calls, k);
        }
    }

    #[test]
    fn terminal_errors_are_not_retried() {
        let (c, _) = ctx();
        let mut calls = 0;
        let result: Result<(), _> =
            run_with_retry(&policy(5), &CancelToken::new(), &c, "http://h/x", |_| {
                calls += 1;
                Err(TriggerError::Forbidden {
                    url: "http://h/x".to_string(),
                })
            });
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(TriggerError::Forbidden { .. })));
    }

    #[test]
    fn cancellation_during_sleep_stops_retrying() {
        let (c, _) = ctx();
        let cancel = CancelToken::new();
        let mut calls = 0;
        let long = RetryPolicy::new(Duration::from_secs(60), 5);
        let result: Result<(), _> = run_with_retry(&long, &cancel, &c, "http://h/x", |_| {
            calls += 1;
            cancel.cancel();
            Err(transient())
        });
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(TriggerError::Cancelled)));
    }

    #[test]
    fn log_lines_never_carry_the_query() {
        let (c, sink) = ctx();
        let _: Result<(), _> = run_with_retry(
            &policy(1),
            &CancelToken::new(),
            &c,
            "http://h/job/a/build?token=secret&delay=0",
            |_| Err(transient()),
        );
        let lines = sink.lines();
        assert!(lines.iter().any(|l| l.contains("Retry attempt #1 out of 1")));
        assert!(lines.iter().any(|l| l.contains("http://h/job/a/build")));
        assert!(lines.iter().all(|l| !l.contains("secret")));
    }
}
