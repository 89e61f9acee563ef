//! Optional cap on simultaneous in-flight calls.
//!
//! A [`PermitPool`] is shared by callers that want to limit how many trigger
//! calls hit remote servers at once. The gate fails open: if no permit can
//! be had within the wait (or the wait is cancelled) the call goes ahead
//! anyway.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::context::CallContext;
use crate::control::CancelToken;

/// Granularity at which a blocked acquire re-checks the cancel token.
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Counting permit pool. Zero permits is allowed; every acquire then times out.
#[derive(Debug)]
pub struct PermitPool {
    max: usize,
    available: Mutex<usize>,
    released: Condvar,
}

/// Outcome of [`PermitPool::try_acquire_for`].
#[derive(Debug)]
pub enum Acquire<'a> {
    Acquired(Permit<'a>),
    TimedOut,
    Interrupted,
}

/// Held permit; returned to the pool on drop.
#[derive(Debug)]
pub struct Permit<'a> {
    pool: &'a PermitPool,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        let mut available = self
            .pool
            .available
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *available = (*available + 1).min(self.pool.max);
        drop(available);
        self.pool.released.notify_one();
    }
}

impl PermitPool {
    pub fn new(permits: usize) -> Self {
        Self {
            max: permits,
            available: Mutex::new(permits),
            released: Condvar::new(),
        }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Permits not currently held.
    pub fn available(&self) -> usize {
        *self.available.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn in_use(&self) -> usize {
        self.max.saturating_sub(self.available())
    }

    /// Take a permit without waiting.
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut available = self.available.lock().unwrap_or_else(PoisonError::into_inner);
        if *available == 0 {
            return None;
        }
        *available -= 1;
        Some(Permit { pool: self })
    }

    /// Wait up to `timeout` for a permit, giving up early if `cancel` fires.
    pub fn try_acquire_for(&self, timeout: Duration, cancel: &CancelToken) -> Acquire<'_> {
        let deadline = Instant::now() + timeout;
        let mut available = self.available.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if cancel.is_cancelled() {
                return Acquire::Interrupted;
            }
            if *available > 0 {
                *available -= 1;
                return Acquire::Acquired(Permit { pool: self });
            }
            let now = Instant::now();
            if now >= deadline {
                return Acquire::TimedOut;
            }
            let slice = (deadline - now).min(CANCEL_POLL);
            let (guard, _) = self
                .released
                .wait_timeout(available, slice)
                .unwrap_or_else(PoisonError::into_inner);
            available = guard;
        }
    }
}

/// Run `call` holding a permit from `pool` when one can be had.
///
/// Without a pool the call is ungated. A timed-out or interrupted acquire is
/// logged and the call runs without a permit. An acquired permit is released
/// exactly once, after `call` returns or unwinds.
pub fn with_gate<T>(
    pool: Option<&PermitPool>,
    wait: Duration,
    cancel: &CancelToken,
    ctx: &CallContext,
    call: impl FnOnce() -> T,
) -> T {
    let Some(pool) = pool else {
        ctx.log("calling remote without locking...");
        return call();
    };
    let _permit = match pool.try_acquire_for(wait, cancel) {
        Acquire::Acquired(permit) => {
            tracing::trace!(in_use = pool.in_use(), max = pool.max(), "permit acquired");
            Some(permit)
        }
        Acquire::TimedOut => {
            ctx.log(&format!(
                "could not acquire a call permit within {} seconds, calling remote without locking...",
                wait.as_secs_f64()
            ));
            None
        }
        Acquire::Interrupted => {
            ctx.log("interrupted while waiting for a call permit, calling remote without locking...");
            None
        }
    };
    call()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{MemorySink, RemoteServer};
    use std::sync::Arc;

    fn ctx() -> (CallContext, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (
            CallContext::new(RemoteServer::new("ci", "http://h"), sink.clone()),
            sink,
        )
    }

    #[test]
    fn permits_are_counted_and_released_on_drop() {
        let pool = PermitPool::new(2);
        let a = pool.try_acquire().unwrap();
        let b = pool.try_acquire().unwrap();
        assert!(pool.try_acquire().is_none());
        assert_eq!(pool.in_use(), 2);
        drop(a);
        assert_eq!(pool.available(), 1);
        drop(b);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn zero_permits_fail_open() {
        let pool = PermitPool::new(0);
        let (c, sink) = ctx();
        let mut ran = false;
        with_gate(Some(&pool), Duration::from_millis(20), &CancelToken::new(), &c, || {
            ran = true;
        });
        assert!(ran);
        assert_eq!(pool.available(), 0);
        assert!(sink.contains("without locking"));
    }

    #[test]
    fn permit_held_during_call_and_released_after() {
        let pool = PermitPool::new(1);
        let (c, _) = ctx();
        let during = with_gate(Some(&pool), Duration::from_secs(1), &CancelToken::new(), &c, || {
            pool.available()
        });
        assert_eq!(during, 0);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn permit_released_when_call_fails() {
        let pool = PermitPool::new(1);
        let (c, _) = ctx();
        let result: Result<(), &str> =
            with_gate(Some(&pool), Duration::from_secs(1), &CancelToken::new(), &c, || Err("boom"));
        assert!(result.is_err());
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn cancelled_wait_proceeds_without_permit() {
        let pool = PermitPool::new(1);
        let held = pool.try_acquire().unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            pool.try_acquire_for(Duration::from_secs(30), &cancel),
            Acquire::Interrupted
        ));
        let (c, sink) = ctx();
        assert_eq!(with_gate(Some(&pool), Duration::from_secs(30), &cancel, &c, || 7), 7);
        assert!(sink.contains("interrupted"));
        drop(held);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn waiter_gets_permit_released_by_another_thread() {
        let pool = Arc::new(PermitPool::new(1));
        let held = pool.try_acquire().unwrap();
        let worker = {
            let pool = Arc::clone(&pool);
            std::thread::spawn(move || {
                matches!(
                    pool.try_acquire_for(Duration::from_secs(10), &CancelToken::new()),
                    Acquire::Acquired(_)
                )
            })
        };
        std::thread::sleep(Duration::from_millis(30));
        drop(held);
        assert!(worker.join().unwrap());
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn no_pool_is_ungated() {
        let (c, sink) = ctx();
        assert_eq!(with_gate(None, Duration::ZERO, &CancelToken::new(), &c, || 1), 1);
        assert!(sink.contains("calling remote without locking..."));
    }
}
