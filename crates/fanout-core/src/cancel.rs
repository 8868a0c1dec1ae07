//! Cooperative cancellation with interruptible waits.
//!
//! A fired token wakes every blocked `sleep` immediately, which is what
//! lets timeout and cancellation reclaim worker threads promptly instead
//! of waiting out whatever simulated delay is in flight.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

struct Inner {
    cancelled: Mutex<bool>,
    cond: Condvar,
}

/// Shared cancellation flag. Clones observe the same state.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: Mutex::new(false),
                cond: Condvar::new(),
            }),
        }
    }

    /// Fire the token and wake all waiters.
    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock().unwrap();
        *cancelled = true;
        self.inner.cond.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock().unwrap()
    }

    /// Block for `duration` unless the token fires first.
    /// Returns `true` when the full duration elapsed, `false` when the
    /// wait was interrupted by cancellation.
    pub fn sleep(&self, duration: Duration) -> bool {
        let mut cancelled = self.inner.cancelled.lock().unwrap();
        let mut remaining = duration;

        while !*cancelled {
            if remaining.is_zero() {
                return true;
            }
            let before = std::time::Instant::now();
            let (guard, wait) = self
                .inner
                .cond
                .wait_timeout(cancelled, remaining)
                .unwrap();
            cancelled = guard;
            if wait.timed_out() {
                return !*cancelled;
            }
            remaining = remaining.saturating_sub(before.elapsed());
        }

        false
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
