//! Cooperative stop signalling between a [`ManagedThread`](crate::ManagedThread)
//! and its body.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use minstant::Instant;
use parking_lot::{Condvar, Mutex};

struct Inner {
    requested: AtomicBool,
    lock: Mutex<()>,
    wake: Condvar,
}

/// Stop flag for a single run of a managed thread.
///
/// Every successful start hands the body a fresh token, so a stop requested
/// for one run never carries over into the next. Bodies either poll
/// [`is_stop_requested`](Self::is_stop_requested) between units of work or
/// park on [`wait`](Self::wait) instead of sleeping.
#[derive(Clone)]
pub struct StopToken {
    inner: Arc<Inner>,
}

impl StopToken {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                requested: AtomicBool::new(false),
                lock: Mutex::new(()),
                wake: Condvar::new(),
            }),
        }
    }

    /// Whether the owner has asked this run to stop.
    #[inline]
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.inner.requested.load(Ordering::Acquire)
    }

    /// Parks the calling thread for up to `timeout`, returning early once a
    /// stop is requested.
    ///
    /// Returns `true` if a stop was requested. A `timeout` too large to be
    /// represented as a deadline waits for the request alone.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut guard = self.inner.lock.lock();
        while !self.is_stop_requested() {
            let Some(deadline) = deadline else {
                self.inner.wake.wait(&mut guard);
                continue;
            };
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            self.inner.wake.wait_for(&mut guard, deadline.duration_since(now));
        }
        self.is_stop_requested()
    }

    /// Raises the flag and wakes any waiter. Idempotent.
    pub(crate) fn request_stop(&self) {
        // Flip under the lock so a waiter between its check and its park
        // cannot miss the notification.
        let _guard = self.inner.lock.lock();
        self.inner.requested.store(true, Ordering::Release);
        self.inner.wake.notify_all();
    }
}

impl std::fmt::Debug for StopToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopToken")
            .field("requested", &self.is_stop_requested())
            .finish()
    }
}
