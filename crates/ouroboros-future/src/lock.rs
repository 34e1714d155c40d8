//! Monitor guarding the mutable state of one or more futures.
//!
//! A `FutureLock` pairs a mutex with a condition variable. Every future owns
//! one, either privately or shared through an `Arc` so that a group of
//! related futures serializes on a single monitor and shares its broadcast.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Instant;

/// Mutex + condition variable pair used as a future's monitor.
#[derive(Debug, Default)]
pub struct FutureLock {
    monitor: Mutex<()>,
    condvar: Condvar,
}

impl FutureLock {
    /// Create a new, unshared lock
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a lock ready to be handed to several futures
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Enter the monitor.
    pub(crate) fn enter(&self) -> MutexGuard<'_, ()> {
        self.monitor.lock()
    }

    /// Block until notified. May return spuriously; callers re-check.
    pub(crate) fn wait(&self, guard: &mut MutexGuard<'_, ()>) {
        self.condvar.wait(guard);
    }

    /// Block until notified or `deadline` passes.
    ///
    /// Returns `true` if the wait timed out.
    pub(crate) fn wait_until(&self, guard: &mut MutexGuard<'_, ()>, deadline: Instant) -> bool {
        self.condvar.wait_until(guard, deadline).timed_out()
    }

    /// Wake every thread blocked on this monitor.
    pub(crate) fn notify_all(&self) -> usize {
        self.condvar.notify_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_wait_until_times_out() {
        let lock = FutureLock::new();
        let mut guard = lock.enter();

        let deadline = Instant::now() + Duration::from_millis(20);
        // A spurious wake-up may return early; loop like real callers do.
        while Instant::now() < deadline {
            lock.wait_until(&mut guard, deadline);
        }

        assert!(Instant::now() >= deadline);
    }

    #[test]
    fn test_notify_all_without_waiters() {
        let lock = FutureLock::shared();
        assert_eq!(lock.notify_all(), 0);
    }
}
