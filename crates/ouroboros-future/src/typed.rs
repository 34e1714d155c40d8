//! Typed futures for common session operations
//!
//! These wrap an [`AsyncResult`] and give its opaque value a meaning:
//! whether a write was flushed, whether a session closed, or which session a
//! connect attempt produced. Waiting and listener registration go through
//! the wrapped future via `Deref`.

use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use crate::error::FutureError;
use crate::future::AsyncResult;

// ============================================================================
// WriteFuture
// ============================================================================

/// Outcome of a write request; the value is `true` once written.
pub struct WriteFuture<H> {
    inner: AsyncResult<H, bool>,
}

impl<H> WriteFuture<H> {
    /// Create a pending write future
    pub fn new(handle: H) -> Self {
        Self::from(AsyncResult::new(handle))
    }

    /// A write future that already succeeded
    pub fn written(handle: H) -> Self {
        let future = Self::new(handle);
        future.set_written();
        future
    }

    /// A write future that already failed
    pub fn not_written(handle: H) -> Self {
        let future = Self::new(handle);
        future.set_failed();
        future
    }

    /// Mark the write as flushed
    pub fn set_written(&self) -> bool {
        self.inner.complete(true)
    }

    /// Mark the write as failed
    pub fn set_failed(&self) -> bool {
        self.inner.complete(false)
    }

    /// `true` only once the write completed successfully
    pub fn is_written(&self) -> bool {
        self.inner.value().unwrap_or(false)
    }

    /// The underlying future
    pub fn inner(&self) -> &AsyncResult<H, bool> {
        &self.inner
    }
}

impl<H> From<AsyncResult<H, bool>> for WriteFuture<H> {
    fn from(inner: AsyncResult<H, bool>) -> Self {
        Self { inner }
    }
}

impl<H> Deref for WriteFuture<H> {
    type Target = AsyncResult<H, bool>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

// ============================================================================
// CloseFuture
// ============================================================================

/// Completes when the associated session has been closed.
pub struct CloseFuture<H> {
    inner: AsyncResult<H, bool>,
}

impl<H> CloseFuture<H> {
    /// Create a pending close future
    pub fn new(handle: H) -> Self {
        Self::from(AsyncResult::new(handle))
    }

    /// Mark the session as closed
    pub fn set_closed(&self) -> bool {
        self.inner.complete(true)
    }

    /// Whether the session has been closed
    pub fn is_closed(&self) -> bool {
        self.inner.value().unwrap_or(false)
    }

    /// The underlying future
    pub fn inner(&self) -> &AsyncResult<H, bool> {
        &self.inner
    }
}

impl<H> From<AsyncResult<H, bool>> for CloseFuture<H> {
    fn from(inner: AsyncResult<H, bool>) -> Self {
        Self { inner }
    }
}

impl<H> Deref for CloseFuture<H> {
    type Target = AsyncResult<H, bool>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

// ============================================================================
// ConnectFuture
// ============================================================================

/// Value carried by a [`ConnectFuture`]
pub type ConnectOutcome<S> = Result<S, Arc<anyhow::Error>>;

/// Outcome of a connect attempt: the new session, or why it failed.
pub struct ConnectFuture<H, S> {
    inner: AsyncResult<H, ConnectOutcome<S>>,
}

impl<H, S> ConnectFuture<H, S> {
    /// Create a pending connect future
    pub fn new(handle: H) -> Self {
        Self::from(AsyncResult::new(handle))
    }

    /// A connect future that already failed
    pub fn failed(handle: H, error: anyhow::Error) -> Self {
        let future = Self::new(handle);
        future.set_exception(error);
        future
    }

    /// Complete with the connected session
    pub fn set_session(&self, session: S) -> bool {
        self.inner.complete(Ok(session))
    }

    /// Complete with a connection failure
    pub fn set_exception(&self, error: anyhow::Error) -> bool {
        self.inner.complete(Err(Arc::new(error)))
    }

    /// The underlying future
    pub fn inner(&self) -> &AsyncResult<H, ConnectOutcome<S>> {
        &self.inner
    }
}

impl<H, S: Clone> ConnectFuture<H, S> {
    /// Whether the attempt completed with a session
    pub fn is_connected(&self) -> bool {
        matches!(self.inner.value(), Some(Ok(_)))
    }

    /// The connected session, without blocking.
    pub fn session(&self) -> Result<S, FutureError> {
        match self.inner.value() {
            None => Err(FutureError::NotReady),
            Some(Ok(session)) => Ok(session),
            Some(Err(err)) => Err(FutureError::Connect(err)),
        }
    }

    /// Wait up to `timeout` for the attempt to finish, then return its session.
    pub fn wait_session(&self, timeout: Duration) -> Result<S, FutureError> {
        if !self.inner.wait_for(timeout) {
            return Err(FutureError::Timeout(timeout));
        }
        self.session()
    }
}

impl<H, S> From<AsyncResult<H, ConnectOutcome<S>>> for ConnectFuture<H, S> {
    fn from(inner: AsyncResult<H, ConnectOutcome<S>>) -> Self {
        Self { inner }
    }
}

impl<H, S> Deref for ConnectFuture<H, S> {
    type Target = AsyncResult<H, ConnectOutcome<S>>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::FutureLock;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[test]
    fn test_write_future() {
        let future = WriteFuture::new("session");
        assert!(!future.is_written());

        assert!(future.set_written());
        assert!(!future.set_failed());
        assert!(future.is_written());
        assert!(future.is_ready());
    }

    #[test]
    fn test_write_future_presets() {
        assert!(WriteFuture::written(1).is_written());

        let failed = WriteFuture::not_written(1);
        assert!(failed.is_ready());
        assert!(!failed.is_written());
    }

    #[test]
    fn test_close_future_listener() {
        let future = CloseFuture::new(7u32);
        let closed = Arc::new(AtomicBool::new(false));

        let closed_clone = Arc::clone(&closed);
        future.on_complete(move |f| {
            closed_clone.store(f.value() == Some(true), Ordering::SeqCst);
            Ok(())
        });

        future.set_closed();
        assert!(future.is_closed());
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_connect_future_session() {
        let future: ConnectFuture<&str, u64> = ConnectFuture::new("dial");
        assert!(matches!(future.session(), Err(FutureError::NotReady)));

        future.set_session(99);
        assert!(future.is_connected());
        assert_eq!(future.session().unwrap(), 99);
    }

    #[test]
    fn test_connect_future_failure() {
        let future: ConnectFuture<&str, u64> =
            ConnectFuture::failed("dial", anyhow::anyhow!("connection refused"));

        assert!(!future.is_connected());
        match future.session() {
            Err(FutureError::Connect(err)) => assert_eq!(err.to_string(), "connection refused"),
            other => panic!("unexpected outcome: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_connect_wait_session_timeout() {
        let future: ConnectFuture<(), u64> = ConnectFuture::new(());
        let err = future.wait_session(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, FutureError::Timeout(_)));
    }

    #[test]
    fn test_connect_wait_session_across_threads() {
        let lock = FutureLock::shared();
        let inner: AsyncResult<(), ConnectOutcome<u64>> = AsyncResult::with_lock((), lock);
        let future = Arc::new(ConnectFuture::from(inner));

        let producer = Arc::clone(&future);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            producer.set_session(5);
        });

        assert_eq!(future.wait_session(Duration::from_secs(5)).unwrap(), 5);
        handle.join().unwrap();
    }
}
