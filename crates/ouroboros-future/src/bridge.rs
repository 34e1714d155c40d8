//! Await completion from Tokio tasks
//!
//! Blocking waits park an OS thread; inside a runtime that starves the
//! worker pool. These methods register a one-shot listener instead and
//! suspend the task until it fires.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::FutureError;
use crate::future::AsyncResult;
use crate::listener::ListenerId;

/// Unregisters the wake-up listener if the awaiting task is dropped early.
struct Unregister<'a, H, T> {
    future: &'a AsyncResult<H, T>,
    id: ListenerId,
}

impl<H, T> Drop for Unregister<'_, H, T> {
    fn drop(&mut self) {
        self.future.remove_listener(self.id);
    }
}

impl<H, T> AsyncResult<H, T> {
    /// Resolve once the future has completed.
    pub async fn completion(&self) {
        let (tx, rx) = oneshot::channel::<()>();
        let tx = Mutex::new(Some(tx));

        let id = self.on_complete(move |_| {
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(());
            }
            Ok(())
        });
        let _unregister = Unregister { future: self, id };

        // The sender only drops unsent if the listener was discarded,
        // which cannot happen while `_unregister` is alive.
        let _ = rx.await;
    }

    /// Like [`completion`](Self::completion), bounded by `timeout`.
    pub async fn completion_within(&self, timeout: Duration) -> Result<(), FutureError> {
        tokio::time::timeout(timeout, self.completion())
            .await
            .map_err(|_| FutureError::Timeout(timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_completion_from_blocking_producer() {
        let future = Arc::new(AsyncResult::<&str, u32>::new("session"));

        let producer = Arc::clone(&future);
        let handle = tokio::task::spawn_blocking(move || {
            std::thread::sleep(Duration::from_millis(10));
            producer.complete(42);
        });

        future.completion().await;
        assert_eq!(future.value(), Some(42));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_completion_already_ready() {
        let future: AsyncResult<(), u32> = AsyncResult::new(());
        future.complete(1);
        future.completion().await;
        assert_eq!(future.pending_listeners(), 0);
    }

    #[tokio::test]
    async fn test_completion_within_times_out() {
        let future: AsyncResult<(), u32> = AsyncResult::new(());

        let err = future
            .completion_within(Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, FutureError::Timeout(_)));
        // Dropped wait must not leave its listener behind
        assert_eq!(future.pending_listeners(), 0);
    }
}
