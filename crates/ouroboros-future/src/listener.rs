//! Completion listeners

use std::fmt;

use crate::future::AsyncResult;

/// Callback invoked exactly once when a future completes.
///
/// Returning an error does not affect the future or other listeners; it is
/// forwarded to the future's fault reporter.
pub trait FutureListener<H, T>: Send + Sync {
    /// Called with the completed future.
    fn operation_complete(&self, future: &AsyncResult<H, T>) -> anyhow::Result<()>;
}

impl<H, T, F> FutureListener<H, T> for F
where
    F: Fn(&AsyncResult<H, T>) -> anyhow::Result<()> + Send + Sync,
{
    fn operation_complete(&self, future: &AsyncResult<H, T>) -> anyhow::Result<()> {
        self(future)
    }
}

/// Identifies one registration on one future; used to unregister it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

impl ListenerId {
    /// Raw registration number, unique per future
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A listener as stored in a future's queue.
pub(crate) struct Registration<H, T> {
    pub(crate) id: ListenerId,
    pub(crate) listener: Box<dyn FutureListener<H, T>>,
}

impl<H, T> fmt::Debug for Registration<H, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration").field("id", &self.id).finish()
    }
}
