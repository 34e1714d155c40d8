//! ouroboros-future: one-shot, thread-safe result container
//!
//! An [`AsyncResult`] stands for the eventual outcome of an operation run by
//! another thread. Consumers block on it, poll it, or register listeners that
//! fire exactly once, in registration order, whether they were added before
//! or after completion.
//!
//! # Architecture
//!
//! ```text
//! producer ── complete(v) ──► AsyncResult ──► broadcast to blocked waiters
//!                                  │
//!                                  └──► listeners (in order) ──► FaultReporter on error
//! ```
//!
//! Each future is guarded by a [`FutureLock`]; several futures can share one
//! lock so that they coordinate through a single monitor.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use ouroboros_future::{AsyncResult, FaultMonitor};
//!
//! let monitor = Arc::new(FaultMonitor::new());
//! let future: AsyncResult<&str, u32> = AsyncResult::builder("session-7")
//!     .fault_reporter(monitor.clone())
//!     .build();
//!
//! future.on_complete(|f| {
//!     println!("{} finished with {:?}", f.handle(), f.value());
//!     Ok(())
//! });
//!
//! future.complete(200);
//! assert!(future.wait_until_ready_timeout(0));
//! ```

mod config;
mod error;
mod fault;
mod future;
mod listener;
mod lock;
mod typed;
#[cfg(feature = "tokio")]
mod bridge;

pub use config::{FaultMonitorConfig, ENV_FAULT_HISTORY, ENV_LOG_FAULTS};
pub use error::FutureError;
pub use fault::{
    default_fault_reporter, FaultContext, FaultHandlerFn, FaultMonitor, FaultReporter,
    LoggingFaultReporter, SharedFaultReporter,
};
pub use future::{AsyncResult, FutureBuilder, FutureState};
pub use listener::{FutureListener, ListenerId};
pub use lock::FutureLock;
pub use typed::{CloseFuture, ConnectFuture, ConnectOutcome, WriteFuture};

/// Result type alias for ouroboros-future operations
pub type Result<T> = std::result::Result<T, FutureError>;
