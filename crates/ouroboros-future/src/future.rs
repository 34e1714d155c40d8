//! AsyncResult: one-shot result container shared between a producer and
//! any number of waiting or listening consumers.
//!
//! # Lock discipline
//!
//! Every read and write of the completion flag, the result and the listener
//! queue happens inside the future's [`FutureLock`]. The per-future state
//! mutex is only ever taken while the monitor is held, so it never contends;
//! it exists so several futures with different value types can share one
//! monitor.
//!
//! Listeners are invoked on the completing thread after the monitor has been
//! released. Registrations that arrive while a dispatch is running are
//! queued and fired by the dispatching thread once the current batch is
//! done, which keeps registration order and exactly-once delivery intact.

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::fault::{default_fault_reporter, FaultContext, SharedFaultReporter};
use crate::listener::{FutureListener, ListenerId, Registration};
use crate::lock::FutureLock;

const ORIGIN_COMPLETE: &str = "AsyncResult::complete";
const ORIGIN_ADD_LISTENER: &str = "AsyncResult::add_listener";

/// Lifecycle of a future. `Complete` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FutureState {
    /// No result yet
    #[default]
    Pending,
    /// Result fixed and observable
    Complete,
}

struct Inner<H, T> {
    ready: bool,
    result: Option<T>,
    listeners: VecDeque<Registration<H, T>>,
    next_listener_id: u64,
    /// Set while the completing thread is invoking listeners
    dispatching: bool,
}

/// Thread-safe, one-shot asynchronous result.
///
/// The producer calls [`complete`](Self::complete) once; consumers block in
/// [`wait_until_ready`](Self::wait_until_ready) or register listeners.
/// Share it between threads with an `Arc`.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use ouroboros_future::AsyncResult;
///
/// let future = Arc::new(AsyncResult::<&str, u32>::new("session-1"));
///
/// let producer = Arc::clone(&future);
/// let worker = std::thread::spawn(move || {
///     producer.complete(42);
/// });
///
/// future.wait_until_ready();
/// assert_eq!(future.value(), Some(42));
/// worker.join().unwrap();
/// ```
pub struct AsyncResult<H, T> {
    handle: H,
    lock: Arc<FutureLock>,
    inner: Mutex<Inner<H, T>>,
    reporter: SharedFaultReporter,
}

impl<H, T> AsyncResult<H, T> {
    /// Create a pending future with its own lock.
    pub fn new(handle: H) -> Self {
        Self::builder(handle).build()
    }

    /// Create a pending future guarded by an externally supplied lock.
    pub fn with_lock(handle: H, lock: Arc<FutureLock>) -> Self {
        Self::builder(handle).lock(lock).build()
    }

    /// Start building a future with a custom lock or fault reporter.
    pub fn builder(handle: H) -> FutureBuilder<H, T> {
        FutureBuilder::new(handle)
    }

    /// The handle this future was created for
    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// The monitor guarding this future
    pub fn lock(&self) -> &Arc<FutureLock> {
        &self.lock
    }

    /// Whether the future has completed. Never blocks on completion.
    pub fn is_ready(&self) -> bool {
        let _guard = self.lock.enter();
        self.ready_locked()
    }

    /// Current lifecycle state
    pub fn state(&self) -> FutureState {
        if self.is_ready() {
            FutureState::Complete
        } else {
            FutureState::Pending
        }
    }

    /// Block the calling thread until the future completes.
    ///
    /// Wake-ups that do not coincide with completion are absorbed and the
    /// wait resumes; this call only returns once the future is ready.
    pub fn wait_until_ready(&self) {
        let mut guard = self.lock.enter();
        while !self.ready_locked() {
            self.lock.wait(&mut guard);
        }
    }

    /// Block for at most `timeout_millis` milliseconds.
    ///
    /// Returns `true` if the future is (or becomes) ready within the budget.
    /// A budget of zero or less polls the current state without blocking.
    pub fn wait_until_ready_timeout(&self, timeout_millis: i64) -> bool {
        if timeout_millis <= 0 {
            return self.is_ready();
        }
        self.wait_for(Duration::from_millis(timeout_millis as u64))
    }

    /// Block for at most `timeout`; see [`wait_until_ready_timeout`](Self::wait_until_ready_timeout).
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let mut guard = self.lock.enter();
        if self.ready_locked() {
            return true;
        }
        if timeout.is_zero() {
            return false;
        }

        let Some(deadline) = Instant::now().checked_add(timeout) else {
            // Budget beyond the clock's range
            while !self.ready_locked() {
                self.lock.wait(&mut guard);
            }
            return true;
        };

        loop {
            let timed_out = self.lock.wait_until(&mut guard, deadline);
            if self.ready_locked() {
                return true;
            }
            if timed_out || Instant::now() >= deadline {
                return false;
            }
        }
    }

    /// Fix the result and wake everything waiting on it.
    ///
    /// Only the first call has an effect; later calls are discarded and
    /// return `false`. Registered listeners run on the calling thread, in
    /// registration order, before this returns.
    pub fn complete(&self, value: T) -> bool {
        let batch = {
            let _guard = self.lock.enter();
            let mut inner = self.inner.lock();
            if inner.ready {
                tracing::trace!("Ignoring completion of an already completed future");
                return false;
            }

            inner.result = Some(value);
            inner.ready = true;
            inner.dispatching = true;
            let batch: Vec<_> = inner.listeners.drain(..).collect();
            drop(inner);

            let woken = self.lock.notify_all();
            tracing::trace!(woken, listeners = batch.len(), "Future completed");
            batch
        };

        self.dispatch(batch);
        true
    }

    /// Register a listener.
    ///
    /// If the future has already completed, the listener is invoked before
    /// this returns. The returned id can be passed to
    /// [`remove_listener`](Self::remove_listener).
    pub fn add_listener<L>(&self, listener: L) -> ListenerId
    where
        L: FutureListener<H, T> + 'static,
    {
        let registration = {
            let _guard = self.lock.enter();
            let mut inner = self.inner.lock();
            let id = ListenerId(inner.next_listener_id);
            inner.next_listener_id += 1;

            let registration = Registration {
                id,
                listener: Box::new(listener),
            };

            if !inner.ready || inner.dispatching {
                tracing::trace!(listener = %id, "Listener queued");
                inner.listeners.push_back(registration);
                return id;
            }
            registration
        };

        self.notify_listener(&registration, ORIGIN_ADD_LISTENER);
        registration.id
    }

    /// Register a closure as a listener.
    pub fn on_complete<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&AsyncResult<H, T>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_listener(callback)
    }

    /// Unregister a listener that has not fired yet.
    ///
    /// Returns `false` if the id is unknown or the listener already ran.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let _guard = self.lock.enter();
        let mut inner = self.inner.lock();
        match inner.listeners.iter().position(|r| r.id == id) {
            Some(index) => {
                inner.listeners.remove(index);
                tracing::trace!(listener = %id, "Listener removed");
                true
            }
            None => false,
        }
    }

    /// Number of listeners waiting to fire
    pub fn pending_listeners(&self) -> usize {
        let _guard = self.lock.enter();
        self.inner.lock().listeners.len()
    }

    fn ready_locked(&self) -> bool {
        self.inner.lock().ready
    }

    /// Invoke `batch`, then keep draining registrations that arrived
    /// meanwhile until the queue is empty.
    fn dispatch(&self, mut batch: Vec<Registration<H, T>>) {
        loop {
            if !batch.is_empty() {
                tracing::debug!(listeners = batch.len(), "Dispatching future listeners");
            }
            for registration in &batch {
                self.notify_listener(registration, ORIGIN_COMPLETE);
            }

            let _guard = self.lock.enter();
            let mut inner = self.inner.lock();
            if inner.listeners.is_empty() {
                inner.dispatching = false;
                return;
            }
            batch = inner.listeners.drain(..).collect();
        }
    }

    fn notify_listener(&self, registration: &Registration<H, T>, origin: &str) {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            registration.listener.operation_complete(self)
        }));

        let error = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(payload) => anyhow::anyhow!("listener panicked: {}", panic_message(&*payload)),
        };

        let context = FaultContext::new("Listener raised an error", origin)
            .future(format!("AsyncResult<{}>", std::any::type_name::<T>()))
            .listener(registration.id.as_u64())
            .extra("handle_type", std::any::type_name::<H>());

        // A failing reporter must not abort the dispatch loop.
        let reported = catch_unwind(AssertUnwindSafe(|| {
            self.reporter.report_fault(&error, &context)
        }));
        if let Err(payload) = reported {
            tracing::error!(
                origin,
                listener = %registration.id,
                error = %format!("{:#}", error),
                reporter_panic = %panic_message(&*payload),
                "Fault reporter panicked"
            );
        }
    }
}

impl<H, T: Clone> AsyncResult<H, T> {
    /// Snapshot of the result; `None` until the future completes.
    pub fn value(&self) -> Option<T> {
        let _guard = self.lock.enter();
        self.inner.lock().result.clone()
    }
}

impl<H: fmt::Debug, T: fmt::Debug> fmt::Debug for AsyncResult<H, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let _guard = self.lock.enter();
        let inner = self.inner.lock();
        f.debug_struct("AsyncResult")
            .field("handle", &self.handle)
            .field("ready", &inner.ready)
            .field("result", &inner.result)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`AsyncResult`]
pub struct FutureBuilder<H, T> {
    handle: H,
    lock: Option<Arc<FutureLock>>,
    reporter: Option<SharedFaultReporter>,
    _value: PhantomData<fn() -> T>,
}

impl<H, T> FutureBuilder<H, T> {
    fn new(handle: H) -> Self {
        Self {
            handle,
            lock: None,
            reporter: None,
            _value: PhantomData,
        }
    }

    /// Guard the future with a shared lock
    pub fn lock(mut self, lock: Arc<FutureLock>) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Send listener faults to `reporter` instead of the log
    pub fn fault_reporter(mut self, reporter: SharedFaultReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Build a pending future
    pub fn build(self) -> AsyncResult<H, T> {
        AsyncResult {
            handle: self.handle,
            lock: self.lock.unwrap_or_else(FutureLock::shared),
            inner: Mutex::new(Inner {
                ready: false,
                result: None,
                listeners: VecDeque::new(),
                next_listener_id: 0,
                dispatching: false,
            }),
            reporter: self.reporter.unwrap_or_else(default_fault_reporter),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
