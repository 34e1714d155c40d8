//! Fault reporting for listener callbacks
//!
//! A listener that returns an error or panics never disturbs the completing
//! thread. The failure is caught and handed to the future's [`FaultReporter`]
//! together with a [`FaultContext`] describing where it happened.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use parking_lot::RwLock;

use crate::config::FaultMonitorConfig;

// ============================================================================
// Fault Context
// ============================================================================

/// Context information for a listener fault
#[derive(Debug, Clone)]
pub struct FaultContext {
    /// Short description of the fault
    pub message: String,
    /// Operation during which the listener ran
    pub origin: String,
    /// Rendered error chain
    pub error: Option<String>,
    /// Future that dispatched the listener
    pub future: Option<String>,
    /// Registration id of the failing listener
    pub listener: Option<u64>,
    /// Additional context data
    pub extra: HashMap<String, String>,
}

impl FaultContext {
    /// Create a new fault context
    pub fn new(message: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            origin: origin.into(),
            error: None,
            future: None,
            listener: None,
            extra: HashMap::new(),
        }
    }

    /// Set the rendered error
    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Set future
    pub fn future(mut self, future: impl Into<String>) -> Self {
        self.future = Some(future.into());
        self
    }

    /// Set listener id
    pub fn listener(mut self, id: u64) -> Self {
        self.listener = Some(id);
        self
    }

    /// Add extra context
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Format context for logging
    pub fn format(&self) -> String {
        let mut parts = vec![
            format!("Message: {}", self.message),
            format!("Origin: {}", self.origin),
        ];

        if let Some(ref error) = self.error {
            parts.push(format!("Error: {}", error));
        }
        if let Some(ref future) = self.future {
            parts.push(format!("Future: {}", future));
        }
        if let Some(listener) = self.listener {
            parts.push(format!("Listener: #{}", listener));
        }

        let mut extra: Vec<_> = self.extra.iter().collect();
        extra.sort();
        for (key, value) in extra {
            parts.push(format!("{}: {}", key, value));
        }

        parts.join("\n")
    }
}

// ============================================================================
// Reporter
// ============================================================================

/// Sink for errors raised by listener callbacks.
///
/// Implementations must not panic; a reporter runs on whichever thread
/// dispatched the failing listener.
pub trait FaultReporter: Send + Sync {
    /// Record one failed listener invocation.
    fn report_fault(&self, error: &anyhow::Error, context: &FaultContext);
}

/// Reporter that only logs through `tracing`.
///
/// Used by futures that were not given a reporter explicitly.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingFaultReporter;

impl FaultReporter for LoggingFaultReporter {
    fn report_fault(&self, error: &anyhow::Error, context: &FaultContext) {
        tracing::error!(
            origin = %context.origin,
            listener = ?context.listener,
            error = %format!("{:#}", error),
            "Unhandled fault in future listener"
        );
    }
}

/// Shared reporter handle
pub type SharedFaultReporter = Arc<dyn FaultReporter>;

/// Default reporter used when none is injected
pub fn default_fault_reporter() -> SharedFaultReporter {
    Arc::new(LoggingFaultReporter)
}

// ============================================================================
// Fault Monitor
// ============================================================================

/// Custom fault handler function type
pub type FaultHandlerFn = Box<dyn Fn(&FaultContext) + Send + Sync>;

/// Reporter with a pluggable handler and a bounded fault history
pub struct FaultMonitor {
    /// Custom handler
    custom_handler: RwLock<Option<FaultHandlerFn>>,
    /// Whether to log faults when no custom handler is set
    log_faults: RwLock<bool>,
    /// Fault history, oldest first
    history: RwLock<VecDeque<FaultContext>>,
    /// Maximum history size
    max_history: usize,
}

impl FaultMonitor {
    /// Create a new fault monitor with default settings
    pub fn new() -> Self {
        Self::with_config(FaultMonitorConfig::default())
    }

    /// Create a fault monitor from configuration
    pub fn with_config(config: FaultMonitorConfig) -> Self {
        Self {
            custom_handler: RwLock::new(None),
            log_faults: RwLock::new(config.log_faults),
            history: RwLock::new(VecDeque::new()),
            max_history: config.max_history,
        }
    }

    /// Set custom fault handler
    pub fn set_fault_handler<F>(&self, handler: F)
    where
        F: Fn(&FaultContext) + Send + Sync + 'static,
    {
        *self.custom_handler.write() = Some(Box::new(handler));
    }

    /// Whether a custom handler is installed
    pub fn has_fault_handler(&self) -> bool {
        self.custom_handler.read().is_some()
    }

    /// Clear custom fault handler (revert to logging)
    pub fn clear_fault_handler(&self) {
        *self.custom_handler.write() = None;
    }

    /// Set whether to log faults
    pub fn set_log_faults(&self, log: bool) {
        *self.log_faults.write() = log;
    }

    /// Get fault history
    pub fn history(&self) -> Vec<FaultContext> {
        self.history.read().iter().cloned().collect()
    }

    /// Clear fault history
    pub fn clear_history(&self) {
        self.history.write().clear();
    }

    /// Number of faults currently held in history
    pub fn fault_count(&self) -> usize {
        self.history.read().len()
    }

    fn record(&self, context: &FaultContext) {
        if self.max_history == 0 {
            return;
        }
        let mut history = self.history.write();
        history.push_back(context.clone());
        while history.len() > self.max_history {
            history.pop_front();
        }
    }
}

impl FaultReporter for FaultMonitor {
    fn report_fault(&self, error: &anyhow::Error, context: &FaultContext) {
        let context = context.clone().error(format!("{:#}", error));
        self.record(&context);

        let handler = self.custom_handler.read();
        if let Some(ref h) = *handler {
            h(&context);
            return;
        }
        drop(handler);

        if *self.log_faults.read() {
            tracing::error!("Unhandled fault in future listener:\n{}", context.format());
        }
    }
}

impl Default for FaultMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FaultMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultMonitor")
            .field("has_fault_handler", &self.has_fault_handler())
            .field("fault_count", &self.fault_count())
            .field("max_history", &self.max_history)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_fault_context() {
        let ctx = FaultContext::new("listener failed", "AsyncResult::complete")
            .future("AsyncResult<i32>")
            .listener(3)
            .extra("session", "42");

        assert_eq!(ctx.message, "listener failed");
        assert_eq!(ctx.listener, Some(3));

        let formatted = ctx.format();
        assert!(formatted.contains("Origin: AsyncResult::complete"));
        assert!(formatted.contains("Listener: #3"));
        assert!(formatted.contains("session: 42"));
    }

    #[test]
    fn test_monitor_records_history() {
        let monitor = FaultMonitor::new();
        monitor.set_log_faults(false);

        let err = anyhow::anyhow!("boom");
        monitor.report_fault(&err, &FaultContext::new("first", "test"));
        monitor.report_fault(&err, &FaultContext::new("second", "test"));

        let history = monitor.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].message, "first");
        assert_eq!(history[1].error.as_deref(), Some("boom"));

        monitor.clear_history();
        assert_eq!(monitor.fault_count(), 0);
    }

    #[test]
    fn test_history_is_bounded() {
        let monitor = FaultMonitor::with_config(FaultMonitorConfig {
            max_history: 2,
            log_faults: false,
        });

        let err = anyhow::anyhow!("boom");
        for i in 0..5 {
            monitor.report_fault(&err, &FaultContext::new(format!("fault {}", i), "test"));
        }

        let history = monitor.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].message, "fault 3");
        assert_eq!(history[1].message, "fault 4");
    }

    #[test]
    fn test_custom_fault_handler() {
        let monitor = FaultMonitor::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let counter_clone = Arc::clone(&counter);
        monitor.set_fault_handler(move |ctx| {
            assert_eq!(ctx.error.as_deref(), Some("bad value"));
            counter_clone.fetch_add(1, Ordering::Relaxed);
        });
        assert!(monitor.has_fault_handler());

        monitor.report_fault(&anyhow::anyhow!("bad value"), &FaultContext::new("x", "test"));
        assert_eq!(counter.load(Ordering::Relaxed), 1);

        monitor.clear_fault_handler();
        assert!(!monitor.has_fault_handler());
    }

    #[test]
    fn test_logging_reporter_does_not_panic() {
        let reporter = default_fault_reporter();
        reporter.report_fault(&anyhow::anyhow!("ignored"), &FaultContext::new("x", "test"));
    }
}
