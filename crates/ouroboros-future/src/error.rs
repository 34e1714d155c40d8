//! Error types for ouroboros-future

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the typed future layers and configuration
#[derive(Debug, Clone, Error)]
pub enum FutureError {
    /// The future has not completed yet
    #[error("Future is not ready")]
    NotReady,

    /// Waited for the full budget without completion
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The connect operation completed with a failure
    #[error("Connection failed: {0:#}")]
    Connect(Arc<anyhow::Error>),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FutureError::Connect(Arc::new(
            anyhow::anyhow!("refused").context("dialing 10.0.0.1:9000"),
        ));
        assert_eq!(err.to_string(), "Connection failed: dialing 10.0.0.1:9000: refused");

        let err = FutureError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Timed out after 250ms");
    }
}
