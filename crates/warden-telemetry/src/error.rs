//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur with telemetry operations.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Logging was already initialized; `setup_logging` can only run once
    /// per process.
    #[error("logging is already initialized")]
    AlreadyInitialized,

    /// The configured filter directive could not be parsed.
    #[error("invalid filter directive: {0}")]
    InvalidFilter(String),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
