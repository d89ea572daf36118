//! Telemetry error types.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed, or the filter is invalid.
    #[error("Logging initialization failed: {0}")]
    LoggingInit(String),

    #[error("Cannot open activity log {path}: {source}")]
    ActivityLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Metrics encoding failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

pub type TelemetryResult<T> = Result<T, TelemetryError>;
