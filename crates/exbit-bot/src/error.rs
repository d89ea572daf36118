//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// User input failed validation; the prompt may be repeated.
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Input closed")]
    InputClosed,

    /// Balances could not be fetched with the supplied key.
    #[error("Account verification failed: {0}")]
    Account(String),

    /// Market is not tradable right now (no book, price or minimum volume).
    #[error("Session pre-check failed: {0}")]
    PreCheck(String),

    #[error("Core error: {0}")]
    Core(#[from] exbit_core::CoreError),

    #[error("Exchange error: {0}")]
    Client(#[from] exbit_client::ClientError),

    #[error("Engine error: {0}")]
    Engine(#[from] exbit_mm::MmError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] exbit_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
