//! Engine error types.

use exbit_client::ClientError;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MmError {
    /// Market data needed for this cycle could not be obtained.
    #[error("Market data unavailable: {0}")]
    DataUnavailable(String),

    /// Funds in the per-cycle ledger do not cover an order.
    #[error("Insufficient {asset} balance: required {required}, available {available}")]
    InsufficientBalance {
        asset: String,
        required: Decimal,
        available: Decimal,
    },

    /// Exchange rejected the order or the request failed.
    #[error("Order submission failed: {0}")]
    Submission(#[from] ClientError),

    /// Session parameters can never produce a valid ladder.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MmError {
    /// Whether this error must end the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidConfig(_))
    }
}

pub type MmResult<T> = Result<T, MmError>;
