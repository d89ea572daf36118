//! Errors raised while constructing domain values.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Market id is not of the `base_quote` form.
    #[error("Invalid market id: {0}")]
    InvalidMarketId(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
