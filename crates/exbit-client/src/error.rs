//! Client error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Request never produced a response (connect, timeout, TLS).
    #[error("HTTP transport error: {0}")]
    Transport(String),

    /// Exchange answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the expected shape.
    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("Invalid client configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Whether the same request may succeed if sent again shortly.
    ///
    /// Transport failures, rate limiting and server errors are retryable;
    /// validation rejections (other 4xx) and parse errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Parse(_) | Self::Config(_) | Self::Json(_) => false,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
