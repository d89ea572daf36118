//! Prometheus metrics and structured logging for the Exbit bot.
//!
//! - Structured logging with tracing (console plus an activity log file)
//! - Prometheus counters and gauges for cycle and order outcomes

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, LoggingConfig};
pub use metrics::Metrics;
