//! Structured logging initialization.
//!
//! Console output is JSON when `RUST_ENV=production` and pretty otherwise.
//! Every event is also appended, timestamped and without ANSI colours, to an
//! activity log file so a session can be reviewed after the terminal is gone.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{TelemetryError, TelemetryResult};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,exbit=debug";

/// Logging settings (`[logging]` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Activity log file. `None` disables file output.
    #[serde(default = "default_activity_log")]
    pub activity_log: Option<PathBuf>,

    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_activity_log() -> Option<PathBuf> {
    Some(PathBuf::from("exbitbot.log"))
}

fn default_filter() -> String {
    DEFAULT_FILTER.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            activity_log: default_activity_log(),
            filter: default_filter(),
        }
    }
}

impl LoggingConfig {
    fn env_filter(&self) -> TelemetryResult<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.filter).map_err(|e| {
                TelemetryError::LoggingInit(format!("bad filter {:?}: {e}", self.filter))
            }),
        }
    }

    fn open_activity_log(&self) -> TelemetryResult<Option<Mutex<File>>> {
        let Some(path) = &self.activity_log else {
            return Ok(None);
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| TelemetryError::ActivityLog {
                path: path.clone(),
                source,
            })?;
        Ok(Some(Mutex::new(file)))
    }
}

/// Install the global tracing subscriber.
///
/// Fails if a subscriber is already installed or the activity log cannot be
/// opened.
pub fn init_logging(config: &LoggingConfig) -> TelemetryResult<()> {
    let env_filter = config.env_filter()?;
    let activity_layer = config
        .open_activity_log()?
        .map(|writer| fmt::layer().with_ansi(false).with_target(false).with_writer(writer));

    let is_production = std::env::var("RUST_ENV")
        .map(|v| v == "production")
        .unwrap_or(false);

    let result = if is_production {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(activity_layer)
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(activity_layer)
            .with(fmt::layer().pretty().with_target(true))
            .try_init()
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.activity_log, Some(PathBuf::from("exbitbot.log")));
        assert_eq!(config.filter, DEFAULT_FILTER);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: LoggingConfig = toml::from_str(r#"filter = "warn""#).unwrap();
        assert_eq!(config.filter, "warn");
        assert_eq!(config.activity_log, Some(PathBuf::from("exbitbot.log")));
    }

    #[test]
    fn test_unopenable_activity_log_is_error() {
        let config = LoggingConfig {
            activity_log: Some(PathBuf::from("/nonexistent-dir/exbit/activity.log")),
            filter: default_filter(),
        };
        assert!(matches!(
            config.open_activity_log(),
            Err(TelemetryError::ActivityLog { .. })
        ));
    }

    #[test]
    fn test_disabled_activity_log() {
        let config = LoggingConfig {
            activity_log: None,
            filter: default_filter(),
        };
        assert!(config.open_activity_log().unwrap().is_none());
    }
}
