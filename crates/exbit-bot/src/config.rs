//! Application configuration.
//!
//! Loaded from a TOML file; every section and field is optional and falls
//! back to the defaults below. The API key is never read from the file.

use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use exbit_client::session::DEFAULT_BASE_URL;
use exbit_mm::{AnchorStrategy, LadderPolicy, ScheduleConfig};
use exbit_telemetry::LoggingConfig;

use crate::error::{AppError, AppResult};

/// Config file used when neither `--config` nor `EXBIT_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "EXBIT_API_KEY";

/// Environment variable holding the config path.
pub const CONFIG_PATH_ENV: &str = "EXBIT_CONFIG";

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub exchange: ExchangeConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub ladder: LadderConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[exchange]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ExchangeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// `[ladder]` section. Unset numbers take the anchor's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LadderConfig {
    #[serde(default)]
    pub anchor: AnchorStrategy,

    #[serde(default)]
    pub base_spread: Option<Decimal>,

    #[serde(default)]
    pub volume_growth_rate: Option<Decimal>,
}

impl LadderConfig {
    pub fn policy(&self) -> LadderPolicy {
        let mut policy = LadderPolicy::for_anchor(self.anchor);
        if let Some(spread) = self.base_spread {
            policy.base_spread = spread;
        }
        if let Some(rate) = self.volume_growth_rate {
            policy.volume_growth_rate = rate;
        }
        policy
    }
}

impl AppConfig {
    /// Load from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Load from `path`, or defaults when the file does not exist.
    ///
    /// The flag is `false` when defaults were used.
    pub fn from_file_or_default(path: impl AsRef<Path>) -> AppResult<(Self, bool)> {
        let path = path.as_ref();
        if path.exists() {
            Ok((Self::from_file(path)?, true))
        } else {
            Ok((Self::default(), false))
        }
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.exchange.base_url.trim().is_empty() {
            return Err(AppError::Config("exchange.base_url is empty".to_string()));
        }
        if self.exchange.request_timeout_ms == 0 {
            return Err(AppError::Config(
                "exchange.request_timeout_ms must be positive".to_string(),
            ));
        }
        self.schedule.validate()?;
        self.ladder.policy().validate()?;
        Ok(())
    }
}
