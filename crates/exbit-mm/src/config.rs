//! Session configuration.
//!
//! All three types are immutable for the lifetime of a trading session.

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use exbit_core::{MarketId, Size};

use crate::error::{MmError, MmResult};

/// Largest accepted ladder depth per side.
pub const MAX_LEVELS: u32 = 50;

/// Market, size and depth of one trading session.
///
/// Only constructible through [`SpreadConfig::new`], so a value in hand is
/// always valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadConfig {
    market: MarketId,
    min_volume: Size,
    level_count: u32,
}

impl SpreadConfig {
    /// Validate session parameters.
    ///
    /// `min_volume` must be positive and `level_count` in `1..=50`.
    pub fn new(market: MarketId, min_volume: Size, level_count: u32) -> MmResult<Self> {
        if !min_volume.is_positive() {
            return Err(MmError::InvalidConfig(format!(
                "minimum volume must be positive, got {min_volume}"
            )));
        }
        if !(1..=MAX_LEVELS).contains(&level_count) {
            return Err(MmError::InvalidConfig(format!(
                "level count must be between 1 and {MAX_LEVELS}, got {level_count}"
            )));
        }
        Ok(Self {
            market,
            min_volume,
            level_count,
        })
    }

    pub fn market(&self) -> &MarketId {
        &self.market
    }

    pub fn min_volume(&self) -> Size {
        self.min_volume
    }

    pub fn level_count(&self) -> u32 {
        self.level_count
    }
}

/// Which price each side of the ladder is offset from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnchorStrategy {
    /// Both sides offset from the reference (mid) price.
    #[default]
    Centered,
    /// Buys offset from the market's minimum trade price, sells from the
    /// reference price.
    MinimumAnchored,
}

impl AnchorStrategy {
    /// Per-level spread used when the configuration does not override it.
    pub fn default_base_spread(&self) -> Decimal {
        match self {
            Self::Centered => dec!(0.01375),
            Self::MinimumAnchored => dec!(0.00125),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Centered => "centered",
            Self::MinimumAnchored => "minimum_anchored",
        }
    }
}

/// Ladder shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LadderPolicy {
    pub anchor: AnchorStrategy,

    /// Fractional price offset added per level (level `i` sits at
    /// `base_spread * i` from its anchor).
    pub base_spread: Decimal,

    /// Volume multiplier growth per level (`1 + rate * i`).
    #[serde(default = "default_volume_growth_rate")]
    pub volume_growth_rate: Decimal,
}

fn default_volume_growth_rate() -> Decimal {
    dec!(0.125)
}

impl LadderPolicy {
    /// Symmetric ladder around the mid price.
    pub fn centered() -> Self {
        Self::for_anchor(AnchorStrategy::Centered)
    }

    /// Buys anchored at the market minimum price.
    pub fn minimum_anchored() -> Self {
        Self::for_anchor(AnchorStrategy::MinimumAnchored)
    }

    /// Default policy for `anchor`.
    pub fn for_anchor(anchor: AnchorStrategy) -> Self {
        Self {
            anchor,
            base_spread: anchor.default_base_spread(),
            volume_growth_rate: default_volume_growth_rate(),
        }
    }

    pub fn validate(&self) -> MmResult<()> {
        if self.base_spread <= Decimal::ZERO {
            return Err(MmError::InvalidConfig(format!(
                "base spread must be positive, got {}",
                self.base_spread
            )));
        }
        if self.volume_growth_rate < Decimal::ZERO {
            return Err(MmError::InvalidConfig(format!(
                "volume growth rate must not be negative, got {}",
                self.volume_growth_rate
            )));
        }
        Ok(())
    }
}

impl Default for LadderPolicy {
    fn default() -> Self {
        Self::centered()
    }
}

/// Cycle timing (`[schedule]` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Wait between completed cycles.
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,

    /// Wait after a cycle skipped for missing market data.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Backoff before the single retry of a failed placement.
    #[serde(default = "default_placement_backoff_secs")]
    pub placement_backoff_secs: u64,

    /// Skip cycles while either side of the market has a zero balance.
    #[serde(default = "default_true")]
    pub require_funded_market: bool,
}

fn default_cycle_interval_secs() -> u64 {
    300
}

fn default_retry_delay_secs() -> u64 {
    300
}

fn default_placement_backoff_secs() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cycle_interval_secs: default_cycle_interval_secs(),
            retry_delay_secs: default_retry_delay_secs(),
            placement_backoff_secs: default_placement_backoff_secs(),
            require_funded_market: default_true(),
        }
    }
}

impl ScheduleConfig {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn placement_backoff(&self) -> Duration {
        Duration::from_secs(self.placement_backoff_secs)
    }

    pub fn validate(&self) -> MmResult<()> {
        if self.cycle_interval_secs == 0 || self.retry_delay_secs == 0 {
            return Err(MmError::InvalidConfig(
                "cycle interval and retry delay must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}
