//! Ladder generation.
//!
//! Pure and deterministic: identical inputs always yield the identical
//! ladder. Level `i` (1-based) sits at `base_spread * i` from its anchor
//! with volume `min_volume * (1 + volume_growth_rate * i)`, both rounded to
//! order precision.

use rust_decimal::Decimal;

use exbit_core::{MarketId, OrderRequest, OrderSide, Price, Size};

use crate::config::{AnchorStrategy, LadderPolicy, SpreadConfig};
use crate::error::{MmError, MmResult};

/// One rung of the ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSpec {
    pub market: MarketId,
    pub side: OrderSide,
    pub price: Price,
    pub volume: Size,
    /// 1-based distance from the anchor.
    pub level: u32,
}

impl LevelSpec {
    /// Limit order for this level.
    pub fn to_request(&self) -> OrderRequest {
        OrderRequest::limit(self.market.clone(), self.side, self.price, self.volume)
    }
}

/// Prices the ladder may be anchored at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasePrices {
    /// Mid price of the current book.
    pub reference: Price,
    /// Market minimum trade price, when published.
    pub minimum: Option<Price>,
}

impl BasePrices {
    pub fn from_reference(reference: Price) -> Self {
        Self {
            reference,
            minimum: None,
        }
    }

    fn for_side(&self, side: OrderSide, anchor: AnchorStrategy) -> MmResult<Price> {
        match (side, anchor) {
            (OrderSide::Sell, _) | (OrderSide::Buy, AnchorStrategy::Centered) => {
                Ok(self.reference)
            }
            (OrderSide::Buy, AnchorStrategy::MinimumAnchored) => {
                let minimum = self.minimum.ok_or_else(|| {
                    MmError::DataUnavailable("market publishes no minimum trade price".to_string())
                })?;
                if !minimum.is_positive() {
                    return Err(MmError::InvalidConfig(format!(
                        "minimum trade price must be positive, got {minimum}"
                    )));
                }
                Ok(minimum)
            }
        }
    }
}

/// Build the ladder: buy then sell for each level, increasing level index.
///
/// Returns exactly `2 * level_count` specs.
pub fn generate_ladder(
    config: &SpreadConfig,
    policy: &LadderPolicy,
    base: &BasePrices,
) -> MmResult<Vec<LevelSpec>> {
    policy.validate()?;
    if config.level_count() == 0 {
        return Err(MmError::InvalidConfig("level count must be positive".to_string()));
    }
    if !config.min_volume().is_positive() {
        return Err(MmError::InvalidConfig(format!(
            "minimum volume must be positive, got {}",
            config.min_volume()
        )));
    }
    if !base.reference.is_positive() {
        return Err(MmError::InvalidConfig(format!(
            "reference price must be positive, got {}",
            base.reference
        )));
    }

    let buy_base = base.for_side(OrderSide::Buy, policy.anchor)?;
    let sell_base = base.for_side(OrderSide::Sell, policy.anchor)?;

    let mut ladder = Vec::with_capacity(2 * config.level_count() as usize);
    for level in 1..=config.level_count() {
        let i = Decimal::from(level);
        let spread = policy.base_spread * i;
        let volume = (config.min_volume() * (Decimal::ONE + policy.volume_growth_rate * i))
            .round_for_order();
        if !volume.is_positive() {
            return Err(MmError::InvalidConfig(format!(
                "level {level} volume rounds to zero"
            )));
        }

        let buy_price = (buy_base * (Decimal::ONE - spread)).round_for_order();
        if !buy_price.is_positive() {
            return Err(MmError::InvalidConfig(format!(
                "level {level} buy price {buy_price} is not positive; reduce levels or spread"
            )));
        }
        let sell_price = (sell_base * (Decimal::ONE + spread)).round_for_order();

        ladder.push(LevelSpec {
            market: config.market().clone(),
            side: OrderSide::Buy,
            price: buy_price,
            volume,
            level,
        });
        ladder.push(LevelSpec {
            market: config.market().clone(),
            side: OrderSide::Sell,
            price: sell_price,
            volume,
            level,
        });
    }

    Ok(ladder)
}
