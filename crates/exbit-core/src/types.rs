//! Per-cycle market and account snapshots.
//!
//! Both types are immutable once built: every cycle fetches fresh copies and
//! replaces the previous ones wholesale.

use crate::{Price, Size};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One price level of an order book side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub size: Size,
}

impl BookLevel {
    pub fn new(price: Price, size: Size) -> Self {
        Self { price, size }
    }
}

/// Order book snapshot.
///
/// Bids are held in descending price order and asks in ascending price
/// order regardless of how the exchange returned them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    bids: Vec<BookLevel>,
    asks: Vec<BookLevel>,
    /// Timestamp when this snapshot was received.
    pub received_at: DateTime<Utc>,
}

impl OrderBookSnapshot {
    /// Build a snapshot, sorting both sides best-first.
    pub fn new(mut bids: Vec<BookLevel>, mut asks: Vec<BookLevel>) -> Self {
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        Self {
            bids,
            asks,
            received_at: Utc::now(),
        }
    }

    pub fn bids(&self) -> &[BookLevel] {
        &self.bids
    }

    pub fn asks(&self) -> &[BookLevel] {
        &self.asks
    }

    /// Highest-priced bid.
    pub fn best_bid(&self) -> Option<&BookLevel> {
        self.bids.first()
    }

    /// Lowest-priced ask.
    pub fn best_ask(&self) -> Option<&BookLevel> {
        self.asks.first()
    }

    /// Best `n` levels of each side: `(asks, bids)`.
    pub fn top_levels(&self, n: usize) -> (&[BookLevel], &[BookLevel]) {
        (
            &self.asks[..n.min(self.asks.len())],
            &self.bids[..n.min(self.bids.len())],
        )
    }
}

/// Available account balances keyed by uppercase asset symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    assets: BTreeMap<String, Decimal>,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Available quantity of `asset`; zero when the asset is not listed.
    pub fn available(&self, asset: &str) -> Decimal {
        self.assets
            .get(&asset.to_ascii_uppercase())
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Iterate assets in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.assets.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<S: AsRef<str>> FromIterator<(S, Decimal)> for Balances {
    /// Negative quantities are clamped to zero; duplicate symbols keep the
    /// last value.
    fn from_iter<I: IntoIterator<Item = (S, Decimal)>>(iter: I) -> Self {
        let assets = iter
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_ascii_uppercase(), v.max(Decimal::ZERO)))
            .collect();
        Self { assets }
    }
}
