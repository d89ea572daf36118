//! Order-related types.
//!
//! Orders are owned by the exchange. The engine only holds transient copies
//! fetched within one cycle and never caches them across cycles.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{MarketId, Price, Size};

/// Which side of the book an order rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only limit orders are ever submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    #[default]
    Limit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("limit")
    }
}

/// Exchange-reported order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Resting with no fills.
    Open,
    /// Resting with some volume filled.
    PartiallyFilled,
    Filled,
    Cancelled,
    /// Any status string this client does not recognise.
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Resting and fully unfilled: eligible for cancellation before a new
    /// ladder is placed. Partially filled orders are left resting.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::PartiallyFilled => "partially_filled",
            Self::Filled => "filled",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Order as reported by the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Exchange-assigned order id (opaque).
    pub id: String,
    pub market: MarketId,
    pub side: OrderSide,
    pub price: Price,
    pub volume: Size,
    pub status: OrderStatus,
}

/// A limit order to submit; prices and volumes are already rounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub market: MarketId,
    pub side: OrderSide,
    pub price: Price,
    pub volume: Size,
    #[serde(default)]
    pub order_type: OrderType,
}

impl OrderRequest {
    pub fn limit(market: MarketId, side: OrderSide, price: Price, volume: Size) -> Self {
        Self {
            market,
            side,
            price,
            volume,
            order_type: OrderType::Limit,
        }
    }
}

/// Acknowledgement of an accepted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    /// Exchange order id, when the response carried one.
    pub order_id: Option<String>,
}

impl fmt::Display for OrderReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.order_id {
            Some(id) => write!(f, "{id}"),
            None => write!(f, "<no id>"),
        }
    }
}
