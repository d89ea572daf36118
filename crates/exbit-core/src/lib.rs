//! Core domain types for the Exbit spread market-making bot.
//!
//! This crate provides fundamental types used throughout the trading system:
//! - `MarketId`: Exchange market identifier with base/quote asset split
//! - `Price`, `Size`: Precision-safe numeric types
//! - `Order`, `OrderSide`, `OrderStatus`: Order types owned by the exchange
//! - `OrderBookSnapshot`, `Balances`: Per-cycle market and account snapshots

pub mod decimal;
pub mod error;
pub mod market;
pub mod order;
pub mod types;

pub use decimal::{Price, Size, ORDER_DECIMALS};
pub use error::{CoreError, Result};
pub use market::{MarketId, MarketInfo};
pub use order::{Order, OrderReceipt, OrderRequest, OrderSide, OrderStatus, OrderType};
pub use types::{Balances, BookLevel, OrderBookSnapshot};
