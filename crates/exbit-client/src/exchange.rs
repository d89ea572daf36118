//! Exchange capability trait.
//!
//! Provides a trait-based abstraction over the exchange so that:
//! - The engine can be unit tested against an in-memory mock
//! - Network and auth concerns stay inside the transport implementation

use std::pin::Pin;
use std::sync::Arc;

use exbit_core::{
    Balances, MarketId, MarketInfo, Order, OrderBookSnapshot, OrderReceipt, OrderRequest,
};

use crate::error::ClientResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Capability surface the engine needs from an exchange.
///
/// Every call is independent; implementations must not cache results
/// between calls.
pub trait ExchangeClient: Send + Sync {
    /// Available balances of enabled assets.
    fn get_balances(&self) -> BoxFuture<'_, ClientResult<Balances>>;

    /// Order book for `market`. `Ok(None)` when the exchange returned no
    /// usable book.
    fn get_order_book<'a>(
        &'a self,
        market: &'a MarketId,
    ) -> BoxFuture<'a, ClientResult<Option<OrderBookSnapshot>>>;

    /// Market metadata. `Ok(None)` when the market is not described.
    fn get_market_info<'a>(
        &'a self,
        market: &'a MarketId,
    ) -> BoxFuture<'a, ClientResult<Option<MarketInfo>>>;

    /// Submit a limit order.
    fn place_order(&self, request: OrderRequest) -> BoxFuture<'_, ClientResult<OrderReceipt>>;

    /// Resting orders for `market`.
    fn list_open_orders<'a>(
        &'a self,
        market: &'a MarketId,
    ) -> BoxFuture<'a, ClientResult<Vec<Order>>>;

    /// Cancel one order by exchange id.
    fn cancel_order<'a>(&'a self, order_id: &'a str) -> BoxFuture<'a, ClientResult<()>>;
}

/// Shared trait object used by the engine and driver.
pub type DynExchangeClient = Arc<dyn ExchangeClient>;
