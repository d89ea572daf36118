//! In-memory exchange for tests.
//!
//! State is scripted up front and every call is recorded, so engine tests
//! can assert on exactly what was requested without a network.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::time::Instant;

use exbit_core::{
    Balances, MarketId, MarketInfo, Order, OrderBookSnapshot, OrderReceipt, OrderRequest,
    OrderSide, OrderStatus,
};

use crate::error::{ClientError, ClientResult};
use crate::exchange::{BoxFuture, ExchangeClient};

/// Which capability a scripted failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockCall {
    Balances,
    OrderBook,
    MarketInfo,
    PlaceOrder,
    OpenOrders,
    Cancel,
}

/// Scriptable [`ExchangeClient`].
///
/// Accepted orders are added to the open-order list with status `open` and
/// a sequential id, and cancelled orders are removed from it, so repeated
/// cycles see their own previous ladder.
#[derive(Debug)]
pub struct MockExchangeClient {
    balances: Mutex<Balances>,
    book: Mutex<Option<OrderBookSnapshot>>,
    book_queue: Mutex<VecDeque<Option<OrderBookSnapshot>>>,
    market_info: Mutex<Option<MarketInfo>>,
    open_orders: Mutex<Vec<Order>>,
    failures: Mutex<HashMap<MockCall, VecDeque<ClientError>>>,
    cancel_rejects: Mutex<HashSet<String>>,
    placed: Mutex<Vec<OrderRequest>>,
    cancelled: Mutex<Vec<String>>,
    book_requests: Mutex<Vec<Instant>>,
    next_id: AtomicU64,
    lock_open_funds: AtomicBool,
}

impl Default for MockExchangeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExchangeClient {
    /// Empty exchange: no balances, no book, no market info.
    pub fn new() -> Self {
        Self {
            balances: Mutex::new(Balances::new()),
            book: Mutex::new(None),
            book_queue: Mutex::new(VecDeque::new()),
            market_info: Mutex::new(None),
            open_orders: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            cancel_rejects: Mutex::new(HashSet::new()),
            placed: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            book_requests: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            lock_open_funds: AtomicBool::new(false),
        }
    }

    pub fn set_balances(&self, balances: Balances) {
        *self.balances.lock() = balances;
    }

    /// Book returned whenever the queue is empty.
    pub fn set_order_book(&self, book: Option<OrderBookSnapshot>) {
        *self.book.lock() = book;
    }

    /// Book returned by the next un-queued request, ahead of the default.
    pub fn push_order_book(&self, book: Option<OrderBookSnapshot>) {
        self.book_queue.lock().push_back(book);
    }

    pub fn set_market_info(&self, info: Option<MarketInfo>) {
        *self.market_info.lock() = info;
    }

    pub fn set_open_orders(&self, orders: Vec<Order>) {
        *self.open_orders.lock() = orders;
    }

    /// Report balances net of funds held by open orders, as the exchange
    /// does: quote `price * volume` per buy, base `volume` per sell.
    pub fn lock_open_order_funds(&self) {
        self.lock_open_funds.store(true, Ordering::SeqCst);
    }

    /// Fail the next call of `call` with `error`. Failures queue in order.
    pub fn push_failure(&self, call: MockCall, error: ClientError) {
        self.failures.lock().entry(call).or_default().push_back(error);
    }

    /// Reject every cancellation of `order_id` with HTTP 404.
    pub fn reject_cancel(&self, order_id: impl Into<String>) {
        self.cancel_rejects.lock().insert(order_id.into());
    }

    /// Submitted order requests, including rejected ones.
    pub fn placed_orders(&self) -> Vec<OrderRequest> {
        self.placed.lock().clone()
    }

    /// Ids of successfully cancelled orders.
    pub fn cancelled_orders(&self) -> Vec<String> {
        self.cancelled.lock().clone()
    }

    /// Instants at which the order book was requested.
    pub fn book_requests(&self) -> Vec<Instant> {
        self.book_requests.lock().clone()
    }

    fn take_failure(&self, call: MockCall) -> Option<ClientError> {
        self.failures.lock().get_mut(&call).and_then(VecDeque::pop_front)
    }

    fn free_balances(&self) -> Balances {
        let balances = self.balances.lock().clone();
        if !self.lock_open_funds.load(Ordering::SeqCst) {
            return balances;
        }
        let mut free: BTreeMap<String, Decimal> =
            balances.iter().map(|(asset, v)| (asset.to_string(), v)).collect();
        for order in self.open_orders.lock().iter() {
            let (asset, held) = match order.side {
                OrderSide::Buy => (
                    order.market.quote_asset(),
                    order.volume.notional(order.price),
                ),
                OrderSide::Sell => (order.market.base_asset(), order.volume.inner()),
            };
            *free.entry(asset.to_string()).or_default() -= held;
        }
        free.into_iter().collect()
    }
}

impl ExchangeClient for MockExchangeClient {
    fn get_balances(&self) -> BoxFuture<'_, ClientResult<Balances>> {
        Box::pin(async move {
            if let Some(e) = self.take_failure(MockCall::Balances) {
                return Err(e);
            }
            Ok(self.free_balances())
        })
    }

    fn get_order_book<'a>(
        &'a self,
        _market: &'a MarketId,
    ) -> BoxFuture<'a, ClientResult<Option<OrderBookSnapshot>>> {
        Box::pin(async move {
            self.book_requests.lock().push(Instant::now());
            if let Some(e) = self.take_failure(MockCall::OrderBook) {
                return Err(e);
            }
            if let Some(book) = self.book_queue.lock().pop_front() {
                return Ok(book);
            }
            Ok(self.book.lock().clone())
        })
    }

    fn get_market_info<'a>(
        &'a self,
        _market: &'a MarketId,
    ) -> BoxFuture<'a, ClientResult<Option<MarketInfo>>> {
        Box::pin(async move {
            if let Some(e) = self.take_failure(MockCall::MarketInfo) {
                return Err(e);
            }
            Ok(self.market_info.lock().clone())
        })
    }

    fn place_order(&self, request: OrderRequest) -> BoxFuture<'_, ClientResult<OrderReceipt>> {
        Box::pin(async move {
            self.placed.lock().push(request.clone());
            if let Some(e) = self.take_failure(MockCall::PlaceOrder) {
                return Err(e);
            }
            let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
            self.open_orders.lock().push(Order {
                id: id.clone(),
                market: request.market,
                side: request.side,
                price: request.price,
                volume: request.volume,
                status: OrderStatus::Open,
            });
            Ok(OrderReceipt { order_id: Some(id) })
        })
    }

    fn list_open_orders<'a>(
        &'a self,
        market: &'a MarketId,
    ) -> BoxFuture<'a, ClientResult<Vec<Order>>> {
        Box::pin(async move {
            if let Some(e) = self.take_failure(MockCall::OpenOrders) {
                return Err(e);
            }
            Ok(self
                .open_orders
                .lock()
                .iter()
                .filter(|o| &o.market == market)
                .cloned()
                .collect())
        })
    }

    fn cancel_order<'a>(&'a self, order_id: &'a str) -> BoxFuture<'a, ClientResult<()>> {
        Box::pin(async move {
            if let Some(e) = self.take_failure(MockCall::Cancel) {
                return Err(e);
            }
            if self.cancel_rejects.lock().contains(order_id) {
                return Err(ClientError::Status {
                    status: 404,
                    body: format!("order {order_id} not found"),
                });
            }
            self.open_orders.lock().retain(|o| o.id != order_id);
            self.cancelled.lock().push(order_id.to_string());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exbit_core::{Price, Size};
    use rust_decimal_macros::dec;

    fn market() -> MarketId {
        MarketId::new("xmr_usdt").unwrap()
    }

    #[tokio::test]
    async fn test_placed_orders_become_open() {
        let mock = MockExchangeClient::new();
        let req = OrderRequest::limit(
            market(),
            OrderSide::Buy,
            Price::new(dec!(98)),
            Size::new(dec!(1)),
        );
        let receipt = mock.place_order(req.clone()).await.unwrap();
        assert_eq!(receipt.order_id.as_deref(), Some("1"));
        assert_eq!(mock.placed_orders(), vec![req]);

        let open = mock.list_open_orders(&market()).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].status, OrderStatus::Open);

        mock.cancel_order("1").await.unwrap();
        assert!(mock.list_open_orders(&market()).await.unwrap().is_empty());
        assert_eq!(mock.cancelled_orders(), vec!["1".to_string()]);
    }

    #[tokio::test]
    async fn test_scripted_failure_applies_once() {
        let mock = MockExchangeClient::new();
        mock.push_failure(MockCall::Balances, ClientError::Transport("down".into()));
        assert!(mock.get_balances().await.is_err());
        assert!(mock.get_balances().await.is_ok());
    }

    #[tokio::test]
    async fn test_book_queue_then_default() {
        let mock = MockExchangeClient::new();
        mock.set_order_book(Some(OrderBookSnapshot::new(vec![], vec![])));
        mock.push_order_book(None);
        assert!(mock.get_order_book(&market()).await.unwrap().is_none());
        assert!(mock.get_order_book(&market()).await.unwrap().is_some());
        assert_eq!(mock.book_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_cancel_keeps_order() {
        let mock = MockExchangeClient::new();
        mock.reject_cancel("7");
        let err = mock.cancel_order("7").await.unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 404, .. }));
        assert!(mock.cancelled_orders().is_empty());
    }

    #[tokio::test]
    async fn test_open_orders_hold_funds() {
        let mock = MockExchangeClient::new();
        mock.set_balances(vec![("USDT", dec!(300)), ("XMR", dec!(3))].into_iter().collect());
        mock.lock_open_order_funds();

        let buy = OrderRequest::limit(
            market(),
            OrderSide::Buy,
            Price::new(dec!(100)),
            Size::new(dec!(2)),
        );
        let sell = OrderRequest::limit(
            market(),
            OrderSide::Sell,
            Price::new(dec!(101)),
            Size::new(dec!(1)),
        );
        mock.place_order(buy).await.unwrap();
        mock.place_order(sell).await.unwrap();

        let free = mock.get_balances().await.unwrap();
        assert_eq!(free.available("USDT"), dec!(100));
        assert_eq!(free.available("XMR"), dec!(2));

        mock.cancel_order("1").await.unwrap();
        mock.cancel_order("2").await.unwrap();
        let free = mock.get_balances().await.unwrap();
        assert_eq!(free.available("USDT"), dec!(300));
        assert_eq!(free.available("XMR"), dec!(3));
    }
}
