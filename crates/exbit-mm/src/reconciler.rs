//! Order reconciliation: cancel stale resting orders, place the new ladder.
//!
//! Each ladder level moves through a small state machine within one pass:
//!
//! ```text
//! Pending ─┬─ ledger covers cost ── submit ─┬─ accepted ──────────▶ Placed
//!          │                                └─ rejected / failed ─▶ Failed
//!          └─ ledger short ───────────────────────────────────────▶ Skipped
//! ```
//!
//! Terminal states are never revisited in the same cycle.

use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use exbit_client::{ClientResult, DynExchangeClient};
use exbit_core::{Balances, MarketId, OrderReceipt, OrderRequest, OrderSide};
use exbit_telemetry::Metrics;

use crate::error::MmError;
use crate::ladder::LevelSpec;

/// Result of the stale-order sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CancelReport {
    /// Ids cancelled successfully.
    pub cancelled: Vec<String>,
    /// Resting orders left in place (partially filled or unknown status).
    pub kept: usize,
    /// `(order id, error)` for cancellations the exchange refused.
    pub failed: Vec<(String, String)>,
}

/// Terminal state of one ladder level.
#[derive(Debug)]
pub enum PlacementStatus {
    Placed(OrderReceipt),
    /// Never submitted; carries [`MmError::InsufficientBalance`].
    Skipped(MmError),
    /// Submitted and not accepted; carries [`MmError::Submission`].
    Failed(MmError),
}

#[derive(Debug)]
pub struct PlacementOutcome {
    pub spec: LevelSpec,
    pub status: PlacementStatus,
}

impl PlacementOutcome {
    pub fn is_placed(&self) -> bool {
        matches!(self.status, PlacementStatus::Placed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, PlacementStatus::Skipped(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, PlacementStatus::Failed(_))
    }
}

/// Funds available to the remainder of one placement pass.
///
/// Starts from the cycle's balance snapshot and is decremented as each
/// order is accepted for submission.
#[derive(Debug, Clone)]
pub struct BalanceLedger {
    base_asset: String,
    quote_asset: String,
    base: Decimal,
    quote: Decimal,
}

impl BalanceLedger {
    pub fn new(market: &MarketId, balances: &Balances) -> Self {
        Self {
            base_asset: market.base_asset().to_string(),
            quote_asset: market.quote_asset().to_string(),
            base: balances.available(market.base_asset()),
            quote: balances.available(market.quote_asset()),
        }
    }

    /// Reserve the funds `spec` needs: quote `price * volume` for a buy,
    /// base `volume` for a sell.
    pub fn reserve(&mut self, spec: &LevelSpec) -> Result<(), MmError> {
        let (asset, available, required) = match spec.side {
            OrderSide::Buy => (
                &self.quote_asset,
                &mut self.quote,
                spec.volume.notional(spec.price),
            ),
            OrderSide::Sell => (&self.base_asset, &mut self.base, spec.volume.inner()),
        };
        if *available < required {
            return Err(MmError::InsufficientBalance {
                asset: asset.clone(),
                required,
                available: *available,
            });
        }
        *available -= required;
        Ok(())
    }
}

/// Issues cancellations and placements against one exchange client.
pub struct OrderReconciler {
    client: DynExchangeClient,
    placement_backoff: Duration,
}

impl OrderReconciler {
    pub fn new(client: DynExchangeClient, placement_backoff: Duration) -> Self {
        Self {
            client,
            placement_backoff,
        }
    }

    /// Cancel every resting order of `market` whose status is exactly
    /// `open`. Failures are recorded per order and never stop the sweep.
    pub async fn cancel_stale_orders(&self, market: &MarketId) -> CancelReport {
        let mut report = CancelReport::default();

        let orders = match self.client.list_open_orders(market).await {
            Ok(orders) => orders,
            Err(e) => {
                warn!(
                    market = %market,
                    error = %e,
                    "Failed to list open orders, skipping cancel sweep"
                );
                return report;
            }
        };

        for order in orders {
            if !order.status.is_stale() {
                debug!(
                    order_id = %order.id,
                    status = %order.status,
                    "Keeping resting order"
                );
                report.kept += 1;
                continue;
            }

            match self.client.cancel_order(&order.id).await {
                Ok(()) => {
                    info!(
                        market = %market,
                        order_id = %order.id,
                        side = %order.side,
                        price = %order.price,
                        volume = %order.volume,
                        "Cancelled stale order"
                    );
                    Metrics::order_cancelled(market.as_str());
                    report.cancelled.push(order.id);
                }
                Err(e) => {
                    warn!(
                        market = %market,
                        order_id = %order.id,
                        side = %order.side,
                        price = %order.price,
                        volume = %order.volume,
                        error = %e,
                        "Failed to cancel order"
                    );
                    Metrics::cancel_failed(market.as_str());
                    report.failed.push((order.id, e.to_string()));
                }
            }
        }

        report
    }

    /// Place `ladder` in order, gated by a ledger built from `balances`.
    ///
    /// Returns one outcome per spec, in ladder order.
    pub async fn place_ladder(
        &self,
        ladder: &[LevelSpec],
        balances: &Balances,
    ) -> Vec<PlacementOutcome> {
        let Some(first) = ladder.first() else {
            return Vec::new();
        };
        let mut ledger = BalanceLedger::new(&first.market, balances);
        let mut outcomes = Vec::with_capacity(ladder.len());

        for spec in ladder {
            let status = match ledger.reserve(spec) {
                Err(reason) => {
                    warn!(
                        market = %spec.market,
                        side = %spec.side,
                        price = %spec.price,
                        volume = %spec.volume,
                        level = spec.level,
                        error = %reason,
                        "Skipping order"
                    );
                    Metrics::order_skipped(spec.market.as_str(), spec.side.as_str());
                    PlacementStatus::Skipped(reason)
                }
                Ok(()) => match self.submit(spec.to_request()).await {
                    Ok(receipt) => {
                        info!(
                            market = %spec.market,
                            side = %spec.side,
                            price = %spec.price,
                            volume = %spec.volume,
                            level = spec.level,
                            order_id = %receipt,
                            "Placed order"
                        );
                        Metrics::order_placed(spec.market.as_str(), spec.side.as_str());
                        PlacementStatus::Placed(receipt)
                    }
                    Err(e) => {
                        warn!(
                            market = %spec.market,
                            side = %spec.side,
                            price = %spec.price,
                            volume = %spec.volume,
                            level = spec.level,
                            error = %e,
                            "Failed to place order"
                        );
                        Metrics::order_failed(spec.market.as_str(), spec.side.as_str());
                        PlacementStatus::Failed(MmError::Submission(e))
                    }
                },
            };
            outcomes.push(PlacementOutcome {
                spec: spec.clone(),
                status,
            });
        }

        outcomes
    }

    /// Submit once; on a retryable error wait the backoff and submit once
    /// more.
    async fn submit(&self, request: OrderRequest) -> ClientResult<OrderReceipt> {
        match self.client.place_order(request.clone()).await {
            Err(e) if e.is_retryable() => {
                warn!(
                    market = %request.market,
                    side = %request.side,
                    price = %request.price,
                    volume = %request.volume,
                    error = %e,
                    backoff_secs = self.placement_backoff.as_secs(),
                    "Placement failed, retrying after backoff"
                );
                tokio::time::sleep(self.placement_backoff).await;
                self.client.place_order(request).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use exbit_client::{ClientError, MockCall, MockExchangeClient};
    use exbit_core::{Order, OrderStatus, Price, Size};
    use rust_decimal_macros::dec;

    fn market() -> MarketId {
        MarketId::new("xmr_usdt").unwrap()
    }

    fn spec(side: OrderSide, price: Decimal, volume: Decimal) -> LevelSpec {
        LevelSpec {
            market: market(),
            side,
            price: Price::new(price),
            volume: Size::new(volume),
            level: 1,
        }
    }

    fn order(id: &str, status: OrderStatus) -> Order {
        Order {
            id: id.to_string(),
            market: market(),
            side: OrderSide::Buy,
            price: Price::new(dec!(99)),
            volume: Size::new(dec!(1)),
            status,
        }
    }

    fn balances(quote: Decimal, base: Decimal) -> Balances {
        vec![("USDT", quote), ("XMR", base)].into_iter().collect()
    }

    fn reconciler(mock: &Arc<MockExchangeClient>) -> OrderReconciler {
        OrderReconciler::new(mock.clone(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_insufficient_quote_is_skipped_not_submitted() {
        let mock = Arc::new(MockExchangeClient::new());
        let outcomes = reconciler(&mock)
            .place_ladder(
                &[spec(OrderSide::Buy, dec!(10), dec!(5))],
                &balances(dec!(49), dec!(0)),
            )
            .await;

        assert_eq!(outcomes.len(), 1);
        assert!(matches!(
            outcomes[0].status,
            PlacementStatus::Skipped(MmError::InsufficientBalance { .. })
        ));
        assert!(mock.placed_orders().is_empty());
    }

    #[tokio::test]
    async fn test_exact_balance_is_enough() {
        let mock = Arc::new(MockExchangeClient::new());
        let outcomes = reconciler(&mock)
            .place_ladder(
                &[spec(OrderSide::Buy, dec!(10), dec!(5))],
                &balances(dec!(50), dec!(0)),
            )
            .await;
        assert!(outcomes[0].is_placed());
        assert_eq!(mock.placed_orders().len(), 1);
    }

    #[tokio::test]
    async fn test_ledger_decrements_across_orders() {
        let mock = Arc::new(MockExchangeClient::new());
        let ladder = [
            spec(OrderSide::Buy, dec!(10), dec!(3)),
            spec(OrderSide::Sell, dec!(11), dec!(2)),
            spec(OrderSide::Buy, dec!(10), dec!(3)),
            spec(OrderSide::Sell, dec!(12), dec!(2)),
        ];
        let outcomes = reconciler(&mock)
            .place_ladder(&ladder, &balances(dec!(50), dec!(3)))
            .await;

        assert!(outcomes[0].is_placed());
        assert!(outcomes[1].is_placed());
        // 30 of 50 USDT and 2 of 3 XMR already reserved.
        assert!(outcomes[2].is_skipped());
        assert!(outcomes[3].is_skipped());
        assert_eq!(mock.placed_orders().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_retried_once_after_backoff() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.push_failure(MockCall::PlaceOrder, ClientError::Transport("reset".into()));

        let start = tokio::time::Instant::now();
        let outcomes = reconciler(&mock)
            .place_ladder(
                &[spec(OrderSide::Sell, dec!(10), dec!(1))],
                &balances(dec!(0), dec!(1)),
            )
            .await;

        assert!(outcomes[0].is_placed());
        assert_eq!(mock.placed_orders().len(), 2);
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_transport_failure_is_failed() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.push_failure(MockCall::PlaceOrder, ClientError::Transport("reset".into()));
        mock.push_failure(MockCall::PlaceOrder, ClientError::Transport("reset".into()));

        let outcomes = reconciler(&mock)
            .place_ladder(
                &[spec(OrderSide::Sell, dec!(10), dec!(1))],
                &balances(dec!(0), dec!(1)),
            )
            .await;

        assert!(matches!(
            outcomes[0].status,
            PlacementStatus::Failed(MmError::Submission(ClientError::Transport(_)))
        ));
        assert_eq!(mock.placed_orders().len(), 2);
    }

    #[tokio::test]
    async fn test_rejection_not_retried_and_siblings_continue() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.push_failure(
            MockCall::PlaceOrder,
            ClientError::Status {
                status: 422,
                body: "amount too small".into(),
            },
        );

        let ladder = [
            spec(OrderSide::Buy, dec!(10), dec!(1)),
            spec(OrderSide::Sell, dec!(11), dec!(1)),
        ];
        let outcomes = reconciler(&mock)
            .place_ladder(&ladder, &balances(dec!(100), dec!(5)))
            .await;

        assert!(outcomes[0].is_failed());
        assert!(outcomes[1].is_placed());
        assert_eq!(mock.placed_orders().len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_only_open_orders() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.set_open_orders(vec![
            order("1", OrderStatus::Open),
            order("2", OrderStatus::PartiallyFilled),
            order("3", OrderStatus::Open),
            order("4", OrderStatus::Unknown),
        ]);

        let report = reconciler(&mock).cancel_stale_orders(&market()).await;
        assert_eq!(report.cancelled, vec!["1".to_string(), "3".to_string()]);
        assert_eq!(report.kept, 2);
        assert!(report.failed.is_empty());
        assert_eq!(mock.cancelled_orders(), vec!["1".to_string(), "3".to_string()]);
    }

    #[tokio::test]
    async fn test_cancel_failure_does_not_stop_sweep() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.set_open_orders(vec![order("1", OrderStatus::Open), order("2", OrderStatus::Open)]);
        mock.reject_cancel("1");

        let report = reconciler(&mock).cancel_stale_orders(&market()).await;
        assert_eq!(report.cancelled, vec!["2".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "1");
    }

    #[tokio::test]
    async fn test_listing_failure_yields_empty_report() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.push_failure(MockCall::OpenOrders, ClientError::Transport("down".into()));
        let report = reconciler(&mock).cancel_stale_orders(&market()).await;
        assert_eq!(report, CancelReport::default());
    }
}
