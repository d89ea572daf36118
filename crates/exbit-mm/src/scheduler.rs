//! Spread cycle scheduler.
//!
//! Runs one sequential loop per session. Each cycle:
//!
//! ```text
//! 1. order book ─▶ reference price       (missing: skip)
//! 2. balances ─▶ funded-market gate       (missing / unfunded: skip)
//! 3. ladder inputs (market minimum price) (missing: skip)
//! 4. cancel stale orders ─▶ refresh balances
//! 5. generate ladder ─▶ place
//! ```
//!
//! then waits, cancellably, for the next cycle.
//!
//! Every input that can be missing is fetched before the resting ladder is
//! cancelled, so a skipped cycle leaves the book as it was. Balances are
//! fetched again after the cancel sweep because resting orders hold funds.
//!
//! Data failures skip the cycle and never end the session. Only invalid
//! configuration or cancellation does.

use std::time::Duration;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use exbit_client::DynExchangeClient;
use exbit_core::{OrderBookSnapshot, Price};
use exbit_telemetry::Metrics;

use crate::config::{AnchorStrategy, LadderPolicy, ScheduleConfig, SpreadConfig};
use crate::error::{MmError, MmResult};
use crate::ladder::{generate_ladder, BasePrices};
use crate::oracle::compute_reference_price;
use crate::reconciler::{CancelReport, OrderReconciler, PlacementOutcome};

/// Book levels per side written to the log each cycle.
pub const BOOK_DISPLAY_DEPTH: usize = 5;

/// Countdown log period while waiting for the next cycle.
const COUNTDOWN_STEP: Duration = Duration::from_secs(60);

/// Why a cycle placed nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Order book request failed or returned no book.
    NoBook(String),
    /// One side of the book is empty.
    NoReferencePrice,
    /// Balance request failed.
    NoBalances(String),
    /// Base or quote balance is zero.
    Unfunded,
    /// Ladder inputs (market minimum price) unavailable.
    NoLadder(String),
}

impl SkipReason {
    fn metric_label(&self) -> &'static str {
        match self {
            Self::NoBook(_) => "no_book",
            Self::NoReferencePrice => "no_price",
            Self::NoBalances(_) => "no_balances",
            Self::Unfunded => "unfunded",
            Self::NoLadder(_) => "no_ladder",
        }
    }
}

/// What one completed cycle did.
#[derive(Debug)]
pub struct CycleReport {
    pub reference_price: Price,
    pub cancel: CancelReport,
    pub outcomes: Vec<PlacementOutcome>,
}

impl CycleReport {
    pub fn placed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_placed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }
}

#[derive(Debug)]
pub enum CycleOutcome {
    Completed(CycleReport),
    Skipped(SkipReason),
}

/// Totals for one session, returned when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub cycles_completed: u64,
    pub cycles_skipped: u64,
    pub orders_placed: u64,
    pub orders_skipped: u64,
    pub orders_failed: u64,
    pub orders_cancelled: u64,
}

impl SessionSummary {
    fn record(&mut self, outcome: &CycleOutcome) {
        match outcome {
            CycleOutcome::Completed(report) => {
                self.cycles_completed += 1;
                self.orders_placed += report.placed() as u64;
                self.orders_skipped += report.skipped() as u64;
                self.orders_failed += report.failed() as u64;
                self.orders_cancelled += report.cancel.cancelled.len() as u64;
            }
            CycleOutcome::Skipped(_) => self.cycles_skipped += 1,
        }
    }
}

/// Drives oracle, ladder and reconciler on a fixed cadence.
pub struct SpreadCycleScheduler {
    client: DynExchangeClient,
    reconciler: OrderReconciler,
    config: SpreadConfig,
    policy: LadderPolicy,
    schedule: ScheduleConfig,
}

impl SpreadCycleScheduler {
    /// Validate the policy and schedule and build a scheduler.
    pub fn new(
        client: DynExchangeClient,
        config: SpreadConfig,
        policy: LadderPolicy,
        schedule: ScheduleConfig,
    ) -> MmResult<Self> {
        policy.validate()?;
        schedule.validate()?;
        let reconciler = OrderReconciler::new(client.clone(), schedule.placement_backoff());
        Ok(Self {
            client,
            reconciler,
            config,
            policy,
            schedule,
        })
    }

    pub fn config(&self) -> &SpreadConfig {
        &self.config
    }

    /// Run cycles until `cancel` fires.
    ///
    /// A cancellation requested mid-cycle takes effect at the following
    /// wait. Returns `Err` only for configuration that can never produce a
    /// ladder.
    pub async fn run(&self, cancel: CancellationToken) -> MmResult<SessionSummary> {
        let market = self.config.market().clone();
        let mut summary = SessionSummary::default();
        info!(
            market = %market,
            levels = self.config.level_count(),
            min_volume = %self.config.min_volume(),
            anchor = self.policy.anchor.as_str(),
            "Spread session started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let outcome = match self.run_cycle().await {
                Ok(outcome) => outcome,
                Err(e) if e.is_fatal() => {
                    error!(market = %market, error = %e, "Spread session aborted");
                    return Err(e);
                }
                Err(e) => {
                    warn!(market = %market, error = %e, "Cycle failed, skipping");
                    CycleOutcome::Skipped(SkipReason::NoLadder(e.to_string()))
                }
            };
            summary.record(&outcome);

            let wait = match &outcome {
                CycleOutcome::Completed(report) => {
                    Metrics::cycle(market.as_str(), "completed");
                    Metrics::cycle_completed_at(Utc::now().timestamp() as f64);
                    info!(
                        market = %market,
                        reference_price = %report.reference_price,
                        cancelled = report.cancel.cancelled.len(),
                        placed = report.placed(),
                        skipped = report.skipped(),
                        failed = report.failed(),
                        "Cycle completed"
                    );
                    self.schedule.cycle_interval()
                }
                CycleOutcome::Skipped(reason) => {
                    Metrics::cycle(market.as_str(), reason.metric_label());
                    match reason {
                        SkipReason::Unfunded => self.schedule.cycle_interval(),
                        _ => self.schedule.retry_delay(),
                    }
                }
            };

            if self.wait(wait, &cancel).await {
                break;
            }
        }

        info!(
            market = %market,
            cycles_completed = summary.cycles_completed,
            cycles_skipped = summary.cycles_skipped,
            orders_placed = summary.orders_placed,
            orders_cancelled = summary.orders_cancelled,
            "Spread session stopped"
        );
        Ok(summary)
    }

    /// Execute one cycle without waiting.
    pub async fn run_cycle(&self) -> MmResult<CycleOutcome> {
        let market = self.config.market();

        let book = match self.client.get_order_book(market).await {
            Ok(Some(book)) => book,
            Ok(None) => {
                warn!(market = %market, "Order book unavailable, skipping cycle");
                return Ok(CycleOutcome::Skipped(SkipReason::NoBook(
                    "empty response".to_string(),
                )));
            }
            Err(e) => {
                warn!(market = %market, error = %e, "Failed to fetch order book, skipping cycle");
                return Ok(CycleOutcome::Skipped(SkipReason::NoBook(e.to_string())));
            }
        };
        log_book(&book);

        let Some(reference_price) = compute_reference_price(&book) else {
            warn!(market = %market, "No reference price (one-sided book), skipping cycle");
            return Ok(CycleOutcome::Skipped(SkipReason::NoReferencePrice));
        };
        info!(market = %market, reference_price = %reference_price, "Reference price");
        Metrics::reference_price(
            market.as_str(),
            reference_price.inner().to_f64().unwrap_or_default(),
        );

        let balances = match self.client.get_balances().await {
            Ok(balances) => balances,
            Err(e) => {
                warn!(market = %market, error = %e, "Failed to fetch balances, skipping cycle");
                return Ok(CycleOutcome::Skipped(SkipReason::NoBalances(e.to_string())));
            }
        };
        let base = balances.available(market.base_asset());
        let quote = balances.available(market.quote_asset());
        debug!(
            base_asset = market.base_asset(),
            %base,
            quote_asset = market.quote_asset(),
            %quote,
            "Cycle balances"
        );
        if self.schedule.require_funded_market && (base.is_zero() || quote.is_zero()) {
            warn!(
                market = %market,
                %base,
                %quote,
                "Insufficient balance on one side, skipping cycle"
            );
            return Ok(CycleOutcome::Skipped(SkipReason::Unfunded));
        }

        let bases = match self.base_prices(reference_price).await {
            Ok(bases) => bases,
            Err(MmError::DataUnavailable(detail)) => {
                warn!(market = %market, %detail, "Ladder inputs unavailable, skipping cycle");
                return Ok(CycleOutcome::Skipped(SkipReason::NoLadder(detail)));
            }
            Err(e) => return Err(e),
        };

        let cancel = self.reconciler.cancel_stale_orders(market).await;

        let balances = if cancel.cancelled.is_empty() {
            balances
        } else {
            match self.client.get_balances().await {
                Ok(refreshed) => refreshed,
                Err(e) => {
                    warn!(
                        market = %market,
                        error = %e,
                        "Failed to refresh balances after cancel sweep, using earlier snapshot"
                    );
                    balances
                }
            }
        };

        let ladder = match generate_ladder(&self.config, &self.policy, &bases) {
            Ok(ladder) => ladder,
            Err(MmError::DataUnavailable(detail)) => {
                warn!(market = %market, %detail, "Ladder inputs unavailable, skipping cycle");
                return Ok(CycleOutcome::Skipped(SkipReason::NoLadder(detail)));
            }
            Err(e) => return Err(e),
        };
        debug!(market = %market, orders = ladder.len(), "Generated ladder");

        let outcomes = self.reconciler.place_ladder(&ladder, &balances).await;

        Ok(CycleOutcome::Completed(CycleReport {
            reference_price,
            cancel,
            outcomes,
        }))
    }

    async fn base_prices(&self, reference: Price) -> MmResult<BasePrices> {
        let mut bases = BasePrices::from_reference(reference);
        if self.policy.anchor == AnchorStrategy::MinimumAnchored {
            let info = self
                .client
                .get_market_info(self.config.market())
                .await
                .map_err(|e| MmError::DataUnavailable(format!("market info: {e}")))?
                .ok_or_else(|| MmError::DataUnavailable("market info missing".to_string()))?;
            let minimum = info.minimum_trade_price.ok_or_else(|| {
                MmError::DataUnavailable("market publishes no minimum trade price".to_string())
            })?;
            bases.minimum = Some(minimum);
        }
        Ok(bases)
    }

    /// Sleep for `total`, logging a countdown every minute.
    ///
    /// Returns `true` when cancelled before the wait elapsed.
    async fn wait(&self, total: Duration, cancel: &CancellationToken) -> bool {
        let deadline = Instant::now() + total;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let minutes = remaining.as_secs().div_ceil(60);
            info!("Waiting for next cycle in {minutes} minutes...");

            tokio::select! {
                _ = cancel.cancelled() => return true,
                _ = tokio::time::sleep(remaining.min(COUNTDOWN_STEP)) => {}
            }
        }
    }
}

fn log_book(book: &OrderBookSnapshot) {
    let (asks, bids) = book.top_levels(BOOK_DISPLAY_DEPTH);
    for level in asks.iter().rev() {
        info!(side = "ask", price = %level.price, volume = %level.size, "Book");
    }
    for level in bids {
        info!(side = "bid", price = %level.price, volume = %level.size, "Book");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use exbit_client::{ClientError, ExchangeClient, MockCall, MockExchangeClient};
    use exbit_core::{
        Balances, BookLevel, MarketId, MarketInfo, Order, OrderSide, OrderStatus, Size,
    };

    use crate::reconciler::PlacementStatus;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn market() -> MarketId {
        MarketId::new("xmr_usdt").unwrap()
    }

    fn book(bid: Decimal, ask: Decimal) -> OrderBookSnapshot {
        OrderBookSnapshot::new(
            vec![BookLevel::new(Price::new(bid), Size::new(dec!(1)))],
            vec![BookLevel::new(Price::new(ask), Size::new(dec!(1)))],
        )
    }

    fn funded() -> Balances {
        vec![("USDT", dec!(10000)), ("XMR", dec!(100))]
            .into_iter()
            .collect()
    }

    fn scheduler(mock: &Arc<MockExchangeClient>, policy: LadderPolicy) -> SpreadCycleScheduler {
        let config = SpreadConfig::new(market(), Size::new(dec!(1)), 2).unwrap();
        SpreadCycleScheduler::new(mock.clone(), config, policy, ScheduleConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_cycle_places_full_ladder() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.set_order_book(Some(book(dec!(99), dec!(101))));
        mock.set_balances(funded());

        let outcome = scheduler(&mock, LadderPolicy::centered())
            .run_cycle()
            .await
            .unwrap();
        let CycleOutcome::Completed(report) = outcome else {
            panic!("expected completed cycle");
        };
        assert_eq!(report.reference_price, Price::new(dec!(100)));
        assert_eq!(report.placed(), 4);

        let placed = mock.placed_orders();
        assert_eq!(placed[0].side, OrderSide::Buy);
        assert_eq!(placed[0].price.inner(), dec!(98.625));
        assert_eq!(placed[1].price.inner(), dec!(101.375));
    }

    #[tokio::test]
    async fn test_second_cycle_cancels_previous_ladder() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.set_order_book(Some(book(dec!(99), dec!(101))));
        mock.set_balances(funded());
        let scheduler = scheduler(&mock, LadderPolicy::centered());

        scheduler.run_cycle().await.unwrap();
        let CycleOutcome::Completed(report) = scheduler.run_cycle().await.unwrap() else {
            panic!("expected completed cycle");
        };
        assert_eq!(report.cancel.cancelled.len(), 4);
        assert_eq!(mock.placed_orders().len(), 8);
    }

    #[tokio::test]
    async fn test_one_sided_book_skips() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.set_order_book(Some(OrderBookSnapshot::new(
            vec![BookLevel::new(Price::new(dec!(100)), Size::new(dec!(1)))],
            vec![],
        )));
        mock.set_balances(funded());

        let outcome = scheduler(&mock, LadderPolicy::centered())
            .run_cycle()
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            CycleOutcome::Skipped(SkipReason::NoReferencePrice)
        ));
        assert!(mock.placed_orders().is_empty());
    }

    #[tokio::test]
    async fn test_unfunded_market_skips() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.set_order_book(Some(book(dec!(99), dec!(101))));
        mock.set_balances(vec![("USDT", dec!(500))].into_iter().collect());

        let outcome = scheduler(&mock, LadderPolicy::centered())
            .run_cycle()
            .await
            .unwrap();
        assert!(matches!(outcome, CycleOutcome::Skipped(SkipReason::Unfunded)));
        assert!(mock.placed_orders().is_empty());
    }

    #[tokio::test]
    async fn test_minimum_anchored_without_info_skips() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.set_order_book(Some(book(dec!(99), dec!(101))));
        mock.set_balances(funded());
        mock.set_market_info(Some(MarketInfo {
            minimum_trade_volume: Size::new(dec!(0.01)),
            minimum_trade_price: None,
        }));

        let outcome = scheduler(&mock, LadderPolicy::minimum_anchored())
            .run_cycle()
            .await
            .unwrap();
        assert!(matches!(outcome, CycleOutcome::Skipped(SkipReason::NoLadder(_))));
    }

    #[tokio::test]
    async fn test_minimum_anchored_places_from_minimum() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.set_order_book(Some(book(dec!(99), dec!(101))));
        mock.set_balances(funded());
        mock.set_market_info(Some(MarketInfo {
            minimum_trade_volume: Size::new(dec!(0.01)),
            minimum_trade_price: Some(Price::new(dec!(80))),
        }));

        scheduler(&mock, LadderPolicy::minimum_anchored())
            .run_cycle()
            .await
            .unwrap();
        let placed = mock.placed_orders();
        assert_eq!(placed[0].price.inner(), dec!(79.9));
        assert_eq!(placed[1].price.inner(), dec!(100.125));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_books_wait_retry_delay() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.push_failure(MockCall::OrderBook, ClientError::Transport("timeout".into()));
        mock.set_order_book(None);

        let scheduler = Arc::new(scheduler(&mock, LadderPolicy::centered()));
        let cancel = CancellationToken::new();
        let handle = {
            let scheduler = scheduler.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { scheduler.run(cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(650)).await;
        cancel.cancel();
        let summary = handle.await.unwrap().unwrap();

        assert_eq!(summary.cycles_skipped, 3);
        assert_eq!(summary.cycles_completed, 0);
        let requests = mock.book_requests();
        assert_eq!(requests.len(), 3);
        for w in requests.windows(2) {
            assert_eq!(w[1] - w[0], Duration::from_secs(300));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_wait_returns_summary() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.set_order_book(Some(book(dec!(99), dec!(101))));
        mock.set_balances(funded());

        let scheduler = Arc::new(scheduler(&mock, LadderPolicy::centered()));
        let cancel = CancellationToken::new();
        let handle = {
            let scheduler = scheduler.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { scheduler.run(cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(30)).await;
        cancel.cancel();
        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.cycles_completed, 1);
        assert_eq!(summary.orders_placed, 4);
    }

    #[tokio::test]
    async fn test_cancelled_ladder_funds_are_reused() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.set_order_book(Some(book(dec!(99), dec!(101))));
        mock.set_balances(vec![("USDT", dec!(300)), ("XMR", dec!(3))].into_iter().collect());
        mock.lock_open_order_funds();
        let scheduler = scheduler(&mock, LadderPolicy::centered());

        let CycleOutcome::Completed(first) = scheduler.run_cycle().await.unwrap() else {
            panic!("expected completed cycle");
        };
        assert_eq!(first.placed(), 4);

        let CycleOutcome::Completed(second) = scheduler.run_cycle().await.unwrap() else {
            panic!("expected completed cycle");
        };
        assert_eq!(second.cancel.cancelled.len(), 4);
        assert_eq!(second.placed(), 4);
        assert_eq!(second.skipped(), 0);
    }

    #[tokio::test]
    async fn test_market_info_outage_keeps_resting_orders() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.set_order_book(Some(book(dec!(99), dec!(101))));
        mock.set_balances(funded());
        mock.set_open_orders(vec![Order {
            id: "1".to_string(),
            market: market(),
            side: OrderSide::Buy,
            price: Price::new(dec!(79.9)),
            volume: Size::new(dec!(1.125)),
            status: OrderStatus::Open,
        }]);
        mock.push_failure(MockCall::MarketInfo, ClientError::Transport("timeout".into()));

        let outcome = scheduler(&mock, LadderPolicy::minimum_anchored())
            .run_cycle()
            .await
            .unwrap();
        assert!(matches!(outcome, CycleOutcome::Skipped(SkipReason::NoLadder(_))));
        assert!(mock.cancelled_orders().is_empty());
        assert_eq!(mock.list_open_orders(&market()).await.unwrap().len(), 1);
        assert!(mock.placed_orders().is_empty());
    }

    #[tokio::test]
    async fn test_unfunded_side_skipped_when_gate_disabled() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.set_order_book(Some(book(dec!(99), dec!(101))));
        mock.set_balances(vec![("USDT", dec!(10000))].into_iter().collect());
        let config = SpreadConfig::new(market(), Size::new(dec!(1)), 2).unwrap();
        let schedule = ScheduleConfig {
            require_funded_market: false,
            ..ScheduleConfig::default()
        };
        let scheduler =
            SpreadCycleScheduler::new(mock.clone(), config, LadderPolicy::centered(), schedule)
                .unwrap();

        let CycleOutcome::Completed(report) = scheduler.run_cycle().await.unwrap() else {
            panic!("expected completed cycle");
        };
        assert_eq!(report.placed(), 2);
        assert_eq!(report.skipped(), 2);
        for outcome in &report.outcomes {
            match outcome.spec.side {
                OrderSide::Buy => assert!(outcome.is_placed()),
                OrderSide::Sell => assert!(matches!(
                    outcome.status,
                    PlacementStatus::Skipped(MmError::InsufficientBalance { .. })
                )),
            }
        }
        assert!(mock.placed_orders().iter().all(|o| o.side == OrderSide::Buy));
    }

    #[test]
    fn test_only_invalid_config_is_fatal() {
        assert!(MmError::InvalidConfig("levels".into()).is_fatal());
        assert!(!MmError::DataUnavailable("book".into()).is_fatal());
    }

    #[test]
    fn test_scheduler_rejects_invalid_policy() {
        let mock = Arc::new(MockExchangeClient::new());
        let config = SpreadConfig::new(market(), Size::new(dec!(1)), 2).unwrap();
        let mut policy = LadderPolicy::centered();
        policy.base_spread = Decimal::ZERO;
        let result =
            SpreadCycleScheduler::new(mock.clone(), config, policy, ScheduleConfig::default());
        assert!(matches!(result, Err(MmError::InvalidConfig(_))));
    }
}
