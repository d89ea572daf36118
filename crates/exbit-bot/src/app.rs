//! Application driver.
//!
//! Owns the exchange client and turns validated user choices into engine
//! calls:
//! - Account verification (balance fetch) at startup
//! - Session pre-check: book, reference price, market minimum volume
//! - Running a spread session until a stop signal
//! - One-shot open-order and balance listings

use std::future::Future;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use exbit_client::{ClientSession, DynExchangeClient, RestClient};
use exbit_core::{Balances, MarketId, Order, OrderBookSnapshot, Price, Size};
use exbit_mm::{
    compute_reference_price, SessionSummary, SpreadConfig, SpreadCycleScheduler, MAX_LEVELS,
};
use exbit_telemetry::Metrics;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::prompt::Prompter;

/// Everything the pre-check learned about a market.
#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub market: MarketId,
    pub book: OrderBookSnapshot,
    pub reference_price: Price,
    /// Market minimum order volume, used as the ladder's base volume.
    pub min_volume: Size,
}

/// Main application.
pub struct Application {
    config: AppConfig,
    client: DynExchangeClient,
}

impl Application {
    /// Create an application talking to the configured Exbitron endpoint.
    pub fn new(config: AppConfig, api_key: String) -> AppResult<Self> {
        let session = ClientSession::new(config.exchange.base_url.clone(), api_key)
            .with_timeout(config.exchange.request_timeout());
        let client = RestClient::new(session)?;
        Ok(Self::with_client(config, Arc::new(client)))
    }

    /// Create an application over an existing client.
    pub fn with_client(config: AppConfig, client: DynExchangeClient) -> Self {
        Self { config, client }
    }

    /// Fetch balances to prove the API key works.
    ///
    /// An empty balance set is treated as a rejected key.
    pub async fn verify_account(&self) -> AppResult<Balances> {
        let balances = self
            .client
            .get_balances()
            .await
            .map_err(|e| AppError::Account(format!("unable to fetch balances: {e}")))?;
        if balances.is_empty() {
            return Err(AppError::Account(
                "no balances returned; check the API key".to_string(),
            ));
        }
        info!(assets = balances.len(), "Account verified");
        Ok(balances)
    }

    /// Check that `market` can be traded right now.
    pub async fn precheck(&self, market: &str) -> AppResult<SessionPlan> {
        let market = MarketId::new(market)?;

        let book = self
            .client
            .get_order_book(&market)
            .await
            .map_err(|e| {
                AppError::PreCheck(format!("failed to fetch order book for {market}: {e}"))
            })?
            .ok_or_else(|| AppError::PreCheck(format!("no order book for {market}")))?;

        let reference_price = compute_reference_price(&book)
            .ok_or_else(|| AppError::PreCheck(format!("no reference price for {market}")))?;

        let info = self
            .client
            .get_market_info(&market)
            .await
            .map_err(|e| {
                AppError::PreCheck(format!("failed to fetch market info for {market}: {e}"))
            })?
            .ok_or_else(|| {
                AppError::PreCheck(format!("no minimum trade volume for {market}"))
            })?;
        if !info.minimum_trade_volume.is_positive() {
            return Err(AppError::PreCheck(format!(
                "minimum trade volume for {market} is {}",
                info.minimum_trade_volume
            )));
        }

        info!(
            market = %market,
            reference_price = %reference_price,
            min_volume = %info.minimum_trade_volume,
            "Pre-check passed"
        );
        Ok(SessionPlan {
            market,
            book,
            reference_price,
            min_volume: info.minimum_trade_volume,
        })
    }

    /// Build a scheduler for `plan` with `levels` per side.
    ///
    /// `min_volume` overrides the market minimum when given.
    pub fn build_scheduler(
        &self,
        plan: &SessionPlan,
        levels: u32,
        min_volume: Option<Size>,
    ) -> AppResult<SpreadCycleScheduler> {
        let config = SpreadConfig::new(
            plan.market.clone(),
            min_volume.unwrap_or(plan.min_volume),
            levels,
        )?;
        let scheduler = SpreadCycleScheduler::new(
            self.client.clone(),
            config,
            self.config.ladder.policy(),
            self.config.schedule.clone(),
        )?;
        Ok(scheduler)
    }

    /// Run `scheduler` until it fails or `stop` resolves.
    ///
    /// After `stop` the session finishes its current cycle before
    /// returning.
    pub async fn run_session<F>(
        &self,
        scheduler: &SpreadCycleScheduler,
        stop: F,
    ) -> AppResult<SessionSummary>
    where
        F: Future<Output = ()>,
    {
        let cancel = CancellationToken::new();
        let run = scheduler.run(cancel.clone());
        tokio::pin!(run);

        tokio::select! {
            result = &mut run => return Ok(result?),
            _ = stop => {
                info!(market = %scheduler.config().market(), "Stop requested, ending session");
                cancel.cancel();
            }
        }

        Ok(run.await?)
    }

    /// Resting orders for `market`.
    pub async fn open_orders(&self, market: &str) -> AppResult<Vec<Order>> {
        let market = MarketId::new(market)?;
        let orders = self.client.list_open_orders(&market).await?;
        info!(market = %market, count = orders.len(), "Open orders");
        Ok(orders)
    }

    pub async fn balances(&self) -> AppResult<Balances> {
        Ok(self.client.get_balances().await?)
    }

    /// Interactive menu loop. Returns when the user exits or input closes.
    pub async fn run_menu<R, W>(&self, prompter: &mut Prompter<R, W>) -> AppResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            prompter.say("").await?;
            prompter.say("Menu:").await?;
            prompter.say("1. Start Spread Trading").await?;
            prompter.say("2. Track Open Orders").await?;
            prompter.say("3. Show Balances").await?;
            prompter.say("4. Show Metrics").await?;
            prompter.say("5. Exit").await?;

            let choice = match prompter.ask_in_range("Enter your choice: ", 1u32, 5).await {
                Ok(choice) => choice,
                Err(AppError::InputClosed) => return Ok(()),
                Err(e) => return Err(e),
            };

            let result = match choice {
                1 => self.menu_start_session(prompter).await,
                2 => self.menu_track_orders(prompter).await,
                3 => self.menu_balances(prompter).await,
                4 => self.menu_metrics(prompter).await,
                _ => {
                    prompter.say("Exiting ExbitBot. Goodbye!").await?;
                    return Ok(());
                }
            };

            match result {
                Ok(()) => {}
                Err(AppError::InputClosed) => return Ok(()),
                Err(e) => {
                    warn!(error = %e, "Menu action failed");
                    prompter.say(format!("{e}")).await?;
                }
            }
        }
    }

    async fn menu_start_session<R, W>(&self, prompter: &mut Prompter<R, W>) -> AppResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let market = prompter
            .ask_non_empty("Enter the trading pair (e.g., xmr_usdt): ")
            .await?;
        let plan = self.precheck(&market).await?;
        write_book(prompter, &plan.book).await?;
        prompter
            .say(format!(
                "Reference price: {}  Minimum volume: {}",
                plan.reference_price, plan.min_volume
            ))
            .await?;

        let levels = prompter
            .ask_in_range("Enter the number of levels (e.g., 10): ", 1, MAX_LEVELS)
            .await?;
        let scheduler = self.build_scheduler(&plan, levels, None)?;

        prompter
            .say(format!(
                "Starting spread trading for {}... (Ctrl-C returns to the menu)",
                plan.market
            ))
            .await?;
        let summary = self.run_session(&scheduler, ctrl_c()).await?;
        prompter.say("Stopped spread trading. Returning to menu.").await?;
        prompter.say(format_summary(&summary)).await?;
        Ok(())
    }

    async fn menu_track_orders<R, W>(&self, prompter: &mut Prompter<R, W>) -> AppResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let market = prompter
            .ask_non_empty("Enter the trading pair to track (e.g., xmr_usdt): ")
            .await?;
        let orders = self.open_orders(&market).await?;
        if orders.is_empty() {
            prompter.say("No open orders.").await?;
        }
        for order in &orders {
            prompter.say(format_order(order)).await?;
        }
        Ok(())
    }

    async fn menu_balances<R, W>(&self, prompter: &mut Prompter<R, W>) -> AppResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let balances = self.balances().await?;
        write_balances(prompter, &balances).await
    }

    async fn menu_metrics<R, W>(&self, prompter: &mut Prompter<R, W>) -> AppResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let text = Metrics::render()?;
        prompter.say(text.trim_end()).await
    }
}

/// Resolves on Ctrl-C. If the signal handler cannot be installed it never
/// resolves, so a session is not stopped spuriously.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

pub async fn write_balances<R, W>(
    prompter: &mut Prompter<R, W>,
    balances: &Balances,
) -> AppResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    prompter.say("Your current balances:").await?;
    for (asset, amount) in balances.iter() {
        prompter.say(format!("{asset}: {amount}")).await?;
    }
    Ok(())
}

async fn write_book<R, W>(prompter: &mut Prompter<R, W>, book: &OrderBookSnapshot) -> AppResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (asks, bids) = book.top_levels(exbit_mm::scheduler::BOOK_DISPLAY_DEPTH);
    prompter.say("Asks:").await?;
    for level in asks.iter().rev() {
        prompter
            .say(format!("  {} @ {}", level.size, level.price))
            .await?;
    }
    prompter.say("Bids:").await?;
    for level in bids {
        prompter
            .say(format!("  {} @ {}", level.size, level.price))
            .await?;
    }
    Ok(())
}

pub fn format_order(order: &Order) -> String {
    format!(
        "{} {} {} @ {} [{}]",
        order.id, order.side, order.volume, order.price, order.status
    )
}

pub fn format_summary(summary: &SessionSummary) -> String {
    format!(
        "Cycles: {} completed, {} skipped | Orders: {} placed, {} skipped, {} failed, {} cancelled",
        summary.cycles_completed,
        summary.cycles_skipped,
        summary.orders_placed,
        summary.orders_skipped,
        summary.orders_failed,
        summary.orders_cancelled
    )
}

/// Parse a user-supplied volume override.
pub fn parse_volume(input: &str) -> AppResult<Size> {
    let value: Decimal = input
        .trim()
        .parse()
        .map_err(|_| AppError::Input(format!("{input:?} is not a valid volume")))?;
    if value <= Decimal::ZERO {
        return Err(AppError::Input(format!("volume must be positive, got {value}")));
    }
    Ok(Size::new(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use exbit_client::{ClientError, MockCall, MockExchangeClient};
    use exbit_core::{BookLevel, MarketInfo, OrderSide, OrderStatus};
    use rust_decimal_macros::dec;

    fn app(mock: &Arc<MockExchangeClient>) -> Application {
        Application::with_client(AppConfig::default(), mock.clone())
    }

    fn book() -> OrderBookSnapshot {
        OrderBookSnapshot::new(
            vec![BookLevel::new(Price::new(dec!(100)), Size::new(dec!(1)))],
            vec![BookLevel::new(Price::new(dec!(102)), Size::new(dec!(1)))],
        )
    }

    #[tokio::test]
    async fn test_verify_account_rejects_empty() {
        let mock = Arc::new(MockExchangeClient::new());
        assert!(matches!(
            app(&mock).verify_account().await,
            Err(AppError::Account(_))
        ));

        mock.push_failure(MockCall::Balances, ClientError::Status {
            status: 401,
            body: "unauthorized".into(),
        });
        assert!(matches!(
            app(&mock).verify_account().await,
            Err(AppError::Account(_))
        ));

        mock.set_balances(vec![("USDT", dec!(5))].into_iter().collect());
        assert_eq!(app(&mock).verify_account().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_precheck_collects_plan() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.set_order_book(Some(book()));
        mock.set_market_info(Some(MarketInfo {
            minimum_trade_volume: Size::new(dec!(0.05)),
            minimum_trade_price: None,
        }));

        let plan = app(&mock).precheck("xmr_usdt").await.unwrap();
        assert_eq!(plan.reference_price, Price::new(dec!(101)));
        assert_eq!(plan.min_volume, Size::new(dec!(0.05)));
    }

    #[tokio::test]
    async fn test_precheck_failures() {
        let mock = Arc::new(MockExchangeClient::new());
        assert!(matches!(
            app(&mock).precheck("xmrusdt").await,
            Err(AppError::Core(_))
        ));
        assert!(matches!(
            app(&mock).precheck("xmr_usdt").await,
            Err(AppError::PreCheck(_))
        ));

        mock.set_order_book(Some(book()));
        assert!(matches!(
            app(&mock).precheck("xmr_usdt").await,
            Err(AppError::PreCheck(_))
        ));
    }

    #[tokio::test]
    async fn test_build_scheduler_validates_levels() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.set_order_book(Some(book()));
        mock.set_market_info(Some(MarketInfo {
            minimum_trade_volume: Size::new(dec!(0.05)),
            minimum_trade_price: None,
        }));
        let app = app(&mock);
        let plan = app.precheck("xmr_usdt").await.unwrap();

        assert!(app.build_scheduler(&plan, 10, None).is_ok());
        assert!(matches!(
            app.build_scheduler(&plan, 0, None),
            Err(AppError::Engine(_))
        ));
        let scheduler = app
            .build_scheduler(&plan, 3, Some(Size::new(dec!(2))))
            .unwrap();
        assert_eq!(scheduler.config().min_volume(), Size::new(dec!(2)));
    }

    #[tokio::test]
    async fn test_menu_track_orders_and_exit() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.set_open_orders(vec![Order {
            id: "42".into(),
            market: MarketId::new("xmr_usdt").unwrap(),
            side: OrderSide::Sell,
            price: Price::new(dec!(103)),
            volume: Size::new(dec!(1.5)),
            status: OrderStatus::Open,
        }]);
        mock.set_balances(vec![("XMR", dec!(3))].into_iter().collect());

        let input = b"9\n2\nxmr_usdt\n3\n5\n";
        let mut prompter = Prompter::new(&input[..], Vec::new());
        app(&mock).run_menu(&mut prompter).await.unwrap();

        let (_, out) = prompter.into_inner();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("at most 5"));
        assert!(out.contains("42 sell 1.5 @ 103 [open]"));
        assert!(out.contains("XMR: 3"));
        assert!(out.contains("Goodbye"));
    }

    #[tokio::test]
    async fn test_menu_reports_precheck_failure_and_continues() {
        let mock = Arc::new(MockExchangeClient::new());
        let input = b"1\nxmr_usdt\n5\n";
        let mut prompter = Prompter::new(&input[..], Vec::new());
        app(&mock).run_menu(&mut prompter).await.unwrap();

        let (_, out) = prompter.into_inner();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Session pre-check failed"));
        assert!(out.contains("Goodbye"));
    }

    #[tokio::test]
    async fn test_menu_ends_on_eof() {
        let mock = Arc::new(MockExchangeClient::new());
        let mut prompter = Prompter::new(&b"2\n"[..], Vec::new());
        assert!(app(&mock).run_menu(&mut prompter).await.is_ok());
    }

    #[test]
    fn test_parse_volume() {
        assert_eq!(parse_volume("0.5").unwrap(), Size::new(dec!(0.5)));
        assert!(parse_volume("0").is_err());
        assert!(parse_volume("abc").is_err());
    }
}
