//! Spread-order lifecycle engine.
//!
//! Maintains a symmetric ladder of limit orders around the mid price of one
//! market:
//! - Reference price from the order book (oracle)
//! - Deterministic ladder of buy/sell levels
//! - Reconciliation against resting orders under balance limits
//! - Fixed-cadence, cancellable cycle loop
//!
//! # Architecture
//!
//! ```text
//! SpreadCycleScheduler.run()
//!   ├─ ExchangeClient.get_order_book() → compute_reference_price()
//!   ├─ ExchangeClient.get_balances()
//!   ├─ OrderReconciler.cancel_stale_orders()
//!   ├─ generate_ladder()
//!   └─ OrderReconciler.place_ladder()  (per-cycle balance ledger)
//! ```

pub mod config;
pub mod error;
pub mod ladder;
pub mod oracle;
pub mod pnl;
pub mod reconciler;
pub mod scheduler;

pub use config::{AnchorStrategy, LadderPolicy, ScheduleConfig, SpreadConfig, MAX_LEVELS};
pub use error::{MmError, MmResult};
pub use ladder::{generate_ladder, BasePrices, LevelSpec};
pub use oracle::compute_reference_price;
pub use pnl::{running_pnl, Fill};
pub use reconciler::{
    BalanceLedger, CancelReport, OrderReconciler, PlacementOutcome, PlacementStatus,
};
pub use scheduler::{CycleOutcome, CycleReport, SessionSummary, SkipReason, SpreadCycleScheduler};
