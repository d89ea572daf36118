//! Running PnL over reported fills.
//!
//! Cash-flow only: sells add `price * volume`, buys subtract it. No
//! inventory valuation or fee accounting.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use exbit_core::{OrderSide, Price, Size};

/// One executed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub side: OrderSide,
    pub price: Price,
    pub volume: Size,
}

impl Fill {
    /// Signed quote cash flow of this fill.
    pub fn cash_flow(&self) -> Decimal {
        let notional = self.volume.notional(self.price);
        match self.side {
            OrderSide::Sell => notional,
            OrderSide::Buy => -notional,
        }
    }
}

/// Sum of cash flows over `fills`.
pub fn running_pnl<'a>(fills: impl IntoIterator<Item = &'a Fill>) -> Decimal {
    fills.into_iter().map(Fill::cash_flow).sum()
}
