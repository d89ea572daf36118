//! Reference price derivation.

use exbit_core::{OrderBookSnapshot, Price};

/// Midpoint of best bid and best ask.
///
/// `None` when either side of the book is empty or the midpoint is not
/// positive. No rounding is applied here; prices are rounded only when
/// ladder orders are built.
pub fn compute_reference_price(book: &OrderBookSnapshot) -> Option<Price> {
    let best_bid = book.best_bid()?;
    let best_ask = book.best_ask()?;
    let mid = best_bid.price.midpoint(best_ask.price);
    mid.is_positive().then_some(mid)
}
