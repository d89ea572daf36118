//! Prometheus metrics for the spread bot.
//!
//! Covers the cycle loop and order flow:
//! - Cycle outcomes (completed / skipped by reason)
//! - Orders placed, skipped and failed per side
//! - Stale-order cancellations
//! - Last reference price per market
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A failure means duplicate metric
//! names, which is a programming error caught on first use.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, CounterVec, Encoder, Gauge,
    GaugeVec, TextEncoder,
};

use crate::error::TelemetryResult;

/// Cycles finished, by outcome.
/// Labels: market, outcome (completed / no_book / no_price / no_balances / unfunded / no_ladder)
pub static CYCLES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "exbit_cycles_total",
        "Spread cycles finished, by outcome",
        &["market", "outcome"]
    )
    .unwrap()
});

/// Ladder orders, by side and outcome.
/// Labels: market, side, outcome (placed / skipped / failed)
pub static ORDERS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "exbit_orders_total",
        "Ladder orders by side and outcome",
        &["market", "side", "outcome"]
    )
    .unwrap()
});

/// Stale-order cancellations, by result (cancelled / failed).
pub static CANCELS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "exbit_cancels_total",
        "Stale-order cancellations by result",
        &["market", "result"]
    )
    .unwrap()
});

/// Reference (mid) price used by the most recent ladder.
pub static REFERENCE_PRICE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "exbit_reference_price",
        "Reference price of the most recent cycle",
        &["market"]
    )
    .unwrap()
});

/// Unix time of the last completed cycle.
pub static LAST_CYCLE_TIMESTAMP: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "exbit_last_cycle_timestamp_seconds",
        "Unix time of the last completed cycle"
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    /// Record a finished cycle.
    pub fn cycle(market: &str, outcome: &str) {
        CYCLES_TOTAL.with_label_values(&[market, outcome]).inc();
    }

    pub fn cycle_completed_at(unix_secs: f64) {
        LAST_CYCLE_TIMESTAMP.set(unix_secs);
    }

    pub fn order_placed(market: &str, side: &str) {
        ORDERS_TOTAL
            .with_label_values(&[market, side, "placed"])
            .inc();
    }

    pub fn order_skipped(market: &str, side: &str) {
        ORDERS_TOTAL
            .with_label_values(&[market, side, "skipped"])
            .inc();
    }

    pub fn order_failed(market: &str, side: &str) {
        ORDERS_TOTAL
            .with_label_values(&[market, side, "failed"])
            .inc();
    }

    pub fn order_cancelled(market: &str) {
        CANCELS_TOTAL.with_label_values(&[market, "cancelled"]).inc();
    }

    pub fn cancel_failed(market: &str) {
        CANCELS_TOTAL.with_label_values(&[market, "failed"]).inc();
    }

    pub fn reference_price(market: &str, price: f64) {
        REFERENCE_PRICE.with_label_values(&[market]).set(price);
    }

    /// Text exposition of every registered metric.
    pub fn render() -> TelemetryResult<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
