//! Prometheus metrics for the punctual terminal.
//!
//! Covers:
//! - Stream connection state and reconnects
//! - Feed ticks by source, skipped duplicates, snapshot poll failures
//! - Latest prices and position PnL
//! - Transactions by action and outcome
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a programming error caught on first use.

use crate::error::TelemetryResult;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_histogram_vec,
    register_int_counter, CounterVec, Encoder, Gauge, GaugeVec, HistogramVec, IntCounter,
    TextEncoder,
};

/// Stream connection state (1 = connected, 0 = otherwise).
pub static WS_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "punctual_ws_connected",
        "Ticker stream connection state (1=connected)"
    )
    .unwrap()
});

/// Labels: state (disconnected/connecting/connected/reconnecting)
pub static WS_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "punctual_ws_state",
        "Ticker stream state machine current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

pub static WS_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "punctual_ws_reconnect_total",
        "Total ticker stream reconnection attempts",
        &["reason"]
    )
    .unwrap()
});

/// Accepted feed updates. Labels: source (stream/snapshot/synthetic)
pub static FEED_TICKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "punctual_feed_ticks_total",
        "Price updates appended to the series",
        &["source"]
    )
    .unwrap()
});

pub static FEED_DUPLICATES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "punctual_feed_duplicates_total",
        "Price updates skipped because the spot price did not change"
    )
    .unwrap()
});

pub static SNAPSHOT_POLL_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "punctual_snapshot_poll_failures_total",
        "Failed REST snapshot polls"
    )
    .unwrap()
});

/// Age of an update when it reaches the feed loop.
pub static FEED_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "punctual_feed_latency_ms",
        "Update age on arrival in milliseconds",
        &["source"],
        vec![1.0, 5.0, 10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0]
    )
    .unwrap()
});

/// Labels: channel (spot/perp)
pub static LAST_PRICE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "punctual_last_price",
        "Most recent price per channel",
        &["channel"]
    )
    .unwrap()
});

pub static POSITION_PNL: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!("punctual_position_pnl", "Unrealized PnL of the open position").unwrap()
});

pub static POSITION_PNL_PERCENT: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "punctual_position_pnl_percent",
        "Unrealized PnL relative to margin, in percent"
    )
    .unwrap()
});

/// Labels: action (open/close), outcome (sent/rejected/insufficient_funds/reverted/failed/invalid)
pub static TRANSACTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "punctual_transactions_total",
        "Wallet transactions by action and outcome",
        &["action", "outcome"]
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    pub fn ws_connected() {
        WS_CONNECTED.set(1.0);
    }

    pub fn ws_disconnected() {
        WS_CONNECTED.set(0.0);
    }

    /// Set the active state to 1 and every other state to 0.
    pub fn ws_state_set(state: &str) {
        for s in &["disconnected", "connecting", "connected", "reconnecting"] {
            WS_STATE.with_label_values(&[s]).set(0.0);
        }
        WS_STATE.with_label_values(&[state]).set(1.0);
    }

    pub fn ws_reconnect(reason: &str) {
        WS_RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn feed_tick(source: &str) {
        FEED_TICKS_TOTAL.with_label_values(&[source]).inc();
    }

    pub fn feed_duplicate() {
        FEED_DUPLICATES_TOTAL.inc();
    }

    pub fn snapshot_poll_failed() {
        SNAPSHOT_POLL_FAILURES_TOTAL.inc();
    }

    pub fn feed_latency(source: &str, latency_ms: f64) {
        FEED_LATENCY_MS
            .with_label_values(&[source])
            .observe(latency_ms.max(0.0));
    }

    pub fn last_prices(spot: f64, perp: f64) {
        LAST_PRICE.with_label_values(&["spot"]).set(spot);
        LAST_PRICE.with_label_values(&["perp"]).set(perp);
    }

    pub fn position_pnl(pnl: f64, pnl_percent: f64) {
        POSITION_PNL.set(pnl);
        POSITION_PNL_PERCENT.set(pnl_percent);
    }

    pub fn transaction(action: &str, outcome: &str) {
        TRANSACTIONS_TOTAL
            .with_label_values(&[action, outcome])
            .inc();
    }

    /// Text exposition of every registered metric.
    pub fn render() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
