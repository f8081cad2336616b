//! Price series data types.
//!
//! A `PricePoint` is one sample of the spot/perp pair. Points are immutable
//! once created; the series that holds them lives in punctual-feed.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Current wall-clock time in Unix milliseconds.
#[inline]
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// One sample of the price series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    /// Sample time (Unix ms).
    pub timestamp: i64,
    /// Spot price from the exchange.
    pub spot_price: f64,
    /// Perp price tracked by the contract.
    pub perp_price: f64,
    /// Traded volume attached to the sample.
    pub volume: f64,
}

impl PricePoint {
    /// Create a new price point.
    #[inline]
    pub fn new(timestamp: i64, spot_price: f64, perp_price: f64, volume: f64) -> Self {
        Self {
            timestamp,
            spot_price,
            perp_price,
            volume,
        }
    }

    /// Smallest of the two channel prices.
    #[inline]
    pub fn low(&self) -> f64 {
        self.spot_price.min(self.perp_price)
    }

    /// Largest of the two channel prices.
    #[inline]
    pub fn high(&self) -> f64 {
        self.spot_price.max(self.perp_price)
    }
}

/// Percentage change of each channel between two consecutive points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    /// Spot change in percent.
    pub spot_pct: f64,
    /// Perp change in percent.
    pub perp_pct: f64,
}

impl PriceChange {
    /// Change from `previous` to `latest`.
    ///
    /// A channel whose previous price is zero reports 0%.
    pub fn between(previous: &PricePoint, latest: &PricePoint) -> Self {
        Self {
            spot_pct: pct_change(previous.spot_price, latest.spot_price),
            perp_pct: pct_change(previous.perp_price, latest.perp_price),
        }
    }
}

fn pct_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        return 0.0;
    }
    (to - from) / from * 100.0
}
