//! Perp price model.
//!
//! The exchange contract has no public perp ticker, so the terminal derives
//! the perp channel from spot. `MirrorSpot` is the honest default;
//! `SimulatedBasis` adds noise and a slow sine trend for demos.

use crate::error::{FeedError, FeedResult};
use crate::synthetic::{check_jitter, sample_jitter};
use rand::Rng;
use serde::{Deserialize, Serialize};

fn default_jitter() -> f64 {
    100.0
}

fn default_trend_amplitude() -> f64 {
    20.0
}

fn default_trend_period_ms() -> f64 {
    10_000.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum PerpPricer {
    /// perp = spot.
    #[default]
    MirrorSpot,
    /// perp = spot + U(-jitter/2, jitter/2) + sin(t / period) * amplitude.
    SimulatedBasis {
        #[serde(default = "default_jitter")]
        jitter: f64,
        #[serde(default = "default_trend_amplitude")]
        trend_amplitude: f64,
        #[serde(default = "default_trend_period_ms")]
        trend_period_ms: f64,
    },
}

impl PerpPricer {
    pub fn simulated() -> Self {
        Self::SimulatedBasis {
            jitter: default_jitter(),
            trend_amplitude: default_trend_amplitude(),
            trend_period_ms: default_trend_period_ms(),
        }
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self, Self::SimulatedBasis { .. })
    }

    pub fn validate(&self) -> FeedResult<()> {
        if let Self::SimulatedBasis {
            jitter,
            trend_amplitude,
            trend_period_ms,
        } = *self
        {
            check_jitter("perp.jitter", jitter)?;
            check_jitter("perp.trend_amplitude", trend_amplitude)?;
            if !(trend_period_ms.is_finite() && trend_period_ms >= 0.0) {
                return Err(FeedError::InvalidData(format!(
                    "perp.trend_period_ms must be finite and non-negative, got {trend_period_ms}"
                )));
            }
        }
        Ok(())
    }

    /// Perp price for a spot observation at `timestamp_ms`.
    pub fn price<R: Rng + ?Sized>(&self, spot: f64, timestamp_ms: i64, rng: &mut R) -> f64 {
        match *self {
            Self::MirrorSpot => spot,
            Self::SimulatedBasis {
                jitter,
                trend_amplitude,
                trend_period_ms,
            } => {
                let noise = sample_jitter(rng, jitter.abs() / 2.0);
                let trend = if trend_period_ms > 0.0 {
                    (timestamp_ms as f64 / trend_period_ms).sin() * trend_amplitude
                } else {
                    0.0
                };
                spot + noise + trend
            }
        }
    }
}
