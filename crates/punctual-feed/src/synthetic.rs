//! Synthetic fallback ticks.
//!
//! When no market data arrives the feed keeps the chart moving by
//! perturbing the last known prices. Synthetic points are always tagged so
//! consumers can tell them from market data.

use crate::error::{FeedError, FeedResult};
use punctual_core::PricePoint;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Price used when nothing is known yet.
pub const DEFAULT_SEED_PRICE: f64 = 107_000.0;

/// Largest accepted jitter half-width; the sampled range must stay finite.
pub const MAX_JITTER: f64 = f64::MAX / 4.0;

pub(crate) fn check_jitter(field: &str, value: f64) -> FeedResult<()> {
    if value.is_finite() && value.abs() <= MAX_JITTER {
        Ok(())
    } else {
        Err(FeedError::InvalidData(format!(
            "{field} must be finite and at most {MAX_JITTER:e}, got {value}"
        )))
    }
}

/// Uniform sample in `(-half_width, half_width)`, 0 when the width is unusable.
pub(crate) fn sample_jitter<R: Rng + ?Sized>(rng: &mut R, half_width: f64) -> f64 {
    if half_width > 0.0 && half_width <= MAX_JITTER {
        rng.gen_range(-half_width..half_width)
    } else {
        0.0
    }
}

/// When the fallback generator may emit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    Disabled,
    /// Only after `quiet_after_ms` without a stream tick or snapshot.
    #[default]
    WhenQuiet,
    /// On every interval, regardless of stream activity.
    Always,
}

fn default_interval_ms() -> u64 {
    2_000
}

fn default_quiet_after_ms() -> u64 {
    5_000
}

fn default_spot_jitter() -> f64 {
    10.0
}

fn default_perp_jitter() -> f64 {
    25.0
}

fn default_seed_price() -> f64 {
    DEFAULT_SEED_PRICE
}

/// Fallback generator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackConfig {
    #[serde(default)]
    pub mode: FallbackMode,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_quiet_after_ms")]
    pub quiet_after_ms: u64,
    /// Half-width of the uniform spot perturbation.
    #[serde(default = "default_spot_jitter")]
    pub spot_jitter: f64,
    /// Half-width of the uniform perp perturbation.
    #[serde(default = "default_perp_jitter")]
    pub perp_jitter: f64,
    #[serde(default = "default_seed_price")]
    pub seed_price: f64,
}

impl FallbackConfig {
    pub fn validate(&self) -> FeedResult<()> {
        check_jitter("fallback.spot_jitter", self.spot_jitter)?;
        check_jitter("fallback.perp_jitter", self.perp_jitter)?;
        if !(self.seed_price.is_finite() && self.seed_price > 0.0) {
            return Err(FeedError::InvalidData(format!(
                "fallback.seed_price must be positive, got {}",
                self.seed_price
            )));
        }
        Ok(())
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            mode: FallbackMode::default(),
            interval_ms: default_interval_ms(),
            quiet_after_ms: default_quiet_after_ms(),
            spot_jitter: default_spot_jitter(),
            perp_jitter: default_perp_jitter(),
            seed_price: default_seed_price(),
        }
    }
}

/// Decides on each fallback interval whether a synthetic point is due.
#[derive(Debug, Clone, Copy)]
pub struct FallbackGate {
    mode: FallbackMode,
    quiet_after: Duration,
}

impl FallbackGate {
    pub fn new(mode: FallbackMode, quiet_after: Duration) -> Self {
        Self { mode, quiet_after }
    }

    pub fn from_config(config: &FallbackConfig) -> Self {
        Self::new(config.mode, Duration::from_millis(config.quiet_after_ms))
    }

    pub fn mode(&self) -> FallbackMode {
        self.mode
    }

    pub fn should_emit(&self, last_real_tick: Option<Instant>, now: Instant) -> bool {
        match self.mode {
            FallbackMode::Disabled => false,
            FallbackMode::Always => true,
            FallbackMode::WhenQuiet => last_real_tick
                .map_or(true, |at| now.saturating_duration_since(at) >= self.quiet_after),
        }
    }
}

/// Produces jittered points around the last known prices.
#[derive(Debug)]
pub struct SyntheticGenerator {
    rng: StdRng,
    spot_jitter: f64,
    perp_jitter: f64,
    seed_price: f64,
}

impl SyntheticGenerator {
    pub fn new(config: &FallbackConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic generator for tests and replays.
    pub fn seeded(config: &FallbackConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &FallbackConfig, rng: StdRng) -> Self {
        Self {
            rng,
            spot_jitter: config.spot_jitter.abs(),
            perp_jitter: config.perp_jitter.abs(),
            seed_price: config.seed_price,
        }
    }

    fn jitter(&mut self, half_width: f64) -> f64 {
        sample_jitter(&mut self.rng, half_width)
    }

    /// Next synthetic point from the last known `(spot, perp)`.
    ///
    /// A missing or zero price falls back to the seed price.
    pub fn next_point(&mut self, last: Option<(f64, f64)>, timestamp_ms: i64) -> PricePoint {
        let (spot, perp) = last.unwrap_or((0.0, 0.0));
        let base_spot = if spot > 0.0 { spot } else { self.seed_price };
        let base_perp = if perp > 0.0 { perp } else { self.seed_price };

        let spot_price = base_spot + self.jitter(self.spot_jitter);
        let perp_price = base_perp + self.jitter(self.perp_jitter);
        let volume = self.rng.gen_range(0.0..1_000.0);

        PricePoint::new(timestamp_ms, spot_price, perp_price, volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FallbackConfig::default();
        assert_eq!(config.mode, FallbackMode::WhenQuiet);
        assert_eq!(config.interval_ms, 2_000);
        assert_eq!(config.quiet_after_ms, 5_000);
        assert_eq!(config.spot_jitter, 10.0);
        assert_eq!(config.perp_jitter, 25.0);
        assert_eq!(config.seed_price, 107_000.0);
    }

    #[test]
    fn test_points_stay_within_jitter() {
        let mut generator = SyntheticGenerator::seeded(&FallbackConfig::default(), 42);
        for i in 0..1_000 {
            let point = generator.next_point(Some((50_000.0, 50_100.0)), i);
            assert!((point.spot_price - 50_000.0).abs() <= 10.0);
            assert!((point.perp_price - 50_100.0).abs() <= 25.0);
            assert!((0.0..1_000.0).contains(&point.volume));
            assert_eq!(point.timestamp, i);
        }
    }

    #[test]
    fn test_seed_price_when_unknown() {
        let mut generator = SyntheticGenerator::seeded(&FallbackConfig::default(), 1);
        let point = generator.next_point(None, 0);
        assert!((point.spot_price - 107_000.0).abs() <= 10.0);
        assert!((point.perp_price - 107_000.0).abs() <= 25.0);

        let point = generator.next_point(Some((0.0, 0.0)), 0);
        assert!((point.spot_price - 107_000.0).abs() <= 10.0);
    }

    #[test]
    fn test_zero_jitter_repeats_prices() {
        let config = FallbackConfig {
            spot_jitter: 0.0,
            perp_jitter: 0.0,
            ..Default::default()
        };
        let mut generator = SyntheticGenerator::seeded(&config, 3);
        let point = generator.next_point(Some((10.0, 11.0)), 0);
        assert_eq!((point.spot_price, point.perp_price), (10.0, 11.0));
    }

    #[test]
    fn test_validate_rejects_unusable_jitter_and_seed() {
        assert!(FallbackConfig::default().validate().is_ok());

        let config: FallbackConfig = serde_json::from_str(r#"{"spot_jitter":1e308}"#).unwrap();
        assert!(matches!(config.validate(), Err(FeedError::InvalidData(_))));

        for bad in [f64::INFINITY, f64::NAN, -1e308] {
            let config = FallbackConfig {
                perp_jitter: bad,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "perp_jitter {bad} accepted");
        }

        for bad in [0.0, -5.0, f64::INFINITY] {
            let config = FallbackConfig {
                seed_price: bad,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "seed_price {bad} accepted");
        }
    }

    #[test]
    fn test_generator_never_panics_on_huge_jitter() {
        let config = FallbackConfig {
            spot_jitter: 1e308,
            perp_jitter: f64::INFINITY,
            ..Default::default()
        };
        let mut generator = SyntheticGenerator::seeded(&config, 5);
        let point = generator.next_point(Some((100.0, 101.0)), 0);
        assert_eq!((point.spot_price, point.perp_price), (100.0, 101.0));
    }

    #[test]
    fn test_gate_modes() {
        let now = Instant::now();
        let quiet = Duration::from_secs(5);
        let recent = Some(now - Duration::from_secs(1));
        let stale = Some(now - Duration::from_secs(6));

        let gate = FallbackGate::new(FallbackMode::WhenQuiet, quiet);
        assert!(gate.should_emit(None, now));
        assert!(!gate.should_emit(recent, now));
        assert!(gate.should_emit(stale, now));

        let gate = FallbackGate::new(FallbackMode::Always, quiet);
        assert!(gate.should_emit(recent, now));

        let gate = FallbackGate::new(FallbackMode::Disabled, quiet);
        assert!(!gate.should_emit(None, now));
        assert!(!gate.should_emit(stale, now));
    }

    #[test]
    fn test_mode_deserializes_snake_case() {
        let config: FallbackConfig =
            serde_json::from_str(r#"{"mode":"when_quiet","quiet_after_ms":1000}"#).unwrap();
        assert_eq!(config.mode, FallbackMode::WhenQuiet);
        assert_eq!(config.quiet_after_ms, 1000);
        assert_eq!(config.interval_ms, 2_000);
    }
}
