//! Bounded, ordered spot/perp price series.

use punctual_core::{PriceChange, PricePoint};
use std::collections::VecDeque;

/// Points kept for the chart and PnL display.
pub const DEFAULT_SERIES_CAPACITY: usize = 100;

/// Time-ordered price points, oldest first, never more than `capacity`.
///
/// Only changes are recorded: a point whose spot price is bit-identical to
/// the newest point is dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    points: VecDeque<PricePoint>,
    capacity: usize,
}

impl Default for PriceSeries {
    fn default() -> Self {
        Self::new(DEFAULT_SERIES_CAPACITY)
    }
}

impl PriceSeries {
    /// A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.back()
    }

    pub fn previous(&self) -> Option<&PricePoint> {
        self.points.len().checked_sub(2).and_then(|i| self.points.get(i))
    }

    /// Whether `spot_price` would be skipped as unchanged.
    pub fn is_duplicate(&self, spot_price: f64) -> bool {
        self.latest()
            .is_some_and(|last| last.spot_price.to_bits() == spot_price.to_bits())
    }

    /// Append `point` unless it repeats the latest spot price. Evicts the
    /// oldest point when full. Returns whether the point was appended.
    pub fn push(&mut self, point: PricePoint) -> bool {
        if self.is_duplicate(point.spot_price) {
            return false;
        }
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
        true
    }

    /// Replace the contents with the newest `capacity` points of `history`.
    ///
    /// `history` is expected oldest first; it is taken as-is, duplicates
    /// included, since candles at different times may share a close.
    pub fn bootstrap(&mut self, history: impl IntoIterator<Item = PricePoint>) {
        self.points.clear();
        for point in history {
            if self.points.len() == self.capacity {
                self.points.pop_front();
            }
            self.points.push_back(point);
        }
    }

    /// Change between the two newest points.
    pub fn price_change(&self) -> PriceChange {
        match (self.previous(), self.latest()) {
            (Some(prev), Some(latest)) => PriceChange::between(prev, latest),
            _ => PriceChange::default(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PricePoint> {
        self.points.iter()
    }

    pub fn to_vec(&self) -> Vec<PricePoint> {
        self.points.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(ts: i64, spot: f64) -> PricePoint {
        PricePoint::new(ts, spot, spot + 5.0, 1.0)
    }

    #[test]
    fn test_evicts_oldest_at_capacity() {
        let mut series = PriceSeries::new(100);
        for i in 0..101 {
            assert!(series.push(point(i, 1_000.0 + i as f64)));
        }
        assert_eq!(series.len(), 100);
        assert_eq!(series.iter().next().unwrap().timestamp, 1);
        assert_eq!(series.latest().unwrap().timestamp, 100);
    }

    #[test]
    fn test_len_never_exceeds_capacity() {
        let mut series = PriceSeries::new(3);
        for i in 0..50 {
            series.push(point(i, i as f64));
            assert!(series.len() <= 3);
        }
    }

    #[test]
    fn test_skips_unchanged_spot() {
        let mut series = PriceSeries::default();
        assert!(series.push(point(1, 100.0)));
        assert!(!series.push(point(2, 100.0)));
        assert_eq!(series.len(), 1);
        assert!(series.push(point(3, 100.5)));
        // Only the newest point counts, returning to an older price is a change.
        assert!(series.push(point(4, 100.0)));
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn test_bootstrap_keeps_newest() {
        let mut series = PriceSeries::new(2);
        series.push(point(0, 1.0));
        series.bootstrap((10..15).map(|i| point(i, 7.0)));
        assert_eq!(series.len(), 2);
        assert_eq!(
            series.to_vec().iter().map(|p| p.timestamp).collect::<Vec<_>>(),
            vec![13, 14]
        );
    }

    #[test]
    fn test_price_change_between_newest_two() {
        let mut series = PriceSeries::default();
        assert_eq!(series.price_change(), PriceChange::default());
        series.push(point(1, 100.0));
        assert_eq!(series.price_change(), PriceChange::default());
        series.push(point(2, 102.0));
        let change = series.price_change();
        assert!((change.spot_pct - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let mut series = PriceSeries::new(0);
        series.push(point(1, 1.0));
        series.push(point(2, 2.0));
        assert_eq!(series.capacity(), 1);
        assert_eq!(series.len(), 1);
    }
}
