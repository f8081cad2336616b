//! Shared fakes for feed integration tests.

#![allow(dead_code)]

use punctual_feed::{FeedError, FeedResult, Kline, PriceSnapshot, SnapshotSource, Timeframe};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Snapshot source that replays scripted prices, then repeats the last.
pub struct FakeSource {
    prices: Mutex<VecDeque<f64>>,
    last: Mutex<Option<f64>>,
    klines: Vec<Kline>,
    fail: bool,
    calls: AtomicU32,
}

impl FakeSource {
    pub fn constant(price: f64) -> Self {
        Self::scripted(vec![price])
    }

    pub fn scripted(prices: Vec<f64>) -> Self {
        Self {
            prices: Mutex::new(prices.into()),
            last: Mutex::new(None),
            klines: Vec::new(),
            fail: false,
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::scripted(Vec::new())
        }
    }

    pub fn with_klines(mut self, klines: Vec<Kline>) -> Self {
        self.klines = klines;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn kline(open_time_ms: i64, close: f64) -> Kline {
    Kline {
        open_time_ms,
        open: close,
        high: close,
        low: close,
        close,
        volume: 1.0,
    }
}

impl SnapshotSource for FakeSource {
    async fn fetch_snapshot(&self, symbol: &str) -> FeedResult<PriceSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(FeedError::Network("connection refused".to_string()));
        }
        let next = self.prices.lock().unwrap().pop_front();
        let price = {
            let mut last = self.last.lock().unwrap();
            if let Some(p) = next {
                *last = Some(p);
            }
            (*last).ok_or_else(|| FeedError::Network("no price".to_string()))?
        };
        Ok(PriceSnapshot {
            symbol: symbol.to_string(),
            price,
            fetched_at_ms: punctual_core::now_ms(),
        })
    }

    async fn fetch_klines(
        &self,
        _symbol: &str,
        _timeframe: Timeframe,
        limit: u16,
    ) -> FeedResult<Vec<Kline>> {
        if self.fail {
            return Err(FeedError::Network("connection refused".to_string()));
        }
        let skip = self.klines.len().saturating_sub(usize::from(limit));
        Ok(self.klines[skip..].to_vec())
    }
}
