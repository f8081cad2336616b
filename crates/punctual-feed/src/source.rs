//! Pull side of the price source.

use crate::error::FeedResult;
use crate::rest::{Kline, PriceSnapshot};
use crate::timeframe::Timeframe;
use std::future::Future;

/// Anything that can answer "what is the price now" and serve history.
///
/// `RestPriceClient` is the production implementation; the feed loop is
/// generic over this trait so tests can drive it with fakes.
pub trait SnapshotSource: Send + Sync + 'static {
    fn fetch_snapshot(
        &self,
        symbol: &str,
    ) -> impl Future<Output = FeedResult<PriceSnapshot>> + Send;

    /// Candles oldest first, at most `limit` of them.
    fn fetch_klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: u16,
    ) -> impl Future<Output = FeedResult<Vec<Kline>>> + Send;
}
