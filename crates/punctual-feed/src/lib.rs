//! Live spot/perp price feed for the punctual terminal.
//!
//! Merges three producers into one bounded price series:
//! - REST snapshots polled on a fixed period (`RestPriceClient`)
//! - Pushed ticks from the ticker stream (`punctual-ws`)
//! - Synthetic ticks while market data is quiet (`SyntheticGenerator`)
//!
//! Every producer sends source-tagged `PriceUpdate`s into one channel. A
//! single task owns the `FeedState` and publishes `FeedSnapshot`s on a
//! `watch` channel for the chart and PnL consumers.

pub mod error;
pub mod feed;
pub mod perp;
pub mod rest;
pub mod scheduler;
pub mod series;
pub mod source;
pub mod synthetic;
pub mod timeframe;

pub use error::{FeedError, FeedResult};
pub use feed::{
    ApplyOutcome, FeedConfig, FeedHandle, FeedSnapshot, FeedState, PriceFeed, PriceUpdate,
    SourceCounts, TickSource,
};
pub use perp::PerpPricer;
pub use rest::{parse_kline_row, Kline, PriceSnapshot, RestPriceClient};
pub use scheduler::ScheduledTask;
pub use series::{PriceSeries, DEFAULT_SERIES_CAPACITY};
pub use source::SnapshotSource;
pub use synthetic::{FallbackConfig, FallbackGate, FallbackMode, SyntheticGenerator};
pub use timeframe::Timeframe;
