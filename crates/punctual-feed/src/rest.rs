//! REST price snapshots and kline history.

use crate::error::{FeedError, FeedResult};
use crate::source::SnapshotSource;
use crate::timeframe::Timeframe;
use punctual_core::{now_ms, PricePoint};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Default timeout for REST requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest page the klines endpoint serves.
pub const MAX_KLINES_PER_REQUEST: u16 = 1_000;

/// Authoritative spot price at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    pub symbol: String,
    pub price: f64,
    pub fetched_at_ms: i64,
}

/// One OHLCV candle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kline {
    pub open_time_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Kline {
    /// Series point at the candle open, priced at the close.
    pub fn to_point(&self, perp_price: f64) -> PricePoint {
        PricePoint::new(self.open_time_ms, self.close, perp_price, self.volume)
    }
}

#[derive(Debug, Deserialize)]
struct TickerPriceWire {
    symbol: Option<String>,
    price: String,
}

fn ticker_price_endpoint(base_url: &str, symbol: &str) -> String {
    format!(
        "{}/api/v3/ticker/price?symbol={}",
        base_url.trim_end_matches('/'),
        symbol.to_ascii_uppercase()
    )
}

fn klines_endpoint(base_url: &str, symbol: &str, timeframe: Timeframe, limit: u16) -> String {
    format!(
        "{}/api/v3/klines?symbol={}&interval={}&limit={limit}",
        base_url.trim_end_matches('/'),
        symbol.to_ascii_uppercase(),
        timeframe.as_str()
    )
}

fn parse_number(value: &Value, field: &str) -> FeedResult<f64> {
    let parsed = match value {
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| FeedError::ParseError(format!("{field}: {s:?}")))?,
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| FeedError::ParseError(format!("{field}: {n}")))?,
        other => return Err(FeedError::ParseError(format!("{field}: {other}"))),
    };
    if !parsed.is_finite() {
        return Err(FeedError::InvalidData(format!("{field} is not finite")));
    }
    Ok(parsed)
}

/// Parse one `[open_time, open, high, low, close, volume, ...]` row.
pub fn parse_kline_row(row: &Value) -> FeedResult<Kline> {
    let fields = row
        .as_array()
        .ok_or_else(|| FeedError::ParseError("kline row is not an array".to_string()))?;
    if fields.len() < 6 {
        return Err(FeedError::ParseError(format!(
            "kline row has {} fields, expected at least 6",
            fields.len()
        )));
    }

    let open_time_ms = fields[0]
        .as_i64()
        .ok_or_else(|| FeedError::ParseError(format!("open_time: {}", fields[0])))?;

    Ok(Kline {
        open_time_ms,
        open: parse_number(&fields[1], "open")?,
        high: parse_number(&fields[2], "high")?,
        low: parse_number(&fields[3], "low")?,
        close: parse_number(&fields[4], "close")?,
        volume: parse_number(&fields[5], "volume")?,
    })
}

/// Client for the exchange's public REST API.
#[derive(Debug, Clone)]
pub struct RestPriceClient {
    client: Client,
    base_url: String,
}

impl RestPriceClient {
    /// Create a client for `base_url` (e.g. "https://api.binance.com").
    pub fn new(base_url: impl Into<String>) -> FeedResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| FeedError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> FeedResult<T> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Network(format!("HTTP {status}: {body}")));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Fetch the latest spot price.
    pub async fn fetch_snapshot(&self, symbol: &str) -> FeedResult<PriceSnapshot> {
        let url = ticker_price_endpoint(&self.base_url, symbol);
        let wire: TickerPriceWire = self.get_json(&url).await?;

        let price: f64 = wire
            .price
            .parse()
            .map_err(|_| FeedError::ParseError(format!("price: {:?}", wire.price)))?;
        if !price.is_finite() || price <= 0.0 {
            return Err(FeedError::InvalidData(format!("price {price}")));
        }
        debug!(symbol, price, "Fetched price snapshot");

        Ok(PriceSnapshot {
            symbol: wire.symbol.unwrap_or_else(|| symbol.to_ascii_uppercase()),
            price,
            fetched_at_ms: now_ms(),
        })
    }

    /// Fetch up to `limit` candles, oldest first.
    pub async fn fetch_klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: u16,
    ) -> FeedResult<Vec<Kline>> {
        let limit = limit.clamp(1, MAX_KLINES_PER_REQUEST);
        let url = klines_endpoint(&self.base_url, symbol, timeframe, limit);
        let rows: Vec<Value> = self.get_json(&url).await?;

        let mut klines = rows
            .iter()
            .map(parse_kline_row)
            .collect::<FeedResult<Vec<_>>>()?;
        klines.sort_unstable_by_key(|k| k.open_time_ms);
        klines.dedup_by_key(|k| k.open_time_ms);
        debug!(symbol, %timeframe, count = klines.len(), "Fetched klines");

        Ok(klines)
    }
}

impl SnapshotSource for RestPriceClient {
    async fn fetch_snapshot(&self, symbol: &str) -> FeedResult<PriceSnapshot> {
        RestPriceClient::fetch_snapshot(self, symbol).await
    }

    async fn fetch_klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: u16,
    ) -> FeedResult<Vec<Kline>> {
        RestPriceClient::fetch_klines(self, symbol, timeframe, limit).await
    }
}
