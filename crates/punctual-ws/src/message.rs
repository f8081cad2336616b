//! Ticker stream messages.

use crate::error::{WsError, WsResult};
use punctual_core::now_ms;
use serde::{Deserialize, Serialize};

/// Raw 24h ticker event as pushed by the exchange stream.
///
/// Only the fields the terminal uses are decoded.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerMessage {
    #[serde(rename = "e", default)]
    pub event_type: String,
    #[serde(rename = "E", default)]
    pub event_time: Option<i64>,
    #[serde(rename = "s", default)]
    pub symbol: String,
    /// Last price.
    #[serde(rename = "c")]
    pub last_price: String,
    /// Base asset volume.
    #[serde(rename = "v", default)]
    pub volume: Option<String>,
}

/// One price tick from the stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StreamTick {
    pub price: f64,
    pub volume: f64,
    pub event_time_ms: i64,
}

impl TickerMessage {
    pub fn to_tick(&self) -> WsResult<StreamTick> {
        let price: f64 = self
            .last_price
            .parse()
            .map_err(|_| WsError::ParseError(format!("price {:?}", self.last_price)))?;
        if !price.is_finite() || price <= 0.0 {
            return Err(WsError::ParseError(format!("price {price}")));
        }

        let volume = match &self.volume {
            Some(v) => v
                .parse::<f64>()
                .map_err(|_| WsError::ParseError(format!("volume {v:?}")))?,
            None => 0.0,
        };

        Ok(StreamTick {
            price,
            volume,
            event_time_ms: self.event_time.unwrap_or_else(now_ms),
        })
    }
}

/// Parse one text frame into a tick.
pub fn parse_ticker(text: &str) -> WsResult<StreamTick> {
    let msg: TickerMessage = serde_json::from_str(text)?;
    msg.to_tick()
}

/// Stream endpoint for `symbol`, e.g. `wss://host/ws/btcusdt@ticker`.
pub fn ticker_stream_url(base: &str, symbol: &str) -> String {
    format!(
        "{}/{}@ticker",
        base.trim_end_matches('/'),
        symbol.to_lowercase()
    )
}
