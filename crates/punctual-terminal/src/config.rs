//! Application configuration.
//!
//! Layers, lowest first: built-in defaults, an optional TOML file, then
//! `PUNCTUAL__*` environment variables (`PUNCTUAL__FEED__SNAPSHOT_INTERVAL_MS`).

use crate::error::{AppError, AppResult};
use config::{Config, Environment, File, FileFormat};
use punctual_chart::{ChartStyle, Viewport};
use punctual_contract::{Address, Chain, DEFAULT_CONTRACT_ADDRESS};
use punctual_feed::{FeedConfig, Timeframe};
use punctual_telemetry::LogFormat;
use punctual_ws::{ticker_stream_url, ConnectionConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file used when neither `--config` nor `PUNCTUAL_CONFIG` is set.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "PUNCTUAL_CONFIG";

const ENV_PREFIX: &str = "PUNCTUAL";

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}

fn default_rest_url() -> String {
    "https://api.binance.com".to_string()
}

fn default_stream_url() -> String {
    "wss://stream.binance.com:9443/ws".to_string()
}

/// Ticker stream reconnection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WsConfig {
    /// Fixed delay before reconnecting (ms). Default: 3000.
    pub reconnect_delay_ms: u64,
    /// Give up after this many failed attempts (0 = never).
    pub max_reconnect_attempts: u32,
    /// Reconnect when the stream is silent this long (ms, 0 = never).
    pub activity_timeout_ms: u64,
}

impl Default for WsConfig {
    fn default() -> Self {
        let defaults = ConnectionConfig::default();
        Self {
            reconnect_delay_ms: defaults.reconnect_delay_ms,
            max_reconnect_attempts: defaults.max_reconnect_attempts,
            activity_timeout_ms: defaults.activity_timeout_ms,
        }
    }
}

/// Wallet endpoint and exchange contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Wallet JSON-RPC endpoint.
    pub rpc_url: String,
    /// Exchange contract address.
    pub address: String,
    /// Account to use instead of the wallet's first account.
    pub account: Option<String>,
    /// Chain requested by `chain --switch`.
    pub chain: Chain,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            account: None,
            chain: Chain::default(),
        }
    }
}

/// Position polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    /// Re-read period while an address is known (ms). Default: 5000.
    pub refresh_interval_ms: u64,
    /// Delay before re-reading after a close (ms). Default: 2000.
    pub close_recheck_delay_ms: u64,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 5_000,
            close_recheck_delay_ms: 2_000,
        }
    }
}

impl PositionConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }

    pub fn close_recheck_delay(&self) -> Duration {
        Duration::from_millis(self.close_recheck_delay_ms)
    }
}

/// Chart output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub width: f64,
    pub height: f64,
    /// How often `watch --svg` rewrites the file (ms).
    pub svg_interval_ms: u64,
    pub style: ChartStyle,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 400.0,
            svg_interval_ms: 5_000,
            style: ChartStyle::default(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_format: LogFormat,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Traded pair, e.g. "BTCUSDT".
    pub symbol: String,
    /// REST API base for snapshots and klines.
    pub rest_url: String,
    /// Stream base; the ticker path is appended.
    pub stream_url: String,
    /// Candle size for the history bootstrap.
    pub timeframe: Timeframe,
    pub feed: FeedConfig,
    pub websocket: WsConfig,
    pub contract: ContractConfig,
    pub position: PositionConfig,
    pub chart: ChartConfig,
    pub telemetry: TelemetryConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            rest_url: default_rest_url(),
            stream_url: default_stream_url(),
            timeframe: Timeframe::default(),
            feed: FeedConfig::default(),
            websocket: WsConfig::default(),
            contract: ContractConfig::default(),
            position: PositionConfig::default(),
            chart: ChartConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Resolve the config file path: CLI arg > `PUNCTUAL_CONFIG` > default.
    pub fn resolve_path(cli: Option<String>) -> String {
        cli.or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load defaults, then `path` if it exists, then environment overrides.
    pub fn load(path: &str) -> AppResult<Self> {
        if !Path::new(path).exists() {
            tracing::warn!(path, "Config file not found, using defaults");
        }

        let settings = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a single TOML file, without environment overrides.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.symbol.trim().is_empty() {
            return Err(AppError::Config("symbol must not be empty".to_string()));
        }
        if self.feed.series_capacity == 0 {
            return Err(AppError::Config(
                "feed.series_capacity must be at least 1".to_string(),
            ));
        }
        self.feed.validate()?;
        self.contract_address()?;
        self.account()?;
        self.viewport()?;
        Ok(())
    }

    /// Feed settings with the top-level symbol and timeframe applied.
    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            symbol: self.symbol.clone(),
            timeframe: self.timeframe,
            ..self.feed.clone()
        }
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            url: ticker_stream_url(&self.stream_url, &self.symbol),
            reconnect_delay_ms: self.websocket.reconnect_delay_ms,
            max_reconnect_attempts: self.websocket.max_reconnect_attempts,
            activity_timeout_ms: self.websocket.activity_timeout_ms,
        }
    }

    pub fn contract_address(&self) -> AppResult<Address> {
        parse_address("contract.address", &self.contract.address)
    }

    /// Configured account override, if any.
    pub fn account(&self) -> AppResult<Option<Address>> {
        self.contract
            .account
            .as_deref()
            .map(|a| parse_address("contract.account", a))
            .transpose()
    }

    pub fn viewport(&self) -> AppResult<Viewport> {
        Ok(Viewport::new(self.chart.width, self.chart.height)?)
    }
}

fn parse_address(field: &str, value: &str) -> AppResult<Address> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{field}: invalid address {value:?}")))
}
