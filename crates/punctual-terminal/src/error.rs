//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] punctual_ws::WsError),

    #[error("Feed error: {0}")]
    Feed(#[from] punctual_feed::FeedError),

    #[error("Contract error: {0}")]
    Contract(#[from] punctual_contract::ContractError),

    #[error("Chart error: {0}")]
    Chart(#[from] punctual_chart::ChartError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] punctual_telemetry::TelemetryError),

    #[error(transparent)]
    Validation(#[from] punctual_core::ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
