//! Prometheus metrics and structured logging for the punctual terminal.
//!
//! - Prometheus metrics for the price feed, stream connection and trades
//! - Structured logging with tracing (JSON in production, pretty otherwise)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, LogFormat};
pub use metrics::Metrics;
