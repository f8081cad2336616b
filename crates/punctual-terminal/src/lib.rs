//! Punctual perpetual trading terminal.
//!
//! Wires the crates together:
//! - Live spot/perp feed and chart output (`watch`)
//! - Position reads and PnL (`PositionMonitor`)
//! - Pre-flight checked open/close transactions (`TradeDesk`)

pub mod app;
pub mod config;
pub mod display;
pub mod error;
pub mod monitor;
pub mod trade;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use monitor::PositionMonitor;
pub use trade::{Notification, NotificationKind, TradeDesk};
