//! Core domain types for the punctual perpetual terminal.
//!
//! This crate provides the types shared by the feed, chart, contract and
//! terminal crates:
//! - `PricePoint`, `PriceChange`: one sample of the spot/perp price series
//! - `Scale`: exact fixed-point conversions at the contract boundary
//! - `Position`, `Pnl`: the externally owned position and its unrealized PnL
//! - `OpenOrder`: trade form input with pre-flight validation

pub mod error;
pub mod order;
pub mod position;
pub mod scale;
pub mod types;

pub use error::{CoreError, Result, ValidationError};
pub use order::{OpenOrder, LIQUIDATION_MARGIN_RATIO, MAX_LEVERAGE, MIN_LEVERAGE};
pub use position::{compute_pnl, Direction, Pnl, Position, RawPosition};
pub use scale::{Scale, AMOUNT_DECIMALS, PRICE_DECIMALS};
pub use types::{now_ms, PriceChange, PricePoint};
