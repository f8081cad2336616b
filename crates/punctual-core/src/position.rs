//! Externally owned position and unrealized PnL.
//!
//! The position is read from the perp contract and never mutated locally;
//! this module only converts it out of fixed point and prices it.

use crate::error::{CoreError, Result};
use crate::scale::Scale;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    #[inline]
    pub fn from_is_long(is_long: bool) -> Self {
        if is_long {
            Self::Long
        } else {
            Self::Short
        }
    }

    #[inline]
    pub fn is_long(&self) -> bool {
        matches!(self, Self::Long)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

/// Position exactly as returned by `getUserPosition`, still in fixed point.
///
/// Field order follows the contract's return tuple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawPosition {
    /// Entry price, 8 decimals.
    pub entry_price: u128,
    pub leverage: u64,
    /// Open time (Unix seconds).
    pub timestamp: u64,
    /// Margin, 18 decimals.
    pub margin: u128,
    /// Notional size, 18 decimals.
    pub size: u128,
    pub is_long: bool,
    /// Quantity, 18 decimals.
    pub quantity: u128,
}

/// Position in human units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub entry_price: Decimal,
    pub margin: Decimal,
    pub leverage: u32,
    pub opened_at: DateTime<Utc>,
    pub size: Decimal,
    pub direction: Direction,
    pub quantity: Decimal,
}

impl Position {
    /// Convert a raw contract position, applying the price and amount scales.
    pub fn from_raw(raw: RawPosition) -> Result<Self> {
        let leverage = u32::try_from(raw.leverage)
            .map_err(|_| CoreError::InvalidAmount(format!("leverage {} too large", raw.leverage)))?;
        let secs = i64::try_from(raw.timestamp)
            .map_err(|_| CoreError::InvalidAmount(format!("timestamp {}", raw.timestamp)))?;
        let opened_at = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| CoreError::InvalidAmount(format!("timestamp {secs}")))?;

        Ok(Self {
            entry_price: Scale::Price.to_decimal(raw.entry_price)?,
            margin: Scale::Amount.to_decimal(raw.margin)?,
            leverage,
            opened_at,
            size: Scale::Amount.to_decimal(raw.size)?,
            direction: Direction::from_is_long(raw.is_long),
            quantity: Scale::Amount.to_decimal(raw.quantity)?,
        })
    }

    /// A zero-size position means there is nothing open.
    #[inline]
    pub fn is_open(&self) -> bool {
        !self.size.is_zero()
    }

    /// Unrealized PnL at `current_price`.
    pub fn unrealized_pnl(&self, current_price: f64) -> Pnl {
        compute_pnl(
            self.direction,
            self.entry_price.to_f64().unwrap_or(0.0),
            self.size.to_f64().unwrap_or(0.0),
            self.margin.to_f64().unwrap_or(0.0),
            current_price,
        )
    }
}

/// Unrealized profit and loss.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pnl {
    /// PnL in quote units.
    pub pnl: f64,
    /// PnL relative to margin, in percent.
    pub pnl_percent: f64,
}

/// PnL of a position of `size` opened at `entry_price`, priced at `current_price`.
///
/// `pnl_percent` is relative to `margin` and is 0 when there is no margin.
pub fn compute_pnl(
    direction: Direction,
    entry_price: f64,
    size: f64,
    margin: f64,
    current_price: f64,
) -> Pnl {
    if entry_price <= 0.0 {
        return Pnl::default();
    }

    let pnl = match direction {
        Direction::Long => (current_price - entry_price) / entry_price * size,
        Direction::Short => (entry_price - current_price) / entry_price * size,
    };
    let pnl_percent = if margin > 0.0 {
        pnl / margin * 100.0
    } else {
        0.0
    };

    Pnl { pnl, pnl_percent }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const E18: u128 = 1_000_000_000_000_000_000;
    const E8: u128 = 100_000_000;

    fn raw_long() -> RawPosition {
        RawPosition {
            entry_price: 100 * E8,
            leverage: 2,
            timestamp: 1_700_000_000,
            margin: 5 * E18,
            size: 10 * E18,
            is_long: true,
            quantity: E18 / 10,
        }
    }

    #[test]
    fn test_long_pnl_scenario() {
        let pnl = compute_pnl(Direction::Long, 100.0, 10.0, 5.0, 110.0);
        assert!((pnl.pnl - 1.0).abs() < 1e-9);
        assert!((pnl.pnl_percent - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_pnl_sign_follows_direction() {
        assert!(compute_pnl(Direction::Long, 100.0, 10.0, 5.0, 120.0).pnl > 0.0);
        assert!(compute_pnl(Direction::Long, 100.0, 10.0, 5.0, 80.0).pnl < 0.0);
        assert!(compute_pnl(Direction::Short, 100.0, 10.0, 5.0, 80.0).pnl > 0.0);
        assert!(compute_pnl(Direction::Short, 100.0, 10.0, 5.0, 120.0).pnl < 0.0);
    }

    #[test]
    fn test_zero_margin_percent_is_zero() {
        let pnl = compute_pnl(Direction::Long, 100.0, 10.0, 0.0, 110.0);
        assert!(pnl.pnl > 0.0);
        assert_eq!(pnl.pnl_percent, 0.0);
    }

    #[test]
    fn test_zero_entry_price_yields_zero() {
        assert_eq!(
            compute_pnl(Direction::Short, 0.0, 10.0, 5.0, 110.0),
            Pnl::default()
        );
    }

    #[test]
    fn test_from_raw_applies_scales() {
        let position = Position::from_raw(raw_long()).unwrap();
        assert_eq!(position.entry_price, dec!(100));
        assert_eq!(position.margin, dec!(5));
        assert_eq!(position.size, dec!(10));
        assert_eq!(position.quantity, dec!(0.1));
        assert_eq!(position.leverage, 2);
        assert_eq!(position.direction, Direction::Long);
        assert_eq!(position.opened_at.timestamp(), 1_700_000_000);
        assert!(position.is_open());
    }

    #[test]
    fn test_from_raw_pnl_matches_float_math() {
        let position = Position::from_raw(raw_long()).unwrap();
        let pnl = position.unrealized_pnl(110.0);
        assert!((pnl.pnl - 1.0).abs() < 1e-9);
        assert!((pnl.pnl_percent - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_position_not_open() {
        let position = Position::from_raw(RawPosition::default()).unwrap();
        assert!(!position.is_open());
    }
}
