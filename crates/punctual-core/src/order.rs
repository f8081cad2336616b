//! Trade form input and pre-flight validation.

use crate::error::ValidationError;
use crate::position::Direction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lowest leverage the trade form accepts.
pub const MIN_LEVERAGE: u32 = 1;

/// Highest leverage the trade form accepts.
pub const MAX_LEVERAGE: u32 = 10;

/// Fraction of margin that can be lost before liquidation.
pub const LIQUIDATION_MARGIN_RATIO: Decimal = Decimal::from_parts(8, 0, 0, false, 1);

/// An order to open a position, as entered on the trade form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrder {
    /// Margin in the chain's native unit.
    pub margin: Decimal,
    pub leverage: u32,
    pub direction: Direction,
}

impl OpenOrder {
    /// Build an order and validate it.
    pub fn new(
        margin: Decimal,
        leverage: u32,
        direction: Direction,
    ) -> Result<Self, ValidationError> {
        let order = Self {
            margin,
            leverage,
            direction,
        };
        order.validate()?;
        Ok(order)
    }

    /// Build an order from the raw margin text of the form.
    pub fn parse(
        margin: &str,
        leverage: u32,
        direction: Direction,
    ) -> Result<Self, ValidationError> {
        let trimmed = margin.trim();
        let margin = Decimal::from_str(trimmed)
            .map_err(|_| ValidationError::InvalidMargin(trimmed.to_string()))?;
        Self::new(margin, leverage, direction)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.margin <= Decimal::ZERO {
            return Err(ValidationError::InvalidMargin(self.margin.to_string()));
        }
        if !(MIN_LEVERAGE..=MAX_LEVERAGE).contains(&self.leverage) {
            return Err(ValidationError::LeverageOutOfRange {
                value: self.leverage,
                min: MIN_LEVERAGE,
                max: MAX_LEVERAGE,
            });
        }
        Ok(())
    }

    /// Notional size: margin × leverage.
    #[inline]
    pub fn position_size(&self) -> Decimal {
        self.margin * Decimal::from(self.leverage)
    }

    /// Estimated liquidation price for a fill at `entry_price`.
    ///
    /// Longs liquidate below entry, shorts above.
    pub fn liquidation_price(&self, entry_price: Decimal) -> Decimal {
        let leverage = Decimal::from(self.leverage.max(MIN_LEVERAGE));
        let distance = LIQUIDATION_MARGIN_RATIO / leverage;
        match self.direction {
            Direction::Long => entry_price * (Decimal::ONE - distance),
            Direction::Short => entry_price * (Decimal::ONE + distance),
        }
    }
}
