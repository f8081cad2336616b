//! Fixed-point conversions at the contract boundary.
//!
//! The perp contract stores prices with 8 decimals and margin/size/quantity
//! with 18 decimals. Raw integers are converted through `rust_decimal` so the
//! scale boundary is exact; floats are only produced once the value is in
//! human units.

use crate::error::{CoreError, Result};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Decimals used for prices on the contract (1e8).
pub const PRICE_DECIMALS: u32 = 8;

/// Decimals used for margin, size, quantity and native value (1e18).
pub const AMOUNT_DECIMALS: u32 = 18;

/// Fixed-point scale of a contract quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    /// Prices, 8 decimals.
    Price,
    /// Margin, size, quantity and wei value, 18 decimals.
    Amount,
}

impl Scale {
    /// Number of decimals for this scale.
    #[inline]
    pub const fn decimals(self) -> u32 {
        match self {
            Self::Price => PRICE_DECIMALS,
            Self::Amount => AMOUNT_DECIMALS,
        }
    }

    /// `10^decimals` as a decimal.
    #[inline]
    pub fn factor(self) -> Decimal {
        Decimal::from_i128_with_scale(10i128.pow(self.decimals()), 0)
    }

    /// Convert a raw fixed-point integer into human units, exactly.
    pub fn to_decimal(self, raw: u128) -> Result<Decimal> {
        let mantissa = i128::try_from(raw)
            .map_err(|_| CoreError::ScaleOverflow(format!("{raw} exceeds i128")))?;
        Decimal::try_from_i128_with_scale(mantissa, self.decimals())
            .map(|d| d.normalize())
            .map_err(|_| CoreError::ScaleOverflow(format!("{raw} exceeds decimal precision")))
    }

    /// Convert a raw fixed-point integer into a float in human units.
    pub fn to_f64(self, raw: u128) -> Result<f64> {
        let value = self.to_decimal(raw)?;
        value
            .to_f64()
            .ok_or_else(|| CoreError::ScaleOverflow(format!("{value} not representable as f64")))
    }

    /// Convert a human-unit decimal into a raw fixed-point integer.
    ///
    /// Digits beyond the scale are floored.
    pub fn from_decimal(self, value: Decimal) -> Result<u128> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(CoreError::InvalidAmount(format!("{value} is negative")));
        }
        let mut scaled = value
            .checked_mul(self.factor())
            .ok_or_else(|| CoreError::ScaleOverflow(format!("{value} * 1e{}", self.decimals())))?
            .floor();
        scaled.rescale(0);
        u128::try_from(scaled.mantissa())
            .map_err(|_| CoreError::InvalidAmount(format!("{value} is negative")))
    }

    /// Convert a float in human units into a raw fixed-point integer.
    pub fn from_f64(self, value: f64) -> Result<u128> {
        if !value.is_finite() {
            return Err(CoreError::InvalidAmount(format!("{value} is not finite")));
        }
        let decimal = Decimal::from_f64(value)
            .ok_or_else(|| CoreError::InvalidAmount(format!("{value} out of decimal range")))?;
        self.from_decimal(decimal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_scale_roundtrip() {
        for price in [107_123.45_f64, 0.01, 1.0, 64_250.5] {
            let raw = Scale::Price.from_f64(price).unwrap();
            let back = Scale::Price.to_f64(raw).unwrap();
            assert!((back - price).abs() < 1e-7, "{price} -> {raw} -> {back}");
        }
    }

    #[test]
    fn test_price_scale_floors_extra_digits() {
        // 8 decimals kept, the 9th is dropped
        let raw = Scale::Price.from_decimal(dec!(100.123456789)).unwrap();
        assert_eq!(raw, 10_012_345_678);
    }

    #[test]
    fn test_amount_scale_exact() {
        let raw = 1_500_000_000_000_000_000u128;
        assert_eq!(Scale::Amount.to_decimal(raw).unwrap(), dec!(1.5));
        assert_eq!(Scale::Amount.from_decimal(dec!(1.5)).unwrap(), raw);
    }

    #[test]
    fn test_zero_converts_to_zero() {
        assert_eq!(Scale::Amount.to_decimal(0).unwrap(), Decimal::ZERO);
        assert_eq!(Scale::Price.from_f64(0.0).unwrap(), 0);
    }

    #[test]
    fn test_negative_and_non_finite_rejected() {
        assert!(Scale::Price.from_f64(-1.0).is_err());
        assert!(Scale::Price.from_f64(f64::NAN).is_err());
        assert!(Scale::Amount.from_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn test_overflow_reported() {
        assert!(matches!(
            Scale::Amount.to_decimal(u128::MAX),
            Err(CoreError::ScaleOverflow(_))
        ));
    }
}
