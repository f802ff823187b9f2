//! Amount - Non-negative token quantity
//!
//! Operation inputs are validated through `Amount` before they touch a
//! reserve. Negative quantities are unrepresentable; zero is allowed by
//! `new` and rejected by `positive`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur when building amounts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount cannot be negative: {0}")]
    Negative(Decimal),

    #[error("Amount must be greater than zero")]
    Zero,

    #[error("Amount {amount} has more than {decimals} fractional digits")]
    TooPrecise { amount: Decimal, decimals: u32 },
}

/// A non-negative decimal quantity of some token, in whole-token units.
///
/// # Invariant
/// The inner value is always >= 0.
///
/// # Example
/// ```
/// use bilend_core::Amount;
/// use rust_decimal::Decimal;
///
/// let amount = Amount::new(Decimal::new(15, 1)).unwrap();
/// assert_eq!(amount.value(), Decimal::new(15, 1));
///
/// assert!(Amount::new(Decimal::new(-1, 0)).is_err());
/// assert!(Amount::positive(Decimal::ZERO).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new Amount, rejecting negative values.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            Err(AmountError::Negative(value))
        } else {
            Ok(Self(value))
        }
    }

    /// Create an Amount that must be strictly positive.
    pub fn positive(value: Decimal) -> Result<Self, AmountError> {
        let amount = Self::new(value)?;
        if amount.is_zero() {
            return Err(AmountError::Zero);
        }
        Ok(amount)
    }

    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Check that the amount is expressible with `decimals` fractional digits.
    pub fn ensure_precision(self, decimals: u32) -> Result<Self, AmountError> {
        if self.0.normalize().scale() > decimals {
            return Err(AmountError::TooPrecise {
                amount: self.0,
                decimals,
            });
        }
        Ok(self)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_rejected() {
        let result = Amount::new(Decimal::new(-100, 0));
        assert!(matches!(result, Err(AmountError::Negative(_))));
    }

    #[test]
    fn test_positive_rejects_zero() {
        assert_eq!(Amount::positive(Decimal::ZERO), Err(AmountError::Zero));
        assert!(Amount::positive(Decimal::new(1, 6)).is_ok());
    }

    #[test]
    fn test_precision_check() {
        let amount = Amount::new(Decimal::new(10_000_001, 7)).unwrap(); // 1.0000001
        assert!(matches!(
            amount.ensure_precision(6),
            Err(AmountError::TooPrecise { decimals: 6, .. })
        ));
        assert!(amount.ensure_precision(7).is_ok());

        // Trailing zeros do not count against the precision
        let padded = Amount::new(Decimal::new(1_500_000, 6)).unwrap(); // 1.500000
        assert!(padded.ensure_precision(1).is_ok());
    }

    #[test]
    fn test_serde_rejects_negative() {
        let parsed: Result<Amount, _> = serde_json::from_str("\"-5\"");
        assert!(parsed.is_err());

        let parsed: Amount = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(parsed.value(), Decimal::new(125, 1));
    }
}
