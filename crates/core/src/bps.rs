//! Basis points for risk parameters (LTV, liquidation threshold, bonus)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 100% expressed in basis points
pub const BPS_DENOMINATOR: u16 = 10_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BpsError {
    #[error("Basis points out of range (max {max}): {value}")]
    OutOfRange { value: u32, max: u32 },
}

/// A ratio expressed in basis points (1 bp = 0.01%).
///
/// Values above 10_000 are representable on purpose: the registry is the
/// place that decides which parameters may exceed 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BasisPoints(u16);

impl BasisPoints {
    pub const ZERO: Self = Self(0);
    pub const ONE_HUNDRED_PERCENT: Self = Self(BPS_DENOMINATOR);

    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u16 {
        self.0
    }

    /// The ratio as a decimal fraction: 8000 bp -> 0.8
    pub fn as_fraction(&self) -> Decimal {
        Decimal::new(i64::from(self.0), 4)
    }
}

impl TryFrom<u32> for BasisPoints {
    type Error = BpsError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        u16::try_from(value)
            .map(BasisPoints)
            .map_err(|_| BpsError::OutOfRange {
                value,
                max: u32::from(u16::MAX),
            })
    }
}

impl fmt::Display for BasisPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bp", self.0)
    }
}
