//! Interest Rate Model
//!
//! Maps reserve utilization to borrow and supply rates. The curve is the
//! usual two-slope ("kinked") shape, configured per reserve:
//!
//! ```text
//! u <= optimal : base + slope1 * u / optimal
//! u >  optimal : base + slope1 + slope2 * (u - optimal) / (1 - optimal)
//! ```
//!
//! Both branches meet at `u = optimal`, so the curve is continuous, and it is
//! non-decreasing as long as every parameter is non-negative.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Seconds in a 365-day year, used to turn annual rates into per-second rates
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Default base rate (0%)
pub const DEFAULT_BASE_RATE: Decimal = Decimal::ZERO;
/// Default slope below the kink (4% APR at optimal utilization)
pub const DEFAULT_SLOPE1: Decimal = Decimal::from_parts(4, 0, 0, false, 2);
/// Default slope above the kink (+75% APR at full utilization)
pub const DEFAULT_SLOPE2: Decimal = Decimal::from_parts(75, 0, 0, false, 2);
/// Default kink (80% utilization)
pub const DEFAULT_OPTIMAL_UTILIZATION: Decimal = Decimal::from_parts(80, 0, 0, false, 2);
/// Default protocol share of interest (10%)
pub const DEFAULT_RESERVE_FACTOR: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Utilization = borrowed / supplied, 0 for an empty reserve, capped at 1
pub fn utilization(total_supplied: Decimal, total_borrowed: Decimal) -> Decimal {
    if total_supplied <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (total_borrowed / total_supplied).clamp(Decimal::ZERO, Decimal::ONE)
}

/// A pure mapping from utilization to interest rates
pub trait InterestRateModel {
    /// Annual borrow rate at utilization `u`
    fn borrow_rate(&self, u: Decimal) -> Decimal;

    /// Share of borrower interest retained by the protocol
    fn reserve_factor(&self) -> Decimal;

    /// Per-second borrow rate
    fn borrow_rate_per_second(&self, u: Decimal) -> Decimal {
        self.borrow_rate(u) / Decimal::from(SECONDS_PER_YEAR)
    }

    /// Annual supply rate: borrow rate x utilization x (1 - reserve factor)
    fn supply_rate(&self, u: Decimal) -> Decimal {
        self.borrow_rate(u) * u * (Decimal::ONE - self.reserve_factor())
    }

    /// Per-second supply rate
    fn supply_rate_per_second(&self, u: Decimal) -> Decimal {
        self.borrow_rate_per_second(u) * u * (Decimal::ONE - self.reserve_factor())
    }
}

/// Kinked rate curve parameters (annual rates as fractions, 0.05 = 5%)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateParams {
    #[serde(default = "default_base_rate")]
    pub base_rate: Decimal,

    #[serde(default = "default_slope1")]
    pub slope1: Decimal,

    #[serde(default = "default_slope2")]
    pub slope2: Decimal,

    #[serde(default = "default_optimal_utilization")]
    pub optimal_utilization: Decimal,

    #[serde(default = "default_reserve_factor")]
    pub reserve_factor: Decimal,
}

fn default_base_rate() -> Decimal {
    DEFAULT_BASE_RATE
}

fn default_slope1() -> Decimal {
    DEFAULT_SLOPE1
}

fn default_slope2() -> Decimal {
    DEFAULT_SLOPE2
}

fn default_optimal_utilization() -> Decimal {
    DEFAULT_OPTIMAL_UTILIZATION
}

fn default_reserve_factor() -> Decimal {
    DEFAULT_RESERVE_FACTOR
}

impl Default for RateParams {
    fn default() -> Self {
        Self {
            base_rate: default_base_rate(),
            slope1: default_slope1(),
            slope2: default_slope2(),
            optimal_utilization: default_optimal_utilization(),
            reserve_factor: default_reserve_factor(),
        }
    }
}

impl RateParams {
    /// A flat curve: the same borrow rate at every utilization
    pub fn flat(rate: Decimal) -> Self {
        Self {
            base_rate: rate,
            slope1: Decimal::ZERO,
            slope2: Decimal::ZERO,
            optimal_utilization: Decimal::ONE,
            reserve_factor: Decimal::ZERO,
        }
    }

    pub fn with_reserve_factor(mut self, reserve_factor: Decimal) -> Self {
        self.reserve_factor = reserve_factor;
        self
    }

    /// Check the curve is well-formed (monotonic, no division by zero)
    pub fn validate(&self) -> Result<(), LedgerError> {
        let negative = [
            ("base_rate", self.base_rate),
            ("slope1", self.slope1),
            ("slope2", self.slope2),
        ]
        .into_iter()
        .find(|(_, value)| *value < Decimal::ZERO);

        if let Some((name, value)) = negative {
            return Err(LedgerError::ConfigInvariantViolation(format!(
                "{name} must not be negative, got {value}"
            )));
        }

        if self.optimal_utilization <= Decimal::ZERO || self.optimal_utilization > Decimal::ONE {
            return Err(LedgerError::ConfigInvariantViolation(format!(
                "optimal_utilization must be in (0, 1], got {}",
                self.optimal_utilization
            )));
        }

        if self.reserve_factor < Decimal::ZERO || self.reserve_factor >= Decimal::ONE {
            return Err(LedgerError::ConfigInvariantViolation(format!(
                "reserve_factor must be in [0, 1), got {}",
                self.reserve_factor
            )));
        }

        Ok(())
    }
}

impl InterestRateModel for RateParams {
    fn borrow_rate(&self, u: Decimal) -> Decimal {
        let u = u.clamp(Decimal::ZERO, Decimal::ONE);

        if u <= self.optimal_utilization {
            self.base_rate + self.slope1 * u / self.optimal_utilization
        } else {
            let excess = (u - self.optimal_utilization) / (Decimal::ONE - self.optimal_utilization);
            self.base_rate + self.slope1 + self.slope2 * excess
        }
    }

    fn reserve_factor(&self) -> Decimal {
        self.reserve_factor
    }
}
