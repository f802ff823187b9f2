//! Account snapshot - the USD-normalized risk picture of one user

use bilend_core::{AssetId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Health factor: `collateral × liquidationThreshold / debt`.
///
/// A user without debt has an infinite health factor. The derived ordering
/// puts every finite value below `Infinite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthFactor {
    Finite(Decimal),
    Infinite,
}

impl HealthFactor {
    /// Strictly below `threshold`
    pub fn is_below(&self, threshold: Decimal) -> bool {
        match self {
            HealthFactor::Finite(value) => *value < threshold,
            HealthFactor::Infinite => false,
        }
    }

    pub fn value(&self) -> Option<Decimal> {
        match self {
            HealthFactor::Finite(value) => Some(*value),
            HealthFactor::Infinite => None,
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, HealthFactor::Infinite)
    }
}

impl fmt::Display for HealthFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthFactor::Finite(value) => write!(f, "{value}"),
            HealthFactor::Infinite => write!(f, "inf"),
        }
    }
}

/// One reserve's contribution to an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetExposure {
    pub asset: AssetId,
    pub supplied: Decimal,
    pub borrowed: Decimal,
    /// USD price used for the valuation
    pub price: Decimal,
    pub collateral_usd: Decimal,
    pub debt_usd: Decimal,
}

/// Derived account data. Never persisted, always recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub user: UserId,
    pub total_collateral_usd: Decimal,
    pub total_debt_usd: Decimal,
    /// `max(0, Σ collateral_i × ltv_i − debt)`
    pub available_borrows_usd: Decimal,
    /// Collateral-weighted liquidation threshold (fraction)
    pub liquidation_threshold: Decimal,
    /// Collateral-weighted LTV (fraction)
    pub ltv: Decimal,
    pub health_factor: HealthFactor,
    pub exposures: Vec<AssetExposure>,
}

impl AccountSnapshot {
    /// Snapshot of a user with no positions
    pub fn empty(user: UserId) -> Self {
        Self {
            user,
            total_collateral_usd: Decimal::ZERO,
            total_debt_usd: Decimal::ZERO,
            available_borrows_usd: Decimal::ZERO,
            liquidation_threshold: Decimal::ZERO,
            ltv: Decimal::ZERO,
            health_factor: HealthFactor::Infinite,
            exposures: Vec::new(),
        }
    }

    pub fn has_debt(&self) -> bool {
        self.total_debt_usd > Decimal::ZERO
    }

    pub fn exposure(&self, asset: &AssetId) -> Option<&AssetExposure> {
        self.exposures.iter().find(|exposure| &exposure.asset == asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_health_factor_ordering() {
        let low = HealthFactor::Finite(dec!(0.95));
        let high = HealthFactor::Finite(dec!(1000000));
        assert!(low < high);
        assert!(high < HealthFactor::Infinite);
        assert_eq!(HealthFactor::Infinite.max(low), HealthFactor::Infinite);
    }

    #[test]
    fn test_is_below() {
        assert!(HealthFactor::Finite(dec!(0.99)).is_below(Decimal::ONE));
        assert!(!HealthFactor::Finite(Decimal::ONE).is_below(Decimal::ONE));
        assert!(!HealthFactor::Infinite.is_below(Decimal::ONE));
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = AccountSnapshot::empty(UserId::new("alice"));
        assert!(!snapshot.has_debt());
        assert!(snapshot.health_factor.is_infinite());
        assert_eq!(snapshot.health_factor.to_string(), "inf");
    }

    #[test]
    fn test_health_factor_json() {
        let json = serde_json::to_string(&HealthFactor::Infinite).unwrap();
        assert_eq!(json, "\"infinite\"");

        let parsed: HealthFactor = serde_json::from_str(r#"{"finite":"1.6"}"#).unwrap();
        assert_eq!(parsed, HealthFactor::Finite(dec!(1.6)));
    }
}
