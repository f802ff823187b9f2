//! Liquidation quotes
//!
//! Works out how much debt a liquidator may cover in one call and how much
//! collateral they receive for it. Eligibility (health factor below 1) is
//! checked by the caller against a fresh snapshot.

use bilend_core::AssetId;
use bilend_ledger::ReserveConfig;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::RiskError;

/// Default close factor (50% of the debt per call)
pub const DEFAULT_CLOSE_FACTOR: Decimal = Decimal::from_parts(50, 0, 0, false, 2);

/// Configuration for liquidations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationConfig {
    /// Maximum fraction of a debt position repayable in one liquidation
    #[serde(default = "default_close_factor")]
    pub close_factor: Decimal,
}

fn default_close_factor() -> Decimal {
    DEFAULT_CLOSE_FACTOR
}

impl Default for LiquidationConfig {
    fn default() -> Self {
        Self {
            close_factor: default_close_factor(),
        }
    }
}

impl LiquidationConfig {
    pub fn new(close_factor: Decimal) -> Self {
        Self { close_factor }
    }

    pub fn validate(&self) -> Result<(), RiskError> {
        if self.close_factor <= Decimal::ZERO || self.close_factor > Decimal::ONE {
            return Err(RiskError::InvalidConfig(format!(
                "close_factor must be in (0, 1], got {}",
                self.close_factor
            )));
        }
        Ok(())
    }

    /// Largest debt repayable in one call, rounded down to the debt precision.
    ///
    /// A debt too small for the close factor to leave a non-zero cap may be
    /// closed in full.
    pub fn max_cover(&self, debt: Decimal, decimals: u32) -> Decimal {
        let cap = round_down(self.close_factor * debt, decimals);
        if cap.is_zero() {
            debt
        } else {
            cap
        }
    }
}

/// One side of a liquidation: a reserve, the user's balance in it, and its price
#[derive(Debug, Clone, Copy)]
pub struct LiquidationLeg<'a> {
    pub reserve: &'a ReserveConfig,
    pub balance: Decimal,
    pub price: Decimal,
}

/// The priced outcome of a liquidation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationQuote {
    pub debt_asset: AssetId,
    pub collateral_asset: AssetId,
    /// Debt repaid by the liquidator
    pub debt_to_cover: Decimal,
    /// Close factor cap that applied
    pub max_cover: Decimal,
    /// Collateral transferred to the liquidator, bonus included
    pub collateral_seized: Decimal,
    pub debt_price: Decimal,
    pub collateral_price: Decimal,
}

impl LiquidationQuote {
    /// Price a liquidation.
    ///
    /// `seized = debtToCover × debtPrice × (1 + bonus) / collateralPrice`,
    /// rounded down to the collateral precision.
    pub fn compute(
        config: &LiquidationConfig,
        debt: LiquidationLeg<'_>,
        collateral: LiquidationLeg<'_>,
        debt_to_cover: Decimal,
    ) -> Result<Self, RiskError> {
        let max_cover = config.max_cover(debt.balance, debt.reserve.decimals);
        if debt_to_cover > max_cover {
            return Err(RiskError::ExceedsCloseFactor {
                asset: debt.reserve.asset.clone(),
                requested: debt_to_cover,
                max: max_cover,
            });
        }

        let bonus = Decimal::ONE + collateral.reserve.liquidation_bonus.as_fraction();
        let seized = debt_to_cover
            .checked_mul(debt.price)
            .and_then(|value| value.checked_mul(bonus))
            .and_then(|value| value.checked_div(collateral.price))
            .map(|amount| round_down(amount, collateral.reserve.decimals))
            .ok_or_else(|| RiskError::Overflow {
                asset: collateral.reserve.asset.clone(),
            })?;

        if seized > collateral.balance {
            return Err(RiskError::InsufficientCollateral {
                asset: collateral.reserve.asset.clone(),
                required: seized,
                available: collateral.balance,
            });
        }

        Ok(Self {
            debt_asset: debt.reserve.asset.clone(),
            collateral_asset: collateral.reserve.asset.clone(),
            debt_to_cover,
            max_cover,
            collateral_seized: seized,
            debt_price: debt.price,
            collateral_price: collateral.price,
        })
    }
}

fn round_down(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::ToZero)
}
