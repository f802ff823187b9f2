//! Risk engine implementation

use bilend_core::UserId;
use bilend_ledger::LedgerView;
use bilend_oracle::PriceOracle;
use rust_decimal::Decimal;

use crate::error::RiskError;
use crate::snapshot::{AccountSnapshot, AssetExposure, HealthFactor};

/// Health factor below which a position may be liquidated
pub const LIQUIDATION_THRESHOLD: Decimal = Decimal::ONE;

/// Risk Engine - pure aggregator over ledger state and prices
///
/// Holds no state of its own and enforces no policy: callers decide what a
/// snapshot permits.
#[derive(Debug, Default, Clone, Copy)]
pub struct RiskEngine;

impl RiskEngine {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate every non-zero position of `user` into USD.
    ///
    /// Reads balances at whatever index the view currently holds; accrue
    /// the view first to value positions at the present time.
    pub fn snapshot<V>(
        &self,
        view: &V,
        oracle: &dyn PriceOracle,
        user: &UserId,
    ) -> Result<AccountSnapshot, RiskError>
    where
        V: LedgerView + ?Sized,
    {
        let mut snapshot = AccountSnapshot::empty(user.clone());
        let mut weighted_ltv = Decimal::ZERO;
        let mut weighted_threshold = Decimal::ZERO;

        for asset in view.position_assets(user) {
            let reserve = view.reserve(&asset)?;
            let position = view.position(user, &asset);
            let supplied = position.supply_balance(reserve);
            let borrowed = position.borrow_balance(reserve);

            if supplied.is_zero() && borrowed.is_zero() {
                continue;
            }

            let quote = oracle.get_price(&asset)?;
            let collateral_usd = quote.value_of(supplied)?;
            let debt_usd = quote.value_of(borrowed)?;

            let overflow = || RiskError::Overflow {
                asset: asset.clone(),
            };
            snapshot.total_collateral_usd = snapshot
                .total_collateral_usd
                .checked_add(collateral_usd)
                .ok_or_else(overflow)?;
            snapshot.total_debt_usd = snapshot
                .total_debt_usd
                .checked_add(debt_usd)
                .ok_or_else(overflow)?;
            // Bounded by the collateral total, which fits
            weighted_ltv += collateral_usd * reserve.config.ltv.as_fraction();
            weighted_threshold += collateral_usd * reserve.config.liquidation_threshold.as_fraction();

            snapshot.exposures.push(AssetExposure {
                asset,
                supplied,
                borrowed,
                price: quote.price,
                collateral_usd,
                debt_usd,
            });
        }

        if snapshot.total_collateral_usd > Decimal::ZERO {
            snapshot.ltv = weighted_ltv / snapshot.total_collateral_usd;
            snapshot.liquidation_threshold = weighted_threshold / snapshot.total_collateral_usd;
        }

        snapshot.available_borrows_usd = (weighted_ltv - snapshot.total_debt_usd).max(Decimal::ZERO);

        snapshot.health_factor = if snapshot.has_debt() {
            // Dust debt against large collateral saturates
            let ratio = weighted_threshold
                .checked_div(snapshot.total_debt_usd)
                .unwrap_or(Decimal::MAX);
            HealthFactor::Finite(ratio)
        } else {
            HealthFactor::Infinite
        };

        tracing::trace!(
            user = %user,
            collateral_usd = %snapshot.total_collateral_usd,
            debt_usd = %snapshot.total_debt_usd,
            health_factor = %snapshot.health_factor,
            "Account snapshot computed"
        );

        Ok(snapshot)
    }

    /// Health factor alone
    pub fn health_factor<V>(
        &self,
        view: &V,
        oracle: &dyn PriceOracle,
        user: &UserId,
    ) -> Result<HealthFactor, RiskError>
    where
        V: LedgerView + ?Sized,
    {
        Ok(self.snapshot(view, oracle, user)?.health_factor)
    }

    /// Whether the account is eligible for liquidation
    pub fn is_liquidatable<V>(
        &self,
        view: &V,
        oracle: &dyn PriceOracle,
        user: &UserId,
    ) -> Result<bool, RiskError>
    where
        V: LedgerView + ?Sized,
    {
        Ok(self
            .health_factor(view, oracle, user)?
            .is_below(LIQUIDATION_THRESHOLD))
    }
}
