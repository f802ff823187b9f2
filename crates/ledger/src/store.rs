//! Ledger store and staging
//!
//! `LedgerStore` owns every reserve and position. Mutations never touch it
//! directly: an operation stages its changes in a `StagedLedger` (a
//! copy-on-write overlay), and only a fully validated `LedgerDelta` is
//! committed. Dropping a stage discards everything it did.

use bilend_core::{AssetId, UserId};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

use crate::accrual::Accrual;
use crate::error::LedgerError;
use crate::position::{PositionBook, UserPosition};
use crate::reserve::{Reserve, ReserveConfig, ReserveRegistry};

/// Read access shared by the committed store and a stage
pub trait LedgerView {
    fn reserve(&self, asset: &AssetId) -> Result<&Reserve, LedgerError>;

    /// The user's position in `asset` (empty if none)
    fn position(&self, user: &UserId, asset: &AssetId) -> UserPosition;

    /// Assets in which `user` holds a non-empty position, sorted
    fn position_assets(&self, user: &UserId) -> Vec<AssetId>;

    /// True supplied balance at the reserve's current index
    fn supply_balance(&self, user: &UserId, asset: &AssetId) -> Result<Decimal, LedgerError> {
        let reserve = self.reserve(asset)?;
        Ok(self.position(user, asset).supply_balance(reserve))
    }

    /// True debt at the reserve's current index
    fn borrow_balance(&self, user: &UserId, asset: &AssetId) -> Result<Decimal, LedgerError> {
        let reserve = self.reserve(asset)?;
        Ok(self.position(user, asset).borrow_balance(reserve))
    }
}

/// Committed ledger state
#[derive(Debug, Clone, Default)]
pub struct LedgerStore {
    reserves: ReserveRegistry,
    positions: PositionBook,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// List a reserve (see `ReserveRegistry::register`)
    pub fn register_reserve(&mut self, config: ReserveConfig, now: u64) -> Result<(), LedgerError> {
        self.reserves.register(config, now)
    }

    pub fn reserves(&self) -> &ReserveRegistry {
        &self.reserves
    }

    pub fn positions(&self) -> &PositionBook {
        &self.positions
    }

    /// Open a stage over the current state
    pub fn stage(&self) -> StagedLedger<'_> {
        StagedLedger {
            base: self,
            reserves: BTreeMap::new(),
            positions: BTreeMap::new(),
        }
    }

    /// Apply a staged delta. Cannot fail: everything was validated while staging.
    pub fn commit(&mut self, delta: LedgerDelta) {
        for reserve in delta.reserves {
            self.reserves.replace(reserve);
        }
        for ((user, asset), position) in delta.positions {
            self.positions.put(user, asset, position);
        }
    }
}

impl LedgerView for LedgerStore {
    fn reserve(&self, asset: &AssetId) -> Result<&Reserve, LedgerError> {
        self.reserves.get(asset)
    }

    fn position(&self, user: &UserId, asset: &AssetId) -> UserPosition {
        self.positions.get(user, asset).copied().unwrap_or_default()
    }

    fn position_assets(&self, user: &UserId) -> Vec<AssetId> {
        self.positions.assets_of(user).cloned().collect()
    }
}

/// Everything a stage changed, ready to be committed
#[derive(Debug, Clone, Default)]
pub struct LedgerDelta {
    reserves: Vec<Reserve>,
    positions: BTreeMap<(UserId, AssetId), UserPosition>,
}

impl LedgerDelta {
    pub fn is_empty(&self) -> bool {
        self.reserves.is_empty() && self.positions.is_empty()
    }
}

/// Copy-on-write overlay over a `LedgerStore`
#[derive(Debug)]
pub struct StagedLedger<'a> {
    base: &'a LedgerStore,
    reserves: BTreeMap<AssetId, Reserve>,
    positions: BTreeMap<(UserId, AssetId), UserPosition>,
}

impl<'a> StagedLedger<'a> {
    fn reserve_mut(&mut self, asset: &AssetId) -> Result<&mut Reserve, LedgerError> {
        if !self.reserves.contains_key(asset) {
            let reserve = self.base.reserves.get(asset)?.clone();
            self.reserves.insert(asset.clone(), reserve);
        }
        self.reserves
            .get_mut(asset)
            .ok_or_else(|| LedgerError::UnknownAsset(asset.clone()))
    }

    /// Accrue one reserve up to `now`
    pub fn accrue(&mut self, asset: &AssetId, now: u64) -> Result<Option<Accrual>, LedgerError> {
        let reserve = self.reserve_mut(asset)?;
        let accrual = reserve.state.accrue(&reserve.config.rate, now);

        if let Some(accrual) = &accrual {
            tracing::debug!(
                asset = %asset,
                elapsed = accrual.elapsed,
                utilization = %accrual.utilization,
                borrow_rate = %accrual.borrow_rate,
                liquidity_index = %accrual.liquidity_index,
                borrow_index = %accrual.borrow_index,
                treasury_minted = %accrual.treasury_minted,
                "Reserve accrued"
            );
        }

        Ok(accrual)
    }

    /// Accrue every reserve the user holds a position in, plus `extra`
    pub fn accrue_for_user(
        &mut self,
        user: &UserId,
        extra: &[&AssetId],
        now: u64,
    ) -> Result<(), LedgerError> {
        let mut assets: BTreeSet<AssetId> = self.position_assets(user).into_iter().collect();
        assets.extend(extra.iter().map(|asset| (*asset).clone()));

        for asset in &assets {
            self.accrue(asset, now)?;
        }
        Ok(())
    }

    pub fn increase_supply(
        &mut self,
        user: &UserId,
        asset: &AssetId,
        amount: Decimal,
    ) -> Result<Decimal, LedgerError> {
        let mut position = self.position(user, asset);
        let reserve = self.reserve_mut(asset)?;

        let scaled = position.increase_supply(amount, reserve);
        reserve.state.add_scaled_supply(scaled);

        self.positions.insert((user.clone(), asset.clone()), position);
        Ok(scaled)
    }

    pub fn decrease_supply(
        &mut self,
        user: &UserId,
        asset: &AssetId,
        amount: Decimal,
    ) -> Result<Decimal, LedgerError> {
        let mut position = self.position(user, asset);
        let reserve = self.reserve_mut(asset)?;

        let Some(scaled) = position.decrease_supply(amount, reserve) else {
            return Err(LedgerError::InsufficientBalance {
                user: user.clone(),
                asset: asset.clone(),
                available: position.supply_balance(reserve),
                requested: amount,
            });
        };
        reserve.state.sub_scaled_supply(scaled);

        self.positions.insert((user.clone(), asset.clone()), position);
        Ok(scaled)
    }

    pub fn increase_borrow(
        &mut self,
        user: &UserId,
        asset: &AssetId,
        amount: Decimal,
    ) -> Result<Decimal, LedgerError> {
        let mut position = self.position(user, asset);
        let reserve = self.reserve_mut(asset)?;

        let scaled = position.increase_borrow(amount, reserve);
        reserve.state.add_scaled_borrow(scaled);

        self.positions.insert((user.clone(), asset.clone()), position);
        Ok(scaled)
    }

    pub fn decrease_borrow(
        &mut self,
        user: &UserId,
        asset: &AssetId,
        amount: Decimal,
    ) -> Result<Decimal, LedgerError> {
        let mut position = self.position(user, asset);
        let reserve = self.reserve_mut(asset)?;

        let Some(scaled) = position.decrease_borrow(amount, reserve) else {
            return Err(LedgerError::InsufficientBalance {
                user: user.clone(),
                asset: asset.clone(),
                available: position.borrow_balance(reserve),
                requested: amount,
            });
        };
        reserve.state.sub_scaled_borrow(scaled);

        self.positions.insert((user.clone(), asset.clone()), position);
        Ok(scaled)
    }

    /// Finish staging and hand back the changes
    pub fn into_delta(self) -> LedgerDelta {
        LedgerDelta {
            reserves: self.reserves.into_values().collect(),
            positions: self.positions,
        }
    }
}

impl LedgerView for StagedLedger<'_> {
    fn reserve(&self, asset: &AssetId) -> Result<&Reserve, LedgerError> {
        match self.reserves.get(asset) {
            Some(reserve) => Ok(reserve),
            None => self.base.reserve(asset),
        }
    }

    fn position(&self, user: &UserId, asset: &AssetId) -> UserPosition {
        self.positions
            .get(&(user.clone(), asset.clone()))
            .copied()
            .unwrap_or_else(|| self.base.position(user, asset))
    }

    fn position_assets(&self, user: &UserId) -> Vec<AssetId> {
        let mut assets: BTreeSet<AssetId> = self.base.position_assets(user).into_iter().collect();
        for ((owner, asset), position) in &self.positions {
            if owner != user {
                continue;
            }
            if position.is_empty() {
                assets.remove(asset);
            } else {
                assets.insert(asset.clone());
            }
        }
        assets.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate::{RateParams, SECONDS_PER_YEAR};
    use bilend_core::BasisPoints;
    use rust_decimal_macros::dec;

    fn usdc() -> AssetId {
        AssetId::new("USDC")
    }

    fn alice() -> UserId {
        UserId::new("alice")
    }

    fn store() -> LedgerStore {
        let mut store = LedgerStore::new();
        store
            .register_reserve(
                ReserveConfig::new(
                    usdc(),
                    6,
                    BasisPoints::new(8_000),
                    BasisPoints::new(8_500),
                    BasisPoints::new(500),
                    RateParams::flat(dec!(0.05)),
                ),
                0,
            )
            .unwrap();
        store
    }

    #[test]
    fn test_dropped_stage_leaves_store_untouched() {
        let store = store();
        {
            let mut stage = store.stage();
            stage.increase_supply(&alice(), &usdc(), dec!(100)).unwrap();
            assert_eq!(stage.supply_balance(&alice(), &usdc()).unwrap(), dec!(100));
        }
        assert_eq!(store.supply_balance(&alice(), &usdc()).unwrap(), Decimal::ZERO);
        assert!(store.positions().is_empty());
    }

    #[test]
    fn test_commit_applies_positions_and_totals() {
        let mut store = store();
        let mut stage = store.stage();
        stage.increase_supply(&alice(), &usdc(), dec!(100)).unwrap();
        stage.increase_borrow(&alice(), &usdc(), dec!(30)).unwrap();
        let delta = stage.into_delta();
        store.commit(delta);

        let reserve = store.reserve(&usdc()).unwrap();
        assert_eq!(reserve.total_supplied(), dec!(100));
        assert_eq!(reserve.total_borrowed(), dec!(30));
        assert_eq!(reserve.available_liquidity(), dec!(70));
        assert_eq!(store.position_assets(&alice()), vec![usdc()]);
    }

    #[test]
    fn test_insufficient_balance() {
        let mut store = store();
        let mut stage = store.stage();
        stage.increase_supply(&alice(), &usdc(), dec!(50)).unwrap();
        store.commit(stage.into_delta());

        let mut stage = store.stage();
        let result = stage.decrease_supply(&alice(), &usdc(), dec!(50.000001));
        assert_eq!(
            result,
            Err(LedgerError::InsufficientBalance {
                user: alice(),
                asset: usdc(),
                available: dec!(50),
                requested: dec!(50.000001),
            })
        );
    }

    #[test]
    fn test_round_trip_leaves_totals_unchanged() {
        let mut store = store();
        let mut stage = store.stage();
        stage.increase_supply(&UserId::new("bob"), &usdc(), dec!(1000)).unwrap();
        stage.increase_borrow(&UserId::new("bob"), &usdc(), dec!(400)).unwrap();
        store.commit(stage.into_delta());

        let mut stage = store.stage();
        stage.accrue(&usdc(), SECONDS_PER_YEAR / 3).unwrap();
        store.commit(stage.into_delta());
        let before = store.reserve(&usdc()).unwrap().clone();

        let mut stage = store.stage();
        stage.increase_supply(&alice(), &usdc(), dec!(123.456789)).unwrap();
        stage.decrease_supply(&alice(), &usdc(), dec!(123.456789)).unwrap();
        store.commit(stage.into_delta());

        let after = store.reserve(&usdc()).unwrap();
        assert_eq!(after.total_supplied(), before.total_supplied());
        assert_eq!(after.total_borrowed(), before.total_borrowed());
        assert_eq!(after.state.liquidity_index(), before.state.liquidity_index());
        assert!(store.position_assets(&alice()).is_empty());
    }

    #[test]
    fn test_accrual_grows_balances() {
        let mut store = store();
        let mut stage = store.stage();
        stage.increase_supply(&UserId::new("bob"), &usdc(), dec!(1000)).unwrap();
        stage.increase_borrow(&alice(), &usdc(), dec!(500)).unwrap();
        store.commit(stage.into_delta());

        let mut stage = store.stage();
        stage.accrue_for_user(&alice(), &[], SECONDS_PER_YEAR).unwrap();
        assert_eq!(stage.borrow_balance(&alice(), &usdc()).unwrap(), dec!(525));
        // Accrual in a stage is not visible until commit
        assert_eq!(store.borrow_balance(&alice(), &usdc()).unwrap(), dec!(500));

        store.commit(stage.into_delta());
        assert_eq!(store.borrow_balance(&alice(), &usdc()).unwrap(), dec!(525));
        assert_eq!(store.supply_balance(&UserId::new("bob"), &usdc()).unwrap(), dec!(1025));
    }

    #[test]
    fn test_unknown_asset_in_stage() {
        let store = store();
        let mut stage = store.stage();
        let weth = AssetId::new("WETH");
        assert_eq!(
            stage.increase_supply(&alice(), &weth, dec!(1)),
            Err(LedgerError::UnknownAsset(weth))
        );
    }
}
