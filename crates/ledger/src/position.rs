//! User positions - scaled supply and borrow principals per (user, asset)

use bilend_core::{AssetId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::reserve::Reserve;

/// One user's stake in one reserve.
///
/// Both principals are scaled: the true balance is `scaled * index` for the
/// matching reserve index, read fresh every time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserPosition {
    scaled_supply: Decimal,
    scaled_borrow: Decimal,
}

impl UserPosition {
    pub fn scaled_supply(&self) -> Decimal {
        self.scaled_supply
    }

    pub fn scaled_borrow(&self) -> Decimal {
        self.scaled_borrow
    }

    /// No supply and no debt: the position can be dropped
    pub fn is_empty(&self) -> bool {
        self.scaled_supply.is_zero() && self.scaled_borrow.is_zero()
    }

    pub fn supply_balance(&self, reserve: &Reserve) -> Decimal {
        reserve.supply_balance_of(self.scaled_supply)
    }

    pub fn borrow_balance(&self, reserve: &Reserve) -> Decimal {
        reserve.borrow_balance_of(self.scaled_borrow)
    }

    /// Add `amount` tokens of supply, returning the scaled delta
    pub(crate) fn increase_supply(&mut self, amount: Decimal, reserve: &Reserve) -> Decimal {
        let scaled = amount / reserve.state.liquidity_index();
        self.scaled_supply += scaled;
        scaled
    }

    /// Remove `amount` tokens of supply, returning the scaled delta.
    ///
    /// `None` if the true balance is smaller than `amount`. Removing exactly
    /// the true balance clears the principal.
    pub(crate) fn decrease_supply(&mut self, amount: Decimal, reserve: &Reserve) -> Option<Decimal> {
        let balance = self.supply_balance(reserve);
        let scaled = scaled_decrease(
            amount,
            balance,
            self.scaled_supply,
            reserve.state.liquidity_index(),
        )?;
        self.scaled_supply -= scaled;
        Some(scaled)
    }

    pub(crate) fn increase_borrow(&mut self, amount: Decimal, reserve: &Reserve) -> Decimal {
        let scaled = amount / reserve.state.borrow_index();
        self.scaled_borrow += scaled;
        scaled
    }

    pub(crate) fn decrease_borrow(&mut self, amount: Decimal, reserve: &Reserve) -> Option<Decimal> {
        let balance = self.borrow_balance(reserve);
        let scaled = scaled_decrease(
            amount,
            balance,
            self.scaled_borrow,
            reserve.state.borrow_index(),
        )?;
        self.scaled_borrow -= scaled;
        Some(scaled)
    }
}

fn scaled_decrease(
    amount: Decimal,
    balance: Decimal,
    scaled: Decimal,
    index: Decimal,
) -> Option<Decimal> {
    if amount > balance {
        return None;
    }
    if amount == balance {
        return Some(scaled);
    }
    Some((amount / index).min(scaled))
}

/// All positions, grouped by user then asset
#[derive(Debug, Clone, Default)]
pub struct PositionBook {
    positions: BTreeMap<UserId, BTreeMap<AssetId, UserPosition>>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user: &UserId, asset: &AssetId) -> Option<&UserPosition> {
        self.positions.get(user)?.get(asset)
    }

    /// Assets in which `user` holds a position, sorted
    pub fn assets_of(&self, user: &UserId) -> impl Iterator<Item = &AssetId> {
        self.positions.get(user).into_iter().flat_map(|book| book.keys())
    }

    pub fn users(&self) -> impl Iterator<Item = &UserId> {
        self.positions.keys()
    }

    /// Store a position, dropping it when it has become empty
    pub fn put(&mut self, user: UserId, asset: AssetId, position: UserPosition) {
        if position.is_empty() {
            if let Some(book) = self.positions.get_mut(&user) {
                book.remove(&asset);
                if book.is_empty() {
                    self.positions.remove(&user);
                }
            }
            return;
        }
        self.positions.entry(user).or_default().insert(asset, position);
    }

    /// Number of (user, asset) positions
    pub fn len(&self) -> usize {
        self.positions.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
