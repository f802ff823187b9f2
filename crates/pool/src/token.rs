//! Token transfers between user wallets and pool custody
//!
//! The core never moves tokens itself. It asks a `TokenGateway` to pull
//! funds from a wallet into the pool (`debit`) or push them out of the pool
//! (`credit`). A failed transfer aborts the enclosing operation before the
//! ledger commit.

use bilend_core::{AssetId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Insufficient funds for {user} in {asset}: available {available}, requested {requested}")]
    InsufficientFunds {
        user: UserId,
        asset: AssetId,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Pool holds only {available} {asset}, requested {requested}")]
    PoolShortfall {
        asset: AssetId,
        available: Decimal,
        requested: Decimal,
    },
}

/// One leg of a token settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "direction", rename_all = "snake_case")]
pub enum Transfer {
    /// Wallet -> pool
    Debit {
        user: UserId,
        asset: AssetId,
        amount: Decimal,
    },
    /// Pool -> wallet
    Credit {
        user: UserId,
        asset: AssetId,
        amount: Decimal,
    },
}

impl Transfer {
    /// The leg that undoes this one
    pub fn reversed(&self) -> Transfer {
        match self.clone() {
            Transfer::Debit {
                user,
                asset,
                amount,
            } => Transfer::Credit {
                user,
                asset,
                amount,
            },
            Transfer::Credit {
                user,
                asset,
                amount,
            } => Transfer::Debit {
                user,
                asset,
                amount,
            },
        }
    }
}

/// Token transfer collaborator
pub trait TokenGateway: Send + Sync {
    /// Move `amount` from `user`'s wallet into the pool
    fn debit(&self, user: &UserId, asset: &AssetId, amount: Decimal) -> Result<(), TokenError>;

    /// Move `amount` from the pool to `user`'s wallet
    fn credit(&self, user: &UserId, asset: &AssetId, amount: Decimal) -> Result<(), TokenError>;

    /// Wallet balance of `user`
    fn balance_of(&self, user: &UserId, asset: &AssetId) -> Decimal;

    /// Apply one leg
    fn apply(&self, transfer: &Transfer) -> Result<(), TokenError> {
        match transfer {
            Transfer::Debit {
                user,
                asset,
                amount,
            } => self.debit(user, asset, *amount),
            Transfer::Credit {
                user,
                asset,
                amount,
            } => self.credit(user, asset, *amount),
        }
    }

    /// Apply every leg or none.
    ///
    /// When a leg fails, the legs already applied are reversed in the
    /// opposite order and the original error is returned.
    fn settle(&self, transfers: &[Transfer]) -> Result<(), TokenError> {
        for (index, transfer) in transfers.iter().enumerate() {
            if let Err(error) = self.apply(transfer) {
                for applied in transfers[..index].iter().rev() {
                    if let Err(undo) = self.apply(&applied.reversed()) {
                        tracing::error!(
                            transfer = ?applied,
                            error = %undo,
                            "Failed to reverse token transfer"
                        );
                    }
                }
                return Err(error);
            }
        }
        Ok(())
    }
}

impl<T: TokenGateway + ?Sized> TokenGateway for Arc<T> {
    fn debit(&self, user: &UserId, asset: &AssetId, amount: Decimal) -> Result<(), TokenError> {
        (**self).debit(user, asset, amount)
    }

    fn credit(&self, user: &UserId, asset: &AssetId, amount: Decimal) -> Result<(), TokenError> {
        (**self).credit(user, asset, amount)
    }

    fn balance_of(&self, user: &UserId, asset: &AssetId) -> Decimal {
        (**self).balance_of(user, asset)
    }
}

#[derive(Debug, Default)]
struct Balances {
    wallets: HashMap<(UserId, AssetId), Decimal>,
    pool: HashMap<AssetId, Decimal>,
}

/// In-memory wallets and pool custody
#[derive(Debug, Default)]
pub struct InMemoryTokens {
    balances: Mutex<Balances>,
}

impl InMemoryTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit a wallet from outside the pool
    pub fn mint(&self, user: &UserId, asset: &AssetId, amount: Decimal) {
        let mut balances = self.balances.lock().unwrap_or_else(PoisonError::into_inner);
        *balances
            .wallets
            .entry((user.clone(), asset.clone()))
            .or_default() += amount;
    }

    /// Tokens held by the pool
    pub fn pool_balance(&self, asset: &AssetId) -> Decimal {
        let balances = self.balances.lock().unwrap_or_else(PoisonError::into_inner);
        balances.pool.get(asset).copied().unwrap_or_default()
    }
}

impl TokenGateway for InMemoryTokens {
    fn debit(&self, user: &UserId, asset: &AssetId, amount: Decimal) -> Result<(), TokenError> {
        let mut balances = self.balances.lock().unwrap_or_else(PoisonError::into_inner);
        let key = (user.clone(), asset.clone());
        let available = balances.wallets.get(&key).copied().unwrap_or_default();

        if available < amount {
            return Err(TokenError::InsufficientFunds {
                user: user.clone(),
                asset: asset.clone(),
                available,
                requested: amount,
            });
        }

        balances.wallets.insert(key, available - amount);
        *balances.pool.entry(asset.clone()).or_default() += amount;
        Ok(())
    }

    fn credit(&self, user: &UserId, asset: &AssetId, amount: Decimal) -> Result<(), TokenError> {
        let mut balances = self.balances.lock().unwrap_or_else(PoisonError::into_inner);
        let available = balances.pool.get(asset).copied().unwrap_or_default();

        if available < amount {
            return Err(TokenError::PoolShortfall {
                asset: asset.clone(),
                available,
                requested: amount,
            });
        }

        balances.pool.insert(asset.clone(), available - amount);
        *balances
            .wallets
            .entry((user.clone(), asset.clone()))
            .or_default() += amount;
        Ok(())
    }

    fn balance_of(&self, user: &UserId, asset: &AssetId) -> Decimal {
        let balances = self.balances.lock().unwrap_or_else(PoisonError::into_inner);
        balances
            .wallets
            .get(&(user.clone(), asset.clone()))
            .copied()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn alice() -> UserId {
        UserId::new("alice")
    }

    fn usdc() -> AssetId {
        AssetId::new("USDC")
    }

    fn weth() -> AssetId {
        AssetId::new("WETH")
    }

    #[test]
    fn test_debit_moves_into_pool() {
        let tokens = InMemoryTokens::new();
        tokens.mint(&alice(), &usdc(), dec!(100));

        tokens.debit(&alice(), &usdc(), dec!(40)).unwrap();
        assert_eq!(tokens.balance_of(&alice(), &usdc()), dec!(60));
        assert_eq!(tokens.pool_balance(&usdc()), dec!(40));
    }

    #[test]
    fn test_debit_insufficient_funds() {
        let tokens = InMemoryTokens::new();
        tokens.mint(&alice(), &usdc(), dec!(10));

        let result = tokens.debit(&alice(), &usdc(), dec!(10.5));
        assert!(matches!(result, Err(TokenError::InsufficientFunds { .. })));
        assert_eq!(tokens.balance_of(&alice(), &usdc()), dec!(10));
    }

    #[test]
    fn test_credit_pool_shortfall() {
        let tokens = InMemoryTokens::new();
        let result = tokens.credit(&alice(), &weth(), dec!(1));
        assert_eq!(
            result,
            Err(TokenError::PoolShortfall {
                asset: weth(),
                available: Decimal::ZERO,
                requested: dec!(1),
            })
        );
    }

    #[test]
    fn test_settle_all_legs() {
        let tokens = InMemoryTokens::new();
        tokens.mint(&alice(), &usdc(), dec!(500));
        tokens.mint(&UserId::new("bob"), &weth(), dec!(1));
        tokens.debit(&UserId::new("bob"), &weth(), dec!(1)).unwrap();

        tokens
            .settle(&[
                Transfer::Debit { user: alice(), asset: usdc(), amount: dec!(500) },
                Transfer::Credit { user: alice(), asset: weth(), amount: dec!(0.25) },
            ])
            .unwrap();

        assert_eq!(tokens.balance_of(&alice(), &usdc()), Decimal::ZERO);
        assert_eq!(tokens.balance_of(&alice(), &weth()), dec!(0.25));
        assert_eq!(tokens.pool_balance(&weth()), dec!(0.75));
    }

    #[test]
    fn test_settle_reverses_applied_legs() {
        let tokens = InMemoryTokens::new();
        tokens.mint(&alice(), &usdc(), dec!(500));

        // Pool holds no WETH, so the second leg fails
        let result = tokens.settle(&[
            Transfer::Debit { user: alice(), asset: usdc(), amount: dec!(500) },
            Transfer::Credit { user: alice(), asset: weth(), amount: dec!(0.25) },
        ]);

        assert!(matches!(result, Err(TokenError::PoolShortfall { .. })));
        assert_eq!(tokens.balance_of(&alice(), &usdc()), dec!(500));
        assert_eq!(tokens.pool_balance(&usdc()), Decimal::ZERO);
    }
}
