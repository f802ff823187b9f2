//! Ledger errors

use bilend_core::{AssetId, UserId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur in reserve and position bookkeeping
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Unknown asset: {0}")]
    UnknownAsset(AssetId),

    #[error("Invalid amount {amount} for {asset}: {reason}")]
    InvalidAmount {
        asset: AssetId,
        amount: Decimal,
        reason: String,
    },

    #[error("Insufficient balance for {user} in {asset}: available {available}, requested {requested}")]
    InsufficientBalance {
        user: UserId,
        asset: AssetId,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Reserve configuration invariant violated: {0}")]
    ConfigInvariantViolation(String),
}
