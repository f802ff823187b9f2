//! Operation errors

use bilend_core::{AssetId, UserId};
use bilend_ledger::LedgerError;
use bilend_oracle::OracleError;
use bilend_risk::{HealthFactor, RiskError};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::token::TokenError;

/// Why an operation was rejected. The ledger is unchanged whenever one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
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

    #[error("Insufficient liquidity in {asset}: available {available}, requested {requested}")]
    InsufficientLiquidity {
        asset: AssetId,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Borrow of {requested_usd} USD by {user} exceeds available {available_usd} USD")]
    BorrowExceedsLimit {
        user: UserId,
        requested_usd: Decimal,
        available_usd: Decimal,
    },

    #[error("Withdrawal would drop health factor of {user} to {health_factor}")]
    WithdrawBreaksHealthFactor {
        user: UserId,
        health_factor: HealthFactor,
    },

    #[error("{user} supplies {asset} and cannot borrow it")]
    SelfCollateralBorrowRejected { user: UserId, asset: AssetId },

    #[error("Health factor of {user} is {health_factor}, not below the liquidation threshold")]
    HealthFactorAboveLiquidationThreshold {
        user: UserId,
        health_factor: HealthFactor,
    },

    #[error("Debt to cover {requested} {asset} exceeds close factor limit {max}")]
    ExceedsCloseFactor {
        asset: AssetId,
        requested: Decimal,
        max: Decimal,
    },

    #[error("Collateral to seize {required} {asset} exceeds balance {available}")]
    InsufficientCollateral {
        asset: AssetId,
        required: Decimal,
        available: Decimal,
    },

    #[error("Configuration invariant violated: {0}")]
    ConfigInvariantViolation(String),

    #[error("Supply cap of {cap} {asset} exceeded: total would be {total}")]
    SupplyCapExceeded {
        asset: AssetId,
        cap: Decimal,
        total: Decimal,
    },

    #[error("Borrow cap of {cap} {asset} exceeded: total would be {total}")]
    BorrowCapExceeded {
        asset: AssetId,
        cap: Decimal,
        total: Decimal,
    },

    #[error("{user} has no {asset} debt to repay")]
    NoDebtToRepay { user: UserId, asset: AssetId },

    #[error("{0} cannot liquidate their own position")]
    SelfLiquidation(UserId),

    #[error("{asset} amounts overflow the representable range")]
    Overflow { asset: AssetId },

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Token transfer failed: {0}")]
    Token(#[from] TokenError),
}

impl From<LedgerError> for OperationError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::UnknownAsset(asset) => OperationError::UnknownAsset(asset),
            LedgerError::InvalidAmount {
                asset,
                amount,
                reason,
            } => OperationError::InvalidAmount {
                asset,
                amount,
                reason,
            },
            LedgerError::InsufficientBalance {
                user,
                asset,
                available,
                requested,
            } => OperationError::InsufficientBalance {
                user,
                asset,
                available,
                requested,
            },
            LedgerError::ConfigInvariantViolation(msg) => {
                OperationError::ConfigInvariantViolation(msg)
            }
        }
    }
}

impl From<RiskError> for OperationError {
    fn from(error: RiskError) -> Self {
        match error {
            RiskError::Ledger(e) => e.into(),
            RiskError::Oracle(e) => OperationError::Oracle(e),
            RiskError::ExceedsCloseFactor {
                asset,
                requested,
                max,
            } => OperationError::ExceedsCloseFactor {
                asset,
                requested,
                max,
            },
            RiskError::InsufficientCollateral {
                asset,
                required,
                available,
            } => OperationError::InsufficientCollateral {
                asset,
                required,
                available,
            },
            RiskError::Overflow { asset } => OperationError::Overflow { asset },
            RiskError::InvalidConfig(msg) => OperationError::ConfigInvariantViolation(msg),
        }
    }
}
