//! Risk engine errors

use bilend_core::AssetId;
use bilend_ledger::LedgerError;
use bilend_oracle::OracleError;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RiskError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

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

    #[error("USD valuation overflows at {asset}")]
    Overflow { asset: AssetId },

    #[error("Invalid liquidation config: {0}")]
    InvalidConfig(String),
}
