//! Oracle error types

use bilend_core::AssetId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Oracle-related errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// No price is known for the asset
    #[error("No price available for {asset}")]
    PriceNotFound { asset: AssetId },

    /// Price is zero, negative or not representable with 8 decimals
    #[error("Invalid price for {asset}: {price} ({reason})")]
    InvalidPrice {
        asset: AssetId,
        price: Decimal,
        reason: &'static str,
    },

    /// Value of an amount does not fit the decimal range
    #[error("Value of {amount} {asset} overflows")]
    ValueOverflow { asset: AssetId, amount: Decimal },
}
