//! Core oracle types

use bilend_core::AssetId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::OracleError;

/// Fractional digits carried by every USD price
pub const PRICE_DECIMALS: u32 = 8;

/// A USD price for one unit of an asset, fixed-point with 8 decimals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// The priced asset
    pub asset: AssetId,
    /// USD per whole token
    pub price: Decimal,
}

impl PriceQuote {
    /// Create a quote, checking the price is positive and fits 8 decimals
    pub fn new(asset: AssetId, price: Decimal) -> Result<Self, OracleError> {
        if price <= Decimal::ZERO {
            return Err(OracleError::InvalidPrice {
                asset,
                price,
                reason: "price must be positive",
            });
        }
        if price.normalize().scale() > PRICE_DECIMALS {
            return Err(OracleError::InvalidPrice {
                asset,
                price,
                reason: "price has more than 8 decimals",
            });
        }
        Ok(Self { asset, price })
    }

    /// Create a quote from a raw 8-decimal integer (e.g. 2_000_00000000 = $2000)
    pub fn from_raw(asset: AssetId, raw: u64) -> Result<Self, OracleError> {
        let raw = i64::try_from(raw).map_err(|_| OracleError::InvalidPrice {
            asset: asset.clone(),
            price: Decimal::MAX,
            reason: "raw price out of range",
        })?;
        Self::new(asset, Decimal::new(raw, PRICE_DECIMALS))
    }

    /// USD value of `amount` whole tokens
    pub fn value_of(&self, amount: Decimal) -> Result<Decimal, OracleError> {
        amount
            .checked_mul(self.price)
            .ok_or_else(|| OracleError::ValueOverflow {
                asset: self.asset.clone(),
                amount,
            })
    }
}

/// Price Oracle trait - the core's view of an external price feed
///
/// Lookups are synchronous: every price an operation needs is resolved
/// before any ledger mutation is applied. Freshness is the feed's concern.
pub trait PriceOracle: Send + Sync {
    /// Get the current USD price for an asset
    fn get_price(&self, asset: &AssetId) -> Result<PriceQuote, OracleError>;

    /// Get prices for several assets, failing on the first missing one
    fn get_prices(&self, assets: &[AssetId]) -> Result<Vec<PriceQuote>, OracleError> {
        assets.iter().map(|asset| self.get_price(asset)).collect()
    }
}

impl<T: PriceOracle + ?Sized> PriceOracle for Arc<T> {
    fn get_price(&self, asset: &AssetId) -> Result<PriceQuote, OracleError> {
        (**self).get_price(asset)
    }
}
