//! Mock Oracle for tests and simulations
//!
//! Holds fixed prices that can be changed while a pool is running,
//! which is how tests push accounts under water.

use bilend_core::AssetId;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::OracleError;
use crate::types::{PriceOracle, PriceQuote};

/// Mock Price Oracle with programmable prices
#[derive(Debug, Default)]
pub struct MockOracle {
    prices: RwLock<HashMap<AssetId, PriceQuote>>,
}

impl MockOracle {
    /// Create a new empty mock oracle
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock oracle seeded with `(asset, price)` pairs
    pub fn with_prices<I>(prices: I) -> Result<Self, OracleError>
    where
        I: IntoIterator<Item = (AssetId, Decimal)>,
    {
        let oracle = Self::new();
        for (asset, price) in prices {
            oracle.set_price(asset, price)?;
        }
        Ok(oracle)
    }

    /// Set (or replace) the price of an asset
    pub fn set_price(&self, asset: AssetId, price: Decimal) -> Result<(), OracleError> {
        let quote = PriceQuote::new(asset.clone(), price)?;
        self.prices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(asset, quote);
        Ok(())
    }

    /// Remove a price (for testing the missing-price path)
    pub fn remove_price(&self, asset: &AssetId) {
        self.prices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(asset);
    }

    /// Number of priced assets
    pub fn len(&self) -> usize {
        self.prices.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PriceOracle for MockOracle {
    fn get_price(&self, asset: &AssetId) -> Result<PriceQuote, OracleError> {
        self.prices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(asset)
            .cloned()
            .ok_or_else(|| OracleError::PriceNotFound {
                asset: asset.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[test]
    fn test_set_and_get_price() {
        let oracle = MockOracle::new();
        let weth = AssetId::new("WETH");

        assert!(oracle.get_price(&weth).is_err());

        oracle.set_price(weth.clone(), dec!(2000)).unwrap();
        assert_eq!(oracle.get_price(&weth).unwrap().price, dec!(2000));

        oracle.set_price(weth.clone(), dec!(1500)).unwrap();
        assert_eq!(oracle.get_price(&weth).unwrap().price, dec!(1500));
        assert_eq!(oracle.len(), 1);
    }

    #[test]
    fn test_price_not_found() {
        let oracle = MockOracle::new();
        let result = oracle.get_price(&AssetId::new("UNKNOWN"));
        assert!(matches!(result, Err(OracleError::PriceNotFound { .. })));
    }

    #[test]
    fn test_invalid_price_not_stored() {
        let oracle = MockOracle::new();
        assert!(oracle.set_price(AssetId::new("WETH"), dec!(0)).is_err());
        assert!(oracle.is_empty());
    }

    #[test]
    fn test_get_prices_fails_on_missing() {
        let oracle =
            MockOracle::with_prices([(AssetId::new("USDC"), dec!(1)), (AssetId::new("WETH"), dec!(2000))])
                .unwrap();

        let quotes = oracle
            .get_prices(&[AssetId::new("USDC"), AssetId::new("WETH")])
            .unwrap();
        assert_eq!(quotes.len(), 2);

        oracle.remove_price(&AssetId::new("WETH"));
        assert!(oracle
            .get_prices(&[AssetId::new("USDC"), AssetId::new("WETH")])
            .is_err());
    }

    #[test]
    fn test_shared_through_arc() {
        let oracle = Arc::new(MockOracle::new());
        let as_trait: Arc<dyn PriceOracle> = oracle.clone();

        oracle.set_price(AssetId::new("WBTC"), dec!(60000)).unwrap();
        assert_eq!(
            as_trait.get_price(&AssetId::new("WBTC")).unwrap().price,
            dec!(60000)
        );
    }
}
