//! Protocol configuration
//!
//! Liquidation parameters and the list of reserves to register at startup.
//! Loaded from JSON; every field has a default.

use bilend_core::{AssetId, BasisPoints};
use bilend_ledger::{RateParams, ReserveConfig};
use bilend_risk::LiquidationConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration of a lending pool
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProtocolConfig {
    #[serde(default)]
    pub liquidation: LiquidationConfig,

    /// Reserves registered when the pool starts, in order
    #[serde(default)]
    pub reserves: Vec<ReserveConfig>,
}

impl ProtocolConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// A ready-to-edit configuration with three common reserves
    pub fn example() -> Self {
        let stable_rate = RateParams {
            slope1: Decimal::new(4, 2),
            slope2: Decimal::new(60, 2),
            optimal_utilization: Decimal::new(90, 2),
            ..RateParams::default()
        };
        let volatile_rate = RateParams {
            slope1: Decimal::new(7, 2),
            slope2: Decimal::new(300, 2),
            optimal_utilization: Decimal::new(45, 2),
            reserve_factor: Decimal::new(15, 2),
            ..RateParams::default()
        };

        Self {
            liquidation: LiquidationConfig::default(),
            reserves: vec![
                ReserveConfig::new(
                    AssetId::new("USDC"),
                    6,
                    BasisPoints::new(8_000),
                    BasisPoints::new(8_500),
                    BasisPoints::new(500),
                    stable_rate.clone(),
                ),
                ReserveConfig::new(
                    AssetId::new("DAI"),
                    18,
                    BasisPoints::new(7_500),
                    BasisPoints::new(8_000),
                    BasisPoints::new(500),
                    stable_rate,
                ),
                ReserveConfig::new(
                    AssetId::new("WETH"),
                    18,
                    BasisPoints::new(8_000),
                    BasisPoints::new(8_250),
                    BasisPoints::new(500),
                    volatile_rate,
                )
                .with_supply_cap(Decimal::new(100_000, 0)),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = ProtocolConfig::default();
        assert_eq!(config.liquidation.close_factor, dec!(0.5));
        assert!(config.reserves.is_empty());
    }

    #[test]
    fn test_example_is_valid() {
        let config = ProtocolConfig::example();
        assert_eq!(config.reserves.len(), 3);
        for reserve in &config.reserves {
            assert!(reserve.validate().is_ok(), "{} invalid", reserve.asset);
        }
    }

    #[test]
    fn test_config_serialization() {
        let config = ProtocolConfig::example();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("close_factor"));
        assert!(json.contains("liquidation_threshold"));

        let parsed: ProtocolConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_config_partial_json() {
        let json = r#"{ "liquidation": {} }"#;
        let config: ProtocolConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.liquidation.close_factor, dec!(0.5));
        assert!(config.reserves.is_empty());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "liquidation": {{ "close_factor": "0.4" }},
                "reserves": [
                    {{ "asset": "USDC", "decimals": 6, "ltv": 8000,
                       "liquidation_threshold": 8500, "liquidation_bonus": 400 }}
                ]
            }}"#
        )
        .unwrap();

        let config = ProtocolConfig::from_file(file.path()).unwrap();
        assert_eq!(config.liquidation.close_factor, dec!(0.4));
        assert_eq!(config.reserves[0].asset, AssetId::new("USDC"));
        assert_eq!(config.reserves[0].liquidation_bonus, BasisPoints::new(400));
    }

    #[test]
    fn test_from_file_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let error = ProtocolConfig::from_file(file.path()).unwrap_err();
        assert_eq!(error.kind(), std::io::ErrorKind::InvalidData);
    }
}
