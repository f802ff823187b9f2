//! Reserves - per-asset risk configuration and aggregate totals
//!
//! A `Reserve` pairs the immutable `ReserveConfig` chosen at listing time
//! with the mutable `ReserveState` (scaled totals and interest indices).
//! Totals are stored scaled, exactly like user positions, so the true
//! totals follow the indices without per-holder work.

use bilend_core::{AssetId, BasisPoints};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::LedgerError;
use crate::rate::{utilization, InterestRateModel, RateParams};

/// Highest decimal precision a reserve may declare
pub const MAX_RESERVE_DECIMALS: u32 = 18;

/// Risk and rate configuration of a listed asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveConfig {
    pub asset: AssetId,

    /// Fractional digits of the underlying token
    pub decimals: u32,

    /// Maximum borrowable fraction of this collateral's value
    pub ltv: BasisPoints,

    /// Collateral fraction counted towards the health factor
    pub liquidation_threshold: BasisPoints,

    /// Extra collateral paid to liquidators on top of covered debt
    pub liquidation_bonus: BasisPoints,

    #[serde(default)]
    pub rate: RateParams,

    /// Maximum total supplied, in tokens (None = unlimited)
    #[serde(default)]
    pub supply_cap: Option<Decimal>,

    /// Maximum total borrowed, in tokens (None = unlimited)
    #[serde(default)]
    pub borrow_cap: Option<Decimal>,
}

impl ReserveConfig {
    pub fn new(
        asset: AssetId,
        decimals: u32,
        ltv: BasisPoints,
        liquidation_threshold: BasisPoints,
        liquidation_bonus: BasisPoints,
        rate: RateParams,
    ) -> Self {
        Self {
            asset,
            decimals,
            ltv,
            liquidation_threshold,
            liquidation_bonus,
            rate,
            supply_cap: None,
            borrow_cap: None,
        }
    }

    pub fn with_supply_cap(mut self, cap: Decimal) -> Self {
        self.supply_cap = Some(cap);
        self
    }

    pub fn with_borrow_cap(mut self, cap: Decimal) -> Self {
        self.borrow_cap = Some(cap);
        self
    }

    /// Check listing invariants
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.ltv >= self.liquidation_threshold {
            return Err(LedgerError::ConfigInvariantViolation(format!(
                "{}: ltv {} must be below liquidation threshold {}",
                self.asset, self.ltv, self.liquidation_threshold
            )));
        }

        if self.liquidation_threshold > BasisPoints::ONE_HUNDRED_PERCENT {
            return Err(LedgerError::ConfigInvariantViolation(format!(
                "{}: liquidation threshold {} exceeds 100%",
                self.asset, self.liquidation_threshold
            )));
        }

        if self.decimals > MAX_RESERVE_DECIMALS {
            return Err(LedgerError::ConfigInvariantViolation(format!(
                "{}: {} decimals exceeds the maximum of {MAX_RESERVE_DECIMALS}",
                self.asset, self.decimals
            )));
        }

        let negative_cap = [self.supply_cap, self.borrow_cap]
            .into_iter()
            .flatten()
            .any(|cap| cap < Decimal::ZERO);
        if negative_cap {
            return Err(LedgerError::ConfigInvariantViolation(format!(
                "{}: caps must not be negative",
                self.asset
            )));
        }

        self.rate.validate().map_err(|e| match e {
            LedgerError::ConfigInvariantViolation(msg) => {
                LedgerError::ConfigInvariantViolation(format!("{}: {msg}", self.asset))
            }
            other => other,
        })
    }

    /// Round a raw token quantity to this reserve's precision
    pub fn round(&self, value: Decimal) -> Decimal {
        value.round_dp(self.decimals)
    }
}

/// Mutable accounting state of a reserve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveState {
    /// Sum of all scaled supply principals (treasury included)
    pub(crate) scaled_supplied: Decimal,
    /// Sum of all scaled borrow principals
    pub(crate) scaled_borrowed: Decimal,
    /// Scaled supply owned by the protocol treasury
    pub(crate) scaled_treasury: Decimal,
    pub(crate) liquidity_index: Decimal,
    pub(crate) borrow_index: Decimal,
    /// Unix seconds of the last accrual
    pub(crate) last_update: u64,
}

impl ReserveState {
    /// Fresh state: empty totals, both indices at 1
    pub fn new(now: u64) -> Self {
        Self {
            scaled_supplied: Decimal::ZERO,
            scaled_borrowed: Decimal::ZERO,
            scaled_treasury: Decimal::ZERO,
            liquidity_index: Decimal::ONE,
            borrow_index: Decimal::ONE,
            last_update: now,
        }
    }

    pub fn liquidity_index(&self) -> Decimal {
        self.liquidity_index
    }

    pub fn borrow_index(&self) -> Decimal {
        self.borrow_index
    }

    pub fn last_update(&self) -> u64 {
        self.last_update
    }

    pub fn scaled_supplied(&self) -> Decimal {
        self.scaled_supplied
    }

    pub fn scaled_borrowed(&self) -> Decimal {
        self.scaled_borrowed
    }

    /// Unrounded true total supplied
    pub(crate) fn raw_total_supplied(&self) -> Decimal {
        self.scaled_supplied * self.liquidity_index
    }

    /// Unrounded true total borrowed
    pub(crate) fn raw_total_borrowed(&self) -> Decimal {
        self.scaled_borrowed * self.borrow_index
    }

    pub(crate) fn add_scaled_supply(&mut self, scaled: Decimal) {
        self.scaled_supplied += scaled;
    }

    pub(crate) fn sub_scaled_supply(&mut self, scaled: Decimal) {
        self.scaled_supplied = (self.scaled_supplied - scaled).max(Decimal::ZERO);
    }

    pub(crate) fn add_scaled_borrow(&mut self, scaled: Decimal) {
        self.scaled_borrowed += scaled;
    }

    pub(crate) fn sub_scaled_borrow(&mut self, scaled: Decimal) {
        self.scaled_borrowed = (self.scaled_borrowed - scaled).max(Decimal::ZERO);
    }
}

/// A listed asset: configuration plus accounting state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserve {
    pub config: ReserveConfig,
    pub state: ReserveState,
}

impl Reserve {
    pub fn asset(&self) -> &AssetId {
        &self.config.asset
    }

    pub fn decimals(&self) -> u32 {
        self.config.decimals
    }

    /// True total supplied, at reserve precision
    pub fn total_supplied(&self) -> Decimal {
        self.config.round(self.state.raw_total_supplied())
    }

    /// True total borrowed, at reserve precision
    pub fn total_borrowed(&self) -> Decimal {
        self.config.round(self.state.raw_total_borrowed())
    }

    /// Tokens free to be borrowed or withdrawn
    pub fn available_liquidity(&self) -> Decimal {
        (self.total_supplied() - self.total_borrowed()).max(Decimal::ZERO)
    }

    /// Protocol treasury balance, at reserve precision
    pub fn treasury_balance(&self) -> Decimal {
        self.config
            .round(self.state.scaled_treasury * self.state.liquidity_index)
    }

    pub fn utilization(&self) -> Decimal {
        utilization(self.state.raw_total_supplied(), self.state.raw_total_borrowed())
    }

    /// Convert a scaled supply principal into a true balance
    pub fn supply_balance_of(&self, scaled: Decimal) -> Decimal {
        self.config.round(scaled * self.state.liquidity_index)
    }

    /// Convert a scaled borrow principal into a true balance
    pub fn borrow_balance_of(&self, scaled: Decimal) -> Decimal {
        self.config.round(scaled * self.state.borrow_index)
    }

    /// Query projection of this reserve
    pub fn summary(&self) -> ReserveSummary {
        let u = self.utilization();
        ReserveSummary {
            asset: self.config.asset.clone(),
            total_supplied: self.total_supplied(),
            total_borrowed: self.total_borrowed(),
            available_liquidity: self.available_liquidity(),
            treasury_balance: self.treasury_balance(),
            utilization: u,
            borrow_rate: self.config.rate.borrow_rate(u),
            supply_rate: self.config.rate.supply_rate(u),
            liquidity_index: self.state.liquidity_index,
            borrow_index: self.state.borrow_index,
            last_update: self.state.last_update,
        }
    }
}

/// Read-only view of a reserve's state, as served by the query surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveSummary {
    pub asset: AssetId,
    pub total_supplied: Decimal,
    pub total_borrowed: Decimal,
    pub available_liquidity: Decimal,
    pub treasury_balance: Decimal,
    pub utilization: Decimal,
    /// Annual borrow rate at current utilization
    pub borrow_rate: Decimal,
    /// Annual supply rate at current utilization
    pub supply_rate: Decimal,
    pub liquidity_index: Decimal,
    pub borrow_index: Decimal,
    pub last_update: u64,
}

/// Registry of every listed reserve, keyed and iterated by asset
#[derive(Debug, Clone, Default)]
pub struct ReserveRegistry {
    reserves: BTreeMap<AssetId, Reserve>,
}

impl ReserveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// List a new asset. Indices start at 1 and accrual starts at `now`.
    pub fn register(&mut self, config: ReserveConfig, now: u64) -> Result<(), LedgerError> {
        if self.reserves.contains_key(&config.asset) {
            return Err(LedgerError::ConfigInvariantViolation(format!(
                "{} is already registered",
                config.asset
            )));
        }

        config.validate()?;

        tracing::debug!(
            asset = %config.asset,
            decimals = config.decimals,
            ltv = %config.ltv,
            liquidation_threshold = %config.liquidation_threshold,
            "Reserve registered"
        );

        self.reserves.insert(
            config.asset.clone(),
            Reserve {
                config,
                state: ReserveState::new(now),
            },
        );
        Ok(())
    }

    pub fn get(&self, asset: &AssetId) -> Result<&Reserve, LedgerError> {
        self.reserves
            .get(asset)
            .ok_or_else(|| LedgerError::UnknownAsset(asset.clone()))
    }

    pub fn get_config(&self, asset: &AssetId) -> Result<&ReserveConfig, LedgerError> {
        self.get(asset).map(|reserve| &reserve.config)
    }

    pub fn contains(&self, asset: &AssetId) -> bool {
        self.reserves.contains_key(asset)
    }

    /// Listed assets in sorted order
    pub fn assets(&self) -> impl Iterator<Item = &AssetId> {
        self.reserves.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reserve> {
        self.reserves.values()
    }

    pub fn len(&self) -> usize {
        self.reserves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reserves.is_empty()
    }

    /// Replace a reserve with a staged copy. The asset must already be listed.
    pub(crate) fn replace(&mut self, reserve: Reserve) {
        if let Some(slot) = self.reserves.get_mut(reserve.asset()) {
            *slot = reserve;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config(asset: &str, ltv: u16, threshold: u16) -> ReserveConfig {
        ReserveConfig::new(
            AssetId::new(asset),
            6,
            BasisPoints::new(ltv),
            BasisPoints::new(threshold),
            BasisPoints::new(500),
            RateParams::default(),
        )
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ReserveRegistry::new();
        registry.register(config("USDC", 8_000, 8_500), 100).unwrap();

        let reserve = registry.get(&AssetId::new("USDC")).unwrap();
        assert_eq!(reserve.state.liquidity_index(), Decimal::ONE);
        assert_eq!(reserve.state.borrow_index(), Decimal::ONE);
        assert_eq!(reserve.state.last_update(), 100);
        assert_eq!(reserve.total_supplied(), Decimal::ZERO);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_asset() {
        let registry = ReserveRegistry::new();
        let result = registry.get_config(&AssetId::new("WETH"));
        assert_eq!(result, Err(LedgerError::UnknownAsset(AssetId::new("WETH"))));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = ReserveRegistry::new();
        registry.register(config("USDC", 8_000, 8_500), 0).unwrap();
        let result = registry.register(config("USDC", 7_000, 7_500), 0);
        assert!(matches!(result, Err(LedgerError::ConfigInvariantViolation(_))));
    }

    #[test]
    fn test_ltv_must_be_below_threshold() {
        let mut registry = ReserveRegistry::new();
        assert!(registry.register(config("USDC", 8_500, 8_500), 0).is_err());
        assert!(registry.register(config("USDC", 9_000, 8_500), 0).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_threshold_capped_at_one_hundred_percent() {
        let mut registry = ReserveRegistry::new();
        assert!(registry.register(config("USDC", 9_000, 10_001), 0).is_err());
        assert!(registry.register(config("USDC", 9_000, 10_000), 0).is_ok());
    }

    #[test]
    fn test_decimals_and_rate_validated() {
        let mut registry = ReserveRegistry::new();

        let mut too_precise = config("SHIB", 5_000, 6_000);
        too_precise.decimals = 24;
        assert!(registry.register(too_precise, 0).is_err());

        let mut bad_rate = config("DAI", 5_000, 6_000);
        bad_rate.rate.optimal_utilization = dec!(1.5);
        assert!(matches!(
            registry.register(bad_rate, 0),
            Err(LedgerError::ConfigInvariantViolation(msg)) if msg.starts_with("DAI")
        ));
    }

    #[test]
    fn test_assets_sorted() {
        let mut registry = ReserveRegistry::new();
        registry.register(config("WETH", 8_000, 8_250), 0).unwrap();
        registry.register(config("DAI", 7_500, 8_000), 0).unwrap();
        registry.register(config("USDC", 8_000, 8_500), 0).unwrap();

        let assets: Vec<&str> = registry.assets().map(AssetId::as_str).collect();
        assert_eq!(assets, vec!["DAI", "USDC", "WETH"]);
    }

    #[test]
    fn test_config_json_defaults() {
        let json = r#"{
            "asset": "weth",
            "decimals": 18,
            "ltv": 8000,
            "liquidation_threshold": 8250,
            "liquidation_bonus": 500
        }"#;
        let config: ReserveConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.asset, AssetId::new("WETH"));
        assert_eq!(config.rate, RateParams::default());
        assert_eq!(config.supply_cap, None);
        assert!(config.validate().is_ok());
    }
}
