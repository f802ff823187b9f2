//! Lending pool - wires the ledger store to its processor

use bilend_core::{AssetId, UserId};
use bilend_events::EventSink;
use bilend_ledger::{LedgerStore, ReserveConfig, ReserveSummary};
use bilend_oracle::PriceOracle;
use bilend_risk::{AccountSnapshot, LiquidationQuote};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::clock::Clock;
use crate::config::ProtocolConfig;
use crate::error::OperationError;
use crate::processor::OperationProcessor;
use crate::token::TokenGateway;

/// A ledger store together with the processor allowed to mutate it.
///
/// All mutating calls take `&mut self`; a service sharing one pool across
/// threads wraps the whole pool in a single lock.
pub struct LendingPool {
    store: LedgerStore,
    processor: OperationProcessor,
}

impl LendingPool {
    /// Build a pool and register every configured reserve at the current time
    pub fn new(
        config: ProtocolConfig,
        oracle: Arc<dyn PriceOracle>,
        tokens: Arc<dyn TokenGateway>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, OperationError> {
        let processor = OperationProcessor::new(oracle, tokens, clock, config.liquidation)?;

        let now = processor.clock().now();
        let mut store = LedgerStore::new();
        for reserve in config.reserves {
            store.register_reserve(reserve, now)?;
        }

        tracing::info!(
            reserves = store.reserves().len(),
            close_factor = %processor.liquidation_config().close_factor,
            "Lending pool initialized"
        );

        Ok(Self { store, processor })
    }

    /// List an additional reserve
    pub fn register_reserve(&mut self, config: ReserveConfig) -> Result<(), OperationError> {
        let now = self.processor.clock().now();
        Ok(self.store.register_reserve(config, now)?)
    }

    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.processor.add_sink(sink);
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn processor(&self) -> &OperationProcessor {
        &self.processor
    }

    pub fn supply(
        &mut self,
        user: &UserId,
        asset: &AssetId,
        amount: Decimal,
        on_behalf_of: &UserId,
    ) -> Result<(), OperationError> {
        self.processor
            .supply(&mut self.store, user, asset, amount, on_behalf_of)
    }

    pub fn withdraw(
        &mut self,
        user: &UserId,
        asset: &AssetId,
        amount: Decimal,
        to: &UserId,
    ) -> Result<(), OperationError> {
        self.processor
            .withdraw(&mut self.store, user, asset, amount, to)
    }

    pub fn borrow(
        &mut self,
        user: &UserId,
        asset: &AssetId,
        amount: Decimal,
        to: &UserId,
    ) -> Result<(), OperationError> {
        self.processor.borrow(&mut self.store, user, asset, amount, to)
    }

    pub fn repay(
        &mut self,
        user: &UserId,
        asset: &AssetId,
        amount: Decimal,
        on_behalf_of: &UserId,
    ) -> Result<Decimal, OperationError> {
        self.processor
            .repay(&mut self.store, user, asset, amount, on_behalf_of)
    }

    pub fn liquidate(
        &mut self,
        liquidator: &UserId,
        user: &UserId,
        debt_asset: &AssetId,
        collateral_asset: &AssetId,
        debt_to_cover: Decimal,
    ) -> Result<LiquidationQuote, OperationError> {
        self.processor.liquidate(
            &mut self.store,
            liquidator,
            user,
            debt_asset,
            collateral_asset,
            debt_to_cover,
        )
    }

    pub fn get_user_account_data(&self, user: &UserId) -> Result<AccountSnapshot, OperationError> {
        self.processor.user_account_data(&self.store, user)
    }

    pub fn get_reserve_config(&self, asset: &AssetId) -> Result<ReserveConfig, OperationError> {
        self.processor.reserve_config(&self.store, asset)
    }

    pub fn get_reserve_state(&self, asset: &AssetId) -> Result<ReserveSummary, OperationError> {
        self.processor.reserve_state(&self.store, asset)
    }

    pub fn supply_balance(&self, user: &UserId, asset: &AssetId) -> Result<Decimal, OperationError> {
        self.processor.supply_balance(&self.store, user, asset)
    }

    pub fn borrow_balance(&self, user: &UserId, asset: &AssetId) -> Result<Decimal, OperationError> {
        self.processor.borrow_balance(&self.store, user, asset)
    }
}
