//! Operation processor - the only writer of the ledger
//!
//! Every operation is one atomic transition over an explicitly passed
//! `&mut LedgerStore`:
//!
//! stage → accrue touched reserves → validate → move tokens → commit → emit
//!
//! Anything that fails before the commit drops the stage, so the store is
//! left exactly as it was.

use bilend_core::{Amount, AssetId, UserId};
use bilend_events::{EventRecord, EventSink, LendingEvent};
use bilend_ledger::{
    InterestRateModel, LedgerStore, LedgerView, ReserveConfig, ReserveSummary, StagedLedger,
};
use bilend_oracle::PriceOracle;
use bilend_risk::{
    AccountSnapshot, LiquidationConfig, LiquidationLeg, LiquidationQuote, RiskEngine,
    LIQUIDATION_THRESHOLD,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use strum_macros::Display;

use crate::clock::Clock;
use crate::error::OperationError;
use crate::token::{TokenGateway, Transfer};

/// Operation names, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum OperationKind {
    Supply,
    Withdraw,
    Borrow,
    Repay,
    Liquidate,
}

/// Validates and applies balance-changing operations
pub struct OperationProcessor {
    oracle: Arc<dyn PriceOracle>,
    tokens: Arc<dyn TokenGateway>,
    clock: Arc<dyn Clock>,
    sinks: Vec<Box<dyn EventSink>>,
    liquidation: LiquidationConfig,
    risk: RiskEngine,
    sequence: u64,
}

impl OperationProcessor {
    pub fn new(
        oracle: Arc<dyn PriceOracle>,
        tokens: Arc<dyn TokenGateway>,
        clock: Arc<dyn Clock>,
        liquidation: LiquidationConfig,
    ) -> Result<Self, OperationError> {
        liquidation.validate()?;
        Ok(Self {
            oracle,
            tokens,
            clock,
            sinks: Vec::new(),
            liquidation,
            risk: RiskEngine::new(),
            sequence: 0,
        })
    }

    /// Register an event sink
    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        tracing::debug!(sink = sink.name(), "Event sink registered");
        self.sinks.push(sink);
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn liquidation_config(&self) -> &LiquidationConfig {
        &self.liquidation
    }

    /// Sequence of the last emitted event (0 before the first)
    pub fn last_sequence(&self) -> u64 {
        self.sequence
    }

    // === Operations ===

    /// Deposit `amount` of `asset` from `user`, credited to `on_behalf_of`
    pub fn supply(
        &mut self,
        store: &mut LedgerStore,
        user: &UserId,
        asset: &AssetId,
        amount: Decimal,
        on_behalf_of: &UserId,
    ) -> Result<(), OperationError> {
        let result = self.try_supply(store, user, asset, amount, on_behalf_of);
        rejected(OperationKind::Supply, user, asset, result)
    }

    fn try_supply(
        &mut self,
        store: &mut LedgerStore,
        user: &UserId,
        asset: &AssetId,
        amount: Decimal,
        on_behalf_of: &UserId,
    ) -> Result<(), OperationError> {
        let now = self.clock.now();
        let mut stage = store.stage();
        let amount = validate_amount(&stage, asset, amount)?;

        stage.accrue(asset, now)?;

        let reserve = stage.reserve(asset)?;
        let total = reserve
            .total_supplied()
            .checked_add(amount)
            .ok_or_else(|| OperationError::Overflow {
                asset: asset.clone(),
            })?;
        if let Some(cap) = reserve.config.supply_cap {
            if total > cap {
                return Err(OperationError::SupplyCapExceeded {
                    asset: asset.clone(),
                    cap,
                    total,
                });
            }
        }
        // Every position in the reserve must stay valuable in USD
        self.oracle.get_price(asset)?.value_of(total)?;

        stage.increase_supply(on_behalf_of, asset, amount)?;
        let delta = stage.into_delta();

        self.tokens.debit(user, asset, amount)?;
        store.commit(delta);

        self.committed(
            OperationKind::Supply,
            now,
            LendingEvent::Supply {
                user: user.clone(),
                on_behalf_of: on_behalf_of.clone(),
                asset: asset.clone(),
                amount,
            },
        );
        Ok(())
    }

    /// Redeem `amount` of `user`'s supply, sending the tokens to `to`
    pub fn withdraw(
        &mut self,
        store: &mut LedgerStore,
        user: &UserId,
        asset: &AssetId,
        amount: Decimal,
        to: &UserId,
    ) -> Result<(), OperationError> {
        let result = self.try_withdraw(store, user, asset, amount, to);
        rejected(OperationKind::Withdraw, user, asset, result)
    }

    fn try_withdraw(
        &mut self,
        store: &mut LedgerStore,
        user: &UserId,
        asset: &AssetId,
        amount: Decimal,
        to: &UserId,
    ) -> Result<(), OperationError> {
        let now = self.clock.now();
        let mut stage = store.stage();
        let amount = validate_amount(&stage, asset, amount)?;

        stage.accrue_for_user(user, &[asset], now)?;

        let balance = stage.supply_balance(user, asset)?;
        if amount > balance {
            return Err(OperationError::InsufficientBalance {
                user: user.clone(),
                asset: asset.clone(),
                available: balance,
                requested: amount,
            });
        }

        let available = stage.reserve(asset)?.available_liquidity();
        if amount > available {
            return Err(OperationError::InsufficientLiquidity {
                asset: asset.clone(),
                available,
                requested: amount,
            });
        }

        stage.decrease_supply(user, asset, amount)?;

        let snapshot = self.risk.snapshot(&stage, self.oracle.as_ref(), user)?;
        if snapshot.has_debt() && snapshot.health_factor.is_below(LIQUIDATION_THRESHOLD) {
            return Err(OperationError::WithdrawBreaksHealthFactor {
                user: user.clone(),
                health_factor: snapshot.health_factor,
            });
        }

        let delta = stage.into_delta();

        self.tokens.credit(to, asset, amount)?;
        store.commit(delta);

        self.committed(
            OperationKind::Withdraw,
            now,
            LendingEvent::Withdraw {
                user: user.clone(),
                to: to.clone(),
                asset: asset.clone(),
                amount,
            },
        );
        Ok(())
    }

    /// Open `amount` of `asset` debt for `user`, sending the tokens to `to`
    pub fn borrow(
        &mut self,
        store: &mut LedgerStore,
        user: &UserId,
        asset: &AssetId,
        amount: Decimal,
        to: &UserId,
    ) -> Result<(), OperationError> {
        let result = self.try_borrow(store, user, asset, amount, to);
        rejected(OperationKind::Borrow, user, asset, result)
    }

    fn try_borrow(
        &mut self,
        store: &mut LedgerStore,
        user: &UserId,
        asset: &AssetId,
        amount: Decimal,
        to: &UserId,
    ) -> Result<(), OperationError> {
        let now = self.clock.now();
        let mut stage = store.stage();
        let amount = validate_amount(&stage, asset, amount)?;

        stage.accrue_for_user(user, &[asset], now)?;

        if !stage.supply_balance(user, asset)?.is_zero() {
            return Err(OperationError::SelfCollateralBorrowRejected {
                user: user.clone(),
                asset: asset.clone(),
            });
        }

        let snapshot = self.risk.snapshot(&stage, self.oracle.as_ref(), user)?;
        let requested_usd = self.oracle.get_price(asset)?.value_of(amount)?;
        if requested_usd > snapshot.available_borrows_usd {
            return Err(OperationError::BorrowExceedsLimit {
                user: user.clone(),
                requested_usd,
                available_usd: snapshot.available_borrows_usd,
            });
        }

        let reserve = stage.reserve(asset)?;
        let available = reserve.available_liquidity();
        if amount > available {
            return Err(OperationError::InsufficientLiquidity {
                asset: asset.clone(),
                available,
                requested: amount,
            });
        }

        if let Some(cap) = reserve.config.borrow_cap {
            let total = reserve
                .total_borrowed()
                .checked_add(amount)
                .ok_or_else(|| OperationError::Overflow {
                    asset: asset.clone(),
                })?;
            if total > cap {
                return Err(OperationError::BorrowCapExceeded {
                    asset: asset.clone(),
                    cap,
                    total,
                });
            }
        }

        stage.increase_borrow(user, asset, amount)?;
        let borrow_rate = {
            let reserve = stage.reserve(asset)?;
            reserve.config.rate.borrow_rate(reserve.utilization())
        };
        let delta = stage.into_delta();

        self.tokens.credit(to, asset, amount)?;
        store.commit(delta);

        self.committed(
            OperationKind::Borrow,
            now,
            LendingEvent::Borrow {
                user: user.clone(),
                to: to.clone(),
                asset: asset.clone(),
                amount,
                borrow_rate,
            },
        );
        Ok(())
    }

    /// Repay up to `amount` of `on_behalf_of`'s debt with `user`'s tokens.
    ///
    /// Returns the amount actually repaid: never more than the debt.
    pub fn repay(
        &mut self,
        store: &mut LedgerStore,
        user: &UserId,
        asset: &AssetId,
        amount: Decimal,
        on_behalf_of: &UserId,
    ) -> Result<Decimal, OperationError> {
        let result = self.try_repay(store, user, asset, amount, on_behalf_of);
        rejected(OperationKind::Repay, user, asset, result)
    }

    fn try_repay(
        &mut self,
        store: &mut LedgerStore,
        user: &UserId,
        asset: &AssetId,
        amount: Decimal,
        on_behalf_of: &UserId,
    ) -> Result<Decimal, OperationError> {
        let now = self.clock.now();
        let mut stage = store.stage();
        let amount = validate_amount(&stage, asset, amount)?;

        stage.accrue(asset, now)?;

        let debt = stage.borrow_balance(on_behalf_of, asset)?;
        if debt.is_zero() {
            return Err(OperationError::NoDebtToRepay {
                user: on_behalf_of.clone(),
                asset: asset.clone(),
            });
        }

        let repaid = amount.min(debt);
        stage.decrease_borrow(on_behalf_of, asset, repaid)?;
        let delta = stage.into_delta();

        self.tokens.debit(user, asset, repaid)?;
        store.commit(delta);

        self.committed(
            OperationKind::Repay,
            now,
            LendingEvent::Repay {
                user: user.clone(),
                on_behalf_of: on_behalf_of.clone(),
                asset: asset.clone(),
                amount: repaid,
            },
        );
        Ok(repaid)
    }

    /// Cover part of `user`'s `debt_asset` debt and seize bonus-adjusted
    /// `collateral_asset` collateral in return
    pub fn liquidate(
        &mut self,
        store: &mut LedgerStore,
        liquidator: &UserId,
        user: &UserId,
        debt_asset: &AssetId,
        collateral_asset: &AssetId,
        debt_to_cover: Decimal,
    ) -> Result<LiquidationQuote, OperationError> {
        let result = self.try_liquidate(
            store,
            liquidator,
            user,
            debt_asset,
            collateral_asset,
            debt_to_cover,
        );
        rejected(OperationKind::Liquidate, user, debt_asset, result)
    }

    fn try_liquidate(
        &mut self,
        store: &mut LedgerStore,
        liquidator: &UserId,
        user: &UserId,
        debt_asset: &AssetId,
        collateral_asset: &AssetId,
        debt_to_cover: Decimal,
    ) -> Result<LiquidationQuote, OperationError> {
        if liquidator == user {
            return Err(OperationError::SelfLiquidation(user.clone()));
        }

        let now = self.clock.now();
        let mut stage = store.stage();
        let debt_to_cover = validate_amount(&stage, debt_asset, debt_to_cover)?;
        stage.reserve(collateral_asset)?;

        stage.accrue_for_user(user, &[debt_asset, collateral_asset], now)?;

        let snapshot = self.risk.snapshot(&stage, self.oracle.as_ref(), user)?;
        if !snapshot.health_factor.is_below(LIQUIDATION_THRESHOLD) {
            return Err(OperationError::HealthFactorAboveLiquidationThreshold {
                user: user.clone(),
                health_factor: snapshot.health_factor,
            });
        }

        let quote = {
            let debt_reserve = stage.reserve(debt_asset)?;
            let collateral_reserve = stage.reserve(collateral_asset)?;

            let quote = LiquidationQuote::compute(
                &self.liquidation,
                LiquidationLeg {
                    reserve: &debt_reserve.config,
                    balance: stage.borrow_balance(user, debt_asset)?,
                    price: self.oracle.get_price(debt_asset)?.price,
                },
                LiquidationLeg {
                    reserve: &collateral_reserve.config,
                    balance: stage.supply_balance(user, collateral_asset)?,
                    price: self.oracle.get_price(collateral_asset)?.price,
                },
                debt_to_cover,
            )?;

            let available = collateral_reserve.available_liquidity();
            if quote.collateral_seized > available {
                return Err(OperationError::InsufficientLiquidity {
                    asset: collateral_asset.clone(),
                    available,
                    requested: quote.collateral_seized,
                });
            }
            quote
        };

        stage.decrease_borrow(user, debt_asset, quote.debt_to_cover)?;
        stage.decrease_supply(user, collateral_asset, quote.collateral_seized)?;
        let delta = stage.into_delta();

        self.tokens.settle(&[
            Transfer::Debit {
                user: liquidator.clone(),
                asset: debt_asset.clone(),
                amount: quote.debt_to_cover,
            },
            Transfer::Credit {
                user: liquidator.clone(),
                asset: collateral_asset.clone(),
                amount: quote.collateral_seized,
            },
        ])?;
        store.commit(delta);

        self.committed(
            OperationKind::Liquidate,
            now,
            LendingEvent::Liquidation {
                liquidator: liquidator.clone(),
                user: user.clone(),
                debt_asset: debt_asset.clone(),
                collateral_asset: collateral_asset.clone(),
                debt_covered: quote.debt_to_cover,
                collateral_seized: quote.collateral_seized,
            },
        );
        Ok(quote)
    }

    // === Queries ===

    /// Account data valued at the current time. Does not mutate the store.
    pub fn user_account_data(
        &self,
        store: &LedgerStore,
        user: &UserId,
    ) -> Result<AccountSnapshot, OperationError> {
        let stage = self.accrued_stage(store, user, &[])?;
        Ok(self.risk.snapshot(&stage, self.oracle.as_ref(), user)?)
    }

    pub fn reserve_config(
        &self,
        store: &LedgerStore,
        asset: &AssetId,
    ) -> Result<ReserveConfig, OperationError> {
        Ok(store.reserves().get_config(asset)?.clone())
    }

    /// Reserve totals, rates and indices at the current time
    pub fn reserve_state(
        &self,
        store: &LedgerStore,
        asset: &AssetId,
    ) -> Result<ReserveSummary, OperationError> {
        let mut stage = store.stage();
        stage.accrue(asset, self.clock.now())?;
        Ok(stage.reserve(asset)?.summary())
    }

    pub fn supply_balance(
        &self,
        store: &LedgerStore,
        user: &UserId,
        asset: &AssetId,
    ) -> Result<Decimal, OperationError> {
        let stage = self.accrued_stage(store, user, &[asset])?;
        Ok(stage.supply_balance(user, asset)?)
    }

    pub fn borrow_balance(
        &self,
        store: &LedgerStore,
        user: &UserId,
        asset: &AssetId,
    ) -> Result<Decimal, OperationError> {
        let stage = self.accrued_stage(store, user, &[asset])?;
        Ok(stage.borrow_balance(user, asset)?)
    }

    fn accrued_stage<'a>(
        &self,
        store: &'a LedgerStore,
        user: &UserId,
        extra: &[&AssetId],
    ) -> Result<StagedLedger<'a>, OperationError> {
        let mut stage = store.stage();
        stage.accrue_for_user(user, extra, self.clock.now())?;
        Ok(stage)
    }

    // === Events ===

    fn committed(&mut self, kind: OperationKind, timestamp: u64, event: LendingEvent) {
        self.sequence += 1;
        let record = EventRecord::new(self.sequence, timestamp, event);

        tracing::info!(
            operation = %kind,
            user = %record.event.position_owner(),
            sequence = record.sequence,
            "Operation committed"
        );

        for sink in &self.sinks {
            if let Err(e) = sink.handle(&record) {
                tracing::warn!(
                    sink = sink.name(),
                    sequence = record.sequence,
                    error = %e,
                    "Event sink failed"
                );
            }
        }
    }
}

/// Check an operation amount against the asset's reserve
fn validate_amount<V: LedgerView + ?Sized>(
    view: &V,
    asset: &AssetId,
    amount: Decimal,
) -> Result<Decimal, OperationError> {
    let decimals = view.reserve(asset)?.decimals();
    let amount = Amount::positive(amount)
        .and_then(|amount| amount.ensure_precision(decimals))
        .map_err(|e| OperationError::InvalidAmount {
            asset: asset.clone(),
            amount,
            reason: e.to_string(),
        })?;
    Ok(amount.value())
}

/// Log a rejected operation and pass the result through
fn rejected<T>(
    kind: OperationKind,
    user: &UserId,
    asset: &AssetId,
    result: Result<T, OperationError>,
) -> Result<T, OperationError> {
    if let Err(e) = &result {
        tracing::warn!(
            operation = %kind,
            user = %user,
            asset = %asset,
            error = %e,
            "Operation rejected"
        );
    }
    result
}
