//! Scripted simulations
//!
//! A scenario is a JSON document: a protocol config, starting prices, and a
//! list of steps run in order against a fresh in-memory pool. Rejected
//! operations are recorded in the report rather than aborting the run.

use bilend_core::{AssetId, UserId};
use bilend_events::{EventLog, EventRecord, EventSink};
use bilend_oracle::{MockOracle, OracleError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::clock::{Clock, ManualClock};
use crate::config::ProtocolConfig;
use crate::context::LendingPool;
use crate::error::OperationError;
use crate::token::{InMemoryTokens, TokenGateway};

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid scenario: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Pool setup failed: {0}")]
    Setup(#[from] OperationError),

    #[error("Price update failed: {0}")]
    Oracle(#[from] OracleError),
}

/// A scripted run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unix seconds at which reserves are registered
    #[serde(default)]
    pub start_time: u64,

    #[serde(default)]
    pub config: ProtocolConfig,

    /// Initial USD prices
    #[serde(default)]
    pub prices: BTreeMap<AssetId, Decimal>,

    pub steps: Vec<Step>,
}

/// One scenario step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Mint tokens into a wallet
    Fund {
        user: UserId,
        asset: AssetId,
        amount: Decimal,
    },
    SetPrice {
        asset: AssetId,
        price: Decimal,
    },
    /// Move the clock forward
    Advance {
        seconds: u64,
    },
    Supply {
        user: UserId,
        asset: AssetId,
        amount: Decimal,
        #[serde(default)]
        on_behalf_of: Option<UserId>,
    },
    Withdraw {
        user: UserId,
        asset: AssetId,
        amount: Decimal,
        #[serde(default)]
        to: Option<UserId>,
    },
    Borrow {
        user: UserId,
        asset: AssetId,
        amount: Decimal,
        #[serde(default)]
        to: Option<UserId>,
    },
    Repay {
        user: UserId,
        asset: AssetId,
        amount: Decimal,
        #[serde(default)]
        on_behalf_of: Option<UserId>,
    },
    Liquidate {
        liquidator: UserId,
        user: UserId,
        debt_asset: AssetId,
        collateral_asset: AssetId,
        debt_to_cover: Decimal,
    },
    /// Report a user's account data
    Account {
        user: UserId,
    },
    /// Report a reserve's state
    Reserve {
        asset: AssetId,
    },
}

/// What happened at one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Ok {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<serde_json::Value>,
    },
    Rejected {
        error: String,
    },
}

impl StepOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, StepOutcome::Ok { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub index: usize,
    pub time: u64,
    pub step: Step,
    pub outcome: StepOutcome,
}

/// Result of a scenario run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub steps: Vec<StepReport>,
    pub events: Vec<EventRecord>,
}

impl ScenarioReport {
    pub fn rejected(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|report| !report.outcome.is_ok())
    }
}

impl Scenario {
    pub fn from_file(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Run every step against a fresh pool. Extra sinks receive every event.
    pub fn run(&self, sinks: Vec<Box<dyn EventSink>>) -> Result<ScenarioReport, ScenarioError> {
        let oracle = Arc::new(MockOracle::with_prices(
            self.prices.iter().map(|(asset, price)| (asset.clone(), *price)),
        )?);
        let tokens = Arc::new(InMemoryTokens::new());
        let clock = Arc::new(ManualClock::new(self.start_time));

        let mut pool = LendingPool::new(
            self.config.clone(),
            oracle.clone(),
            tokens.clone(),
            clock.clone(),
        )?;

        let log = EventLog::new();
        pool.add_sink(Box::new(log.clone()));
        for sink in sinks {
            pool.add_sink(sink);
        }

        let mut steps = Vec::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            let outcome = match step {
                Step::Fund {
                    user,
                    asset,
                    amount,
                } => {
                    tokens.mint(user, asset, *amount);
                    ok(tokens.balance_of(user, asset))
                }
                Step::SetPrice { asset, price } => {
                    oracle.set_price(asset.clone(), *price)?;
                    ok(price)
                }
                Step::Advance { seconds } => ok(clock.advance(*seconds)),
                Step::Supply {
                    user,
                    asset,
                    amount,
                    on_behalf_of,
                } => from_result(pool.supply(user, asset, *amount, on_behalf_of.as_ref().unwrap_or(user))),
                Step::Withdraw {
                    user,
                    asset,
                    amount,
                    to,
                } => from_result(pool.withdraw(user, asset, *amount, to.as_ref().unwrap_or(user))),
                Step::Borrow {
                    user,
                    asset,
                    amount,
                    to,
                } => from_result(pool.borrow(user, asset, *amount, to.as_ref().unwrap_or(user))),
                Step::Repay {
                    user,
                    asset,
                    amount,
                    on_behalf_of,
                } => from_result(pool.repay(user, asset, *amount, on_behalf_of.as_ref().unwrap_or(user))),
                Step::Liquidate {
                    liquidator,
                    user,
                    debt_asset,
                    collateral_asset,
                    debt_to_cover,
                } => from_result(pool.liquidate(
                    liquidator,
                    user,
                    debt_asset,
                    collateral_asset,
                    *debt_to_cover,
                )),
                Step::Account { user } => from_result(pool.get_user_account_data(user)),
                Step::Reserve { asset } => from_result(pool.get_reserve_state(asset)),
            };

            steps.push(StepReport {
                index,
                time: clock.now(),
                step: step.clone(),
                outcome,
            });
        }

        Ok(ScenarioReport {
            steps,
            events: log.records(),
        })
    }
}

fn ok<T: Serialize>(detail: T) -> StepOutcome {
    StepOutcome::Ok {
        detail: serde_json::to_value(detail)
            .ok()
            .filter(|value| !value.is_null()),
    }
}

fn from_result<T: Serialize>(result: Result<T, OperationError>) -> StepOutcome {
    match result {
        Ok(value) => ok(value),
        Err(e) => StepOutcome::Rejected {
            error: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SCENARIO: &str = r#"{
        "start_time": 1000,
        "config": {
            "reserves": [
                { "asset": "USDC", "decimals": 6, "ltv": 8000,
                  "liquidation_threshold": 8500, "liquidation_bonus": 500 },
                { "asset": "WETH", "decimals": 18, "ltv": 8000,
                  "liquidation_threshold": 8250, "liquidation_bonus": 500 }
            ]
        },
        "prices": { "USDC": "1", "WETH": "2000" },
        "steps": [
            { "action": "fund", "user": "alice", "asset": "WETH", "amount": "1" },
            { "action": "fund", "user": "bob", "asset": "USDC", "amount": "5000" },
            { "action": "supply", "user": "alice", "asset": "WETH", "amount": "1" },
            { "action": "supply", "user": "bob", "asset": "USDC", "amount": "5000" },
            { "action": "borrow", "user": "alice", "asset": "USDC", "amount": "1601" },
            { "action": "borrow", "user": "alice", "asset": "USDC", "amount": "1600" },
            { "action": "advance", "seconds": 3600 },
            { "action": "account", "user": "alice" }
        ]
    }"#;

    #[test]
    fn test_parse_steps() {
        let scenario: Scenario = serde_json::from_str(SCENARIO).unwrap();
        assert_eq!(scenario.steps.len(), 8);
        assert_eq!(scenario.steps[6], Step::Advance { seconds: 3600 });
        assert_eq!(scenario.prices[&AssetId::new("WETH")], dec!(2000));
    }

    #[test]
    fn test_run_records_rejections() {
        let scenario: Scenario = serde_json::from_str(SCENARIO).unwrap();
        let report = scenario.run(Vec::new()).unwrap();

        let rejected: Vec<usize> = report.rejected().map(|step| step.index).collect();
        assert_eq!(rejected, vec![4]);

        // supply, supply, borrow
        assert_eq!(report.events.len(), 3);
        assert_eq!(report.steps[7].time, 4600);

        let StepOutcome::Ok { detail: Some(account) } = &report.steps[7].outcome else {
            panic!("account step failed");
        };
        assert_eq!(account["user"], "alice");
    }

    #[test]
    fn test_unknown_action_rejected() {
        let json = r#"{ "steps": [ { "action": "teleport" } ] }"#;
        assert!(serde_json::from_str::<Scenario>(json).is_err());
    }
}
