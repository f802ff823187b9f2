//! BiLend Risk Engine - Account health and liquidation math
//!
//! Aggregates a user's positions into a USD-normalized `AccountSnapshot`
//! (collateral, debt, weighted LTV and liquidation threshold, health factor)
//! and prices partial liquidations. Policy lives in the operation processor.

pub mod engine;
pub mod error;
pub mod liquidation;
pub mod snapshot;

pub use engine::{RiskEngine, LIQUIDATION_THRESHOLD};
pub use error::RiskError;
pub use liquidation::{LiquidationConfig, LiquidationLeg, LiquidationQuote, DEFAULT_CLOSE_FACTOR};
pub use snapshot::{AccountSnapshot, AssetExposure, HealthFactor};
