//! BiLend Pool - Operation processor and pool wiring
//!
//! `OperationProcessor` is the single writer of the ledger: each supply,
//! withdraw, borrow, repay and liquidation is staged, checked against a fresh
//! risk snapshot, settled through the token gateway, committed, and only
//! then published as an event.

pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod processor;
pub mod scenario;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ProtocolConfig;
pub use context::LendingPool;
pub use error::OperationError;
pub use processor::{OperationKind, OperationProcessor};
pub use scenario::{Scenario, ScenarioError, ScenarioReport, Step, StepOutcome};
pub use token::{InMemoryTokens, TokenError, TokenGateway, Transfer};
