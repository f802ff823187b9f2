//! BiLend Ledger - Reserves, interest accrual and user positions
//!
//! Holds the only mutable protocol state:
//! - `ReserveRegistry`: listed assets, their risk configuration and totals
//! - `RateParams`: per-reserve kinked interest rate curve
//! - `ReserveState::accrue`: lazy O(1) index accrual
//! - `LedgerStore` / `StagedLedger`: scaled positions with staged, atomic commits

pub mod accrual;
pub mod error;
pub mod position;
pub mod rate;
pub mod reserve;
pub mod store;

pub use accrual::Accrual;
pub use error::LedgerError;
pub use position::{PositionBook, UserPosition};
pub use rate::{utilization, InterestRateModel, RateParams, SECONDS_PER_YEAR};
pub use reserve::{Reserve, ReserveConfig, ReserveRegistry, ReserveState, ReserveSummary};
pub use store::{LedgerDelta, LedgerStore, LedgerView, StagedLedger};
