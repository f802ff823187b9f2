//! BiLend Price Oracle
//!
//! Provides USD prices for collateral and debt valuation.
//! `MockOracle` serves tests and the simulator; production feeds
//! implement `PriceOracle`.

mod error;
mod mock;
mod types;

pub use error::OracleError;
pub use mock::MockOracle;
pub use types::{PriceOracle, PriceQuote, PRICE_DECIMALS};
