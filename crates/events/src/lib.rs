//! BiLend Events - Records of committed operations
//!
//! Every committed supply, withdraw, borrow, repay and liquidation produces
//! one sequenced `EventRecord`, published to each registered `EventSink`.
//! Events are never read back by the core; persistence is the sink's business.

pub mod error;
pub mod event;
pub mod sink;

pub use error::EventError;
pub use event::{EventRecord, LendingEvent};
pub use sink::{EventLog, EventSink, JsonLinesSink};
