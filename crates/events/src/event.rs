//! Lending events emitted after each committed operation

use bilend_core::{AssetId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Balance-changing operations, as observed after commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LendingEvent {
    /// Tokens deposited by `user` and credited to `on_behalf_of`
    Supply {
        user: UserId,
        on_behalf_of: UserId,
        asset: AssetId,
        amount: Decimal,
    },

    /// Supply redeemed by `user` and sent to `to`
    Withdraw {
        user: UserId,
        to: UserId,
        asset: AssetId,
        amount: Decimal,
    },

    /// Debt opened by `user`, tokens sent to `to`
    Borrow {
        user: UserId,
        to: UserId,
        asset: AssetId,
        amount: Decimal,
        /// Annual borrow rate after the operation
        borrow_rate: Decimal,
    },

    /// Debt of `on_behalf_of` reduced with tokens from `user`
    Repay {
        user: UserId,
        on_behalf_of: UserId,
        asset: AssetId,
        amount: Decimal,
    },

    /// Part of `user`'s debt covered by `liquidator` in exchange for collateral
    Liquidation {
        liquidator: UserId,
        user: UserId,
        debt_asset: AssetId,
        collateral_asset: AssetId,
        debt_covered: Decimal,
        collateral_seized: Decimal,
    },
}

impl LendingEvent {
    /// The account whose position changed
    pub fn position_owner(&self) -> &UserId {
        match self {
            LendingEvent::Supply { on_behalf_of, .. } => on_behalf_of,
            LendingEvent::Withdraw { user, .. } => user,
            LendingEvent::Borrow { user, .. } => user,
            LendingEvent::Repay { on_behalf_of, .. } => on_behalf_of,
            LendingEvent::Liquidation { user, .. } => user,
        }
    }
}

/// A sequenced, timestamped event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Strictly increasing per processor, starting at 1
    pub sequence: u64,
    /// Unix seconds of the operation
    pub timestamp: u64,
    #[serde(flatten)]
    pub event: LendingEvent,
}

impl EventRecord {
    pub fn new(sequence: u64, timestamp: u64, event: LendingEvent) -> Self {
        Self {
            sequence,
            timestamp,
            event,
        }
    }

    /// Timestamp as a UTC date-time, if representable
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.timestamp).ok()?;
        DateTime::from_timestamp(secs, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn supply() -> LendingEvent {
        LendingEvent::Supply {
            user: UserId::new("alice"),
            on_behalf_of: UserId::new("bob"),
            asset: AssetId::new("USDC"),
            amount: dec!(100),
        }
    }

    #[test]
    fn test_display_kind() {
        assert_eq!(supply().to_string(), "supply");
        let liquidation = LendingEvent::Liquidation {
            liquidator: UserId::new("carol"),
            user: UserId::new("alice"),
            debt_asset: AssetId::new("USDC"),
            collateral_asset: AssetId::new("WETH"),
            debt_covered: dec!(500),
            collateral_seized: dec!(0.2625),
        };
        assert_eq!(liquidation.to_string(), "liquidation");
        assert_eq!(liquidation.position_owner(), &UserId::new("alice"));
    }

    #[test]
    fn test_position_owner_is_beneficiary() {
        assert_eq!(supply().position_owner(), &UserId::new("bob"));
    }

    #[test]
    fn test_record_json_shape() {
        let record = EventRecord::new(7, 1_700_000_000, supply());
        let json: serde_json::Value = serde_json::to_value(&record).unwrap();

        assert_eq!(json["sequence"], 7);
        assert_eq!(json["type"], "supply");
        assert_eq!(json["asset"], "USDC");
        assert_eq!(json["amount"], "100");

        let parsed: EventRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_recorded_at() {
        let record = EventRecord::new(1, 86_400, supply());
        let at = record.recorded_at().unwrap();
        assert_eq!(at.format("%Y-%m-%d").to_string(), "1970-01-02");
    }
}
