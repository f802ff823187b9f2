//! BiLend Core - Domain types
//!
//! This crate contains the fundamental types shared by every BiLend crate:
//! - `Amount`: Non-negative token quantity
//! - `AssetId`: Reserve asset code
//! - `UserId`: Account identifier
//! - `BasisPoints`: Risk parameter ratios

pub mod amount;
pub mod asset;
pub mod bps;
pub mod user;

pub use amount::{Amount, AmountError};
pub use asset::{AssetError, AssetId};
pub use bps::{BasisPoints, BpsError, BPS_DENOMINATOR};
pub use user::{UserId, UserIdError};
