//! AssetId - Validated reserve asset codes
//!
//! Reserves, prices and positions are all keyed by `AssetId`. Codes are
//! normalized to upper case so that "eth" and "ETH" address the same reserve.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum length of an asset code
pub const MAX_ASSET_CODE_LEN: usize = 12;

/// Errors that can occur when parsing asset codes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("Empty asset code")]
    EmptyCode,

    #[error("Asset code too long (max 12 chars): {0}")]
    TooLong(String),

    #[error("Invalid asset code format: {0}")]
    InvalidFormat(String),
}

/// Identifier of a listed asset (e.g. `USDC`, `WETH`)
///
/// # Examples
/// ```
/// use bilend_core::AssetId;
///
/// let weth: AssetId = "weth".parse().unwrap();
/// assert_eq!(weth.as_str(), "WETH");
/// assert!("W-ETH".parse::<AssetId>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetId(String);

impl AssetId {
    /// Build an asset id, panicking on invalid input.
    ///
    /// Intended for constants in tests and fixtures; use `parse` for input.
    pub fn new(code: &str) -> Self {
        match code.parse() {
            Ok(asset) => asset,
            Err(e) => panic!("invalid asset code {code:?}: {e}"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AssetId {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_uppercase();

        if s.is_empty() {
            return Err(AssetError::EmptyCode);
        }

        if s.len() > MAX_ASSET_CODE_LEN {
            return Err(AssetError::TooLong(s));
        }

        if !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') {
            return Err(AssetError::InvalidFormat(s));
        }

        Ok(AssetId(s))
    }
}

impl TryFrom<String> for AssetId {
    type Error = AssetError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AssetId> for String {
    fn from(asset: AssetId) -> Self {
        asset.0
    }
}
