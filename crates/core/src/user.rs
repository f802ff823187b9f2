//! UserId - Account identifiers
//!
//! Users are opaque to the core; only a non-empty, whitespace-free
//! identifier is required. Case is preserved.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UserIdError {
    #[error("Empty user id")]
    Empty,

    #[error("User id must not contain whitespace: {0:?}")]
    Whitespace(String),
}

/// Identifier of a protocol user (wallet address, account name, ...)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Build a user id, panicking on invalid input. Meant for fixtures.
    pub fn new(id: &str) -> Self {
        match id.parse() {
            Ok(user) => user,
            Err(e) => panic!("invalid user id {id:?}: {e}"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = UserIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(UserIdError::Empty);
        }
        if s.chars().any(char::is_whitespace) {
            return Err(UserIdError::Whitespace(s.to_string()));
        }
        Ok(UserId(s.to_string()))
    }
}

impl TryFrom<String> for UserId {
    type Error = UserIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<UserId> for String {
    fn from(user: UserId) -> Self {
        user.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_preserved() {
        let user: UserId = "0xAbC".parse().unwrap();
        assert_eq!(user.as_str(), "0xAbC");
    }

    #[test]
    fn test_rejects_empty_and_whitespace() {
        assert_eq!("".parse::<UserId>(), Err(UserIdError::Empty));
        assert!(matches!(
            "alice smith".parse::<UserId>(),
            Err(UserIdError::Whitespace(_))
        ));
    }
}
