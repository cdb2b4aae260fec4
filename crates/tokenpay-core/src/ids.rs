//! Identifier types for tokenpay.
//!
//! This module provides strongly-typed identifiers for users and ledger
//! transactions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, OnceLock};
use ulid::{Generator, Ulid};

/// Maximum accepted length of a user identifier, in bytes.
pub const MAX_USER_ID_LEN: usize = 128;

/// A user identifier issued by the authentication provider.
///
/// User IDs are opaque strings taken from the bearer token's subject claim and
/// echoed back by the payments provider as the checkout session's
/// `client_reference_id`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the raw bytes of the identifier.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl FromStr for UserId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(IdError::Empty);
        }
        if s.len() > MAX_USER_ID_LEN {
            return Err(IdError::TooLong);
        }
        // The store uses NUL as the separator in composite index keys.
        if s.chars().any(char::is_control) {
            return Err(IdError::InvalidCharacter);
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl AsRef<[u8]> for UserId {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// A transaction identifier using ULID for time-ordering.
///
/// Transaction IDs are time-ordered to allow efficient range queries
/// and natural chronological sorting.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId(Ulid);

impl TransactionId {
    /// Generate a new `TransactionId` with the current timestamp.
    ///
    /// IDs are strictly increasing within the process, including IDs minted
    /// in the same millisecond.
    #[must_use]
    pub fn generate() -> Self {
        static GENERATOR: OnceLock<Mutex<Generator>> = OnceLock::new();

        let generated = GENERATOR
            .get_or_init(|| Mutex::new(Generator::new()))
            .lock()
            .ok()
            .and_then(|mut generator| generator.generate().ok());
        Self(generated.unwrap_or_else(Ulid::new))
    }

    /// Return the bytes of the ULID (16 bytes).
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 16] {
        self.0.to_bytes()
    }

    /// Create a `TransactionId` from bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Ulid::from_bytes(bytes))
    }
}

impl FromStr for TransactionId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ulid = Ulid::from_string(s).map_err(|_| IdError::InvalidUlid)?;
        Ok(Self(ulid))
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.0)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TransactionId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TransactionId> for String {
    fn from(id: TransactionId) -> Self {
        id.0.to_string()
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is empty.
    #[error("identifier is empty")]
    Empty,

    /// The input exceeds the maximum identifier length.
    #[error("identifier exceeds {MAX_USER_ID_LEN} bytes")]
    TooLong,

    /// The input contains control characters.
    #[error("identifier contains control characters")]
    InvalidCharacter,

    /// The input is not a valid ULID.
    #[error("invalid ULID format")]
    InvalidUlid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_accepts_opaque_strings() {
        let id: UserId = "u123".parse().unwrap();
        assert_eq!(id.as_str(), "u123");
        assert_eq!(id.to_string(), "u123");

        let oid: UserId = "65f1c0ffee0000000000abcd".parse().unwrap();
        assert_eq!(oid.as_bytes().len(), 24);
    }

    #[test]
    fn user_id_rejects_empty_and_control_chars() {
        assert_eq!("".parse::<UserId>(), Err(IdError::Empty));
        assert_eq!("u\0123".parse::<UserId>(), Err(IdError::InvalidCharacter));
        assert_eq!(
            "x".repeat(MAX_USER_ID_LEN + 1).parse::<UserId>(),
            Err(IdError::TooLong)
        );
    }

    #[test]
    fn user_id_serde_json() {
        let id: UserId = "u123".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"u123\"");
        let parsed: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);

        assert!(serde_json::from_str::<UserId>("\"\"").is_err());
    }

    #[test]
    fn transaction_id_roundtrip() {
        let id = TransactionId::generate();
        let parsed = TransactionId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert_eq!(TransactionId::from_bytes(id.to_bytes()), id);
    }

    #[test]
    fn transaction_ids_increase_within_a_millisecond() {
        let ids: Vec<_> = (0..1_000).map(|_| TransactionId::generate().to_bytes()).collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn transaction_id_rejects_garbage() {
        assert_eq!(
            "not-a-ulid".parse::<TransactionId>(),
            Err(IdError::InvalidUlid)
        );
    }
}
