//! # Identity Newtypes
//!
//! Newtype wrappers for the identifiers flowing through the validation
//! pipeline. You cannot pass an `AccountId` where a `Symbol` is expected,
//! nor a `TransactionId` where a `SequenceNumber` is expected.
//!
//! Transaction identifiers and sequence numbers are plain counters rather
//! than random UUIDs: identical transaction sequences must reproduce
//! identical logs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SecflowError;

/// Unique identifier of an account in the economy.
///
/// Non-empty, no surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Create a validated account identifier.
    ///
    /// # Errors
    ///
    /// Rejects empty identifiers and identifiers with leading or trailing
    /// whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, SecflowError> {
        let id = id.into();
        if id.is_empty() {
            return Err(SecflowError::InvalidIdentifier(
                "account id must be non-empty".to_string(),
            ));
        }
        if id.trim() != id {
            return Err(SecflowError::InvalidIdentifier(format!(
                "account id must not carry surrounding whitespace: {id:?}"
            )));
        }
        Ok(Self(id))
    }

    /// Access the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountId {
    type Error = SecflowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a submitted transaction, issued by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// The raw counter value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{:06}", self.0)
    }
}

/// Position of a transaction in the strictly increasing processing order.
///
/// Taxonomy snapshots are keyed by sequence number. `GENESIS` (0) is the
/// slot for mappings configured before the first transaction.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SequenceNumber(pub u64);

impl SequenceNumber {
    /// The genesis slot, before any transaction.
    pub const GENESIS: Self = Self(0);

    /// The raw counter value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The following sequence number, or `None` on overflow.
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl From<u64> for SequenceNumber {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single taxonomy symbol naming one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(pub char);

impl Symbol {
    /// The underlying character.
    pub fn as_char(&self) -> char {
        self.0
    }
}

impl From<char> for Symbol {
    fn from(c: char) -> Self {
        Self(c)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
