//! Errors raised by the transaction graph.

use thiserror::Error;

use secflow_core::AccountId;

/// Errors from graph construction and path enumeration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The account is not a node of the graph.
    #[error("account {0} is not in the transaction graph")]
    UnknownAccount(AccountId),

    /// The account was added twice.
    #[error("account {0} is already in the transaction graph")]
    DuplicateAccount(AccountId),

    /// A trade link from an account to itself.
    #[error("account {0} cannot trade with itself")]
    SelfLink(AccountId),
}
