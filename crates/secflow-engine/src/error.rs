//! Pipeline-level errors, aggregating every stage crate.
//!
//! `Infeasible` is a verdict and never appears here.

use thiserror::Error;

use secflow_automaton::AutomatonError;
use secflow_core::{AccountId, ConfigError, SecflowError, Sector, SequenceNumber, Symbol, TransactionId};
use secflow_graph::GraphError;
use secflow_lp::LpError;
use secflow_state::{DynValidationState, StateError};
use secflow_taxonomy::TaxonomyError;

/// Errors raised by the [`Orchestrator`](crate::Orchestrator).
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration failed validation.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A core primitive rejected a value.
    #[error(transparent)]
    Core(#[from] SecflowError),

    /// Allocation or taxonomy failure.
    #[error("taxonomy error: {0}")]
    Taxonomy(#[from] TaxonomyError),

    /// Classifier compilation failure.
    #[error("automaton error: {0}")]
    Automaton(#[from] AutomatonError),

    /// Graph failure.
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// Constraint building or solver failure.
    #[error("lp error: {0}")]
    Lp(#[from] LpError),

    /// Runtime lifecycle check failed.
    #[error("lifecycle error: {0}")]
    State(#[from] StateError),

    /// The account is not registered.
    #[error("unknown account: {0}")]
    UnknownAccount(AccountId),

    /// The account is already registered.
    #[error("account already exists: {0}")]
    DuplicateAccount(AccountId),

    /// No transaction with this id was submitted.
    #[error("unknown transaction: {0}")]
    UnknownTransaction(TransactionId),

    /// An earlier transaction is still awaiting its verdict.
    #[error("transaction {requested} validated out of order, {expected} is next")]
    OutOfOrder {
        /// The transaction the caller asked for.
        requested: TransactionId,
        /// The earliest transaction without a verdict.
        expected: TransactionId,
    },

    /// The transaction already has a verdict.
    #[error("transaction {transaction} already finalized as {state}")]
    AlreadyFinalized {
        /// The transaction.
        transaction: TransactionId,
        /// Its terminal stage.
        state: DynValidationState,
    },

    /// Transfer amounts must be positive.
    #[error("invalid transfer amount {amount}: must be positive")]
    InvalidAmount {
        /// The rejected amount.
        amount: rust_decimal::Decimal,
    },

    /// Source and target are the same account.
    #[error("transfer from {0} to itself")]
    SelfTransfer(AccountId),

    /// A symbol outside the account's sector range.
    #[error("symbol {symbol} is not in the {sector} range of account {account}")]
    ForeignSymbol {
        /// The account.
        account: AccountId,
        /// The offered symbol.
        symbol: Symbol,
        /// The account's sector.
        sector: Sector,
    },

    /// Another account already holds the symbol.
    #[error("symbol {symbol} requested for {account} is held by {holder}")]
    SymbolInUse {
        /// The account being mapped.
        account: AccountId,
        /// The requested symbol.
        symbol: Symbol,
        /// The account currently holding it.
        holder: AccountId,
    },

    /// A loaded transaction log is internally inconsistent.
    #[error("corrupt transaction log at {transaction}: {detail}")]
    CorruptLog {
        /// The offending record.
        transaction: TransactionId,
        /// What is inconsistent.
        detail: String,
    },

    /// The sequence counter cannot advance further.
    #[error("sequence numbers exhausted after {0}")]
    SequenceExhausted(SequenceNumber),
}
