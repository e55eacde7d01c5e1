//! # secflow-engine — Sectoral Transaction Validation
//!
//! The [`Orchestrator`] owns the sector allocator, the versioned taxonomy,
//! the transaction graph and the flow classifier, and validates submitted
//! transfers one at a time:
//!
//! 1. extend the taxonomy to the transaction's sequence number,
//! 2. enumerate the simple paths from source to target,
//! 3. read each path as a word and classify it,
//! 4. build the flow LP and solve it with exact Simplex,
//! 5. record the [`Verdict`] and, if feasible, move the balance.
//!
//! No path and no classified word both short-circuit to `Infeasible`
//! before the solver runs.
//!
//! ## Crate Policy
//!
//! Single-threaded and synchronous. All operations take `&mut self` or
//! `&self`; nothing performs I/O. Identical operation sequences produce
//! identical taxonomy history and verdicts (up to elapsed time).

pub mod account;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod transaction;
pub mod verdict;

pub use account::{Account, AccountHandle, AccountRegistry};
pub use error::EngineError;
pub use metrics::ValidationMetrics;
pub use orchestrator::Orchestrator;
pub use transaction::{Transaction, TransactionLog, TransactionRecord};
pub use verdict::{RoutedFlow, ShortCircuit, Verdict, VerdictOutcome};

pub use secflow_lp::SolveMode;
