//! Validation verdicts.
//!
//! A verdict is produced exactly once per transaction and never changes.
//! It records what each pipeline stage saw so a verdict can be explained
//! without re-running the pipeline.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use secflow_automaton::FlowClass;
use secflow_core::{SequenceNumber, TransactionId};
use secflow_lp::SolveMode;

/// Final outcome of a validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictOutcome {
    /// The transfer can be routed within every constraint and was applied.
    Feasible,
    /// No admissible routing exists. Balances are unchanged.
    Infeasible,
    /// Validation aborted on an error. Balances are unchanged.
    Error,
}

/// Why the solver was not invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShortCircuit {
    /// No path connects source and target within the hop limit.
    NoPath,
    /// No path word was classified.
    Unclassified,
}

/// Volume routed under one flow class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutedFlow {
    /// The flow class.
    pub class: FlowClass,
    /// Volume assigned by the solver.
    pub volume: Decimal,
}

/// The verdict of one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// The transaction.
    pub transaction_id: TransactionId,
    /// Its sequence number.
    pub sequence_number: SequenceNumber,
    /// Requested solver mode.
    pub mode: SolveMode,
    /// Outcome.
    pub outcome: VerdictOutcome,
    /// Optimal routed volume (optimization mode, feasible outcome).
    pub optimal_value: Option<Decimal>,
    /// Per-class volumes of the feasible point, ordered by class.
    pub routed: Vec<RoutedFlow>,
    /// Whether this validation published a taxonomy snapshot.
    pub taxonomy_extended: bool,
    /// Connecting paths enumerated.
    pub path_count: usize,
    /// Whether the path cap dropped further connecting paths.
    pub paths_truncated: bool,
    /// Paths whose word was classified.
    pub classified_path_count: usize,
    /// `classified_path_count / path_count`, 0 without paths.
    pub classification_rate: f64,
    /// Set when the pipeline stopped before the solver.
    pub short_circuit: Option<ShortCircuit>,
    /// Whether the solver ran.
    pub solver_invoked: bool,
    /// Pivots performed by the solver.
    pub pivots: usize,
    /// Error description for `Error` outcomes.
    pub error: Option<String>,
    /// Wall-clock validation time.
    pub elapsed: Duration,
}

impl Verdict {
    /// Whether the transfer was applied.
    pub fn is_feasible(&self) -> bool {
        self.outcome == VerdictOutcome::Feasible
    }
}
