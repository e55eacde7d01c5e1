//! Errors raised while building and solving linear programs.
//!
//! `Infeasible` and `Unbounded` are solver outcomes, not errors. Everything
//! here is either a malformed problem or an internal solver fault.

use thiserror::Error;

use crate::problem::VarId;

/// Errors from the LP model, the constraint builder and the solver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LpError {
    /// A constraint or objective references a variable the problem never
    /// declared.
    #[error("{context} references undeclared variable {variable} ({declared} declared)")]
    UndeclaredVariable {
        /// The offending variable.
        variable: VarId,
        /// Name of the constraint, or `objective`.
        context: String,
        /// Number of declared variables.
        declared: usize,
    },

    /// A checked decimal operation overflowed.
    #[error("arithmetic overflow in {operation}")]
    ArithmeticOverflow {
        /// The operation that overflowed.
        operation: &'static str,
    },

    /// Optimization was requested for a problem without an objective.
    #[error("optimization requested but the problem has no objective")]
    MissingObjective,

    /// An assignment does not have one value per variable.
    #[error("assignment has {actual} values, problem has {expected} variables")]
    DimensionMismatch {
        /// Number of declared variables.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },

    /// The solver exceeded its pivot budget.
    #[error("simplex exceeded {limit} pivots")]
    IterationLimit {
        /// The pivot budget.
        limit: usize,
    },

    /// Independent solver results disagree.
    #[error("solver inconsistency on {variables} variables x {constraints} constraints: {detail}")]
    SolverInconsistency {
        /// Number of variables in the problem.
        variables: usize,
        /// Number of constraints in the problem.
        constraints: usize,
        /// What disagreed.
        detail: String,
    },
}
