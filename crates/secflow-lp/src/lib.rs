//! # secflow-lp — Flow Constraints and Exact Simplex
//!
//! - [`LpProblem`]: variables, linear constraints and an optional objective
//!   over exact decimals. Variables are implicitly non-negative.
//! - [`build`]: one transfer plus its classified paths to an LP with
//!   conservation, balance and sector share rows.
//! - [`solve`] / [`solve_validated`]: two-phase tableau Simplex with
//!   Bland's rule and checked `rust_decimal` arithmetic.
//!
//! ## Crate Policy
//!
//! No binary floating point. Every arithmetic step is checked and overflow
//! is an error. `Infeasible` and `Unbounded` are outcomes, never errors.

pub mod builder;
pub mod error;
pub mod problem;
pub mod simplex;

pub use builder::{build, ClassifiedPath, FlowProblem, Transfer};
pub use error::LpError;
pub use problem::{Constraint, LpProblem, Objective, Relation, Sense, VarId, Variable};
pub use simplex::{solve, solve_validated, Outcome, Solution, SolveMode, MAX_PIVOTS};
