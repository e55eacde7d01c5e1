//! # secflow-state — Typestate-Encoded Validation Lifecycle
//!
//! Each stage of a transaction's validation is a distinct Rust type, and
//! stage transitions are methods that consume the current stage and produce
//! the next one. Skipping a stage is a compile error, not a runtime check.
//!
//! ## Lifecycle
//!
//! ```text
//! Submitted → TaxonomyChecked → PathsEnumerated → Classified → Constrained → Solved
//!                                     │                │                       │
//!                                     └──▶ Infeasible ◀┘          Feasible ◀───┴──▶ Infeasible
//! ```
//!
//! Any in-flight stage may move to `Failed`. `Feasible`, `Infeasible` and
//! `Failed` are terminal.
//!
//! [`DynValidation`] is the runtime form stored in the transaction log, with
//! the same transition table enforced by [`DynValidation::try_transition`].
//! [`DynValidation::verify`] replays a stored history through that table.

pub mod validation;

pub use validation::{
    Classified, Constrained, DynValidation, DynValidationState, Failed, Feasible, InFlight,
    Infeasible, PathsEnumerated, Solved, StateError, Submitted, TaxonomyChecked, TransitionRecord,
    Validation, ValidationState,
};
