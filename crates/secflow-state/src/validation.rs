//! # Validation Typestate Machine
//!
//! Implements the validation lifecycle of one transaction using the
//! typestate pattern. Each stage is a distinct type; a stage can only be
//! reached through the stage before it.
//!
//! ## Allowed Transitions
//!
//! ```text
//! Submitted ──taxonomy_checked()──▶ TaxonomyChecked ──paths_enumerated()──▶ PathsEnumerated
//!
//! PathsEnumerated ──classified()──▶ Classified     PathsEnumerated ──no_path()──▶ Infeasible
//! Classified ──constrained()──▶ Constrained        Classified ──unclassified()──▶ Infeasible
//! Constrained ──solved()──▶ Solved
//! Solved ──feasible()──▶ Feasible                  Solved ──infeasible()──▶ Infeasible
//!
//! any in-flight stage ──fail()──▶ Failed
//! ```
//!
//! ## Security Invariant
//!
//! A verdict can only be produced from a stage that earned it: `Feasible`
//! exists only after `Solved`, which exists only after `Constrained`. The
//! solver cannot be reached without classification, and terminal stages
//! have no transition methods at all.
//!
//! ```compile_fail
//! use secflow_core::{SequenceNumber, TransactionId};
//! use secflow_state::validation::*;
//!
//! let v = Validation::<Submitted>::new(TransactionId(1), SequenceNumber(1));
//! // ERROR: no method named `feasible` found for `Validation<Submitted>`
//! let _done = v.feasible();
//! ```

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use secflow_core::{SequenceNumber, TransactionId};

// ─── State Types ─────────────────────────────────────────────────────

/// Stage: accepted, not yet examined.
#[derive(Debug, Clone, Copy)]
pub struct Submitted;

/// Stage: every account on the graph has a symbol at the transaction's
/// sequence number.
#[derive(Debug, Clone, Copy)]
pub struct TaxonomyChecked;

/// Stage: connecting paths enumerated.
#[derive(Debug, Clone, Copy)]
pub struct PathsEnumerated;

/// Stage: path words classified.
#[derive(Debug, Clone, Copy)]
pub struct Classified;

/// Stage: linear program built.
#[derive(Debug, Clone, Copy)]
pub struct Constrained;

/// Stage: linear program solved.
#[derive(Debug, Clone, Copy)]
pub struct Solved;

/// Terminal: the transaction may be applied.
#[derive(Debug, Clone, Copy)]
pub struct Feasible;

/// Terminal: no admissible routing exists.
#[derive(Debug, Clone, Copy)]
pub struct Infeasible;

/// Terminal: validation aborted on an error.
#[derive(Debug, Clone, Copy)]
pub struct Failed;

// ─── Sealed Traits ───────────────────────────────────────────────────

mod private {
    pub trait Sealed {}
    impl Sealed for super::Submitted {}
    impl Sealed for super::TaxonomyChecked {}
    impl Sealed for super::PathsEnumerated {}
    impl Sealed for super::Classified {}
    impl Sealed for super::Constrained {}
    impl Sealed for super::Solved {}
    impl Sealed for super::Feasible {}
    impl Sealed for super::Infeasible {}
    impl Sealed for super::Failed {}
}

/// Marker trait for all validation stages.
///
/// Sealed: only the stages defined in this module implement it.
pub trait ValidationState: private::Sealed + std::fmt::Debug {
    /// The runtime form of this stage.
    fn state() -> DynValidationState;
}

/// Stages that may still fail. Terminal stages do not implement it.
pub trait InFlight: ValidationState {}

macro_rules! impl_state {
    ($($ty:ident),* $(,)?) => {
        $(
            impl ValidationState for $ty {
                fn state() -> DynValidationState {
                    DynValidationState::$ty
                }
            }
        )*
    };
}

impl_state!(
    Submitted,
    TaxonomyChecked,
    PathsEnumerated,
    Classified,
    Constrained,
    Solved,
    Feasible,
    Infeasible,
    Failed,
);

impl InFlight for Submitted {}
impl InFlight for TaxonomyChecked {}
impl InFlight for PathsEnumerated {}
impl InFlight for Classified {}
impl InFlight for Constrained {}
impl InFlight for Solved {}

// ─── Transition Record ───────────────────────────────────────────────

/// One stage change in a validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Stage before the transition.
    pub from_state: DynValidationState,
    /// Stage after the transition.
    pub to_state: DynValidationState,
    /// When the transition occurred (UTC).
    pub timestamp: DateTime<Utc>,
    /// What the stage produced, e.g. `paths=3`.
    pub detail: Option<String>,
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from runtime-checked transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The transition is not in the lifecycle table.
    #[error("invalid validation transition: {from} -> {to}")]
    InvalidTransition {
        /// Current stage.
        from: DynValidationState,
        /// Attempted stage.
        to: DynValidationState,
    },

    /// A recorded stage disagrees with the stage its history leads to.
    #[error("recorded stage {recorded} does not match replayed stage {replayed}")]
    HistoryMismatch {
        /// Stage as recorded.
        recorded: DynValidationState,
        /// Stage reached by replaying the transitions.
        replayed: DynValidationState,
    },
}

// ─── The Validation ──────────────────────────────────────────────────

/// The validation of one transaction, parameterized by its stage.
#[derive(Debug)]
pub struct Validation<S: ValidationState> {
    /// Transaction under validation.
    pub transaction_id: TransactionId,
    /// Sequence number the transaction was assigned.
    pub sequence_number: SequenceNumber,
    /// When validation started.
    pub started_at: DateTime<Utc>,
    transition_log: Vec<TransitionRecord>,
    _state: PhantomData<S>,
}

impl<S: ValidationState> Validation<S> {
    /// The runtime form of the current stage.
    pub fn state(&self) -> DynValidationState {
        S::state()
    }

    /// Canonical stage name, e.g. `PATHS_ENUMERATED`.
    pub fn state_name(&self) -> &'static str {
        S::state().name()
    }

    /// Whether the stage is terminal.
    pub fn is_terminal(&self) -> bool {
        S::state().is_terminal()
    }

    /// Stage changes so far.
    pub fn transition_log(&self) -> &[TransitionRecord] {
        &self.transition_log
    }

    fn transition_to<T: ValidationState>(mut self, detail: Option<String>) -> Validation<T> {
        self.transition_log.push(TransitionRecord {
            from_state: S::state(),
            to_state: T::state(),
            timestamp: Utc::now(),
            detail,
        });
        Validation {
            transaction_id: self.transaction_id,
            sequence_number: self.sequence_number,
            started_at: self.started_at,
            transition_log: self.transition_log,
            _state: PhantomData,
        }
    }
}

impl<S: InFlight> Validation<S> {
    /// Abort with `reason` (any in-flight stage → ERROR).
    pub fn fail(self, reason: impl Into<String>) -> Validation<Failed> {
        self.transition_to(Some(reason.into()))
    }
}

// ─── Stage-Specific Impl Blocks ─────────────────────────────────────

impl Validation<Submitted> {
    /// Start validating `transaction_id`. The start itself is not a
    /// transition.
    pub fn new(transaction_id: TransactionId, sequence_number: SequenceNumber) -> Self {
        Self {
            transaction_id,
            sequence_number,
            started_at: Utc::now(),
            transition_log: Vec::new(),
            _state: PhantomData,
        }
    }

    /// Taxonomy covers the graph (SUBMITTED → TAXONOMY_CHECKED).
    pub fn taxonomy_checked(self, extended: bool) -> Validation<TaxonomyChecked> {
        self.transition_to(Some(format!("extended={extended}")))
    }
}

impl Validation<TaxonomyChecked> {
    /// Paths enumerated (TAXONOMY_CHECKED → PATHS_ENUMERATED).
    pub fn paths_enumerated(self, paths: usize) -> Validation<PathsEnumerated> {
        self.transition_to(Some(format!("paths={paths}")))
    }
}

impl Validation<PathsEnumerated> {
    /// Words classified (PATHS_ENUMERATED → CLASSIFIED).
    pub fn classified(self, classified: usize, rate: f64) -> Validation<Classified> {
        self.transition_to(Some(format!("classified={classified} rate={rate}")))
    }

    /// No connecting path (PATHS_ENUMERATED → INFEASIBLE).
    pub fn no_path(self) -> Validation<Infeasible> {
        self.transition_to(Some("no connecting path".to_string()))
    }
}

impl Validation<Classified> {
    /// Linear program built (CLASSIFIED → CONSTRAINED).
    pub fn constrained(self, variables: usize, constraints: usize) -> Validation<Constrained> {
        self.transition_to(Some(format!(
            "variables={variables} constraints={constraints}"
        )))
    }

    /// No path word was classified (CLASSIFIED → INFEASIBLE).
    pub fn unclassified(self) -> Validation<Infeasible> {
        self.transition_to(Some("classification rate 0".to_string()))
    }
}

impl Validation<Constrained> {
    /// Solver finished (CONSTRAINED → SOLVED).
    pub fn solved(self, pivots: usize) -> Validation<Solved> {
        self.transition_to(Some(format!("pivots={pivots}")))
    }
}

impl Validation<Solved> {
    /// A routing exists (SOLVED → FEASIBLE).
    pub fn feasible(self) -> Validation<Feasible> {
        self.transition_to(None)
    }

    /// No routing exists (SOLVED → INFEASIBLE).
    pub fn infeasible(self) -> Validation<Infeasible> {
        self.transition_to(None)
    }
}

// ─── DynValidation — Runtime Form ───────────────────────────────────

/// Runtime representation of a validation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DynValidationState {
    /// Accepted, not yet examined.
    Submitted,
    /// Taxonomy covers the graph.
    TaxonomyChecked,
    /// Paths enumerated.
    PathsEnumerated,
    /// Words classified.
    Classified,
    /// Linear program built.
    Constrained,
    /// Linear program solved.
    Solved,
    /// Terminal: applicable.
    Feasible,
    /// Terminal: no admissible routing.
    Infeasible,
    /// Terminal: aborted on an error.
    #[serde(rename = "ERROR")]
    Failed,
}

impl DynValidationState {
    /// Canonical stage name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::TaxonomyChecked => "TAXONOMY_CHECKED",
            Self::PathsEnumerated => "PATHS_ENUMERATED",
            Self::Classified => "CLASSIFIED",
            Self::Constrained => "CONSTRAINED",
            Self::Solved => "SOLVED",
            Self::Feasible => "FEASIBLE",
            Self::Infeasible => "INFEASIBLE",
            Self::Failed => "ERROR",
        }
    }

    /// Whether the stage is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Feasible | Self::Infeasible | Self::Failed)
    }

    /// Whether `self → to` is in the lifecycle table.
    pub fn can_transition_to(&self, to: DynValidationState) -> bool {
        use DynValidationState as D;
        if to == D::Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, to),
            (D::Submitted, D::TaxonomyChecked)
                | (D::TaxonomyChecked, D::PathsEnumerated)
                | (D::PathsEnumerated, D::Classified)
                | (D::PathsEnumerated, D::Infeasible)
                | (D::Classified, D::Constrained)
                | (D::Classified, D::Infeasible)
                | (D::Constrained, D::Solved)
                | (D::Solved, D::Feasible)
                | (D::Solved, D::Infeasible)
        )
    }
}

impl std::fmt::Display for DynValidationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A validation whose stage is only known at runtime, e.g. one read back
/// from the transaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynValidation {
    /// Transaction under validation.
    pub transaction_id: TransactionId,
    /// Sequence number the transaction was assigned.
    pub sequence_number: SequenceNumber,
    /// When validation started.
    pub started_at: DateTime<Utc>,
    /// Current stage.
    pub state: DynValidationState,
    /// Stage changes so far.
    pub transition_log: Vec<TransitionRecord>,
}

impl DynValidation {
    /// A fresh validation in SUBMITTED.
    pub fn new(transaction_id: TransactionId, sequence_number: SequenceNumber) -> Self {
        Validation::<Submitted>::new(transaction_id, sequence_number).into()
    }

    /// Attempt a stage change with runtime validation.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidTransition`] if the change is not in the
    /// lifecycle table; the validation is unchanged.
    pub fn try_transition(
        &mut self,
        to: DynValidationState,
        detail: Option<String>,
    ) -> Result<(), StateError> {
        if !self.state.can_transition_to(to) {
            return Err(StateError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.transition_log.push(TransitionRecord {
            from_state: self.state,
            to_state: to,
            timestamp: Utc::now(),
            detail,
        });
        self.state = to;
        Ok(())
    }

    /// Canonical stage name.
    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    /// Whether the stage is terminal.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Replay the transition log from `SUBMITTED` through the lifecycle
    /// table and check it arrives at the current stage.
    ///
    /// # Errors
    ///
    /// - [`StateError::InvalidTransition`] for a step outside the table.
    /// - [`StateError::HistoryMismatch`] if a record starts from a stage the
    ///   replay is not in, or the replay ends elsewhere than `state`.
    pub fn verify(&self) -> Result<(), StateError> {
        let mut replay = DynValidation::new(self.transaction_id, self.sequence_number);
        for record in &self.transition_log {
            if record.from_state != replay.state {
                return Err(StateError::HistoryMismatch {
                    recorded: record.from_state,
                    replayed: replay.state,
                });
            }
            replay.try_transition(record.to_state, record.detail.clone())?;
        }
        if replay.state != self.state {
            return Err(StateError::HistoryMismatch {
                recorded: self.state,
                replayed: replay.state,
            });
        }
        Ok(())
    }
}

impl<S: ValidationState> From<Validation<S>> for DynValidation {
    fn from(v: Validation<S>) -> Self {
        DynValidation {
            transaction_id: v.transaction_id,
            sequence_number: v.sequence_number,
            started_at: v.started_at,
            state: S::state(),
            transition_log: v.transition_log,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
