//! Errors raised while compiling patterns and classifiers.
//!
//! Every variant is a compile-time failure. A compiled classifier never
//! fails at runtime: an unmatched word is classified as `None`.

use thiserror::Error;

use secflow_core::Sector;

use crate::classifier::FlowClass;

/// Errors from pattern parsing and classifier compilation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AutomatonError {
    /// The pattern text is malformed.
    #[error("invalid pattern {pattern:?} at offset {position}: {reason}")]
    Parse {
        /// The full pattern text.
        pattern: String,
        /// Character offset of the failure.
        position: usize,
        /// What the parser expected.
        reason: String,
    },

    /// Two mutually exclusive classes accept a common word.
    #[error("classes {first} and {second} both accept {witness:?}")]
    AmbiguousClassification {
        /// First accepting class, in class order.
        first: FlowClass,
        /// Second accepting class.
        second: FlowClass,
        /// A shortest word accepted by both.
        witness: String,
    },

    /// A class references a sector without a pattern.
    #[error("class {class} references sector {sector}, which has no pattern")]
    UnknownSector {
        /// The class being compiled.
        class: FlowClass,
        /// The sector without a pattern.
        sector: Sector,
    },

    /// The same class was declared twice.
    #[error("class {0} declared more than once")]
    DuplicateClass(FlowClass),

    /// Subset construction exceeded its state budget.
    #[error("determinism check exceeded {limit} DFA states")]
    StateLimit {
        /// The configured state limit.
        limit: usize,
    },
}
