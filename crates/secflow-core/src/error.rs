//! # Error Types — Foundational Error Hierarchy
//!
//! Errors raised while constructing core primitives and loading engine
//! configuration. Pipeline-stage errors live in their own crates and are
//! aggregated by the engine.

use thiserror::Error;

use crate::sector::Sector;

/// Top-level error type for core primitives.
#[derive(Error, Debug)]
pub enum SecflowError {
    /// Configuration failed to load or validate.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An identifier failed validation.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// An amount failed validation.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A symbol range is not a contiguous run of Unicode scalar values.
    #[error("invalid symbol range starting at {start:?} with capacity {capacity}: {reason}")]
    InvalidSymbolRange {
        /// First symbol of the range.
        start: char,
        /// Requested number of symbols.
        capacity: u32,
        /// Why the range was rejected.
        reason: String,
    },

    /// Serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error while loading or validating an [`EngineConfig`](crate::EngineConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The YAML document could not be parsed.
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A sector was declared more than once.
    #[error("sector {0} declared more than once")]
    DuplicateSector(Sector),

    /// No sectors were declared.
    #[error("at least one sector must be declared")]
    NoSectors,

    /// A sector's symbol range is malformed.
    #[error("sector {sector} has an invalid symbol range: {reason}")]
    InvalidRange {
        /// The offending sector.
        sector: Sector,
        /// Why the range was rejected.
        reason: String,
    },

    /// Two sectors reserve overlapping symbol ranges.
    #[error("symbol ranges of {first} and {second} overlap")]
    OverlappingRanges {
        /// First sector.
        first: Sector,
        /// Second sector.
        second: Sector,
    },

    /// A share limit lies outside `(0, 1]`.
    #[error("sector {sector} max_share must lie in (0, 1], got {share}")]
    InvalidShare {
        /// The offending sector.
        sector: Sector,
        /// The rejected share.
        share: String,
    },

    /// A joint class references a sector without a symbol range.
    #[error("joint class {from} -> {to} references undeclared sector {missing}")]
    UnknownJointSector {
        /// Joint class source sector.
        from: Sector,
        /// Joint class target sector.
        to: Sector,
        /// The sector that has no range.
        missing: Sector,
    },

    /// A joint class connects a sector to itself.
    #[error("joint class must connect two distinct sectors, got {0} -> {0}")]
    SelfJoint(Sector),

    /// The same joint class was declared twice.
    #[error("joint class {from} -> {to} declared more than once")]
    DuplicateJoint {
        /// Joint class source sector.
        from: Sector,
        /// Joint class target sector.
        to: Sector,
    },

    /// A numeric limit is out of range.
    #[error("{field} must be at least 1, got {value}")]
    InvalidLimit {
        /// Name of the field.
        field: &'static str,
        /// The rejected value.
        value: usize,
    },
}
