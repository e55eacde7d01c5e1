//! # secflow-core — Foundational Types for Sectoral Flow Validation
//!
//! This crate is the leaf of the secflow workspace. It defines the domain
//! primitives every pipeline stage shares and depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `AccountId`,
//!    `TransactionId`, `SequenceNumber`, `Symbol` are distinct types.
//!    An account name cannot be passed where a symbol is expected.
//!
//! 2. **Single `Sector` enum.** One closed definition, exhaustive `match`
//!    everywhere. Adding a sector forces every consumer to handle it.
//!
//! 3. **Exact amounts.** `Amount` wraps `rust_decimal::Decimal`. Binary
//!    floating point never touches a balance or a conservation constraint.
//!
//! 4. **Validated configuration.** `EngineConfig` rejects overlapping symbol
//!    ranges, duplicate sectors and malformed limits at load time, so the
//!    allocator and automaton never see an inconsistent layout.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `secflow-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod amount;
pub mod config;
pub mod digest;
pub mod error;
pub mod identity;
pub mod sector;

// Re-export primary types for ergonomic imports.
pub use amount::Amount;
pub use config::{EngineConfig, JointClassConfig, SectorConfig};
pub use digest::{fingerprint_of, Fingerprint};
pub use error::{ConfigError, SecflowError};
pub use identity::{AccountId, SequenceNumber, Symbol, TransactionId};
pub use sector::{Sector, SymbolRange, SECTOR_COUNT};
