//! # secflow-taxonomy — Symbol Allocation and Versioned Account Naming
//!
//! Every account in the economy is named by one symbol drawn from its
//! sector's reserved alphabet. This crate owns both halves of that naming:
//!
//! - [`SectorAllocator`] issues symbols from bounded, pairwise-disjoint
//!   sector ranges and derives each sector's [`SectorPattern`].
//! - [`VersionedTaxonomy`] records which symbol each account carried at
//!   each point of the transaction sequence, as append-only snapshots.
//!
//! ## Security Invariant
//!
//! A validation at sequence number `k` sees the taxonomy exactly as it was
//! published at `k`. Snapshots are immutable; later changes (new accounts,
//! remaps, gap extensions) publish new snapshots and never rewrite old ones.
//!
//! ## Crate Policy
//!
//! - Depends only on `secflow-core` internally.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod allocator;
pub mod error;
pub mod pattern;
pub mod snapshot;
pub mod taxonomy;

pub use allocator::SectorAllocator;
pub use error::TaxonomyError;
pub use pattern::{escape_in_set, escape_literal, SectorPattern};
pub use snapshot::{Snapshot, MAX_OVERLAY_DEPTH};
pub use taxonomy::{SnapshotRecord, VersionedTaxonomy};
