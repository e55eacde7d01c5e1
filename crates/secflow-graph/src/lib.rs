//! # secflow-graph — Transaction Graph, Paths and Words
//!
//! The account graph over which a transaction's value may be routed, and
//! the conversion of routes into taxonomy words.
//!
//! - [`TransactionGraph`] holds accounts and directed trade links and
//!   enumerates bounded simple paths in deterministic order.
//! - [`WordConverter`] maps a [`Path`] to its [`Word`] under the taxonomy
//!   snapshot in force at a sequence number.
//!
//! Paths and words are ephemeral: they are recomputed per validation and
//! never stored.

pub mod error;
pub mod graph;
pub mod word;

pub use error::GraphError;
pub use graph::{Enumeration, Path, TransactionGraph};
pub use word::{Word, WordConverter};
