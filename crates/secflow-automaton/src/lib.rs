//! # secflow-automaton — Pattern Automaton for Flow Classification
//!
//! Path words (one symbol per account along a path) are classified into
//! flow classes by regular patterns over the taxonomy alphabet.
//!
//! ## Pipeline
//!
//! 1. [`parser`] turns pattern text into a syntax tree.
//! 2. [`nfa`] builds a Thompson NFA; a union NFA tags each class's
//!    accepting state.
//! 3. [`dfa`] runs the subset construction once at compile time and rejects
//!    class sets where one word satisfies two exclusive classes.
//! 4. [`classifier`] simulates the union NFA per word.
//!
//! ## Crate Policy
//!
//! - Classification never fails at runtime; every error is raised while
//!   compiling.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod classifier;
pub mod dfa;
pub mod error;
pub mod nfa;
pub mod parser;

pub use classifier::{FlowClass, FlowClassifier};
pub use error::AutomatonError;
pub use nfa::CompiledPattern;
