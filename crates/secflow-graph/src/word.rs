//! # Path-to-Word Conversion
//!
//! A word is the symbol string of a path under the taxonomy snapshot in
//! force at a sequence number. Conversion is a pure function of the path and
//! the (immutable) snapshot, so the same inputs always give the same word.

use std::fmt;

use serde::{Deserialize, Serialize};

use secflow_core::{SequenceNumber, Symbol};
use secflow_taxonomy::{TaxonomyError, VersionedTaxonomy};

use crate::graph::Path;

/// Symbol string of one path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Word(String);

impl Word {
    /// The word as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Symbols of the word, in path order.
    pub fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.0.chars().map(Symbol)
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    /// Whether the word has no symbols.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Symbol> for Word {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        Word(iter.into_iter().map(|s| s.as_char()).collect())
    }
}

impl AsRef<str> for Word {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reads words off paths through a taxonomy.
#[derive(Debug, Clone, Copy)]
pub struct WordConverter<'t> {
    taxonomy: &'t VersionedTaxonomy,
}

impl<'t> WordConverter<'t> {
    /// A converter over `taxonomy`.
    pub fn new(taxonomy: &'t VersionedTaxonomy) -> Self {
        Self { taxonomy }
    }

    /// The word of `path` at `sequence_number`.
    ///
    /// # Errors
    ///
    /// Returns [`TaxonomyError::UnmappedAccount`] for the first account on
    /// the path with no symbol at `sequence_number`.
    pub fn to_word(&self, path: &Path, sequence_number: SequenceNumber) -> Result<Word, TaxonomyError> {
        path.accounts()
            .iter()
            .map(|account| self.taxonomy.lookup(account, sequence_number))
            .collect()
    }

    /// Words of every path, in path order.
    pub fn to_words(
        &self,
        paths: &[Path],
        sequence_number: SequenceNumber,
    ) -> Result<Vec<Word>, TaxonomyError> {
        paths
            .iter()
            .map(|path| self.to_word(path, sequence_number))
            .collect()
    }
}
