//! # Flow Classifier
//!
//! Compiles one pattern per flow class into a single union automaton and
//! classifies path words against it.
//!
//! ## Default Pattern Set
//!
//! [`FlowClassifier::for_sectors`] derives the patterns from the sector
//! layout. A word is the symbol string of a path that starts at the
//! transaction source, so its second symbol names the first counterparty:
//!
//! | Class                          | Pattern                     |
//! |--------------------------------|-----------------------------|
//! | `Sector(S)`                    | `.[S].*`                    |
//! | `Joint { F, T }`               | `[F][T].*`                  |
//! | `Joint { F, T, bidirectional }`| `[F][T].*\|[T][F].*`        |
//!
//! ## Security Invariant
//!
//! The class set is checked for determinism when it is compiled: no word
//! over the symbol alphabet may be accepted by two mutually exclusive
//! classes. Sector classes exclude each other, joint classes exclude each
//! other, and a joint class only overlaps the sectors it joins. A classifier
//! that compiled therefore assigns every word at most one class, and
//! `classify` never fails at runtime.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use secflow_core::{JointClassConfig, Sector, SymbolRange};
use secflow_taxonomy::SectorPattern;

use crate::dfa::{alphabet, explore, Exploration, MAX_DFA_STATES};
use crate::error::AutomatonError;
use crate::nfa::Nfa;
use crate::parser::parse;

/// The classification outcome of a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowClass {
    /// Flow whose first counterparty sits in the sector.
    Sector(Sector),
    /// A declared cross-sector exchange.
    Joint {
        /// Sector of the sending account.
        from: Sector,
        /// Sector of the first counterparty.
        to: Sector,
        /// Whether the reverse direction belongs to the class.
        bidirectional: bool,
    },
}

impl FlowClass {
    /// The joint class declared by `config`.
    pub fn joint(config: &JointClassConfig) -> Self {
        FlowClass::Joint {
            from: config.from,
            to: config.to,
            bidirectional: config.bidirectional,
        }
    }

    /// Whether this is a joint class.
    pub fn is_joint(&self) -> bool {
        matches!(self, FlowClass::Joint { .. })
    }

    /// Whether `sector` takes part in this class.
    pub fn involves(&self, sector: Sector) -> bool {
        match *self {
            FlowClass::Sector(s) => s == sector,
            FlowClass::Joint { from, to, .. } => from == sector || to == sector,
        }
    }

    /// Sectors that may receive flow routed under this class.
    pub fn receiving_sectors(&self) -> Vec<Sector> {
        match *self {
            FlowClass::Sector(s) => vec![s],
            FlowClass::Joint {
                from,
                to,
                bidirectional: true,
            } => vec![from, to],
            FlowClass::Joint { to, .. } => vec![to],
        }
    }

    /// Whether this class and `other` may never accept the same word.
    pub fn excludes(&self, other: &FlowClass) -> bool {
        match (self, other) {
            (FlowClass::Sector(a), FlowClass::Sector(b)) => a != b,
            (FlowClass::Joint { .. }, FlowClass::Joint { .. }) => self != other,
            (FlowClass::Sector(s), joint @ FlowClass::Joint { .. })
            | (joint @ FlowClass::Joint { .. }, FlowClass::Sector(s)) => !joint.involves(*s),
        }
    }
}

impl fmt::Display for FlowClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowClass::Sector(s) => write!(f, "{s}"),
            FlowClass::Joint {
                from,
                to,
                bidirectional: false,
            } => write!(f, "{from}->{to}"),
            FlowClass::Joint { from, to, .. } => write!(f, "{from}<->{to}"),
        }
    }
}

/// A compiled, determinism-checked set of flow classes.
#[derive(Debug, Clone)]
pub struct FlowClassifier {
    classes: Vec<FlowClass>,
    patterns: Vec<String>,
    nfa: Nfa,
    dfa_states: usize,
}

impl FlowClassifier {
    /// Compile explicit `(class, pattern)` definitions.
    ///
    /// `symbol_ranges` are the configured sector ranges; they refine the
    /// alphabet the determinism check runs over.
    ///
    /// # Errors
    ///
    /// - [`AutomatonError::Parse`] for malformed patterns.
    /// - [`AutomatonError::DuplicateClass`] if a class is defined twice.
    /// - [`AutomatonError::AmbiguousClassification`] if two exclusive
    ///   classes accept a common word.
    /// - [`AutomatonError::StateLimit`] if the check does not finish within
    ///   [`MAX_DFA_STATES`] states.
    pub fn compile(
        definitions: Vec<(FlowClass, String)>,
        symbol_ranges: &[SymbolRange],
    ) -> Result<Self, AutomatonError> {
        let mut seen = BTreeSet::new();
        let mut classes = Vec::with_capacity(definitions.len());
        let mut patterns = Vec::with_capacity(definitions.len());
        let mut asts = Vec::with_capacity(definitions.len());
        for (class, pattern) in definitions {
            if !seen.insert(class) {
                return Err(AutomatonError::DuplicateClass(class));
            }
            asts.push(parse(&pattern)?);
            classes.push(class);
            patterns.push(pattern);
        }

        let nfa = Nfa::union(&asts);
        let extra: Vec<(char, char)> = symbol_ranges.iter().map(|r| (r.start(), r.end())).collect();
        let symbols = alphabet(&nfa, &extra);

        let dfa_states = match explore(&nfa, &symbols, |a, b| classes[a].excludes(&classes[b])) {
            Exploration::Clean { states } => states,
            Exploration::Conflict {
                first,
                second,
                witness,
            } => {
                return Err(AutomatonError::AmbiguousClassification {
                    first: classes[first],
                    second: classes[second],
                    witness,
                })
            }
            Exploration::LimitReached => {
                return Err(AutomatonError::StateLimit {
                    limit: MAX_DFA_STATES,
                })
            }
        };

        tracing::info!(
            classes = classes.len(),
            nfa_states = nfa.len(),
            dfa_states,
            alphabet = symbols.len(),
            "flow classifier compiled"
        );

        Ok(Self {
            classes,
            patterns,
            nfa,
            dfa_states,
        })
    }

    /// Compile the default pattern set for a sector layout and its declared
    /// joint classes.
    ///
    /// # Errors
    ///
    /// Returns [`AutomatonError::UnknownSector`] if a joint class names a
    /// sector without a pattern, plus every error of [`Self::compile`].
    pub fn for_sectors(
        patterns: &[SectorPattern],
        joints: &[JointClassConfig],
    ) -> Result<Self, AutomatonError> {
        let mut definitions: Vec<(FlowClass, String)> = patterns
            .iter()
            .map(|p| (FlowClass::Sector(p.sector()), p.first_hop_regex()))
            .collect();

        for joint in joints {
            let class = FlowClass::joint(joint);
            let set_of = |sector: Sector| {
                patterns
                    .iter()
                    .find(|p| p.sector() == sector)
                    .map(SectorPattern::set_expr)
                    .ok_or(AutomatonError::UnknownSector { class, sector })
            };
            let from = set_of(joint.from)?;
            let to = set_of(joint.to)?;
            let pattern = if joint.bidirectional {
                format!("{from}{to}.*|{to}{from}.*")
            } else {
                format!("{from}{to}.*")
            };
            definitions.push((class, pattern));
        }

        let ranges: Vec<SymbolRange> = patterns.iter().map(SectorPattern::range).collect();
        Self::compile(definitions, &ranges)
    }

    /// Classify `word`: the accepting joint class if any, otherwise the
    /// accepting sector class, otherwise `None`.
    pub fn classify(&self, word: &str) -> Option<FlowClass> {
        let accepted: Vec<FlowClass> = self
            .nfa
            .accepting_tags(word)
            .into_iter()
            .map(|tag| self.classes[tag])
            .collect();
        accepted
            .iter()
            .find(|class| class.is_joint())
            .or_else(|| accepted.first())
            .copied()
    }

    /// Fraction of `words` that classify, in `[0, 1]`. Zero for no words.
    pub fn classification_rate<I, W>(&self, words: I) -> f64
    where
        I: IntoIterator<Item = W>,
        W: AsRef<str>,
    {
        let (total, classified) = words.into_iter().fold((0usize, 0usize), |(t, c), w| {
            let hit = usize::from(self.classify(w.as_ref()).is_some());
            (t + 1, c + hit)
        });
        if total == 0 {
            0.0
        } else {
            classified as f64 / total as f64
        }
    }

    /// Compiled classes, in definition order.
    pub fn classes(&self) -> &[FlowClass] {
        &self.classes
    }

    /// The pattern compiled for `class`.
    pub fn pattern_of(&self, class: FlowClass) -> Option<&str> {
        self.classes
            .iter()
            .position(|c| *c == class)
            .map(|i| self.patterns[i].as_str())
    }

    /// Reachable DFA states found by the determinism check.
    pub fn dfa_states(&self) -> usize {
        self.dfa_states
    }
}
