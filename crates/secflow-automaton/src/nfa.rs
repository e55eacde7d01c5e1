//! # Thompson NFA
//!
//! Each pattern compiles to a non-deterministic automaton with one start
//! state and one accepting state. States carry ε-edges and at most one
//! symbol-set edge, so simulation over a word of length `n` costs
//! `O(n × states)`.
//!
//! A union automaton ([`Nfa::union`]) joins several patterns under a fresh
//! start state and tags each accepting state with its pattern index. The
//! classifier simulates the union once per word and reads off every
//! accepting tag.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::AutomatonError;
use crate::parser::{parse, Ast, SymbolSet};

/// Index of an NFA state.
pub type StateId = usize;

/// A set of simultaneously active NFA states.
pub type StateSet = BTreeSet<StateId>;

#[derive(Debug, Clone, Default)]
struct State {
    epsilon: Vec<StateId>,
    step: Option<(SymbolSet, StateId)>,
}

/// A Thompson automaton with tagged accepting states.
#[derive(Debug, Clone)]
pub struct Nfa {
    states: Vec<State>,
    start: StateId,
    accepting: BTreeMap<StateId, usize>,
}

impl Nfa {
    /// Compile one parsed pattern. Its accepting state carries tag `0`.
    pub fn from_ast(ast: &Ast) -> Self {
        Self::union(std::slice::from_ref(ast))
    }

    /// Compile several patterns into one automaton; pattern `i` accepts
    /// with tag `i`.
    pub fn union(asts: &[Ast]) -> Self {
        let mut nfa = Nfa {
            states: Vec::new(),
            start: 0,
            accepting: BTreeMap::new(),
        };
        let start = nfa.add_state();
        nfa.start = start;
        for (tag, ast) in asts.iter().enumerate() {
            let (entry, exit) = nfa.build(ast);
            nfa.link(start, entry);
            nfa.accepting.insert(exit, tag);
        }
        nfa
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the automaton has no states. Never true for a built NFA.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// ε-closure of the start state.
    pub fn start_set(&self) -> StateSet {
        self.closure([self.start])
    }

    /// Active states after reading `c` from `set`.
    pub fn step(&self, set: &StateSet, c: char) -> StateSet {
        let targets: Vec<StateId> = set
            .iter()
            .filter_map(|&id| match &self.states[id].step {
                Some((symbols, next)) if symbols.contains(c) => Some(*next),
                _ => None,
            })
            .collect();
        self.closure(targets)
    }

    /// Tags of the accepting states in `set`.
    pub fn accepted(&self, set: &StateSet) -> BTreeSet<usize> {
        set.iter()
            .filter_map(|id| self.accepting.get(id).copied())
            .collect()
    }

    /// Tags of every pattern accepting the whole of `word`.
    pub fn accepting_tags(&self, word: &str) -> BTreeSet<usize> {
        let mut current = self.start_set();
        for c in word.chars() {
            if current.is_empty() {
                break;
            }
            current = self.step(&current, c);
        }
        self.accepted(&current)
    }

    /// Every symbol set on a transition, for alphabet partitioning.
    pub(crate) fn symbol_sets(&self) -> impl Iterator<Item = &SymbolSet> {
        self.states
            .iter()
            .filter_map(|state| state.step.as_ref().map(|(set, _)| set))
    }

    // ── Construction ─────────────────────────────────────────────────

    fn add_state(&mut self) -> StateId {
        self.states.push(State::default());
        self.states.len() - 1
    }

    fn link(&mut self, from: StateId, to: StateId) {
        self.states[from].epsilon.push(to);
    }

    /// Build the fragment for `ast`, returning its (entry, exit) states.
    fn build(&mut self, ast: &Ast) -> (StateId, StateId) {
        let entry = self.add_state();
        let exit = self.add_state();
        match ast {
            Ast::Empty => self.link(entry, exit),
            Ast::Set(set) => self.states[entry].step = Some((set.clone(), exit)),
            Ast::Concat(items) => {
                let mut tail = entry;
                for item in items {
                    let (inner_entry, inner_exit) = self.build(item);
                    self.link(tail, inner_entry);
                    tail = inner_exit;
                }
                self.link(tail, exit);
            }
            Ast::Alternate(branches) => {
                for branch in branches {
                    let (inner_entry, inner_exit) = self.build(branch);
                    self.link(entry, inner_entry);
                    self.link(inner_exit, exit);
                }
            }
            Ast::Star(inner) => {
                let (inner_entry, inner_exit) = self.build(inner);
                self.link(entry, inner_entry);
                self.link(entry, exit);
                self.link(inner_exit, inner_entry);
                self.link(inner_exit, exit);
            }
            Ast::Plus(inner) => {
                let (inner_entry, inner_exit) = self.build(inner);
                self.link(entry, inner_entry);
                self.link(inner_exit, inner_entry);
                self.link(inner_exit, exit);
            }
            Ast::Optional(inner) => {
                let (inner_entry, inner_exit) = self.build(inner);
                self.link(entry, inner_entry);
                self.link(entry, exit);
                self.link(inner_exit, exit);
            }
        }
        (entry, exit)
    }

    fn closure(&self, seeds: impl IntoIterator<Item = StateId>) -> StateSet {
        let mut set = StateSet::new();
        let mut stack: Vec<StateId> = seeds.into_iter().collect();
        while let Some(id) = stack.pop() {
            if set.insert(id) {
                stack.extend(self.states[id].epsilon.iter().copied());
            }
        }
        set
    }
}

/// A single compiled pattern with whole-word match semantics.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    nfa: Nfa,
}

impl CompiledPattern {
    /// Parse and compile `pattern`.
    pub fn compile(pattern: &str) -> Result<Self, AutomatonError> {
        let ast = parse(pattern)?;
        Ok(Self {
            source: pattern.to_string(),
            nfa: Nfa::from_ast(&ast),
        })
    }

    /// The pattern text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the pattern matches the whole of `word`.
    pub fn is_match(&self, word: &str) -> bool {
        !self.nfa.accepting_tags(word).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(p: &str) -> CompiledPattern {
        CompiledPattern::compile(p).unwrap()
    }

    #[test]
    fn containment_pattern_matches_any_occurrence() {
        let p = compile(".*[A-C].*");
        for word in ["A", "B", "C", "xAx", "IIIC", "CI"] {
            assert!(p.is_match(word), "{word}");
        }
        for word in ["", "I", "XYZ", "D"] {
            assert!(!p.is_match(word), "{word}");
        }
    }

    #[test]
    fn whole_word_semantics() {
        let p = compile("AB");
        assert!(p.is_match("AB"));
        assert!(!p.is_match("ABC"));
        assert!(!p.is_match("XAB"));
    }

    #[test]
    fn repetition_operators() {
        let star = compile("AB*");
        assert!(star.is_match("A"));
        assert!(star.is_match("ABBB"));
        let plus = compile("AB+");
        assert!(!plus.is_match("A"));
        assert!(plus.is_match("ABB"));
        let opt = compile("AB?C");
        assert!(opt.is_match("AC"));
        assert!(opt.is_match("ABC"));
        assert!(!opt.is_match("ABBC"));
    }

    #[test]
    fn alternation_and_groups() {
        let p = compile("(AI|IA)X*");
        assert!(p.is_match("AI"));
        assert!(p.is_match("IAXX"));
        assert!(!p.is_match("AA"));
    }

    #[test]
    fn nested_star_terminates() {
        let p = compile("(A*)*B");
        assert!(p.is_match("AAAB"));
        assert!(p.is_match("B"));
        assert!(!p.is_match("AAA"));
    }

    #[test]
    fn union_reports_every_accepting_pattern() {
        let asts = vec![
            parse(".*A").unwrap(),
            parse("A.*").unwrap(),
            parse("B").unwrap(),
        ];
        let nfa = Nfa::union(&asts);
        assert_eq!(nfa.accepting_tags("A"), BTreeSet::from([0, 1]));
        assert_eq!(nfa.accepting_tags("AB"), BTreeSet::from([1]));
        assert_eq!(nfa.accepting_tags("B"), BTreeSet::from([2]));
        assert!(nfa.accepting_tags("C").is_empty());
    }

    #[test]
    fn non_ascii_symbols() {
        let p = compile(".[\u{0140}-\u{014E}].*");
        assert!(p.is_match("\u{0100}\u{0141}"));
        assert!(!p.is_match("\u{0141}\u{0100}"));
    }
}
