//! # Determinism Check — Subset Construction
//!
//! Explores every reachable DFA state of a union automaton and reports the
//! first state whose accepting tags contain a forbidden pair. Exploration is
//! breadth-first with a sorted alphabet, so the reported witness is a
//! shortest conflicting word and the same one on every run.
//!
//! ## Alphabet
//!
//! The symbol space is partitioned into intervals that every transition of
//! the automaton treats alike, refined by the configured sector ranges. One
//! representative per interval stands for the whole interval, which makes
//! the check exhaustive over all symbols (configured and foreign) without
//! enumerating them.

use std::collections::{BTreeSet, VecDeque};

use crate::nfa::{Nfa, StateSet};

/// Upper bound on explored DFA states.
pub const MAX_DFA_STATES: usize = 4096;

/// First code point past the Unicode scalar range.
const CODE_SPACE_END: u32 = 0x11_0000;

/// Outcome of exploring a union automaton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exploration {
    /// Every reachable state passed the check.
    Clean {
        /// Number of reachable DFA states.
        states: usize,
    },
    /// A reachable state accepts a forbidden pair of tags.
    Conflict {
        /// Lower tag of the pair.
        first: usize,
        /// Higher tag of the pair.
        second: usize,
        /// A shortest word reaching the state.
        witness: String,
    },
    /// Exploration stopped at [`MAX_DFA_STATES`].
    LimitReached,
}

/// One representative symbol per alphabet interval.
///
/// `extra` are additional inclusive ranges (the configured sector ranges)
/// whose boundaries refine the partition.
pub fn alphabet(nfa: &Nfa, extra: &[(char, char)]) -> Vec<char> {
    let mut cuts: BTreeSet<u32> = BTreeSet::from([0, CODE_SPACE_END]);
    let ranges = nfa
        .symbol_sets()
        .flat_map(|set| set.ranges().iter().copied())
        .chain(extra.iter().copied());
    for (lo, hi) in ranges {
        cuts.insert(lo as u32);
        cuts.insert(hi as u32 + 1);
    }
    let cuts: Vec<u32> = cuts.into_iter().collect();
    cuts.windows(2)
        .filter_map(|w| representative(w[0], w[1]))
        .collect()
}

/// First scalar value in `[lo, hi)`, skipping the surrogate block.
fn representative(lo: u32, hi: u32) -> Option<char> {
    let candidate = if (0xD800..=0xDFFF).contains(&lo) { 0xE000 } else { lo };
    if candidate < hi {
        char::from_u32(candidate)
    } else {
        None
    }
}

/// Explore the subset construction of `nfa` over `alphabet`.
///
/// `forbidden(a, b)` (called with `a < b`) decides whether tags `a` and `b`
/// may not accept together.
pub fn explore(
    nfa: &Nfa,
    alphabet: &[char],
    forbidden: impl Fn(usize, usize) -> bool,
) -> Exploration {
    let start = nfa.start_set();
    let mut seen: BTreeSet<StateSet> = BTreeSet::new();
    let mut queue: VecDeque<(StateSet, String)> = VecDeque::new();
    seen.insert(start.clone());
    queue.push_back((start, String::new()));

    while let Some((set, word)) = queue.pop_front() {
        let tags: Vec<usize> = nfa.accepted(&set).into_iter().collect();
        for (i, &first) in tags.iter().enumerate() {
            for &second in &tags[i + 1..] {
                if forbidden(first, second) {
                    return Exploration::Conflict {
                        first,
                        second,
                        witness: word,
                    };
                }
            }
        }

        for &c in alphabet {
            let next = nfa.step(&set, c);
            if next.is_empty() || seen.contains(&next) {
                continue;
            }
            if seen.len() >= MAX_DFA_STATES {
                return Exploration::LimitReached;
            }
            seen.insert(next.clone());
            let mut extended = word.clone();
            extended.push(c);
            queue.push_back((next, extended));
        }
    }

    Exploration::Clean { states: seen.len() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn union(patterns: &[&str]) -> Nfa {
        let asts: Vec<_> = patterns.iter().map(|p| parse(p).unwrap()).collect();
        Nfa::union(&asts)
    }

    #[test]
    fn alphabet_has_one_symbol_per_interval() {
        let nfa = union(&[".*[A-C].*", ".*[I].*"]);
        let symbols = alphabet(&nfa, &[]);
        // [0,A) [A,C] (C,I) [I] (I,max]
        assert_eq!(symbols, vec!['\0', 'A', 'D', 'I', 'J']);
    }

    #[test]
    fn extra_ranges_refine_partition() {
        let nfa = union(&["."]);
        let symbols = alphabet(&nfa, &[('A', 'C')]);
        assert_eq!(symbols, vec!['\0', 'A', 'D']);
    }

    #[test]
    fn representative_skips_surrogates() {
        assert_eq!(representative(0xD800, 0xE010), Some('\u{E000}'));
        assert_eq!(representative(0xD800, 0xE000), None);
    }

    #[test]
    fn overlapping_containment_patterns_conflict() {
        let nfa = union(&[".*[AB].*", ".*[I].*"]);
        let symbols = alphabet(&nfa, &[]);
        match explore(&nfa, &symbols, |_, _| true) {
            Exploration::Conflict { first, second, witness } => {
                assert_eq!((first, second), (0, 1));
                assert_eq!(witness.chars().count(), 2);
                assert!(witness.contains('I'));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn disjoint_first_hop_patterns_are_clean() {
        let nfa = union(&[".[A-C].*", ".[I-K].*"]);
        let symbols = alphabet(&nfa, &[]);
        assert!(matches!(
            explore(&nfa, &symbols, |_, _| true),
            Exploration::Clean { .. }
        ));
    }

    #[test]
    fn allowed_overlap_is_not_reported() {
        let nfa = union(&[".[I].*", "[A][I].*"]);
        let symbols = alphabet(&nfa, &[]);
        assert!(matches!(
            explore(&nfa, &symbols, |_, _| false),
            Exploration::Clean { .. }
        ));
        assert!(matches!(
            explore(&nfa, &symbols, |_, _| true),
            Exploration::Conflict { .. }
        ));
    }
}
