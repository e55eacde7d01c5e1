//! # Taxonomy History and Determinism
//!
//! Published snapshots never change, gaps are covered by extension, and two
//! engines fed the same operations produce the same verdicts.

mod common;

use std::collections::BTreeMap;

use proptest::prelude::*;

use secflow_core::{Sector, SequenceNumber, Symbol};
use secflow_engine::{EngineError, SolveMode, VerdictOutcome};
use secflow_taxonomy::TaxonomyError;

use common::*;

#[test]
fn gap_extension_carries_the_previous_snapshot() {
    let mut e = letter_engine();
    open(
        &mut e,
        &[("alice", Sector::Agriculture, 500), ("bob", Sector::Agriculture, 0)],
    );
    link(&mut e, &[("alice", "bob")]);

    e.configure_taxonomy(
        BTreeMap::from([(acct("alice"), Symbol('A')), (acct("bob"), Symbol('B'))]),
        SequenceNumber(0),
    )
    .unwrap();
    assert_eq!(e.next_sequence_number(), SequenceNumber(1));

    let tx = e.submit_transaction(&acct("alice"), &acct("bob"), units(50)).unwrap();
    let verdict = e.validate(tx, SolveMode::Optimization).unwrap();
    assert!(verdict.taxonomy_extended);
    assert_eq!(verdict.outcome, VerdictOutcome::Feasible);

    let taxonomy = e.taxonomy();
    assert_eq!(taxonomy.sequence_numbers(), vec![SequenceNumber(0), SequenceNumber(1)]);
    assert_eq!(
        taxonomy.fingerprint(SequenceNumber(0)).unwrap(),
        taxonomy.fingerprint(SequenceNumber(1)).unwrap()
    );
    assert_eq!(e.get_mapping(&acct("bob"), SequenceNumber(1)).unwrap(), Symbol('B'));
}

#[test]
fn published_snapshots_are_immutable() {
    let mut e = letter_engine();
    open(
        &mut e,
        &[("alice", Sector::Agriculture, 500), ("bob", Sector::Industry, 0)],
    );
    link(&mut e, &[("alice", "bob")]);

    let first = e.submit_transaction(&acct("alice"), &acct("bob"), units(10)).unwrap();
    e.validate(first, SolveMode::Optimization).unwrap();
    let at_one = e.taxonomy().fingerprint(SequenceNumber(1)).unwrap();

    open(&mut e, &[("carol", Sector::Services, 0)]);
    link(&mut e, &[("bob", "carol")]);
    e.remap_account(&acct("bob"), Symbol('K'), SequenceNumber(4)).unwrap();
    let second = e.submit_transaction(&acct("bob"), &acct("carol"), units(5)).unwrap();
    let verdict = e.validate(second, SolveMode::Optimization).unwrap();
    assert_eq!(verdict.sequence_number, SequenceNumber(5));
    assert_eq!(verdict.outcome, VerdictOutcome::Feasible);

    assert_eq!(e.taxonomy().fingerprint(SequenceNumber(1)).unwrap(), at_one);
    assert_eq!(e.get_mapping(&acct("bob"), SequenceNumber(1)).unwrap(), Symbol('I'));
    assert_eq!(e.get_mapping(&acct("bob"), SequenceNumber(3)).unwrap(), Symbol('I'));
    assert_eq!(e.get_mapping(&acct("bob"), SequenceNumber(4)).unwrap(), Symbol('K'));
    // carol was still pending, so the remap snapshot publishes that mapping.
    assert_eq!(e.get_mapping(&acct("carol"), SequenceNumber(4)).unwrap(), Symbol('S'));
    assert!(e.get_mapping(&acct("carol"), SequenceNumber(3)).is_err());
    assert_eq!(e.get_mapping(&acct("alice"), SequenceNumber(5)).unwrap(), Symbol('A'));
}

#[test]
fn pending_mappings_wait_for_the_next_snapshot() {
    let mut e = letter_engine();
    open(&mut e, &[("alice", Sector::Agriculture, 0)]);
    assert_eq!(e.pending_mappings().get(&acct("alice")), Some(&Symbol('A')));
    assert!(e.taxonomy().is_empty());

    e.configure_taxonomy(BTreeMap::new(), SequenceNumber(2)).unwrap();
    assert!(e.pending_mappings().is_empty());
    assert_eq!(e.get_mapping(&acct("alice"), SequenceNumber(2)).unwrap(), Symbol('A'));
}

#[test]
fn remapped_symbol_is_never_issued_again() {
    let mut e = letter_engine();
    open(
        &mut e,
        &[("alice", Sector::Agriculture, 500), ("bob", Sector::Industry, 0)],
    );
    link(&mut e, &[("alice", "bob")]);
    let first = e.submit_transaction(&acct("alice"), &acct("bob"), units(10)).unwrap();
    e.validate(first, SolveMode::Optimization).unwrap();

    e.remap_account(&acct("bob"), Symbol('J'), SequenceNumber(2)).unwrap();
    let dave = e.create_account(acct("dave"), Sector::Industry, units(0)).unwrap();
    assert_eq!(dave.symbol, Symbol('K'));

    // `I` stays retired: earlier snapshots still map it to bob.
    assert!(matches!(
        e.create_account(acct("erin"), Sector::Industry, units(0)),
        Err(EngineError::Taxonomy(TaxonomyError::CapacityExceeded { capacity: 3, .. }))
    ));

    let second = e.submit_transaction(&acct("alice"), &acct("bob"), units(10)).unwrap();
    let verdict = e.validate(second, SolveMode::Optimization).unwrap();
    assert_eq!(verdict.sequence_number, SequenceNumber(3));
    assert_eq!(e.get_mapping(&acct("bob"), SequenceNumber(3)).unwrap(), Symbol('J'));
    assert_eq!(e.get_mapping(&acct("dave"), SequenceNumber(3)).unwrap(), Symbol('K'));
}

#[test]
fn remap_onto_a_held_symbol_is_rejected() {
    let mut e = letter_engine();
    open(
        &mut e,
        &[("bob", Sector::Industry, 0), ("dave", Sector::Industry, 0)],
    );
    e.configure_taxonomy(BTreeMap::new(), SequenceNumber(1)).unwrap();

    let err = e
        .remap_account(&acct("dave"), Symbol('I'), SequenceNumber(2))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::SymbolInUse { symbol: Symbol('I'), ref holder, .. } if holder.as_str() == "bob"
    ));
    assert_eq!(e.get_mapping(&acct("dave"), SequenceNumber(1)).unwrap(), Symbol('J'));
    assert_eq!(e.taxonomy().sequence_numbers(), vec![SequenceNumber(1)]);
    assert_eq!(e.next_sequence_number(), SequenceNumber(2));

    // Two entries of one mapping may not collide either.
    assert!(matches!(
        e.configure_taxonomy(
            BTreeMap::from([(acct("bob"), Symbol('K')), (acct("dave"), Symbol('K'))]),
            SequenceNumber(2),
        ),
        Err(EngineError::SymbolInUse { .. })
    ));
}

#[test]
fn symbols_can_be_swapped_in_one_mapping() {
    let mut e = letter_engine();
    open(
        &mut e,
        &[("bob", Sector::Industry, 0), ("dave", Sector::Industry, 0)],
    );
    e.configure_taxonomy(BTreeMap::new(), SequenceNumber(1)).unwrap();

    e.configure_taxonomy(
        BTreeMap::from([(acct("bob"), Symbol('J')), (acct("dave"), Symbol('I'))]),
        SequenceNumber(2),
    )
    .unwrap();
    assert_eq!(e.get_mapping(&acct("bob"), SequenceNumber(2)).unwrap(), Symbol('J'));
    assert_eq!(e.get_mapping(&acct("dave"), SequenceNumber(2)).unwrap(), Symbol('I'));
    assert_eq!(e.get_mapping(&acct("bob"), SequenceNumber(1)).unwrap(), Symbol('I'));
}

// ── Determinism ──────────────────────────────────────────────────────

const ACCOUNTS: [(&str, Sector); 5] = [
    ("a0", Sector::Agriculture),
    ("a1", Sector::Agriculture),
    ("i0", Sector::Industry),
    ("s0", Sector::Services),
    ("f0", Sector::Finance),
];

/// Replay `links` and `transfers` (indices into [`ACCOUNTS`]) on a fresh
/// letter-layout engine and collect the outcome of every verdict.
fn replay(links: &[(usize, usize)], transfers: &[(usize, usize, u64)]) -> (Vec<String>, Vec<String>) {
    let mut e = letter_engine();
    for (id, sector) in ACCOUNTS {
        e.create_account(acct(id), sector, units(100)).unwrap();
    }
    for &(from, to) in links {
        if from != to {
            e.connect(&acct(ACCOUNTS[from].0), &acct(ACCOUNTS[to].0)).unwrap();
        }
    }

    let mut outcomes = Vec::new();
    for &(from, to, amount) in transfers {
        if from == to {
            continue;
        }
        let tx = e
            .submit_transaction(&acct(ACCOUNTS[from].0), &acct(ACCOUNTS[to].0), units(amount))
            .unwrap();
        let verdict = e.validate(tx, SolveMode::Optimization).unwrap();
        outcomes.push(format!(
            "{:?} {:?} {:?} {}",
            verdict.outcome, verdict.optimal_value, verdict.routed, verdict.path_count
        ));
    }
    let balances = e
        .accounts()
        .iter()
        .map(|account| format!("{}={}", account.id, account.balance))
        .collect();
    (outcomes, balances)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn replay_is_deterministic(
        links in prop::collection::vec((0usize..5, 0usize..5), 0..12),
        transfers in prop::collection::vec((0usize..5, 0usize..5, 1u64..150), 1..6),
    ) {
        let first = replay(&links, &transfers);
        let second = replay(&links, &transfers);
        prop_assert_eq!(first, second);
    }
}
