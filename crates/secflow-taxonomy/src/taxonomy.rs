//! # Versioned Taxonomy — Append-Only Account Naming
//!
//! Maps accounts to symbols over time. Every change publishes a new
//! [`Snapshot`] keyed by a strictly greater [`SequenceNumber`]; a lookup at
//! `k` resolves against the snapshot with the greatest key not above `k`.
//!
//! ## Security Invariant
//!
//! Published snapshots are never edited. Extending the taxonomy to cover a
//! gap, remapping an account, and configuring new mappings all publish a new
//! snapshot. The snapshot at `k` has the same [`Fingerprint`] whenever it is
//! computed, which makes validation history reproducible.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use secflow_core::{fingerprint_of, AccountId, Fingerprint, SequenceNumber, Symbol};

use crate::error::TaxonomyError;
use crate::snapshot::Snapshot;

/// One entry of the exported snapshot log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Sequence number the snapshot was published at.
    pub sequence_number: SequenceNumber,
    /// Entries that differ from the previous snapshot.
    pub entries: BTreeMap<AccountId, Symbol>,
    /// Fingerprint of the complete mapping in force.
    pub fingerprint: Fingerprint,
}

/// The temporally versioned account → symbol mapping.
#[derive(Debug, Clone, Default)]
pub struct VersionedTaxonomy {
    snapshots: BTreeMap<SequenceNumber, Arc<Snapshot>>,
}

impl VersionedTaxonomy {
    /// An empty taxonomy with no snapshots.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `mapping` on top of the latest snapshot at `sequence_number`.
    ///
    /// Accounts already mapped to a different symbol are remapped from
    /// `sequence_number` on.
    ///
    /// # Errors
    ///
    /// Returns [`TaxonomyError::NonMonotonicSequence`] unless
    /// `sequence_number` is greater than every published number. The first
    /// snapshot may be published at any number, including genesis.
    pub fn configure(
        &mut self,
        mapping: BTreeMap<AccountId, Symbol>,
        sequence_number: SequenceNumber,
    ) -> Result<(), TaxonomyError> {
        self.ensure_after_latest(sequence_number)?;
        self.publish(sequence_number, mapping);
        Ok(())
    }

    /// The symbol of `account` in force at `sequence_number`.
    ///
    /// # Errors
    ///
    /// Returns [`TaxonomyError::UnmappedAccount`] if no snapshot at or
    /// before `sequence_number` maps the account.
    pub fn lookup(
        &self,
        account: &AccountId,
        sequence_number: SequenceNumber,
    ) -> Result<Symbol, TaxonomyError> {
        self.in_force(sequence_number)
            .and_then(|snapshot| snapshot.get(account))
            .ok_or_else(|| TaxonomyError::UnmappedAccount {
                account: account.clone(),
                sequence_number,
            })
    }

    /// The greatest published sequence number.
    pub fn latest_sequence_number(&self) -> Option<SequenceNumber> {
        self.snapshots.keys().next_back().copied()
    }

    /// Cover a gap up to `sequence_number`.
    ///
    /// If the latest snapshot is older than `sequence_number` (or there is
    /// none), publish a snapshot at `sequence_number` equal to the latest one
    /// plus `additions`. Accounts the latest snapshot already maps keep
    /// their symbol. Returns whether a snapshot was published.
    pub fn extend_to(
        &mut self,
        sequence_number: SequenceNumber,
        additions: BTreeMap<AccountId, Symbol>,
    ) -> bool {
        let latest = self.latest_snapshot();
        if let Some(latest) = &latest {
            if latest.sequence_number() >= sequence_number {
                return false;
            }
        }

        let additions: BTreeMap<AccountId, Symbol> = additions
            .into_iter()
            .filter(|(account, symbol)| {
                match latest.as_ref().and_then(|snapshot| snapshot.get(account)) {
                    Some(existing) if existing != *symbol => {
                        tracing::warn!(%account, %existing, ignored = %symbol, "extension kept existing mapping");
                        false
                    }
                    Some(_) => false,
                    None => true,
                }
            })
            .collect();

        tracing::debug!(
            seq = %sequence_number,
            from = ?latest.as_ref().map(|s| s.sequence_number()),
            added = additions.len(),
            "extending taxonomy over gap"
        );
        self.publish(sequence_number, additions);
        true
    }

    /// Remap an already mapped account from `sequence_number` on.
    ///
    /// # Errors
    ///
    /// - [`TaxonomyError::NonMonotonicSequence`] if `sequence_number` is not
    ///   after the latest snapshot.
    /// - [`TaxonomyError::UnmappedAccount`] if the account has no mapping yet.
    pub fn remap_account(
        &mut self,
        account: &AccountId,
        symbol: Symbol,
        sequence_number: SequenceNumber,
    ) -> Result<(), TaxonomyError> {
        self.ensure_after_latest(sequence_number)?;
        let latest = self.latest_snapshot();
        let previous = latest
            .as_ref()
            .and_then(|snapshot| snapshot.get(account))
            .ok_or_else(|| TaxonomyError::UnmappedAccount {
                account: account.clone(),
                sequence_number,
            })?;
        tracing::info!(%account, from = %previous, to = %symbol, seq = %sequence_number, "account remapped");
        self.publish(sequence_number, BTreeMap::from([(account.clone(), symbol)]));
        Ok(())
    }

    /// The complete mapping in force at `sequence_number`.
    ///
    /// # Errors
    ///
    /// Returns [`TaxonomyError::NoSnapshot`] if nothing is published at or
    /// before `sequence_number`.
    pub fn snapshot_at(
        &self,
        sequence_number: SequenceNumber,
    ) -> Result<BTreeMap<AccountId, Symbol>, TaxonomyError> {
        self.in_force(sequence_number)
            .map(|snapshot| snapshot.materialize())
            .ok_or(TaxonomyError::NoSnapshot(sequence_number))
    }

    /// Fingerprint of the mapping in force at `sequence_number`.
    pub fn fingerprint(&self, sequence_number: SequenceNumber) -> Result<Fingerprint, TaxonomyError> {
        let mapping = self.snapshot_at(sequence_number)?;
        Ok(fingerprint_of(&mapping)?)
    }

    /// All published sequence numbers, ascending.
    pub fn sequence_numbers(&self) -> Vec<SequenceNumber> {
        self.snapshots.keys().copied().collect()
    }

    /// Number of published snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether nothing has been published yet.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// The append-only snapshot log, oldest first.
    ///
    /// Each record carries the entries that changed relative to the previous
    /// snapshot, independent of how the overlay chain is stored.
    pub fn export_log(&self) -> Result<Vec<SnapshotRecord>, TaxonomyError> {
        let mut records = Vec::with_capacity(self.snapshots.len());
        let mut previous: BTreeMap<AccountId, Symbol> = BTreeMap::new();
        for (sequence_number, snapshot) in &self.snapshots {
            let mapping = snapshot.materialize();
            let entries = mapping
                .iter()
                .filter(|(account, symbol)| previous.get(*account) != Some(*symbol))
                .map(|(account, symbol)| (account.clone(), *symbol))
                .collect();
            records.push(SnapshotRecord {
                sequence_number: *sequence_number,
                entries,
                fingerprint: fingerprint_of(&mapping)?,
            });
            previous = mapping;
        }
        Ok(records)
    }

    // ── Internal helpers ─────────────────────────────────────────────

    fn in_force(&self, sequence_number: SequenceNumber) -> Option<&Arc<Snapshot>> {
        self.snapshots
            .range(..=sequence_number)
            .next_back()
            .map(|(_, snapshot)| snapshot)
    }

    fn latest_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshots.values().next_back().cloned()
    }

    fn ensure_after_latest(&self, requested: SequenceNumber) -> Result<(), TaxonomyError> {
        match self.latest_sequence_number() {
            Some(latest) if requested <= latest => {
                Err(TaxonomyError::NonMonotonicSequence { requested, latest })
            }
            _ => Ok(()),
        }
    }

    fn publish(&mut self, sequence_number: SequenceNumber, changes: BTreeMap<AccountId, Symbol>) {
        let snapshot = match self.latest_snapshot() {
            Some(parent) => Snapshot::layered(&parent, sequence_number, changes),
            None => Snapshot::root(sequence_number, changes),
        };
        tracing::info!(seq = %sequence_number, changed = snapshot.delta().len(), "taxonomy snapshot published");
        self.snapshots.insert(sequence_number, Arc::new(snapshot));
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn acct(id: &str) -> AccountId {
        AccountId::new(id).unwrap()
    }

    fn genesis() -> VersionedTaxonomy {
        let mut taxonomy = VersionedTaxonomy::new();
        taxonomy
            .configure(
                BTreeMap::from([(acct("alice"), Symbol('A')), (acct("bob"), Symbol('B'))]),
                SequenceNumber::GENESIS,
            )
            .unwrap();
        taxonomy
    }

    #[test]
    fn lookup_uses_greatest_key_at_or_below() {
        let mut taxonomy = genesis();
        taxonomy
            .configure(BTreeMap::from([(acct("carol"), Symbol('C'))]), SequenceNumber(5))
            .unwrap();

        assert_eq!(taxonomy.lookup(&acct("alice"), SequenceNumber(3)).unwrap(), Symbol('A'));
        assert!(matches!(
            taxonomy.lookup(&acct("carol"), SequenceNumber(4)),
            Err(TaxonomyError::UnmappedAccount { .. })
        ));
        assert_eq!(taxonomy.lookup(&acct("carol"), SequenceNumber(5)).unwrap(), Symbol('C'));
        assert_eq!(taxonomy.lookup(&acct("carol"), SequenceNumber(900)).unwrap(), Symbol('C'));
    }

    #[test]
    fn lookup_before_first_snapshot_is_unmapped() {
        let mut taxonomy = VersionedTaxonomy::new();
        taxonomy
            .configure(BTreeMap::from([(acct("alice"), Symbol('A'))]), SequenceNumber(3))
            .unwrap();
        assert!(taxonomy.lookup(&acct("alice"), SequenceNumber(2)).is_err());
        assert!(matches!(
            taxonomy.snapshot_at(SequenceNumber(2)),
            Err(TaxonomyError::NoSnapshot(SequenceNumber(2)))
        ));
    }

    #[test]
    fn non_monotonic_configure_rejected_and_history_untouched() {
        let mut taxonomy = genesis();
        taxonomy.configure(BTreeMap::new(), SequenceNumber(2)).unwrap();
        let before = taxonomy.fingerprint(SequenceNumber(2)).unwrap();

        let err = taxonomy
            .configure(BTreeMap::from([(acct("alice"), Symbol('Z'))]), SequenceNumber(2))
            .unwrap_err();
        assert!(matches!(
            err,
            TaxonomyError::NonMonotonicSequence {
                requested: SequenceNumber(2),
                latest: SequenceNumber(2)
            }
        ));
        assert_eq!(taxonomy.fingerprint(SequenceNumber(2)).unwrap(), before);
        assert_eq!(taxonomy.lookup(&acct("alice"), SequenceNumber(2)).unwrap(), Symbol('A'));
    }

    #[test]
    fn gap_extension_copies_latest_snapshot() {
        let mut taxonomy = genesis();
        let at_zero = taxonomy.fingerprint(SequenceNumber::GENESIS).unwrap();

        assert!(taxonomy.extend_to(SequenceNumber(1), BTreeMap::new()));
        assert_eq!(taxonomy.latest_sequence_number(), Some(SequenceNumber(1)));
        assert_eq!(
            taxonomy.snapshot_at(SequenceNumber(1)).unwrap(),
            taxonomy.snapshot_at(SequenceNumber::GENESIS).unwrap()
        );
        assert_eq!(taxonomy.fingerprint(SequenceNumber::GENESIS).unwrap(), at_zero);
        assert_eq!(taxonomy.fingerprint(SequenceNumber(1)).unwrap(), at_zero);
    }

    #[test]
    fn extension_is_noop_when_already_covered() {
        let mut taxonomy = genesis();
        assert!(!taxonomy.extend_to(SequenceNumber::GENESIS, BTreeMap::new()));
        assert_eq!(taxonomy.len(), 1);
    }

    #[test]
    fn extension_never_overrides_existing_mapping() {
        let mut taxonomy = genesis();
        assert!(taxonomy.extend_to(
            SequenceNumber(1),
            BTreeMap::from([(acct("alice"), Symbol('X')), (acct("carol"), Symbol('C'))]),
        ));
        assert_eq!(taxonomy.lookup(&acct("alice"), SequenceNumber(1)).unwrap(), Symbol('A'));
        assert_eq!(taxonomy.lookup(&acct("carol"), SequenceNumber(1)).unwrap(), Symbol('C'));
    }

    #[test]
    fn extension_of_empty_taxonomy_publishes_root() {
        let mut taxonomy = VersionedTaxonomy::new();
        assert!(taxonomy.extend_to(
            SequenceNumber(1),
            BTreeMap::from([(acct("alice"), Symbol('A'))]),
        ));
        assert_eq!(taxonomy.sequence_numbers(), vec![SequenceNumber(1)]);
    }

    #[test]
    fn remap_publishes_new_snapshot_only() {
        let mut taxonomy = genesis();
        taxonomy
            .remap_account(&acct("alice"), Symbol('Q'), SequenceNumber(4))
            .unwrap();
        assert_eq!(taxonomy.lookup(&acct("alice"), SequenceNumber(3)).unwrap(), Symbol('A'));
        assert_eq!(taxonomy.lookup(&acct("alice"), SequenceNumber(4)).unwrap(), Symbol('Q'));
        assert!(matches!(
            taxonomy.remap_account(&acct("zed"), Symbol('Z'), SequenceNumber(5)),
            Err(TaxonomyError::UnmappedAccount { .. })
        ));
    }

    #[test]
    fn export_log_records_deltas() {
        let mut taxonomy = genesis();
        taxonomy.extend_to(SequenceNumber(1), BTreeMap::from([(acct("carol"), Symbol('C'))]));
        taxonomy.extend_to(SequenceNumber(2), BTreeMap::new());

        let log = taxonomy.export_log().unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].entries.len(), 2);
        assert_eq!(log[1].entries, BTreeMap::from([(acct("carol"), Symbol('C'))]));
        assert!(log[2].entries.is_empty());
        assert_eq!(log[1].fingerprint, log[2].fingerprint);

        let json = serde_json::to_string(&log).unwrap();
        let back: Vec<SnapshotRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, log);
    }

    // ─── Property tests ───

    proptest! {
        /// Publishing later snapshots never changes what earlier ones say.
        #[test]
        fn history_is_immutable(additions in proptest::collection::vec(0u32..40, 1..40)) {
            let mut taxonomy = genesis();
            let genesis_print = taxonomy.fingerprint(SequenceNumber::GENESIS).unwrap();
            let mut prints = Vec::new();

            for (i, n) in additions.iter().enumerate() {
                let seq = SequenceNumber(i as u64 + 1);
                let symbol = Symbol(char::from_u32(0x100 + n).unwrap());
                taxonomy.extend_to(seq, BTreeMap::from([(acct(&format!("acct-{n}")), symbol)]));
                prints.push((seq, taxonomy.fingerprint(seq).unwrap()));
            }

            prop_assert_eq!(taxonomy.fingerprint(SequenceNumber::GENESIS).unwrap(), genesis_print);
            for (seq, print) in prints {
                prop_assert_eq!(taxonomy.fingerprint(seq).unwrap(), print);
            }
            prop_assert_eq!(taxonomy.lookup(&acct("alice"), SequenceNumber(1000)).unwrap(), Symbol('A'));
        }

        /// A lookup resolves against the greatest published key at or below it.
        #[test]
        fn lookup_matches_materialized_snapshot(gaps in proptest::collection::vec(1u64..5, 1..20), probe in 0u64..100) {
            let mut taxonomy = genesis();
            let mut seq = 0u64;
            for (i, gap) in gaps.iter().enumerate() {
                seq += gap;
                let symbol = Symbol(char::from_u32(0x200 + i as u32).unwrap());
                taxonomy.extend_to(SequenceNumber(seq), BTreeMap::from([(acct(&format!("n{i}")), symbol)]));
            }
            let probe = SequenceNumber(probe);
            let mapping = taxonomy.snapshot_at(probe).unwrap();
            for (account, symbol) in &mapping {
                prop_assert_eq!(taxonomy.lookup(account, probe).unwrap(), *symbol);
            }
        }
    }
}
