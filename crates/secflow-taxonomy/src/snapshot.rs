//! # Taxonomy Snapshots — Persistent Overlays
//!
//! A `Snapshot` is an immutable account → symbol mapping published at one
//! sequence number. Snapshots are stored as overlays: each holds only the
//! entries that differ from its predecessor plus an `Arc` to that
//! predecessor. Publishing a snapshot never touches an existing one.
//!
//! ## Overlay Depth
//!
//! Lookups walk the overlay chain, so chains are bounded. When a new
//! snapshot would exceed [`MAX_OVERLAY_DEPTH`], it is published as a fresh
//! materialized root instead (copy-on-extend). The predecessor keeps its own
//! chain and is unaffected.

use std::collections::BTreeMap;
use std::sync::Arc;

use secflow_core::{AccountId, SequenceNumber, Symbol};

/// Longest overlay chain before a snapshot is materialized.
pub const MAX_OVERLAY_DEPTH: usize = 16;

/// One published taxonomy snapshot.
#[derive(Debug)]
pub struct Snapshot {
    sequence_number: SequenceNumber,
    delta: BTreeMap<AccountId, Symbol>,
    parent: Option<Arc<Snapshot>>,
    depth: usize,
}

impl Snapshot {
    /// A materialized snapshot with no predecessor.
    pub fn root(sequence_number: SequenceNumber, mapping: BTreeMap<AccountId, Symbol>) -> Self {
        Self {
            sequence_number,
            delta: mapping,
            parent: None,
            depth: 0,
        }
    }

    /// A snapshot equal to `parent` with `changes` applied.
    ///
    /// Entries of `changes` that `parent` already maps to the same symbol
    /// are dropped from the delta.
    pub fn layered(
        parent: &Arc<Snapshot>,
        sequence_number: SequenceNumber,
        changes: BTreeMap<AccountId, Symbol>,
    ) -> Self {
        let delta: BTreeMap<AccountId, Symbol> = changes
            .into_iter()
            .filter(|(account, symbol)| parent.get(account) != Some(*symbol))
            .collect();

        if parent.depth + 1 > MAX_OVERLAY_DEPTH {
            let mut mapping = parent.materialize();
            mapping.extend(delta);
            tracing::debug!(seq = %sequence_number, entries = mapping.len(), "materialized taxonomy snapshot");
            return Self::root(sequence_number, mapping);
        }

        Self {
            sequence_number,
            delta,
            parent: Some(Arc::clone(parent)),
            depth: parent.depth + 1,
        }
    }

    /// Sequence number this snapshot was published at.
    pub fn sequence_number(&self) -> SequenceNumber {
        self.sequence_number
    }

    /// Length of the overlay chain below this snapshot.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Entries introduced or changed by this snapshot.
    pub fn delta(&self) -> &BTreeMap<AccountId, Symbol> {
        &self.delta
    }

    /// The symbol of `account`, resolved through the overlay chain.
    pub fn get(&self, account: &AccountId) -> Option<Symbol> {
        let mut current = Some(self);
        while let Some(snapshot) = current {
            if let Some(symbol) = snapshot.delta.get(account) {
                return Some(*symbol);
            }
            current = snapshot.parent.as_deref();
        }
        None
    }

    /// The complete mapping in force at this snapshot.
    pub fn materialize(&self) -> BTreeMap<AccountId, Symbol> {
        let mut chain = Vec::with_capacity(self.depth + 1);
        let mut current = Some(self);
        while let Some(snapshot) = current {
            chain.push(snapshot);
            current = snapshot.parent.as_deref();
        }
        let mut mapping = BTreeMap::new();
        for snapshot in chain.into_iter().rev() {
            mapping.extend(snapshot.delta.iter().map(|(a, s)| (a.clone(), *s)));
        }
        mapping
    }
}
