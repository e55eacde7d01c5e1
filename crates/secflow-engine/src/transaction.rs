//! # Transactions and the Transaction Log
//!
//! A transaction is immutable once submitted. Its record pairs it with the
//! runtime lifecycle and, once terminal, the verdict. The log is append-only
//! and serializable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use secflow_core::{AccountId, Amount, SecflowError, SequenceNumber, TransactionId};
use secflow_state::DynValidation;

use crate::error::EngineError;
use crate::verdict::Verdict;

/// A submitted transfer request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction identifier, assigned from 1 in submission order.
    pub id: TransactionId,
    /// Sending account.
    pub source: AccountId,
    /// Receiving account.
    pub target: AccountId,
    /// Amount to transfer.
    pub amount: Amount,
    /// Sequence number the taxonomy is read at.
    pub sequence_number: SequenceNumber,
    /// Maximum edges per routing path.
    pub max_hops: usize,
    /// Submission time.
    pub submitted_at: DateTime<Utc>,
}

/// A transaction with its lifecycle and verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// The transaction.
    pub transaction: Transaction,
    /// Lifecycle so far.
    pub lifecycle: DynValidation,
    /// Present once the lifecycle is terminal.
    pub verdict: Option<Verdict>,
}

impl TransactionRecord {
    /// Whether the transaction has a verdict.
    pub fn is_finalized(&self) -> bool {
        self.lifecycle.is_terminal()
    }
}

/// Append-only log of transactions in submission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionLog {
    records: Vec<TransactionRecord>,
}

impl TransactionLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next appended transaction receives.
    pub fn next_id(&self) -> TransactionId {
        TransactionId(self.records.len() as u64 + 1)
    }

    /// Append a freshly submitted transaction.
    pub(crate) fn append(&mut self, transaction: Transaction) {
        let lifecycle = DynValidation::new(transaction.id, transaction.sequence_number);
        self.records.push(TransactionRecord {
            transaction,
            lifecycle,
            verdict: None,
        });
    }

    /// The record of `id`.
    pub fn get(&self, id: TransactionId) -> Option<&TransactionRecord> {
        self.index_of(id).and_then(|i| self.records.get(i))
    }

    pub(crate) fn get_mut(&mut self, id: TransactionId) -> Option<&mut TransactionRecord> {
        self.index_of(id).and_then(|i| self.records.get_mut(i))
    }

    /// The earliest transaction without a verdict.
    pub fn next_pending(&self) -> Option<&TransactionRecord> {
        self.records.iter().find(|r| !r.is_finalized())
    }

    /// Records in submission order.
    pub fn iter(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.records.iter()
    }

    /// Verdicts in submission order.
    pub fn verdicts(&self) -> impl Iterator<Item = &Verdict> {
        self.records.iter().filter_map(|r| r.verdict.as_ref())
    }

    /// Number of transactions.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no transaction was submitted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The log as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load a log written by [`Self::to_json`] and check its consistency.
    ///
    /// Ids must run from 1 in order, every lifecycle must replay through
    /// the transition table, a verdict must be present exactly when the
    /// lifecycle is terminal, and no finalized record may follow a pending
    /// one.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Core`] if the JSON does not parse.
    /// - [`EngineError::State`] if a lifecycle history does not replay.
    /// - [`EngineError::CorruptLog`] for any other inconsistency.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let log: Self = serde_json::from_str(json).map_err(SecflowError::from)?;
        let mut pending_seen = false;
        for (expected, record) in (1u64..).map(TransactionId).zip(&log.records) {
            let id = record.transaction.id;
            let corrupt = |detail: String| EngineError::CorruptLog {
                transaction: id,
                detail,
            };
            if id != expected {
                return Err(corrupt(format!("expected id {expected}")));
            }
            if record.lifecycle.transaction_id != id {
                return Err(corrupt(format!(
                    "lifecycle belongs to {}",
                    record.lifecycle.transaction_id
                )));
            }
            record.lifecycle.verify()?;
            if record.is_finalized() != record.verdict.is_some() {
                return Err(corrupt(format!(
                    "stage {} with verdict present = {}",
                    record.lifecycle.state,
                    record.verdict.is_some()
                )));
            }
            if record.is_finalized() && pending_seen {
                return Err(corrupt("finalized after a pending transaction".to_string()));
            }
            pending_seen |= !record.is_finalized();
        }
        tracing::debug!(records = log.records.len(), "transaction log loaded");
        Ok(log)
    }

    fn index_of(&self, id: TransactionId) -> Option<usize> {
        usize::try_from(id.0).ok()?.checked_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction(id: u64) -> Transaction {
        Transaction {
            id: TransactionId(id),
            source: AccountId::new("alice").unwrap(),
            target: AccountId::new("bob").unwrap(),
            amount: Amount::from_units(10),
            sequence_number: SequenceNumber(id),
            max_hops: 3,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn pending_log_reloads() {
        let mut log = TransactionLog::new();
        log.append(transaction(1));
        log.append(transaction(2));
        let parsed = TransactionLog::from_json(&log.to_json().unwrap()).unwrap();
        assert_eq!(parsed, log);
        assert_eq!(parsed.next_id(), TransactionId(3));
        assert_eq!(parsed.next_pending().map(|r| r.transaction.id), Some(TransactionId(1)));
    }

    #[test]
    fn ids_must_run_in_order() {
        let mut log = TransactionLog::new();
        log.append(transaction(2));
        let err = TransactionLog::from_json(&log.to_json().unwrap()).unwrap_err();
        assert!(matches!(err, EngineError::CorruptLog { transaction: TransactionId(2), .. }));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            TransactionLog::from_json("{\"records\": 7}"),
            Err(EngineError::Core(_))
        ));
    }
}
