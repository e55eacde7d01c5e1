//! In-process validation counters.
//!
//! The orchestrator is single-threaded, so the counters are plain integers
//! updated through `&mut self`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::verdict::{ShortCircuit, Verdict, VerdictOutcome};

/// Counters over every verdict produced so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    /// Transactions submitted.
    pub submitted: u64,
    /// Verdicts produced.
    pub validated: u64,
    /// `Feasible` verdicts.
    pub feasible: u64,
    /// `Infeasible` verdicts.
    pub infeasible: u64,
    /// `Error` verdicts.
    pub errors: u64,
    /// Infeasible without a connecting path.
    pub no_path: u64,
    /// Infeasible because nothing classified.
    pub unclassified: u64,
    /// Solver runs.
    pub solver_invocations: u64,
    /// Pivots across all solver runs.
    pub pivots: u64,
    /// Paths enumerated across all validations.
    pub paths_enumerated: u64,
    /// Path words classified across all validations.
    pub words_classified: u64,
    /// Taxonomy snapshots published by validations.
    pub taxonomy_extensions: u64,
    /// Total validation time.
    pub total_elapsed: Duration,
}

impl ValidationMetrics {
    /// Fresh counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_submission(&mut self) {
        self.submitted += 1;
    }

    /// Fold one verdict into the counters.
    pub fn record(&mut self, verdict: &Verdict) {
        self.validated += 1;
        match verdict.outcome {
            VerdictOutcome::Feasible => self.feasible += 1,
            VerdictOutcome::Infeasible => self.infeasible += 1,
            VerdictOutcome::Error => self.errors += 1,
        }
        match verdict.short_circuit {
            Some(ShortCircuit::NoPath) => self.no_path += 1,
            Some(ShortCircuit::Unclassified) => self.unclassified += 1,
            None => {}
        }
        if verdict.solver_invoked {
            self.solver_invocations += 1;
        }
        self.pivots += verdict.pivots as u64;
        self.paths_enumerated += verdict.path_count as u64;
        self.words_classified += verdict.classified_path_count as u64;
        if verdict.taxonomy_extended {
            self.taxonomy_extensions += 1;
        }
        self.total_elapsed += verdict.elapsed;
    }

    /// Share of verdicts that were `Feasible`, 0 before any verdict.
    pub fn feasibility_rate(&self) -> f64 {
        if self.validated == 0 {
            0.0
        } else {
            self.feasible as f64 / self.validated as f64
        }
    }
}
