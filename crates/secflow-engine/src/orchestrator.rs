//! # Transaction Orchestrator
//!
//! Owns every pipeline component and drives one validation at a time:
//!
//! ```text
//! taxonomy coverage → path enumeration → words → classification
//!     → constraint building → Simplex → verdict (→ balance update)
//! ```
//!
//! ## Sequencing
//!
//! The orchestrator owns the sequence counter. Transactions receive
//! strictly increasing sequence numbers starting at 1; 0 is reserved for a
//! genesis snapshot. Administrative taxonomy changes at `n` advance the
//! counter past `n`, so every later transaction reads a snapshot at or
//! after the change. Transactions are validated in submission order, each
//! exactly once.
//!
//! ## Taxonomy Coverage
//!
//! New accounts receive a symbol from the allocator immediately, but the
//! mapping stays pending until the next snapshot is published. Validating
//! a transaction at sequence number `n` extends the taxonomy to `n`, folding
//! the pending mappings in. Extensions are never rolled back, even when the
//! verdict is `Infeasible` or `Error`.
//!
//! ## Security Invariant
//!
//! A balance changes only after the lifecycle reached `Solved` and the
//! solver reported a feasible routing. Every earlier exit (no path, nothing
//! classified, any error) leaves balances untouched.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::Utc;
use rust_decimal::Decimal;

use secflow_automaton::FlowClassifier;
use secflow_core::{AccountId, Amount, EngineConfig, Sector, SequenceNumber, Symbol, TransactionId};
use secflow_graph::{TransactionGraph, WordConverter};
use secflow_lp::{build, solve, solve_validated, ClassifiedPath, LpError, Outcome, SolveMode, Transfer};
use secflow_state::{DynValidation, InFlight, Submitted, Validation, ValidationState};
use secflow_taxonomy::{SectorAllocator, SectorPattern, VersionedTaxonomy};

use crate::account::{Account, AccountHandle, AccountRegistry};
use crate::error::EngineError;
use crate::metrics::ValidationMetrics;
use crate::transaction::{Transaction, TransactionLog, TransactionRecord};
use crate::verdict::{RoutedFlow, ShortCircuit, Verdict, VerdictOutcome};

/// The validation engine.
#[derive(Debug)]
pub struct Orchestrator {
    config: EngineConfig,
    allocator: SectorAllocator,
    taxonomy: VersionedTaxonomy,
    graph: TransactionGraph,
    classifier: FlowClassifier,
    accounts: AccountRegistry,
    pending: BTreeMap<AccountId, Symbol>,
    share_limits: BTreeMap<Sector, Decimal>,
    transactions: TransactionLog,
    metrics: ValidationMetrics,
    next_sequence: SequenceNumber,
}

/// What the stages observed, folded into the verdict.
#[derive(Debug, Default)]
struct Progress {
    taxonomy_extended: bool,
    path_count: usize,
    paths_truncated: bool,
    classified_path_count: usize,
    classification_rate: f64,
    short_circuit: Option<ShortCircuit>,
    solver_invoked: bool,
    pivots: usize,
    optimal_value: Option<Decimal>,
    routed: Vec<RoutedFlow>,
}

/// A terminal lifecycle and, for `Error`, the cause.
struct Finished {
    lifecycle: DynValidation,
    outcome: VerdictOutcome,
    error: Option<EngineError>,
}

impl Orchestrator {
    /// Build an engine from `config`.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or the flow classes it declares
    /// are ambiguous.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let allocator = SectorAllocator::from_config(&config)?;
        let classifier = FlowClassifier::for_sectors(&allocator.patterns(), &config.joint_classes)?;
        let share_limits = config.share_limits();

        tracing::info!(
            sectors = config.sectors.len(),
            joint_classes = config.joint_classes.len(),
            max_hops = config.max_hops,
            max_paths = config.max_paths,
            triple_validation = config.triple_validation,
            "orchestrator initialized"
        );

        Ok(Self {
            graph: TransactionGraph::new(config.max_paths),
            config,
            allocator,
            taxonomy: VersionedTaxonomy::new(),
            classifier,
            accounts: AccountRegistry::new(),
            pending: BTreeMap::new(),
            share_limits,
            transactions: TransactionLog::new(),
            metrics: ValidationMetrics::new(),
            next_sequence: SequenceNumber(1),
        })
    }

    // ── Accounts and links ──────────────────────────────────────────

    /// Register an account and issue its symbol.
    ///
    /// # Errors
    ///
    /// - [`EngineError::DuplicateAccount`] if `id` is taken.
    /// - [`EngineError::Taxonomy`] with `CapacityExceeded` when the sector
    ///   has no symbols left.
    pub fn create_account(
        &mut self,
        id: AccountId,
        sector: Sector,
        initial_balance: Amount,
    ) -> Result<AccountHandle, EngineError> {
        if self.accounts.contains(&id) {
            return Err(EngineError::DuplicateAccount(id));
        }
        let symbol = self.allocator.allocate_character_for_sector(sector)?;
        self.graph.add_account(id.clone())?;
        let handle = self.accounts.insert(Account {
            id: id.clone(),
            sector,
            balance: initial_balance,
            symbol,
            created_at: Utc::now(),
        })?;
        self.pending.insert(id.clone(), symbol);

        tracing::info!(account = %id, %sector, %symbol, balance = %initial_balance, "account created");
        Ok(handle)
    }

    /// Add the trade link `from → to`. Returns `false` if it existed.
    pub fn connect(&mut self, from: &AccountId, to: &AccountId) -> Result<bool, EngineError> {
        let added = self.graph.connect(from, to)?;
        tracing::debug!(%from, %to, added, "trade link");
        Ok(added)
    }

    // ── Transactions ────────────────────────────────────────────────

    /// Submit a transfer with the configured hop limit.
    pub fn submit_transaction(
        &mut self,
        source: &AccountId,
        target: &AccountId,
        amount: Amount,
    ) -> Result<TransactionId, EngineError> {
        self.submit_transaction_with_hops(source, target, amount, self.config.max_hops)
    }

    /// Submit a transfer routed over at most `max_hops` edges.
    ///
    /// # Errors
    ///
    /// - [`EngineError::UnknownAccount`] for an unregistered endpoint.
    /// - [`EngineError::SelfTransfer`] if `source == target`.
    /// - [`EngineError::InvalidAmount`] unless `amount` is positive.
    pub fn submit_transaction_with_hops(
        &mut self,
        source: &AccountId,
        target: &AccountId,
        amount: Amount,
        max_hops: usize,
    ) -> Result<TransactionId, EngineError> {
        self.accounts.require(source)?;
        self.accounts.require(target)?;
        if source == target {
            return Err(EngineError::SelfTransfer(source.clone()));
        }
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount {
                amount: amount.as_decimal(),
            });
        }

        let sequence_number = self.advance_sequence()?;
        let id = self.transactions.next_id();
        self.transactions.append(Transaction {
            id,
            source: source.clone(),
            target: target.clone(),
            amount,
            sequence_number,
            max_hops,
            submitted_at: Utc::now(),
        });
        self.metrics.record_submission();

        tracing::info!(tx = %id, seq = %sequence_number, %source, %target, %amount, max_hops, "transaction submitted");
        Ok(id)
    }

    /// Validate transaction `id` and record its verdict.
    ///
    /// On a `Feasible` verdict the amount moves from source to target.
    /// An `Error` verdict is recorded in the log and the cause returned as
    /// the error.
    ///
    /// # Errors
    ///
    /// - [`EngineError::UnknownTransaction`] for an unknown id.
    /// - [`EngineError::AlreadyFinalized`] if it already has a verdict.
    /// - [`EngineError::OutOfOrder`] if an earlier transaction is pending.
    /// - The stage error behind an `Error` verdict.
    pub fn validate(&mut self, id: TransactionId, mode: SolveMode) -> Result<Verdict, EngineError> {
        let record = self
            .transactions
            .get(id)
            .ok_or(EngineError::UnknownTransaction(id))?;
        if record.is_finalized() {
            return Err(EngineError::AlreadyFinalized {
                transaction: id,
                state: record.lifecycle.state,
            });
        }
        if let Some(next) = self.transactions.next_pending() {
            if next.transaction.id != id {
                return Err(EngineError::OutOfOrder {
                    requested: id,
                    expected: next.transaction.id,
                });
            }
        }
        let transaction = record.transaction.clone();

        let span = tracing::info_span!("validate", tx = %id, seq = %transaction.sequence_number);
        let _entered = span.enter();

        let started = Instant::now();
        let mut progress = Progress::default();
        let finished = self.run_pipeline(&transaction, mode, &mut progress);

        let verdict = Verdict {
            transaction_id: id,
            sequence_number: transaction.sequence_number,
            mode,
            outcome: finished.outcome,
            optimal_value: progress.optimal_value,
            routed: progress.routed,
            taxonomy_extended: progress.taxonomy_extended,
            path_count: progress.path_count,
            paths_truncated: progress.paths_truncated,
            classified_path_count: progress.classified_path_count,
            classification_rate: progress.classification_rate,
            short_circuit: progress.short_circuit,
            solver_invoked: progress.solver_invoked,
            pivots: progress.pivots,
            error: finished.error.as_ref().map(ToString::to_string),
            elapsed: started.elapsed(),
        };

        let record = self
            .transactions
            .get_mut(id)
            .ok_or(EngineError::UnknownTransaction(id))?;
        record.lifecycle = finished.lifecycle;
        record.verdict = Some(verdict.clone());
        self.metrics.record(&verdict);

        tracing::info!(
            outcome = ?verdict.outcome,
            paths = verdict.path_count,
            classified = verdict.classified_path_count,
            rate = verdict.classification_rate,
            solver = verdict.solver_invoked,
            elapsed_us = verdict.elapsed.as_micros() as u64,
            "verdict"
        );

        match finished.error {
            Some(error) => Err(error),
            None => Ok(verdict),
        }
    }

    // ── Taxonomy administration ─────────────────────────────────────

    /// The symbol of `account` in force at `sequence_number`.
    pub fn get_mapping(
        &self,
        account: &AccountId,
        sequence_number: SequenceNumber,
    ) -> Result<Symbol, EngineError> {
        Ok(self.taxonomy.lookup(account, sequence_number)?)
    }

    /// The containment pattern of `sector`'s symbol range.
    pub fn get_pattern(&self, sector: Sector) -> Result<SectorPattern, EngineError> {
        Ok(self.allocator.get_pattern_for_sector(sector)?)
    }

    /// Publish a snapshot at `sequence_number` carrying every pending
    /// mapping plus `mapping`.
    ///
    /// Symbols in `mapping` must lie in their account's sector range.
    ///
    /// # Errors
    ///
    /// - [`EngineError::UnknownAccount`] or [`EngineError::ForeignSymbol`]
    ///   for an invalid entry.
    /// - [`EngineError::SymbolInUse`] if the result would give two accounts
    ///   the same symbol.
    /// - [`EngineError::Taxonomy`] with `NonMonotonicSequence` unless
    ///   `sequence_number` is after every published snapshot.
    pub fn configure_taxonomy(
        &mut self,
        mapping: BTreeMap<AccountId, Symbol>,
        sequence_number: SequenceNumber,
    ) -> Result<(), EngineError> {
        self.check_mapping(&mapping)?;
        let mut merged = self.pending.clone();
        merged.extend(mapping.iter().map(|(a, s)| (a.clone(), *s)));
        let published = merged.len();

        self.taxonomy.configure(merged, sequence_number)?;
        self.pending.clear();
        for (account, symbol) in mapping {
            self.allocator.reserve(symbol)?;
            self.accounts.set_symbol(&account, symbol)?;
        }
        self.reserve_through(sequence_number)?;

        tracing::info!(seq = %sequence_number, entries = published, "taxonomy configured");
        Ok(())
    }

    /// Remap `account` to `symbol` from `sequence_number` on.
    ///
    /// # Errors
    ///
    /// As for [`Self::configure_taxonomy`].
    pub fn remap_account(
        &mut self,
        account: &AccountId,
        symbol: Symbol,
        sequence_number: SequenceNumber,
    ) -> Result<(), EngineError> {
        self.check_mapping(&BTreeMap::from([(account.clone(), symbol)]))?;
        if self.pending.is_empty() {
            self.taxonomy.remap_account(account, symbol, sequence_number)?;
        } else {
            let mut merged = self.pending.clone();
            merged.insert(account.clone(), symbol);
            self.taxonomy.configure(merged, sequence_number)?;
            self.pending.clear();
        }
        self.allocator.reserve(symbol)?;
        self.accounts.set_symbol(account, symbol)?;
        self.reserve_through(sequence_number)?;
        Ok(())
    }

    /// Grow `sector`'s symbol range to `new_capacity` and recompile the
    /// classifier over the new ranges.
    ///
    /// Nothing changes unless both the upgrade and the recompilation
    /// succeed.
    pub fn upgrade_sector_capacity(
        &mut self,
        sector: Sector,
        new_capacity: u32,
    ) -> Result<SectorPattern, EngineError> {
        let mut allocator = self.allocator.clone();
        let pattern = allocator.upgrade_capacity(sector, new_capacity)?;
        let classifier = FlowClassifier::for_sectors(&allocator.patterns(), &self.config.joint_classes)?;

        self.allocator = allocator;
        self.classifier = classifier;
        if let Some(layout) = self.config.sectors.iter_mut().find(|s| s.sector == sector) {
            layout.capacity = new_capacity;
        }
        tracing::info!(%sector, new_capacity, pattern = %pattern, "sector capacity upgraded");
        Ok(pattern)
    }

    // ── Read access ─────────────────────────────────────────────────

    /// The record of transaction `id`.
    pub fn transaction(&self, id: TransactionId) -> Option<&TransactionRecord> {
        self.transactions.get(id)
    }

    /// The append-only transaction log.
    pub fn transaction_log(&self) -> &TransactionLog {
        &self.transactions
    }

    /// Validation counters.
    pub fn metrics(&self) -> &ValidationMetrics {
        &self.metrics
    }

    /// The account `id`.
    pub fn account(&self, id: &AccountId) -> Option<&Account> {
        self.accounts.get(id)
    }

    /// All accounts.
    pub fn accounts(&self) -> &AccountRegistry {
        &self.accounts
    }

    /// The versioned taxonomy.
    pub fn taxonomy(&self) -> &VersionedTaxonomy {
        &self.taxonomy
    }

    /// The sector allocator.
    pub fn allocator(&self) -> &SectorAllocator {
        &self.allocator
    }

    /// The compiled flow classifier.
    pub fn classifier(&self) -> &FlowClassifier {
        &self.classifier
    }

    /// The transaction graph.
    pub fn graph(&self) -> &TransactionGraph {
        &self.graph
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Mappings issued but not yet published.
    pub fn pending_mappings(&self) -> &BTreeMap<AccountId, Symbol> {
        &self.pending
    }

    /// The sequence number the next transaction will receive.
    pub fn next_sequence_number(&self) -> SequenceNumber {
        self.next_sequence
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn run_pipeline(
        &mut self,
        transaction: &Transaction,
        mode: SolveMode,
        progress: &mut Progress,
    ) -> Finished {
        let seq = transaction.sequence_number;
        let v = Validation::<Submitted>::new(transaction.id, seq);

        progress.taxonomy_extended = self.cover_taxonomy(seq);
        let v = v.taxonomy_checked(progress.taxonomy_extended);

        let paths = match self
            .graph
            .enumerate(&transaction.source, &transaction.target, transaction.max_hops)
        {
            Ok(enumeration) => {
                progress.paths_truncated = enumeration.truncated;
                enumeration.paths
            }
            Err(e) => return fail(v, e.into()),
        };
        progress.path_count = paths.len();
        let v = v.paths_enumerated(paths.len());
        if paths.is_empty() {
            tracing::warn!(max_hops = transaction.max_hops, "no connecting path, solver skipped");
            progress.short_circuit = Some(ShortCircuit::NoPath);
            return conclude(v.no_path(), VerdictOutcome::Infeasible);
        }

        let words = match WordConverter::new(&self.taxonomy).to_words(&paths, seq) {
            Ok(words) => words,
            Err(e) => return fail(v, e.into()),
        };
        let classified: Vec<ClassifiedPath> = words
            .iter()
            .filter_map(|word| {
                self.classifier.classify(word.as_str()).map(|class| ClassifiedPath {
                    word: word.to_string(),
                    class,
                })
            })
            .collect();
        progress.classified_path_count = classified.len();
        progress.classification_rate = self.classifier.classification_rate(&words);
        tracing::debug!(
            paths = paths.len(),
            classified = classified.len(),
            rate = progress.classification_rate,
            "path words classified"
        );
        let v = v.classified(classified.len(), progress.classification_rate);
        if classified.is_empty() {
            tracing::warn!(paths = paths.len(), "no path word classified, solver skipped");
            progress.short_circuit = Some(ShortCircuit::Unclassified);
            return conclude(v.unclassified(), VerdictOutcome::Infeasible);
        }

        let source_balance = match self.accounts.require(&transaction.source) {
            Ok(account) => account.balance,
            Err(e) => return fail(v, e),
        };
        let transfer = Transfer {
            source: transaction.source.clone(),
            target: transaction.target.clone(),
            amount: transaction.amount,
            source_balance,
        };
        let flow = match build(&transfer, &classified, &self.share_limits) {
            Ok(flow) => flow,
            Err(e) => return fail(v, e.into()),
        };
        let variables = flow.problem.variable_count();
        let constraints = flow.problem.constraint_count();
        let v = v.constrained(variables, constraints);

        progress.solver_invoked = true;
        let solved = if self.config.triple_validation {
            solve_validated(&flow.problem)
        } else {
            solve(&flow.problem, mode)
        };
        let solution = match solved {
            Ok(solution) => solution,
            Err(e) => {
                tracing::error!(
                    variables,
                    constraints,
                    classified = classified.len(),
                    error = %e,
                    "solver failed"
                );
                return fail(v, e.into());
            }
        };
        progress.pivots = solution.pivots;
        let v = v.solved(solution.pivots);

        match solution.outcome {
            Outcome::Feasible => {
                if let Err(e) =
                    self.accounts
                        .transfer(&transaction.source, &transaction.target, transaction.amount)
                {
                    return fail(v, e);
                }
                progress.routed = flow
                    .routed(&solution.assignment)
                    .into_iter()
                    .map(|(class, volume)| RoutedFlow { class, volume })
                    .collect();
                if mode == SolveMode::Optimization {
                    progress.optimal_value = solution.optimal_value;
                }
                conclude(v.feasible(), VerdictOutcome::Feasible)
            }
            Outcome::Infeasible => conclude(v.infeasible(), VerdictOutcome::Infeasible),
            Outcome::Unbounded => fail(
                v,
                LpError::SolverInconsistency {
                    variables,
                    constraints,
                    detail: "routed volume unbounded under conservation rows".to_string(),
                }
                .into(),
            ),
        }
    }

    /// Extend the taxonomy to `seq`, publishing pending mappings.
    fn cover_taxonomy(&mut self, seq: SequenceNumber) -> bool {
        let extended = self.taxonomy.extend_to(seq, self.pending.clone());
        if extended {
            self.pending.clear();
        } else if !self.pending.is_empty() {
            tracing::warn!(
                seq = %seq,
                pending = self.pending.len(),
                "taxonomy already past sequence number, pending mappings deferred"
            );
        }
        extended
    }

    /// Validate administrative `mapping` entries against sector ranges and
    /// against the symbols every other account holds once it applies.
    fn check_mapping(&self, mapping: &BTreeMap<AccountId, Symbol>) -> Result<(), EngineError> {
        for (account, symbol) in mapping {
            self.check_symbol(account, *symbol)?;
        }

        // The registry mirrors the latest snapshot plus pending mappings.
        let mut holders: BTreeMap<Symbol, &AccountId> = self
            .accounts
            .iter()
            .filter(|account| !mapping.contains_key(&account.id))
            .map(|account| (account.symbol, &account.id))
            .collect();
        for (account, symbol) in mapping {
            if let Some(holder) = holders.insert(*symbol, account) {
                return Err(EngineError::SymbolInUse {
                    account: account.clone(),
                    symbol: *symbol,
                    holder: holder.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_symbol(&self, account: &AccountId, symbol: Symbol) -> Result<(), EngineError> {
        let sector = self.accounts.require(account)?.sector;
        if self.allocator.sector_of(symbol) == Some(sector) {
            Ok(())
        } else {
            Err(EngineError::ForeignSymbol {
                account: account.clone(),
                symbol,
                sector,
            })
        }
    }

    fn advance_sequence(&mut self) -> Result<SequenceNumber, EngineError> {
        let current = self.next_sequence;
        self.next_sequence = current
            .next()
            .ok_or(EngineError::SequenceExhausted(current))?;
        Ok(current)
    }

    /// Make sure later transactions are sequenced after `seq`.
    fn reserve_through(&mut self, seq: SequenceNumber) -> Result<(), EngineError> {
        if self.next_sequence <= seq {
            self.next_sequence = seq.next().ok_or(EngineError::SequenceExhausted(seq))?;
        }
        Ok(())
    }
}

fn fail<S: InFlight>(v: Validation<S>, error: EngineError) -> Finished {
    tracing::error!(stage = v.state_name(), %error, "validation failed");
    Finished {
        lifecycle: v.fail(error.to_string()).into(),
        outcome: VerdictOutcome::Error,
        error: Some(error),
    }
}

fn conclude<S: ValidationState>(v: Validation<S>, outcome: VerdictOutcome) -> Finished {
    Finished {
        lifecycle: v.into(),
        outcome,
        error: None,
    }
}
