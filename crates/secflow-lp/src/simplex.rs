//! # Simplex Solver — Two-Phase Tableau, Exact Decimals
//!
//! Solves [`LpProblem`]s over non-negative variables with the textbook
//! two-phase tableau method.
//!
//! ## Design
//!
//! 1. **Standard form.** Each constraint is normalized to a non-negative
//!    right-hand side. `≤` rows get a slack column, `≥` rows a surplus and an
//!    artificial column, `=` rows an artificial column.
//! 2. **Phase 1** maximizes `−Σ artificials`. A positive residual means the
//!    problem is infeasible. Artificials left in the basis at zero are
//!    pivoted out; rows where that is impossible are redundant and dropped.
//! 3. **Phase 2** (optimization only) optimizes the real objective from the
//!    phase-1 basis, with artificial columns barred from entering.
//!
//! Pivoting follows Bland's rule (lowest eligible entering column, lowest
//! basic index on ratio ties), which rules out cycling. Every arithmetic
//! step is a checked `rust_decimal` operation; overflow is reported as
//! [`LpError::ArithmeticOverflow`], never wrapped.
//!
//! ## Triple Validation
//!
//! [`solve_validated`] solves twice (feasibility, then optimization) and
//! substitutes both returned points into the original constraints. Any
//! disagreement is a solver fault and raises
//! [`LpError::SolverInconsistency`].

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LpError;
use crate::problem::{LpProblem, Relation, Sense, VarId};

/// Pivot budget per solve.
pub const MAX_PIVOTS: usize = 10_000;

/// What the caller wants to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveMode {
    /// Whether any non-negative point satisfies every constraint.
    Feasibility,
    /// Feasibility plus the optimal objective value.
    Optimization,
}

/// Solver outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// A feasible point exists (and, when optimizing, an optimum).
    Feasible,
    /// No non-negative point satisfies the constraints.
    Infeasible,
    /// Feasible, but the objective grows without bound.
    Unbounded,
}

/// Result of one solve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    /// The requested mode.
    pub mode: SolveMode,
    /// The outcome.
    pub outcome: Outcome,
    /// Optimal objective value (optimization mode, feasible outcome).
    pub optimal_value: Option<Decimal>,
    /// A feasible point, one value per variable. Empty unless feasible.
    pub assignment: Vec<Decimal>,
    /// Pivots performed across both phases.
    pub pivots: usize,
}

impl Solution {
    fn without_point(mode: SolveMode, outcome: Outcome, pivots: usize) -> Self {
        Self {
            mode,
            outcome,
            optimal_value: None,
            assignment: Vec::new(),
            pivots,
        }
    }

    /// Value of `var` in the returned point.
    pub fn value(&self, var: VarId) -> Option<Decimal> {
        self.assignment.get(var.0).copied()
    }
}

/// Solve `problem` in `mode`.
///
/// # Errors
///
/// - [`LpError::MissingObjective`] when optimizing without an objective.
/// - [`LpError::ArithmeticOverflow`] on decimal overflow.
/// - [`LpError::IterationLimit`] past [`MAX_PIVOTS`].
pub fn solve(problem: &LpProblem, mode: SolveMode) -> Result<Solution, LpError> {
    let objective = match mode {
        SolveMode::Optimization => Some(problem.objective().ok_or(LpError::MissingObjective)?),
        SolveMode::Feasibility => None,
    };

    let mut tableau = Tableau::standard_form(problem)?;

    // Phase 1: maximize −Σ artificials.
    let phase_one_cost: Vec<Decimal> = (0..tableau.columns)
        .map(|j| if j >= tableau.artificial_from { Decimal::NEGATIVE_ONE } else { Decimal::ZERO })
        .collect();
    if tableau.optimize(&phase_one_cost, tableau.columns)? == Status::Unbounded {
        return Err(inconsistency(problem, "phase 1 reported an unbounded auxiliary problem"));
    }
    if tableau.artificial_residual()? > Decimal::ZERO {
        tracing::debug!(
            variables = problem.variable_count(),
            constraints = problem.constraint_count(),
            pivots = tableau.pivots,
            "lp infeasible"
        );
        return Ok(Solution::without_point(mode, Outcome::Infeasible, tableau.pivots));
    }
    tableau.expel_artificials()?;

    let Some(objective) = objective else {
        let assignment = tableau.assignment();
        return Ok(Solution {
            mode,
            outcome: Outcome::Feasible,
            optimal_value: None,
            assignment,
            pivots: tableau.pivots,
        });
    };

    // Phase 2: the real objective, artificials barred.
    let mut cost = vec![Decimal::ZERO; tableau.columns];
    for (var, coef) in &objective.terms {
        let coef = match objective.sense {
            Sense::Maximize => *coef,
            Sense::Minimize => -*coef,
        };
        cost[var.0] = cost[var.0].checked_add(coef).ok_or(overflow("objective setup"))?;
    }
    let barrier = tableau.artificial_from;
    if tableau.optimize(&cost, barrier)? == Status::Unbounded {
        return Ok(Solution::without_point(mode, Outcome::Unbounded, tableau.pivots));
    }

    let assignment = tableau.assignment();
    let optimal_value = problem.objective_value(&assignment)?;
    tracing::debug!(
        variables = problem.variable_count(),
        constraints = problem.constraint_count(),
        pivots = tableau.pivots,
        %optimal_value,
        "lp optimal"
    );
    Ok(Solution {
        mode,
        outcome: Outcome::Feasible,
        optimal_value: Some(optimal_value),
        assignment,
        pivots: tableau.pivots,
    })
}

/// Solve with triple validation.
///
/// 1. The feasibility verdict.
/// 2. The optimization verdict, which must agree with (1): both feasible
///    (or unbounded) or both infeasible.
/// 3. Structural re-derivation: both returned points must satisfy every
///    original constraint exactly, and the objective recomputed from the
///    optimal point must equal the reported optimum.
///
/// Returns the optimization [`Solution`].
///
/// # Errors
///
/// [`LpError::SolverInconsistency`] on any disagreement, plus every error
/// of [`solve`].
pub fn solve_validated(problem: &LpProblem) -> Result<Solution, LpError> {
    let feasibility = solve(problem, SolveMode::Feasibility)?;
    let optimization = solve(problem, SolveMode::Optimization)?;

    let feasible_by_phase_one = feasibility.outcome == Outcome::Feasible;
    let feasible_by_phase_two = optimization.outcome != Outcome::Infeasible;
    if feasible_by_phase_one != feasible_by_phase_two {
        return Err(inconsistency(
            problem,
            &format!(
                "feasibility verdict {:?} disagrees with optimization verdict {:?}",
                feasibility.outcome, optimization.outcome
            ),
        ));
    }

    if feasible_by_phase_one {
        if let Some(violated) = problem.first_violation(&feasibility.assignment)? {
            return Err(inconsistency(
                problem,
                &format!("feasible point violates constraint {}", violated.name),
            ));
        }
    }

    if optimization.outcome == Outcome::Feasible {
        if let Some(violated) = problem.first_violation(&optimization.assignment)? {
            return Err(inconsistency(
                problem,
                &format!("optimal point violates constraint {}", violated.name),
            ));
        }
        let recomputed = problem.objective_value(&optimization.assignment)?;
        if optimization.optimal_value != Some(recomputed) {
            return Err(inconsistency(
                problem,
                &format!(
                    "reported optimum {:?} differs from recomputed {recomputed}",
                    optimization.optimal_value
                ),
            ));
        }
    }

    tracing::debug!(outcome = ?optimization.outcome, "triple validation passed");
    Ok(optimization)
}

fn inconsistency(problem: &LpProblem, detail: &str) -> LpError {
    tracing::error!(
        variables = problem.variable_count(),
        constraints = problem.constraint_count(),
        detail,
        "solver inconsistency"
    );
    LpError::SolverInconsistency {
        variables: problem.variable_count(),
        constraints: problem.constraint_count(),
        detail: detail.to_string(),
    }
}

fn overflow(operation: &'static str) -> LpError {
    LpError::ArithmeticOverflow { operation }
}

// ─── Tableau ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Optimal,
    Unbounded,
}

#[derive(Debug)]
struct Tableau {
    rows: Vec<Vec<Decimal>>,
    rhs: Vec<Decimal>,
    basis: Vec<usize>,
    columns: usize,
    structural: usize,
    artificial_from: usize,
    pivots: usize,
}

impl Tableau {
    fn standard_form(problem: &LpProblem) -> Result<Self, LpError> {
        let structural = problem.variable_count();

        // Normalize signs first so slack and artificial counts are known.
        let normalized: Vec<(Vec<(VarId, Decimal)>, Relation, Decimal)> = problem
            .constraints()
            .iter()
            .map(|c| {
                if c.rhs.is_sign_negative() && !c.rhs.is_zero() {
                    let terms = c.terms.iter().map(|(v, k)| (*v, -*k)).collect();
                    (terms, c.relation.flipped(), -c.rhs)
                } else {
                    (c.terms.clone(), c.relation, c.rhs)
                }
            })
            .collect();

        let slacks = normalized
            .iter()
            .filter(|(_, rel, _)| *rel != Relation::Equal)
            .count();
        let artificials = normalized
            .iter()
            .filter(|(_, rel, _)| *rel != Relation::LessEqual)
            .count();
        let artificial_from = structural + slacks;
        let columns = artificial_from + artificials;

        let mut rows = Vec::with_capacity(normalized.len());
        let mut rhs = Vec::with_capacity(normalized.len());
        let mut basis = Vec::with_capacity(normalized.len());
        let mut next_slack = structural;
        let mut next_artificial = artificial_from;

        for (terms, relation, bound) in normalized {
            let mut row = vec![Decimal::ZERO; columns];
            for (var, coef) in terms {
                row[var.0] = row[var.0].checked_add(coef).ok_or(overflow("tableau setup"))?;
            }
            match relation {
                Relation::LessEqual => {
                    row[next_slack] = Decimal::ONE;
                    basis.push(next_slack);
                    next_slack += 1;
                }
                Relation::GreaterEqual => {
                    row[next_slack] = Decimal::NEGATIVE_ONE;
                    next_slack += 1;
                    row[next_artificial] = Decimal::ONE;
                    basis.push(next_artificial);
                    next_artificial += 1;
                }
                Relation::Equal => {
                    row[next_artificial] = Decimal::ONE;
                    basis.push(next_artificial);
                    next_artificial += 1;
                }
            }
            rows.push(row);
            rhs.push(bound);
        }

        Ok(Self {
            rows,
            rhs,
            basis,
            columns,
            structural,
            artificial_from,
            pivots: 0,
        })
    }

    /// Maximize `cost · x` over columns `< eligible` from the current basis.
    fn optimize(&mut self, cost: &[Decimal], eligible: usize) -> Result<Status, LpError> {
        loop {
            let Some(entering) = self.entering_column(cost, eligible)? else {
                return Ok(Status::Optimal);
            };
            let Some(leaving) = self.leaving_row(entering)? else {
                return Ok(Status::Unbounded);
            };
            self.pivot(leaving, entering)?;
        }
    }

    /// Bland: the lowest column with a positive reduced cost.
    fn entering_column(&self, cost: &[Decimal], eligible: usize) -> Result<Option<usize>, LpError> {
        for j in 0..eligible {
            if self.basis.contains(&j) {
                continue;
            }
            let mut reduced = cost[j];
            for (row, &basic) in self.rows.iter().zip(&self.basis) {
                if row[j].is_zero() || cost[basic].is_zero() {
                    continue;
                }
                let term = cost[basic].checked_mul(row[j]).ok_or(overflow("reduced cost"))?;
                reduced = reduced.checked_sub(term).ok_or(overflow("reduced cost"))?;
            }
            if reduced > Decimal::ZERO {
                return Ok(Some(j));
            }
        }
        Ok(None)
    }

    /// Minimum-ratio row for `column`; ties go to the lowest basic index.
    fn leaving_row(&self, column: usize) -> Result<Option<usize>, LpError> {
        let mut best: Option<usize> = None;
        for i in 0..self.rows.len() {
            let a = self.rows[i][column];
            if a <= Decimal::ZERO {
                continue;
            }
            let Some(current) = best else {
                best = Some(i);
                continue;
            };
            // Compare rhs[i]/a against rhs[current]/b by cross-multiplying.
            let b = self.rows[current][column];
            let lhs = self.rhs[i].checked_mul(b).ok_or(overflow("ratio test"))?;
            let rhs = self.rhs[current].checked_mul(a).ok_or(overflow("ratio test"))?;
            match lhs.cmp(&rhs) {
                Ordering::Less => best = Some(i),
                Ordering::Equal if self.basis[i] < self.basis[current] => best = Some(i),
                _ => {}
            }
        }
        Ok(best)
    }

    fn pivot(&mut self, row: usize, column: usize) -> Result<(), LpError> {
        if self.pivots >= MAX_PIVOTS {
            return Err(LpError::IterationLimit { limit: MAX_PIVOTS });
        }
        self.pivots += 1;

        let pivot = self.rows[row][column];
        for value in self.rows[row].iter_mut() {
            *value = value.checked_div(pivot).ok_or(overflow("pivot normalization"))?;
        }
        self.rhs[row] = self.rhs[row].checked_div(pivot).ok_or(overflow("pivot normalization"))?;

        let pivot_row = self.rows[row].clone();
        let pivot_rhs = self.rhs[row];
        for i in 0..self.rows.len() {
            if i == row {
                continue;
            }
            let factor = self.rows[i][column];
            if factor.is_zero() {
                continue;
            }
            for (value, p) in self.rows[i].iter_mut().zip(&pivot_row) {
                if p.is_zero() {
                    continue;
                }
                let delta = factor.checked_mul(*p).ok_or(overflow("row elimination"))?;
                *value = value.checked_sub(delta).ok_or(overflow("row elimination"))?;
            }
            let delta = factor.checked_mul(pivot_rhs).ok_or(overflow("row elimination"))?;
            self.rhs[i] = self.rhs[i].checked_sub(delta).ok_or(overflow("row elimination"))?;
        }
        self.basis[row] = column;
        Ok(())
    }

    fn artificial_residual(&self) -> Result<Decimal, LpError> {
        self.basis
            .iter()
            .zip(&self.rhs)
            .filter(|(basic, _)| **basic >= self.artificial_from)
            .try_fold(Decimal::ZERO, |acc, (_, value)| {
                acc.checked_add(*value).ok_or(overflow("phase 1 residual"))
            })
    }

    /// Pivot zero-valued artificials out of the basis; drop redundant rows.
    fn expel_artificials(&mut self) -> Result<(), LpError> {
        let mut redundant = Vec::new();
        for i in 0..self.rows.len() {
            if self.basis[i] < self.artificial_from {
                continue;
            }
            let replacement = (0..self.artificial_from).find(|&j| !self.rows[i][j].is_zero());
            match replacement {
                Some(j) => self.pivot(i, j)?,
                None => redundant.push(i),
            }
        }
        for i in redundant.into_iter().rev() {
            self.rows.remove(i);
            self.rhs.remove(i);
            self.basis.remove(i);
        }
        Ok(())
    }

    fn assignment(&self) -> Vec<Decimal> {
        let mut values = vec![Decimal::ZERO; self.structural];
        for (&basic, value) in self.basis.iter().zip(&self.rhs) {
            if basic < self.structural {
                values[basic] = value.normalize();
            }
        }
        values
    }
}
