//! # Constraint Builder — Classified Paths to a Linear Program
//!
//! Turns one transfer and the flow classes of its connecting paths into an
//! [`LpProblem`]. Each distinct flow class gets one variable: the volume
//! routed under that class.
//!
//! ## Constraints
//!
//! | Name                 | Form                                   |
//! |----------------------|----------------------------------------|
//! | `source_conservation`| `Σ x_c = amount`                       |
//! | `target_conservation`| `Σ x_c = amount`                       |
//! | `source_balance`     | `Σ x_c ≤ balance(source)`              |
//! | `share:<class>:<S>`  | `x_c ≤ max_share(S) × amount`          |
//!
//! Every class path leaves the source and reaches the target, so the two
//! conservation rows share their terms. Both are emitted so the LP states
//! flow balance at each endpoint explicitly. Share rows are emitted for every
//! receiving sector of a class that declares a limit. Non-negativity is
//! implicit in the solver.
//!
//! The objective maximizes total routed volume.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use secflow_automaton::FlowClass;
use secflow_core::{AccountId, Amount, Sector};

use crate::error::LpError;
use crate::problem::{LpProblem, Relation, Sense, VarId};

/// The transfer being validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Sending account.
    pub source: AccountId,
    /// Receiving account.
    pub target: AccountId,
    /// Amount to route.
    pub amount: Amount,
    /// Balance of the source when validation runs.
    pub source_balance: Amount,
}

/// A path word together with its flow class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedPath {
    /// The path word.
    pub word: String,
    /// The class the automaton assigned to it.
    pub class: FlowClass,
}

/// An LP together with the class behind each variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowProblem {
    /// The linear program.
    pub problem: LpProblem,
    /// Variable of each flow class, ordered by class.
    pub variables: BTreeMap<FlowClass, VarId>,
    /// Number of classified paths behind the variables.
    pub path_count: usize,
}

impl FlowProblem {
    /// The class whose volume `var` carries.
    pub fn class_of(&self, var: VarId) -> Option<FlowClass> {
        self.variables
            .iter()
            .find_map(|(class, v)| (*v == var).then_some(*class))
    }

    /// Per-class volume under `assignment`, ordered by class.
    pub fn routed(&self, assignment: &[Decimal]) -> BTreeMap<FlowClass, Decimal> {
        self.variables
            .iter()
            .filter_map(|(class, var)| assignment.get(var.0).map(|v| (*class, *v)))
            .collect()
    }
}

/// Build the LP for `transfer` over `paths`, applying the sector share
/// `limits`.
///
/// With no classified paths the problem has no variables and the
/// conservation rows `0 = amount` make it infeasible.
///
/// # Errors
///
/// - [`LpError::ArithmeticOverflow`] if a share bound overflows.
/// - [`LpError::UndeclaredVariable`] if a row references an undeclared
///   variable (a builder defect).
pub fn build(
    transfer: &Transfer,
    paths: &[ClassifiedPath],
    limits: &BTreeMap<Sector, Decimal>,
) -> Result<FlowProblem, LpError> {
    let mut problem = LpProblem::new();

    let mut variables = BTreeMap::new();
    for path in paths {
        if !variables.contains_key(&path.class) {
            let var = problem.add_variable(format!("flow[{}]", path.class));
            variables.insert(path.class, var);
        }
    }

    let amount = transfer.amount.as_decimal();
    let total: Vec<(VarId, Decimal)> = variables.values().map(|v| (*v, Decimal::ONE)).collect();

    problem.add_constraint("source_conservation", total.clone(), Relation::Equal, amount)?;
    problem.add_constraint("target_conservation", total.clone(), Relation::Equal, amount)?;
    problem.add_constraint(
        "source_balance",
        total.clone(),
        Relation::LessEqual,
        transfer.source_balance.as_decimal(),
    )?;

    for (class, var) in &variables {
        for sector in class.receiving_sectors() {
            let Some(share) = limits.get(&sector) else {
                continue;
            };
            let bound = share
                .checked_mul(amount)
                .ok_or(LpError::ArithmeticOverflow {
                    operation: "share bound",
                })?;
            problem.add_constraint(
                format!("share:{class}:{sector}"),
                vec![(*var, Decimal::ONE)],
                Relation::LessEqual,
                bound,
            )?;
        }
    }

    problem.set_objective(Sense::Maximize, total)?;

    tracing::debug!(
        source = %transfer.source,
        target = %transfer.target,
        paths = paths.len(),
        variables = problem.variable_count(),
        constraints = problem.constraint_count(),
        "flow problem built"
    );

    Ok(FlowProblem {
        problem,
        variables,
        path_count: paths.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simplex::{solve_validated, Outcome};

    fn transfer(amount: u64, balance: u64) -> Transfer {
        Transfer {
            source: AccountId::new("alice").unwrap(),
            target: AccountId::new("bob").unwrap(),
            amount: Amount::from_units(amount),
            source_balance: Amount::from_units(balance),
        }
    }

    fn classified(word: &str, class: FlowClass) -> ClassifiedPath {
        ClassifiedPath {
            word: word.to_string(),
            class,
        }
    }

    fn agri_to_industry() -> FlowClass {
        FlowClass::Joint {
            from: Sector::Agriculture,
            to: Sector::Industry,
            bidirectional: false,
        }
    }

    #[test]
    fn one_variable_per_distinct_class() {
        let paths = vec![
            classified("AI", agri_to_industry()),
            classified("AIJ", agri_to_industry()),
            classified("ASI", FlowClass::Sector(Sector::Services)),
        ];
        let flow = build(&transfer(300, 2500), &paths, &BTreeMap::new()).unwrap();

        assert_eq!(flow.problem.variable_count(), 2);
        assert_eq!(flow.path_count, 3);
        let names: Vec<&str> = flow.problem.constraints().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["source_conservation", "target_conservation", "source_balance"]);
        assert_eq!(flow.class_of(flow.variables[&agri_to_industry()]), Some(agri_to_industry()));
    }

    #[test]
    fn feasible_transfer_routes_full_amount() {
        let paths = vec![classified("AI", agri_to_industry())];
        let flow = build(&transfer(300, 2500), &paths, &BTreeMap::new()).unwrap();
        let solution = solve_validated(&flow.problem).unwrap();

        assert_eq!(solution.outcome, Outcome::Feasible);
        assert_eq!(solution.optimal_value, Some(Decimal::from(300)));
        assert_eq!(
            flow.routed(&solution.assignment).get(&agri_to_industry()),
            Some(&Decimal::from(300))
        );
    }

    #[test]
    fn insufficient_balance_is_infeasible() {
        let paths = vec![classified("AI", agri_to_industry())];
        let flow = build(&transfer(300, 200), &paths, &BTreeMap::new()).unwrap();
        assert_eq!(solve_validated(&flow.problem).unwrap().outcome, Outcome::Infeasible);
    }

    #[test]
    fn share_limits_bind_receiving_sectors() {
        let limits = BTreeMap::from([(Sector::Industry, Decimal::new(8, 1))]);

        // A single industry-bound class cannot carry the whole amount.
        let single = build(
            &transfer(300, 2500),
            &[classified("AI", agri_to_industry())],
            &limits,
        )
        .unwrap();
        let share_row = &single.problem.constraints()[3];
        assert_eq!(share_row.name, "share:AGRICULTURE->INDUSTRY:INDUSTRY");
        assert_eq!(share_row.rhs, Decimal::from(240));
        assert_eq!(solve_validated(&single.problem).unwrap().outcome, Outcome::Infeasible);

        // A second route through services absorbs the remainder.
        let split = build(
            &transfer(300, 2500),
            &[
                classified("AI", agri_to_industry()),
                classified("ASI", FlowClass::Sector(Sector::Services)),
            ],
            &limits,
        )
        .unwrap();
        let solution = solve_validated(&split.problem).unwrap();
        assert_eq!(solution.outcome, Outcome::Feasible);
        assert_eq!(solution.optimal_value, Some(Decimal::from(300)));
    }

    #[test]
    fn bidirectional_joint_checks_both_sectors() {
        let limits = BTreeMap::from([
            (Sector::Finance, Decimal::new(5, 1)),
            (Sector::Services, Decimal::new(9, 1)),
        ]);
        let class = FlowClass::Joint {
            from: Sector::Finance,
            to: Sector::Services,
            bidirectional: true,
        };
        let flow = build(&transfer(100, 100), &[classified("FS", class)], &limits).unwrap();
        let shares: Vec<Decimal> = flow
            .problem
            .constraints()
            .iter()
            .filter(|c| c.name.starts_with("share:"))
            .map(|c| c.rhs)
            .collect();
        assert_eq!(shares, vec![Decimal::from(50), Decimal::from(90)]);
    }

    #[test]
    fn no_paths_means_no_variables_and_infeasible() {
        let flow = build(&transfer(300, 2500), &[], &BTreeMap::new()).unwrap();
        assert_eq!(flow.problem.variable_count(), 0);
        assert_eq!(solve_validated(&flow.problem).unwrap().outcome, Outcome::Infeasible);
    }

    proptest::proptest! {
        /// Over sector classes with optional share limits, the validated
        /// solve is feasible exactly when the balance covers the amount and
        /// the class caps add up to it, and then routes the whole amount.
        #[test]
        fn verdict_matches_capacity_arithmetic(
            amount in 1u64..1_000,
            balance in 0u64..1_500,
            chosen in proptest::collection::vec(proptest::bool::ANY, Sector::ALL.len()),
            tenths in proptest::collection::vec(proptest::option::of(1i64..=10), Sector::ALL.len()),
        ) {
            let paths: Vec<ClassifiedPath> = Sector::ALL
                .iter()
                .zip(&chosen)
                .filter(|(_, on)| **on)
                .map(|(sector, _)| classified("AX", FlowClass::Sector(*sector)))
                .collect();
            let limits: BTreeMap<Sector, Decimal> = Sector::ALL
                .iter()
                .zip(&tenths)
                .filter_map(|(sector, t)| t.map(|t| (*sector, Decimal::new(t, 1))))
                .collect();

            let flow = build(&transfer(amount, balance), &paths, &limits).unwrap();
            let solution = solve_validated(&flow.problem).unwrap();

            let amount_dec = Decimal::from(amount);
            let capacity: Decimal = paths
                .iter()
                .map(|p| match p.class {
                    FlowClass::Sector(s) => limits.get(&s).map_or(amount_dec, |share| *share * amount_dec),
                    FlowClass::Joint { .. } => Decimal::ZERO,
                })
                .sum();
            let expected = balance >= amount && capacity >= amount_dec;

            proptest::prop_assert_eq!(solution.outcome == Outcome::Feasible, expected);
            if expected {
                proptest::prop_assert_eq!(solution.optimal_value, Some(amount_dec));
                proptest::prop_assert!(flow.problem.first_violation(&solution.assignment).unwrap().is_none());
            }
        }
    }
}
