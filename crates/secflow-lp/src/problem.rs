//! # LP Problem Model
//!
//! Variables, linear constraints and an optional objective. All variables
//! are implicitly non-negative. Coefficients and right-hand sides are exact
//! decimals; evaluation uses checked arithmetic.
//!
//! A problem only accepts constraints over variables it already declared,
//! so a constraint can never silently reference a variable the solver does
//! not know about.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LpError;

/// Index of a declared variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VarId(pub usize);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// Relation between a constraint's left-hand side and its bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relation {
    /// `lhs ≤ rhs`
    LessEqual,
    /// `lhs ≥ rhs`
    GreaterEqual,
    /// `lhs = rhs`
    Equal,
}

impl Relation {
    /// Whether `lhs` relates to `rhs` as required.
    pub fn holds(&self, lhs: Decimal, rhs: Decimal) -> bool {
        match self {
            Relation::LessEqual => lhs <= rhs,
            Relation::GreaterEqual => lhs >= rhs,
            Relation::Equal => lhs == rhs,
        }
    }

    /// The relation after multiplying both sides by -1.
    pub fn flipped(&self) -> Self {
        match self {
            Relation::LessEqual => Relation::GreaterEqual,
            Relation::GreaterEqual => Relation::LessEqual,
            Relation::Equal => Relation::Equal,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Relation::LessEqual => "<=",
            Relation::GreaterEqual => ">=",
            Relation::Equal => "=",
        })
    }
}

/// Direction of optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sense {
    /// Largest objective value.
    Maximize,
    /// Smallest objective value.
    Minimize,
}

/// A named variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    /// Index of the variable.
    pub id: VarId,
    /// Diagnostic name.
    pub name: String,
}

/// One linear constraint `Σ coef·x  (≤ | ≥ | =)  rhs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// Diagnostic name.
    pub name: String,
    /// `(variable, coefficient)` terms.
    pub terms: Vec<(VarId, Decimal)>,
    /// The relation.
    pub relation: Relation,
    /// Right-hand side.
    pub rhs: Decimal,
}

impl Constraint {
    /// Left-hand side under `assignment`.
    pub fn lhs(&self, assignment: &[Decimal]) -> Result<Decimal, LpError> {
        linear_value(&self.terms, assignment)
    }

    /// Whether `assignment` satisfies the constraint exactly.
    pub fn is_satisfied_by(&self, assignment: &[Decimal]) -> Result<bool, LpError> {
        Ok(self.relation.holds(self.lhs(assignment)?, self.rhs))
    }
}

/// A linear objective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    /// Optimization direction.
    pub sense: Sense,
    /// `(variable, coefficient)` terms.
    pub terms: Vec<(VarId, Decimal)>,
}

/// A linear program over non-negative variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LpProblem {
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: Option<Objective>,
}

impl LpProblem {
    /// An empty problem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a new variable.
    pub fn add_variable(&mut self, name: impl Into<String>) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(Variable {
            id,
            name: name.into(),
        });
        id
    }

    /// Add a constraint over declared variables.
    ///
    /// # Errors
    ///
    /// Returns [`LpError::UndeclaredVariable`] if any term references a
    /// variable this problem did not declare. The problem is unchanged.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        terms: Vec<(VarId, Decimal)>,
        relation: Relation,
        rhs: Decimal,
    ) -> Result<(), LpError> {
        let name = name.into();
        self.check_declared(&terms, &name)?;
        self.constraints.push(Constraint {
            name,
            terms,
            relation,
            rhs,
        });
        Ok(())
    }

    /// Set (or replace) the objective.
    pub fn set_objective(&mut self, sense: Sense, terms: Vec<(VarId, Decimal)>) -> Result<(), LpError> {
        self.check_declared(&terms, "objective")?;
        self.objective = Some(Objective { sense, terms });
        Ok(())
    }

    /// Declared variables.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Constraints, in insertion order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The objective, if any.
    pub fn objective(&self) -> Option<&Objective> {
        self.objective.as_ref()
    }

    /// Number of variables.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// The first constraint `assignment` violates, or `None` if it is a
    /// feasible point (including non-negativity).
    pub fn first_violation(&self, assignment: &[Decimal]) -> Result<Option<&Constraint>, LpError> {
        self.check_dimension(assignment)?;
        if assignment.iter().any(|v| v.is_sign_negative() && !v.is_zero()) {
            return Err(LpError::SolverInconsistency {
                variables: self.variable_count(),
                constraints: self.constraint_count(),
                detail: "assignment has a negative value".to_string(),
            });
        }
        for constraint in &self.constraints {
            if !constraint.is_satisfied_by(assignment)? {
                return Ok(Some(constraint));
            }
        }
        Ok(None)
    }

    /// Objective value under `assignment`.
    pub fn objective_value(&self, assignment: &[Decimal]) -> Result<Decimal, LpError> {
        self.check_dimension(assignment)?;
        let objective = self.objective.as_ref().ok_or(LpError::MissingObjective)?;
        linear_value(&objective.terms, assignment)
    }

    fn check_declared(&self, terms: &[(VarId, Decimal)], context: &str) -> Result<(), LpError> {
        match terms.iter().find(|(var, _)| var.0 >= self.variables.len()) {
            Some((variable, _)) => Err(LpError::UndeclaredVariable {
                variable: *variable,
                context: context.to_string(),
                declared: self.variables.len(),
            }),
            None => Ok(()),
        }
    }

    fn check_dimension(&self, assignment: &[Decimal]) -> Result<(), LpError> {
        if assignment.len() != self.variables.len() {
            return Err(LpError::DimensionMismatch {
                expected: self.variables.len(),
                actual: assignment.len(),
            });
        }
        Ok(())
    }
}

fn linear_value(terms: &[(VarId, Decimal)], assignment: &[Decimal]) -> Result<Decimal, LpError> {
    terms.iter().try_fold(Decimal::ZERO, |acc, (var, coef)| {
        let value = assignment.get(var.0).copied().unwrap_or(Decimal::ZERO);
        coef.checked_mul(value)
            .and_then(|product| acc.checked_add(product))
            .ok_or(LpError::ArithmeticOverflow {
                operation: "constraint evaluation",
            })
    })
}
