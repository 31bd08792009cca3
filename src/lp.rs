// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! A solver independent representation of a linear program.
//!
//! The model builder collects variables, `(variable, coefficient)` terms and
//! `(sense, rhs)` constraints into a [`LinearProgram`], which is then handed
//! to a solver backend.  Variables and constraints are numbered in the order
//! they are added, so equal inputs produce identical programs.

mod expression;
mod writer;

pub use expression::LinearExpr;
pub(crate) use writer::LpWriter;

use std::collections::HashMap;

use crate::Error;

/// Identifies a variable of a [`LinearProgram`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    /// Position of the variable in its program.
    pub fn index(self) -> usize {
        self.0
    }
}

/// The domain of a variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Domain {
    Continuous,
    Integer,
    Binary,
}

/// A variable with its bounds.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    pub domain: Domain,
}

/// The sense of a constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

impl std::fmt::Display for Sense {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sense::Le => write!(f, "<="),
            Sense::Ge => write!(f, ">="),
            Sense::Eq => write!(f, "="),
        }
    }
}

/// A linear constraint `Σ coefficient · variable  <sense>  rhs`.
#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub sense: Sense,
    pub rhs: f64,
}

impl Constraint {
    /// Returns the coefficient of `var` in the constraint.
    pub fn coefficient(&self, var: VarId) -> f64 {
        self.terms
            .iter()
            .filter(|(v, _)| *v == var)
            .map(|(_, c)| c)
            .sum()
    }

    /// Returns `true` if the constraint holds for the given variable values,
    /// within `tolerance`.
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs: f64 = self.terms.iter().map(|(v, c)| c * values[v.0]).sum();
        match self.sense {
            Sense::Le => lhs <= self.rhs + tolerance,
            Sense::Ge => lhs >= self.rhs - tolerance,
            Sense::Eq => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

/// A minimisation problem over bounded, possibly integer, variables.
#[derive(Clone, Debug, Default)]
pub struct LinearProgram {
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: LinearExpr,
    variable_names: HashMap<String, VarId>,
    constraint_names: HashMap<String, usize>,
}

impl LinearProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable with the given bounds.  Binary variables are clamped
    /// to `[0, 1]`.
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        lower: f64,
        upper: f64,
        domain: Domain,
    ) -> Result<VarId, Error> {
        let name = name.into();
        if self.variable_names.contains_key(&name) {
            return Err(Error::configuration(format!(
                "Variable {name} exists already."
            )));
        }
        let (lower, upper) = match domain {
            Domain::Binary => (lower.max(0.0), upper.min(1.0)),
            Domain::Continuous | Domain::Integer => (lower, upper),
        };
        let id = VarId(self.variables.len());
        self.variable_names.insert(name.clone(), id);
        self.variables.push(Variable {
            name,
            lower,
            upper,
            domain,
        });
        Ok(id)
    }

    /// Adds the constraint `expr <sense> rhs`.  The constant of `expr` is
    /// moved to the right hand side and repeated variables are merged.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        expr: LinearExpr,
        sense: Sense,
        rhs: f64,
    ) -> Result<usize, Error> {
        let name = name.into();
        if self.constraint_names.contains_key(&name) {
            return Err(Error::configuration(format!(
                "Constraint {name} exists already."
            )));
        }
        let expr = expr.simplified();
        let index = self.constraints.len();
        self.constraint_names.insert(name.clone(), index);
        self.constraints.push(Constraint {
            name,
            rhs: rhs - expr.constant(),
            terms: expr.into_terms(),
            sense,
        });
        Ok(index)
    }

    /// Adds `expr` to the objective.
    pub fn add_objective(&mut self, expr: &LinearExpr) {
        self.objective += expr;
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Returns the variable with the given name.
    pub fn find_variable(&self, name: &str) -> Option<VarId> {
        self.variable_names.get(name).copied()
    }

    /// Returns the constraint with the given name.
    pub fn find_constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraint_names
            .get(name)
            .map(|&index| &self.constraints[index])
    }

    /// Sets both bounds of a variable to `value`.
    pub fn fix(&mut self, id: VarId, value: f64) {
        let var = &mut self.variables[id.0];
        var.lower = value;
        var.upper = value;
    }

    /// Replaces the bounds of a variable.
    pub fn set_bounds(&mut self, id: VarId, lower: f64, upper: f64) {
        let var = &mut self.variables[id.0];
        var.lower = lower;
        var.upper = upper;
    }

    /// Drops all integrality restrictions.  Binary variables keep their
    /// `[0, 1]` bounds.
    pub fn relax(&mut self) {
        for var in &mut self.variables {
            var.domain = Domain::Continuous;
        }
    }

    /// Number of integer and binary variables.
    pub fn integer_count(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.domain != Domain::Continuous)
            .count()
    }

    /// Returns the program in CPLEX LP format.
    ///
    /// With `symbolic_labels`, variables and constraints carry their names,
    /// otherwise they are numbered as `x0, x1, ...` and `c0, c1, ...`.
    pub fn to_lp_string(&self, symbolic_labels: bool) -> String {
        LpWriter::new(self, symbolic_labels).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_variable() -> Result<(), Error> {
        let mut lp = LinearProgram::new();
        let x = lp.add_variable("x", 0.0, 10.0, Domain::Continuous)?;
        let y = lp.add_variable("y", -5.0, 5.0, Domain::Binary)?;
        assert_eq!((x.index(), y.index()), (0, 1));
        assert_eq!(lp.variable(y).lower, 0.0);
        assert_eq!(lp.variable(y).upper, 1.0);
        assert_eq!(lp.find_variable("y"), Some(y));
        assert_eq!(lp.integer_count(), 1);
        assert!(lp
            .add_variable("x", 0.0, 1.0, Domain::Continuous)
            .is_err_and(|e| e == Error::configuration("Variable x exists already.")));

        lp.relax();
        assert_eq!(lp.integer_count(), 0);
        Ok(())
    }

    #[test]
    fn test_add_constraint() -> Result<(), Error> {
        let mut lp = LinearProgram::new();
        let x = lp.add_variable("x", 0.0, f64::INFINITY, Domain::Continuous)?;
        let y = lp.add_variable("y", 0.0, f64::INFINITY, Domain::Continuous)?;

        let expr = LinearExpr::from(x) * 2.0 + LinearExpr::from(y) - LinearExpr::from(x) + 3.0;
        lp.add_constraint("c", expr, Sense::Le, 10.0)?;

        let c = lp.find_constraint("c").unwrap();
        assert_eq!(c.terms, vec![(x, 1.0), (y, 1.0)]);
        assert_eq!(c.rhs, 7.0);
        assert_eq!(c.coefficient(y), 1.0);
        assert!(c.is_satisfied(&[3.0, 4.0], 1e-9));
        assert!(!c.is_satisfied(&[3.0, 4.1], 1e-9));

        assert!(lp
            .add_constraint("c", LinearExpr::new(), Sense::Eq, 0.0)
            .is_err_and(|e| e == Error::configuration("Constraint c exists already.")));
        Ok(())
    }

    #[test]
    fn test_fix() -> Result<(), Error> {
        let mut lp = LinearProgram::new();
        let x = lp.add_variable("x", 0.0, 10.0, Domain::Integer)?;
        lp.fix(x, 4.0);
        assert_eq!((lp.variable(x).lower, lp.variable(x).upper), (4.0, 4.0));
        Ok(())
    }
}
