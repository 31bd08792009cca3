// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Linear expressions over the variables of a `LinearProgram`.

use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use super::VarId;

/// A linear expression `Σ coefficient · variable + constant`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// An expression without variables.
    pub fn constant_expr(constant: f64) -> Self {
        Self {
            terms: vec![],
            constant,
        }
    }

    /// Returns `coefficient · var`.
    pub fn term(var: VarId, coefficient: f64) -> Self {
        Self {
            terms: vec![(var, coefficient)],
            constant: 0.0,
        }
    }

    pub fn add_term(&mut self, var: VarId, coefficient: f64) {
        self.terms.push((var, coefficient));
    }

    pub fn add_constant(&mut self, constant: f64) {
        self.constant += constant;
    }

    /// Adds `factor · other` to the expression.
    pub fn add_scaled(&mut self, other: &LinearExpr, factor: f64) {
        self.terms
            .extend(other.terms.iter().map(|(v, c)| (*v, c * factor)));
        self.constant += other.constant * factor;
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.constant == 0.0
    }

    /// Evaluates the expression for the given variable values.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(v, c)| c * values[v.index()])
            .sum::<f64>()
            + self.constant
    }

    /// Merges repeated variables, in the order of their first occurrence, and
    /// drops zero coefficients.
    pub fn simplified(&self) -> Self {
        let mut terms: Vec<(VarId, f64)> = Vec::with_capacity(self.terms.len());
        let mut positions: std::collections::HashMap<VarId, usize> = std::collections::HashMap::new();
        for &(var, coefficient) in &self.terms {
            match positions.get(&var) {
                Some(&i) => terms[i].1 += coefficient,
                None => {
                    positions.insert(var, terms.len());
                    terms.push((var, coefficient));
                }
            }
        }
        terms.retain(|(_, c)| *c != 0.0);
        Self {
            terms,
            constant: self.constant,
        }
    }

    pub(crate) fn into_terms(self) -> Vec<(VarId, f64)> {
        self.terms
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        Self::term(var, 1.0)
    }
}

impl From<f64> for LinearExpr {
    fn from(constant: f64) -> Self {
        Self::constant_expr(constant)
    }
}

impl AddAssign<&LinearExpr> for LinearExpr {
    fn add_assign(&mut self, rhs: &LinearExpr) {
        self.add_scaled(rhs, 1.0);
    }
}

impl AddAssign<LinearExpr> for LinearExpr {
    fn add_assign(&mut self, rhs: LinearExpr) {
        self.add_scaled(&rhs, 1.0);
    }
}

impl SubAssign<&LinearExpr> for LinearExpr {
    fn sub_assign(&mut self, rhs: &LinearExpr) {
        self.add_scaled(rhs, -1.0);
    }
}

impl SubAssign<LinearExpr> for LinearExpr {
    fn sub_assign(&mut self, rhs: LinearExpr) {
        self.add_scaled(&rhs, -1.0);
    }
}

impl Add for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: LinearExpr) -> Self::Output {
        self += rhs;
        self
    }
}

impl Add<f64> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: f64) -> Self::Output {
        self.constant += rhs;
        self
    }
}

impl Sub for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: LinearExpr) -> Self::Output {
        self -= rhs;
        self
    }
}

impl Sub<f64> for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: f64) -> Self::Output {
        self.constant -= rhs;
        self
    }
}

impl Mul<f64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(mut self, rhs: f64) -> Self::Output {
        for (_, c) in &mut self.terms {
            *c *= rhs;
        }
        self.constant *= rhs;
        self
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> Self::Output {
        self * -1.0
    }
}

impl std::iter::Sum for LinearExpr {
    fn sum<I: Iterator<Item = LinearExpr>>(iter: I) -> Self {
        iter.fold(LinearExpr::new(), |acc, e| acc + e)
    }
}
