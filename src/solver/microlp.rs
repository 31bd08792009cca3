// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! The in-process backend, using `good_lp` with the `microlp` solver.

use good_lp::solvers::microlp::microlp;
use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel,
    Variable,
};

use crate::lp::{Constraint, Domain, LinearProgram, Sense};
use crate::{Error, SolverConfig};

use super::{BackendOutcome, SolverDriver, SolverStatus, TerminationCondition};

pub(crate) struct MicrolpDriver;

impl SolverDriver for MicrolpDriver {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn solve(&self, lp: &LinearProgram, config: &SolverConfig) -> Result<BackendOutcome, Error> {
        if config.time_limit.is_some() || config.mip_gap.is_some() {
            tracing::warn!("microlp doesn't support time limits or MIP gaps, ignoring them.");
        }

        // Constraints without variables are checked here, the solver can't
        // represent them.
        if let Some(c) = lp
            .constraints()
            .iter()
            .find(|c| c.terms.is_empty() && !c.is_satisfied(&[], 1e-9))
        {
            tracing::warn!("Constraint {} can't be satisfied: 0 {} {}.", c.name, c.sense, c.rhs);
            return Ok(BackendOutcome {
                status: SolverStatus::Warning,
                termination: TerminationCondition::Infeasible,
                values: None,
            });
        }

        let mut problem = ProblemVariables::new();
        let vars: Vec<Variable> = lp
            .variables()
            .iter()
            .map(|v| {
                let mut definition = variable();
                if v.domain != Domain::Continuous {
                    definition = definition.integer();
                }
                if v.lower.is_finite() {
                    definition = definition.min(v.lower);
                }
                if v.upper.is_finite() {
                    definition = definition.max(v.upper);
                }
                problem.add(definition)
            })
            .collect();

        let objective = expression(&vars, lp.objective().terms());
        let mut model = problem.minimise(objective).using(microlp);
        for c in lp.constraints().iter().filter(|c| !c.terms.is_empty()) {
            model = model.with(to_constraint(&vars, c));
        }

        let outcome = match model.solve() {
            Ok(solution) => BackendOutcome {
                status: SolverStatus::Ok,
                termination: TerminationCondition::Optimal,
                values: Some(vars.iter().map(|v| solution.value(*v)).collect()),
            },
            Err(ResolutionError::Infeasible) => BackendOutcome {
                status: SolverStatus::Warning,
                termination: TerminationCondition::Infeasible,
                values: None,
            },
            Err(ResolutionError::Unbounded) => BackendOutcome {
                status: SolverStatus::Warning,
                termination: TerminationCondition::Unbounded,
                values: None,
            },
            Err(e) => BackendOutcome {
                status: SolverStatus::Error,
                termination: TerminationCondition::Other(e.to_string()),
                values: None,
            },
        };
        Ok(outcome)
    }
}

fn expression(vars: &[Variable], terms: &[(crate::lp::VarId, f64)]) -> Expression {
    let mut expr = Expression::with_capacity(terms.len());
    for (var, coefficient) in terms {
        expr.add_mul(*coefficient, vars[var.index()]);
    }
    expr
}

fn to_constraint(vars: &[Variable], c: &Constraint) -> good_lp::Constraint {
    match c.sense {
        Sense::Le => constraint::leq(expression(vars, &c.terms), c.rhs),
        Sense::Eq => constraint::eq(expression(vars, &c.terms), c.rhs),
        // `a >= b` is passed on as `-a <= -b`.
        Sense::Ge => {
            let negated: Vec<_> = c.terms.iter().map(|(v, coef)| (*v, -coef)).collect();
            constraint::leq(expression(vars, &negated), -c.rhs)
        }
    }
}
