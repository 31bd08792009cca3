// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Solver backends and the outcome of a solve.
//!
//! A [`LinearProgram`] is handed to the backend selected in the
//! [`SolverConfig`]: the in-process `microlp` solver, or an external CBC
//! process.  Both report a [`SolveResult`]; a non-optimal termination is only
//! an error in strict mode.

mod cbc;
mod microlp;

use std::fmt::Display;
use std::time::{Duration, Instant};

use crate::lp::LinearProgram;
use crate::{Error, SolverBackend, SolverConfig};

/// Whether the solver finished normally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverStatus {
    Ok,
    Warning,
    Aborted,
    Error,
}

/// Why the solver stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TerminationCondition {
    Optimal,
    Infeasible,
    Unbounded,
    TimeLimit,
    Numerical,
    Other(String),
}

impl Display for TerminationCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationCondition::Optimal => write!(f, "optimal"),
            TerminationCondition::Infeasible => write!(f, "infeasible"),
            TerminationCondition::Unbounded => write!(f, "unbounded"),
            TerminationCondition::TimeLimit => write!(f, "time limit"),
            TerminationCondition::Numerical => write!(f, "numerical difficulties"),
            TerminationCondition::Other(reason) => write!(f, "{reason}"),
        }
    }
}

/// The outcome of a solve.
#[derive(Clone, Debug)]
pub struct SolveResult {
    pub status: SolverStatus,
    pub termination: TerminationCondition,

    /// Objective value of `values`, including constant cost terms.
    pub objective_value: Option<f64>,
    pub wall_time: Duration,

    /// One value per variable of the program, if the solver returned a
    /// point.  Also set for the last feasible point of an interrupted solve.
    pub values: Option<Vec<f64>>,
}

impl SolveResult {
    pub fn is_optimal(&self) -> bool {
        self.termination == TerminationCondition::Optimal
    }
}

/// What a backend reports before the common post-processing.
pub(crate) struct BackendOutcome {
    pub(crate) status: SolverStatus,
    pub(crate) termination: TerminationCondition,
    pub(crate) values: Option<Vec<f64>>,
}

impl BackendOutcome {
    pub(crate) fn aborted(termination: TerminationCondition) -> Self {
        Self {
            status: SolverStatus::Aborted,
            termination,
            values: None,
        }
    }
}

/// A solver that can solve a [`LinearProgram`].
pub(crate) trait SolverDriver {
    fn name(&self) -> &'static str;

    fn solve(&self, lp: &LinearProgram, config: &SolverConfig) -> Result<BackendOutcome, Error>;
}

/// Solves `lp` with the backend selected in `config`.
pub(crate) fn solve(lp: &LinearProgram, config: &SolverConfig) -> Result<SolveResult, Error> {
    let driver: Box<dyn SolverDriver> = match config.backend {
        SolverBackend::Microlp => Box::new(microlp::MicrolpDriver),
        SolverBackend::Cbc => Box::new(cbc::CbcDriver::from_env()),
    };

    let start = Instant::now();
    let outcome = if config.is_cancelled() {
        BackendOutcome::aborted(TerminationCondition::Other("cancelled".to_string()))
    } else {
        tracing::info!(
            "Solving {} variables and {} constraints with {}.",
            lp.variables().len(),
            lp.constraints().len(),
            driver.name()
        );
        driver.solve(lp, config)?
    };
    let wall_time = start.elapsed();

    let objective_value = outcome
        .values
        .as_ref()
        .map(|values| lp.objective().evaluate(values));
    let result = SolveResult {
        status: outcome.status,
        termination: outcome.termination,
        objective_value,
        wall_time,
        values: outcome.values,
    };

    if result.is_optimal() {
        tracing::info!(
            "{} finished in {:?} with objective {:?}.",
            driver.name(),
            result.wall_time,
            result.objective_value
        );
    } else {
        tracing::warn!(
            "{} finished in {:?} with status {:?}: {}.",
            driver.name(),
            result.wall_time,
            result.status,
            result.termination
        );
        if config.strict {
            return Err(Error::solver(format!(
                "Solver finished with status {:?}: {}.",
                result.status, result.termination
            )));
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp::{Domain, LinearExpr, Sense};
    use crate::CancellationToken;

    fn program() -> Result<LinearProgram, Error> {
        let mut lp = LinearProgram::new();
        let x = lp.add_variable("x", 0.0, 4.0, Domain::Continuous)?;
        let y = lp.add_variable("y", 0.0, f64::INFINITY, Domain::Integer)?;
        lp.add_constraint(
            "demand",
            LinearExpr::from(x) + LinearExpr::from(y),
            Sense::Ge,
            5.5,
        )?;
        lp.add_objective(&(LinearExpr::term(x, 1.0) + LinearExpr::term(y, 3.0) + 2.0));
        Ok(lp)
    }

    #[test]
    fn test_optimal() -> Result<(), Error> {
        let result = solve(&program()?, &SolverConfig::default())?;
        assert!(result.is_optimal());
        assert_eq!(result.status, SolverStatus::Ok);
        let values = result.values.unwrap();
        assert!((values[0] - 3.5).abs() < 1e-6);
        assert!((values[1] - 2.0).abs() < 1e-6);
        assert!((result.objective_value.unwrap() - 11.5).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_infeasible() -> Result<(), Error> {
        let mut lp = program()?;
        let y = lp.find_variable("y").unwrap();
        lp.add_constraint("cap", y.into(), Sense::Le, 1.0)?;

        let result = solve(&lp, &SolverConfig::default())?;
        assert_eq!(result.termination, TerminationCondition::Infeasible);
        assert_eq!(result.status, SolverStatus::Warning);
        assert!(result.values.is_none());

        let strict = SolverConfig {
            strict: true,
            ..Default::default()
        };
        assert!(solve(&lp, &strict).is_err_and(|e| e
            == Error::solver("Solver finished with status Warning: infeasible.")));
        Ok(())
    }

    #[test]
    fn test_unbounded() -> Result<(), Error> {
        let mut lp = LinearProgram::new();
        let x = lp.add_variable("x", 0.0, f64::INFINITY, Domain::Continuous)?;
        lp.add_objective(&LinearExpr::term(x, -1.0));

        let result = solve(&lp, &SolverConfig::default())?;
        assert_eq!(result.termination, TerminationCondition::Unbounded);
        Ok(())
    }

    #[test]
    fn test_cancelled() -> Result<(), Error> {
        let token = CancellationToken::default();
        token.cancel();
        let config = SolverConfig {
            cancellation: Some(token),
            ..Default::default()
        };
        let result = solve(&program()?, &config)?;
        assert_eq!(result.status, SolverStatus::Aborted);
        assert_eq!(
            result.termination,
            TerminationCondition::Other("cancelled".to_string())
        );
        Ok(())
    }
}
