// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! The optimisation model built from an [`EnergySystem`].
//!
//! [`Model::new`] walks the energy system in insertion order and emits,
//! block by block, the variables, balances and constraints of a
//! [`LinearProgram`]:
//!
//! - every flow gets one variable per step, bounded by its capacity and
//!   profiles, plus gradient and full load time constraints and its variable
//!   costs;
//! - investments turn capacities into per-period decision variables, with
//!   ageing and retirement in multi-period models;
//! - nonconvex flows get a binary status per step, with startups, shutdowns
//!   and minimum up and down times;
//! - balanced buses, converters and storages get their balance equations;
//! - flows with a [`MultiObjective`][crate::MultiObjective] contribute to
//!   named objectives, combined with the weights of the [`ModelConfig`].
//!
//! After construction, further constraints can be added with the helpers of
//! the [`constraints`][crate::constraints] module.

mod builder;
mod bus;
mod converter;
mod investment;
mod multi_objective;
mod nonconvex_flow;
mod registry;
mod simple_flow;
mod storage;

pub(crate) use investment::InvestVars;
pub(crate) use registry::VariableRegistry;

use std::path::Path;

use indexmap::IndexMap;

use crate::lp::{Constraint, LinearExpr, LinearProgram, Sense, VarId};
use crate::solver::{self, SolveResult};
use crate::{EnergySystem, Error, Flow, ModelConfig, Results, SolverConfig, TimeAxis};

/// The capacity that the bounds of a flow or a storage are relative to.
#[derive(Clone, Debug)]
pub(crate) enum Capacity {
    Unknown,
    Fixed(f64),
    Invest(InvestVars),
}

impl Capacity {
    /// Returns the capacity in period `p` as an expression.
    pub(crate) fn expr(&self, p: usize) -> Option<LinearExpr> {
        match self {
            Capacity::Unknown => None,
            Capacity::Fixed(capacity) => Some(LinearExpr::constant_expr(*capacity)),
            Capacity::Invest(vars) => Some(LinearExpr::from(vars.total[p])),
        }
    }
}

/// A flow of the energy system with the variables the model created for it.
#[derive(Clone, Debug)]
pub(crate) struct FlowEntry {
    pub(crate) source: String,
    pub(crate) target: String,
    pub(crate) flow: Flow,
    pub(crate) vars: Vec<VarId>,
    pub(crate) status: Option<Vec<VarId>>,
    pub(crate) capacity: Capacity,
}

/// A storage of the energy system with its content variables.
///
/// Content variables are stored per period.  Period `p` with `n` steps has
/// `n + 1` content variables, the first being the content before its first
/// step.
#[derive(Clone, Debug)]
pub(crate) struct StorageEntry {
    pub(crate) content: Vec<Vec<VarId>>,
    pub(crate) capacity: Capacity,
}

impl StorageEntry {
    /// Content before step `t`.
    pub(crate) fn content_before(&self, axis: &TimeAxis, t: usize) -> VarId {
        let p = axis.period(t);
        self.content[p][t - axis.period_steps(p).start]
    }

    /// Content after step `t`.
    pub(crate) fn content_after(&self, axis: &TimeAxis, t: usize) -> VarId {
        let p = axis.period(t);
        self.content[p][t - axis.period_steps(p).start + 1]
    }
}

/// An LP/MILP built from an energy system, ready to be solved.
#[derive(Clone, Debug)]
pub struct Model {
    lp: LinearProgram,
    config: ModelConfig,
    time_axis: TimeAxis,
    revision: u64,
    flows: Vec<FlowEntry>,
    storages: IndexMap<String, StorageEntry>,
    registry: VariableRegistry,
    investment_vars: Vec<VarId>,
    investment_costs: LinearExpr,
    objective_terms: IndexMap<String, LinearExpr>,
    objectives: IndexMap<String, LinearExpr>,
    solution: Option<Vec<f64>>,
}

/// `Model` construction and solving.
impl Model {
    /// Builds the model for the given energy system.
    ///
    /// The energy system is validated first, unless it is frozen.
    pub fn new(es: &EnergySystem, config: ModelConfig) -> Result<Self, Error> {
        builder::ModelBuilder::build(es, config)
    }

    /// Solves the model.
    ///
    /// A non-optimal termination is reported on the returned [`SolveResult`],
    /// or as an error in strict mode.  The variable values of the solve, if
    /// any, are kept for [`results`][Model::results].
    pub fn solve(&mut self, config: &SolverConfig) -> Result<SolveResult, Error> {
        let result = solver::solve(&self.lp, config)?;
        self.solution = result.values.clone();
        Ok(result)
    }

    /// Returns the results of the last solve.
    ///
    /// Changing the model discards the solution, so the model has to be
    /// solved again before its results can be read.
    pub fn results(&self) -> Result<Results, Error> {
        let values = self.solution.as_ref().ok_or_else(|| {
            Error::solver("The model has no solution. Call `solve` first.")
        })?;
        if values.len() != self.lp.variables().len() {
            return Err(Error::internal(format!(
                "The solution has {} values for {} variables.",
                values.len(),
                self.lp.variables().len()
            )));
        }
        Ok(Results::from_model(self, values))
    }

    /// Replaces the problem with its LP relaxation.
    pub fn relax_problem(&mut self) {
        self.solution = None;
        self.lp.relax();
    }

    /// Fixes all investment decisions to the values in `results`, so that a
    /// repeated solve only optimises dispatch.
    pub fn fix_investments(&mut self, results: &Results) -> Result<(), Error> {
        let values = results.values();
        if values.len() != self.lp.variables().len() {
            return Err(Error::configuration(
                "The results don't belong to this model.",
            ));
        }
        self.solution = None;
        for var in &self.investment_vars {
            let value = values[var.index()];
            let value = match self.lp.variable(*var).domain {
                crate::lp::Domain::Continuous => value,
                crate::lp::Domain::Integer | crate::lp::Domain::Binary => value.round(),
            };
            self.lp.fix(*var, value);
        }
        tracing::debug!("Fixed {} investment variables.", self.investment_vars.len());
        Ok(())
    }

    /// Adds a custom constraint `expr <sense> rhs` to the model.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        expr: LinearExpr,
        sense: Sense,
        rhs: f64,
    ) -> Result<(), Error> {
        self.solution = None;
        self.lp.add_constraint(name, expr, sense, rhs).map(|_| ())
    }

    /// Writes the model to `path` in CPLEX LP format, with symbolic labels.
    pub fn write_lp(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        std::fs::write(path, self.lp.to_lp_string(true))?;
        Ok(())
    }
}

/// `Model` inspection.
impl Model {
    pub fn lp(&self) -> &LinearProgram {
        &self.lp
    }

    pub fn time_axis(&self) -> &TimeAxis {
        &self.time_axis
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// The cost terms of the objective, by name.
    ///
    /// Named objectives of multi-objective flows are listed as
    /// `objective(<name>)`, unweighted.
    pub fn objective_terms(&self) -> IndexMap<String, LinearExpr> {
        let mut terms = self.objective_terms.clone();
        for (name, expr) in &self.objectives {
            terms.insert(format!("objective({name})"), expr.clone());
        }
        terms
    }

    /// Whether the model was built from the current state of `es`.
    pub fn is_current(&self, es: &EnergySystem) -> bool {
        self.revision == es.revision()
    }

    /// Returns the variable with the given name.
    pub fn variable(&self, name: &str) -> Option<VarId> {
        self.lp.find_variable(name)
    }

    /// Returns the constraint with the given name.
    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.lp.find_constraint(name)
    }

    /// Returns the variable of the flow from `source` to `target` at step `t`.
    pub fn flow_variable(&self, source: &str, target: &str, t: usize) -> Result<VarId, Error> {
        let entry = self.flow_entry(source, target)?;
        entry.vars.get(t).copied().ok_or_else(|| {
            Error::configuration(format!(
                "Step {t} is outside of the time axis of {} steps.",
                entry.vars.len()
            ))
        })
    }

    /// Returns the variables of the flow from `source` to `target`, one per
    /// step.
    pub fn flow_variables(&self, source: &str, target: &str) -> Result<Vec<VarId>, Error> {
        Ok(self.flow_entry(source, target)?.vars.clone())
    }

    /// Returns the content variables of a storage after each step.
    pub fn storage_content(&self, label: &str) -> Result<Vec<VarId>, Error> {
        let entry = self.storage_entry(label)?;
        Ok((0..self.time_axis.steps())
            .map(|t| entry.content_after(&self.time_axis, t))
            .collect())
    }

    /// Returns the investment variable of a flow (`target` is `Some`) or a
    /// storage (`target` is `None`) in period `p`.
    pub fn investment_variable(
        &self,
        source: &str,
        target: Option<&str>,
        p: usize,
    ) -> Result<VarId, Error> {
        let capacity = match target {
            Some(target) => &self.flow_entry(source, target)?.capacity,
            None => &self.storage_entry(source)?.capacity,
        };
        match capacity {
            Capacity::Invest(vars) => vars.invest.get(p).copied().ok_or_else(|| {
                Error::configuration(format!("Period {p} is outside of the time axis."))
            }),
            _ => Err(Error::configuration(format!(
                "{source}{} has no investment.",
                target.map(|t| format!(" -> {t}")).unwrap_or_default()
            ))),
        }
    }

    /// The variable values of the last solve.
    pub fn solution(&self) -> Option<&[f64]> {
        self.solution.as_deref()
    }
}

/// Access for the constraint helpers.
impl Model {
    /// Mutable access to the program, which discards the solution.
    pub(crate) fn lp_mut(&mut self) -> &mut LinearProgram {
        self.solution = None;
        &mut self.lp
    }

    pub(crate) fn flows(&self) -> &[FlowEntry] {
        &self.flows
    }

    pub(crate) fn flow_entry(&self, source: &str, target: &str) -> Result<&FlowEntry, Error> {
        self.flows
            .iter()
            .find(|f| f.source == source && f.target == target)
            .ok_or_else(|| Error::flow_not_found(format!("Flow:({source}, {target}) not found.")))
    }

    pub(crate) fn storage_entry(&self, label: &str) -> Result<&StorageEntry, Error> {
        self.storages
            .get(label)
            .ok_or_else(|| Error::node_not_found(format!("Storage with label {label} not found.")))
    }

    pub(crate) fn registry(&self) -> &VariableRegistry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut VariableRegistry {
        &mut self.registry
    }

    pub(crate) fn investment_costs(&self) -> &LinearExpr {
        &self.investment_costs
    }

    pub(crate) fn objectives(&self) -> &IndexMap<String, LinearExpr> {
        &self.objectives
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{assert_close, hourly_axis, solve, solve_model};
    use crate::{constraints, Bus, Investment, NonConvex, Sink, Source};

    fn pv_system(steps: usize) -> Result<EnergySystem, Error> {
        let mut es = EnergySystem::new(hourly_axis(steps));
        es.add_node(Source::new("pv"))?;
        es.add_node(Source::new("grid"))?;
        es.add_node(Bus::new("el"))?;
        es.add_node(Sink::new("demand"))?;
        es.add_flow(
            "pv",
            "el",
            Flow::new().with_investment(
                Investment::new().with_ep_costs(1.0).with_maximum(10.0),
            ),
        )?;
        es.add_flow("grid", "el", Flow::new().with_variable_costs(10.0))?;
        es.add_flow(
            "el",
            "demand",
            Flow::new().with_nominal_capacity(1.0).with_fix(1.0),
        )?;
        es.freeze()?;
        Ok(es)
    }

    #[test]
    fn test_changes_discard_the_solution() -> Result<(), Error> {
        let es = pv_system(2)?;
        let (mut model, results) = solve(&es, ModelConfig::default())?;
        assert_close(results.objective(), 1.0);

        constraints::investment_limit(&mut model, 0.5)?;
        assert!(model.solution().is_none());
        assert!(model.results().is_err_and(|e| e
            == Error::solver("The model has no solution. Call `solve` first.")));

        let results = solve_model(&mut model)?;
        assert_close(results.flow("pv", "el")?.scalars["invest"], 0.5);
        assert_close(results.objective(), 0.5 + 2.0 * 0.5 * 10.0);

        let invest = model.investment_variable("pv", Some("el"), 0)?;
        model.add_constraint("no_pv", LinearExpr::from(invest), Sense::Le, 0.0)?;
        assert!(model.results().is_err());
        let results = solve_model(&mut model)?;
        assert_close(results.objective(), 20.0);
        Ok(())
    }

    #[test]
    fn test_fix_investments() -> Result<(), Error> {
        let es = pv_system(2)?;
        let (mut model, results) = solve(&es, ModelConfig::default())?;
        assert_close(results.objective(), 1.0);

        model.fix_investments(&results)?;
        let invest = model.investment_variable("pv", Some("el"), 0)?;
        let variable = model.lp().variable(invest);
        assert_close(variable.lower, 1.0);
        assert_close(variable.upper, 1.0);

        let fixed = solve_model(&mut model)?;
        assert_close(fixed.objective(), results.objective());
        assert_close(fixed.flow("pv", "el")?.scalars["invest"], 1.0);

        let (_, other) = solve(&pv_system(3)?, ModelConfig::default())?;
        assert!(model.fix_investments(&other).is_err_and(|e| e
            == Error::configuration("The results don't belong to this model.")));
        Ok(())
    }

    #[test]
    fn test_build_is_deterministic() -> Result<(), Error> {
        let es = pv_system(3)?;
        let first = Model::new(&es, ModelConfig::default())?;
        let second = Model::new(&es, ModelConfig::default())?;

        assert_eq!(first.lp().variables(), second.lp().variables());
        assert_eq!(first.lp().constraints(), second.lp().constraints());
        assert_eq!(
            first.lp().to_lp_string(true),
            second.lp().to_lp_string(true)
        );
        assert_eq!(
            first.objective_terms().keys().collect::<Vec<_>>(),
            second.objective_terms().keys().collect::<Vec<_>>()
        );
        Ok(())
    }

    #[test]
    fn test_relax_problem() -> Result<(), Error> {
        let mut es = EnergySystem::new(hourly_axis(1));
        es.add_node(Source::new("plant"))?;
        es.add_node(Source::new("grid"))?;
        es.add_node(Bus::new("el"))?;
        es.add_node(Sink::new("demand"))?;
        es.add_node(Sink::new("excess"))?;
        es.add_flow(
            "plant",
            "el",
            Flow::new()
                .with_nominal_capacity(2.0)
                .with_min(0.5)
                .with_variable_costs(1.0)
                .with_nonconvex(NonConvex::new()),
        )?;
        es.add_flow("grid", "el", Flow::new().with_variable_costs(10.0))?;
        es.add_flow(
            "el",
            "demand",
            Flow::new().with_nominal_capacity(1.0).with_fix(0.5),
        )?;
        es.add_flow("el", "excess", Flow::new())?;

        // Once switched on, the plant produces at least 1.
        let (mut model, results) = solve(&es, ModelConfig::default())?;
        assert_close(results.objective(), 1.0);
        assert!(model.lp().integer_count() > 0);

        model.relax_problem();
        assert_eq!(model.lp().integer_count(), 0);
        assert!(model.solution().is_none());
        let relaxed = solve_model(&mut model)?;
        assert_close(relaxed.objective(), 0.5);
        Ok(())
    }

    #[test]
    fn test_write_lp() -> Result<(), Error> {
        let model = Model::new(&pv_system(2)?, ModelConfig::default())?;
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("model.lp");
        model.write_lp(&path)?;

        let lp = std::fs::read_to_string(&path)?;
        assert!(lp.starts_with("\\* solph *\\"));
        assert!(lp.contains("flow(grid,el,1)"));
        assert!(lp.contains("bus_balance(el,0):"));
        assert_eq!(lp, model.lp().to_lp_string(true));
        Ok(())
    }

    #[test]
    fn test_is_current() -> Result<(), Error> {
        let mut es = pv_system(2)?;
        let model = Model::new(&es, ModelConfig::default())?;
        assert!(model.is_current(&es));

        es.add_node(Sink::new("excess"))?;
        es.add_flow("el", "excess", Flow::new())?;
        assert!(!model.is_current(&es));
        Ok(())
    }
}
