// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! The builder that turns an [`EnergySystem`] into a [`Model`].

use indexmap::IndexMap;

use crate::economics::discount_factor;
use crate::lp::{LinearExpr, LinearProgram, VarId};
use crate::{EnergySystem, Error, ModelConfig, TimeAxis};

use super::{FlowEntry, Model, StorageEntry, VariableRegistry};

/// Collects the variables, constraints and cost terms of a model.  The
/// blocks are implemented in the sibling modules, one `impl` block each.
pub(super) struct ModelBuilder<'a> {
    pub(super) es: &'a EnergySystem,
    pub(super) axis: &'a TimeAxis,
    pub(super) config: ModelConfig,
    pub(super) lp: LinearProgram,
    pub(super) flows: Vec<FlowEntry>,
    pub(super) storages: IndexMap<String, StorageEntry>,
    pub(super) registry: VariableRegistry,
    pub(super) investment_vars: Vec<VarId>,
    pub(super) investment_costs: LinearExpr,
    pub(super) objective_terms: IndexMap<String, LinearExpr>,
    pub(super) objectives: IndexMap<String, LinearExpr>,
}

impl<'a> ModelBuilder<'a> {
    pub(super) fn build(es: &'a EnergySystem, config: ModelConfig) -> Result<Model, Error> {
        if !es.is_frozen() {
            es.validate()?;
        }

        let axis = es.time_axis();
        if let Some(weighting) = &config.objective_weighting {
            weighting.check_len(axis.steps()).map_err(|e| {
                Error::invalid_length(format!("objective_weighting: {}", e.description()))
            })?;
        }
        if config.discount_rate <= -1.0 {
            return Err(Error::configuration(format!(
                "discount_rate must be greater than -1, got {}.",
                config.discount_rate
            )));
        }

        tracing::info!(
            "Building model with {} steps in {} period(s).",
            axis.steps(),
            axis.periods().len()
        );

        let mut builder = ModelBuilder {
            es,
            axis,
            config,
            lp: LinearProgram::new(),
            flows: vec![],
            storages: IndexMap::new(),
            registry: VariableRegistry::default(),
            investment_vars: vec![],
            investment_costs: LinearExpr::new(),
            objective_terms: IndexMap::new(),
            objectives: IndexMap::new(),
        };

        builder.add_flow_variables()?;
        builder.add_flow_investments()?;
        builder.add_simple_flow_constraints()?;
        builder.add_nonconvex_flows()?;
        builder.add_bus_balances()?;
        builder.add_converters()?;
        builder.add_storages()?;
        builder.add_multiobjective_costs();

        Ok(builder.finish())
    }

    pub(super) fn steps(&self) -> usize {
        self.axis.steps()
    }

    /// The weight of step `t` in time-integrated cost terms.
    pub(super) fn objective_weight(&self, t: usize) -> f64 {
        match &self.config.objective_weighting {
            Some(weighting) => weighting.get(t),
            None => self.axis.weight(t),
        }
    }

    /// The factor discounting costs of period `p` to the start of the horizon.
    pub(super) fn discount(&self, p: usize) -> f64 {
        if self.axis.is_multi_period() {
            discount_factor(self.config.discount_rate, self.axis.period_years(p))
        } else {
            1.0
        }
    }

    /// Adds `expr` to the cost term `term` of the objective.
    pub(super) fn add_cost(&mut self, term: &str, expr: LinearExpr) {
        if expr.is_empty() {
            return;
        }
        *self.objective_terms.entry(term.to_string()).or_default() += expr;
    }

    pub(super) fn flow_entry(&self, source: &str, target: &str) -> Result<&FlowEntry, Error> {
        self.flows
            .iter()
            .find(|f| f.source == source && f.target == target)
            .ok_or_else(|| {
                Error::internal(format!("Flow:({source}, {target}) has no variables."))
            })
    }

    /// The variables of the flow from `source` to `target`.
    pub(super) fn flow_vars(&self, source: &str, target: &str) -> Result<Vec<VarId>, Error> {
        self.flow_entry(source, target).map(|f| f.vars.clone())
    }

    fn finish(mut self) -> Model {
        let mut objective = LinearExpr::new();
        for expr in self.objective_terms.values() {
            objective += expr;
        }
        for (name, expr) in &self.objectives {
            objective.add_scaled(expr, self.config.objective.weight(name));
        }
        self.lp.add_objective(&objective);

        if self.config.relax_integrality {
            self.lp.relax();
        }

        tracing::info!(
            "Model built with {} variables ({} integer) and {} constraints.",
            self.lp.variables().len(),
            self.lp.integer_count(),
            self.lp.constraints().len()
        );

        Model {
            lp: self.lp,
            config: self.config,
            time_axis: self.axis.clone(),
            revision: self.es.revision(),
            flows: self.flows,
            storages: self.storages,
            registry: self.registry,
            investment_vars: self.investment_vars,
            investment_costs: self.investment_costs,
            objective_terms: self.objective_terms,
            objectives: self.objectives,
            solution: None,
        }
    }
}
