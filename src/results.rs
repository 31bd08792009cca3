// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Values of a solved [`Model`], keyed by the labels of the energy system.

mod export;
pub mod views;

use std::fmt::Display;

use indexmap::IndexMap;

use crate::{Error, Model};

/// Identifies the results of a flow (`target` is `Some`) or a node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResultKey {
    pub source: String,
    pub target: Option<String>,
}

impl ResultKey {
    pub fn flow(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: Some(target.into()),
        }
    }

    pub fn node(label: impl Into<String>) -> Self {
        Self {
            source: label.into(),
            target: None,
        }
    }
}

impl Display for ResultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.target {
            Some(target) => write!(f, "({}, {})", self.source, target),
            None => write!(f, "({}, None)", self.source),
        }
    }
}

/// The results of one flow or node, by metric name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeResults {
    /// Single values, such as the invested capacity of a single-period
    /// model.
    pub scalars: IndexMap<String, f64>,

    /// One value per step, such as `flow` or `status`.  The
    /// `storage_content` of a storage has one value more per period.
    pub sequences: IndexMap<String, Vec<f64>>,

    /// One value per period, such as the investments of a multi-period
    /// model.
    pub periods: IndexMap<String, Vec<f64>>,
}

/// The results of a solved model.
#[derive(Clone, Debug)]
pub struct Results {
    entries: IndexMap<ResultKey, NodeResults>,
    objective: f64,
    objective_terms: IndexMap<String, f64>,
    objectives: IndexMap<String, f64>,
    values: Vec<f64>,
}

impl Results {
    pub(crate) fn from_model(model: &Model, values: &[f64]) -> Self {
        let value = |var: &crate::lp::VarId| values[var.index()];

        let entries = model
            .registry()
            .iter()
            .map(|(key, entry)| {
                let results = NodeResults {
                    scalars: entry
                        .scalars
                        .iter()
                        .map(|(metric, var)| (metric.clone(), value(var)))
                        .collect(),
                    sequences: entry
                        .sequences
                        .iter()
                        .map(|(metric, vars)| (metric.clone(), vars.iter().map(value).collect()))
                        .collect(),
                    periods: entry
                        .periods
                        .iter()
                        .map(|(metric, vars)| (metric.clone(), vars.iter().map(value).collect()))
                        .collect(),
                };
                (key.clone(), results)
            })
            .collect();

        Self {
            entries,
            objective: model.lp().objective().evaluate(values),
            objective_terms: model
                .objective_terms()
                .iter()
                .map(|(name, expr)| (name.clone(), expr.evaluate(values)))
                .collect(),
            objectives: model
                .objectives()
                .iter()
                .map(|(name, expr)| (name.clone(), expr.evaluate(values)))
                .collect(),
            values: values.to_vec(),
        }
    }

    /// Returns the results for `key`, if there are any.
    pub fn get(&self, key: &ResultKey) -> Option<&NodeResults> {
        self.entries.get(key)
    }

    /// Returns the results of the flow from `source` to `target`.
    pub fn flow(&self, source: &str, target: &str) -> Result<&NodeResults, Error> {
        self.get(&ResultKey::flow(source, target))
            .ok_or_else(|| Error::flow_not_found(format!("No results for Flow:({source}, {target}).")))
    }

    /// Returns the results of the node with the given `label`, such as the
    /// content of a storage or the slack of a bus.
    pub fn node(&self, label: &str) -> Result<&NodeResults, Error> {
        self.get(&ResultKey::node(label))
            .ok_or_else(|| Error::node_not_found(format!("No results for node {label}.")))
    }

    /// Iterates over all results, in the order the model created them.
    pub fn iter(&self) -> impl Iterator<Item = (&ResultKey, &NodeResults)> {
        self.entries.iter()
    }

    /// The value of the objective.
    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// The values of the cost terms of the objective, by name.
    pub fn objective_terms(&self) -> &IndexMap<String, f64> {
        &self.objective_terms
    }

    /// The unweighted values of the named objectives of multi-objective
    /// flows.
    pub fn objectives(&self) -> &IndexMap<String, f64> {
        &self.objectives
    }

    /// The values of all variables of the program, by index.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{assert_close, hourly_axis, solve};
    use crate::{Bus, EnergySystem, Flow, ModelConfig, Sink, Source};

    #[test]
    fn test_result_keys() {
        assert_eq!(ResultKey::flow("a", "b").to_string(), "(a, b)");
        assert_eq!(ResultKey::node("a").to_string(), "(a, None)");
        assert!(ResultKey::node("a") < ResultKey::flow("a", "b"));
    }

    #[test]
    fn test_lookup() -> Result<(), Error> {
        let mut es = EnergySystem::new(hourly_axis(2));
        es.add_node(Source::new("grid"))?;
        es.add_node(Bus::new("el"))?;
        es.add_node(Sink::new("demand"))?;
        es.add_flow("grid", "el", Flow::new().with_variable_costs(2.0))?;
        es.add_flow(
            "el",
            "demand",
            Flow::new().with_nominal_capacity(1.0).with_fix([1.0, 2.0]),
        )?;
        let (model, results) = solve(&es, ModelConfig::default())?;

        assert_eq!(results.iter().count(), 2);
        assert_eq!(results.values().len(), model.lp().variables().len());
        assert_close(results.objective_terms()["variable_costs"], 6.0);
        assert!(results.objectives().is_empty());
        assert!(results
            .flow("el", "grid")
            .is_err_and(|e| e == Error::flow_not_found("No results for Flow:(el, grid).")));
        assert!(results
            .node("grid")
            .is_err_and(|e| e == Error::node_not_found("No results for node grid.")));
        Ok(())
    }
}
