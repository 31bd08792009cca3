// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Content variables and balances of storages.

use crate::lp::{Domain, LinearExpr, Sense, VarId};
use crate::{Error, Node, ResultKey, Storage};

use super::builder::ModelBuilder;
use super::{Capacity, StorageEntry};

impl ModelBuilder<'_> {
    pub(super) fn add_storages(&mut self) -> Result<(), Error> {
        let es = self.es;
        for node in es.iter_nodes() {
            if let Node::Storage(storage) = node {
                self.add_storage(storage)?;
            }
        }

        tracing::debug!("Added {} storages.", self.storages.len());
        Ok(())
    }

    fn add_storage(&mut self, storage: &Storage) -> Result<(), Error> {
        let es = self.es;
        let axis = self.axis;
        let label = &storage.label;
        let key = ResultKey::node(label);

        let capacity = match (&storage.investment, storage.nominal_capacity) {
            (Some(investment), _) => {
                Capacity::Invest(self.add_investment(label, &key, investment)?)
            }
            (None, Some(nominal)) => Capacity::Fixed(nominal),
            (None, None) => {
                return Err(Error::unresolved_capacity(format!(
                    "Storage:{label} needs a nominal_capacity or an investment."
                )))
            }
        };

        let input = es.inputs(label)?.next().ok_or_else(|| {
            Error::invalid_graph(format!("Storage:{label} has no input flow."))
        })?;
        let output = es.outputs(label)?.next().ok_or_else(|| {
            Error::invalid_graph(format!("Storage:{label} has no output flow."))
        })?;
        let (input, output) = (input.source.label(), output.target.label());
        let inflow = self.flow_vars(input, label)?;
        let outflow = self.flow_vars(label, output)?;

        let mut content = Vec::with_capacity(axis.periods().len());
        for p in 0..axis.periods().len() {
            let vars = self.add_content(storage, &capacity, p)?;
            let cap = capacity_expr(&capacity, p)?;
            let steps = axis.period_steps(p);

            for (k, t) in steps.clone().enumerate() {
                let weight = axis.weight(t);
                let retention = (1.0 - storage.loss_rate.get(t)).powf(weight);
                let mut expr = LinearExpr::from(vars[k + 1]) - LinearExpr::term(vars[k], retention);
                expr.add_scaled(&cap, storage.fixed_losses_relative.get(t) * weight);
                expr.add_constant(storage.fixed_losses_absolute.get(t) * weight);
                expr.add_term(
                    inflow[t],
                    -storage.inflow_conversion_factor.get(t) * weight,
                );
                expr.add_term(
                    outflow[t],
                    weight / storage.outflow_conversion_factor.get(t),
                );
                self.lp
                    .add_constraint(format!("storage_balance({label},{t})"), expr, Sense::Eq, 0.0)?;
            }

            let (first, last) = (vars[0], vars[steps.len()]);
            if let Some(level) = storage.initial_level {
                let mut expr = LinearExpr::from(first);
                expr.add_scaled(&cap, -level);
                self.lp
                    .add_constraint(format!("initial_level({label},{p})"), expr, Sense::Eq, 0.0)?;
            }
            if storage.balanced {
                self.lp.add_constraint(
                    format!("storage_balanced({label},{p})"),
                    LinearExpr::from(last) - LinearExpr::from(first),
                    Sense::Eq,
                    0.0,
                )?;
            }
            content.push(vars);
        }

        if let Capacity::Invest(vars) = &capacity {
            for (relation, ratio, source, target, other) in [
                (
                    "invest_relation_input_capacity",
                    storage.invest_relation_input_capacity,
                    input,
                    label.as_str(),
                    None,
                ),
                (
                    "invest_relation_output_capacity",
                    storage.invest_relation_output_capacity,
                    label.as_str(),
                    output,
                    None,
                ),
                (
                    "invest_relation_input_output",
                    storage.invest_relation_input_output,
                    input,
                    label.as_str(),
                    Some((label.as_str(), output)),
                ),
            ] {
                let Some(ratio) = ratio else {
                    continue;
                };
                let flow_total = self.flow_invest_total(source, target, relation)?;
                let reference = match other {
                    Some((source, target)) => self.flow_invest_total(source, target, relation)?,
                    None => vars.total.clone(),
                };
                for (p, (flow_total, reference)) in flow_total.iter().zip(&reference).enumerate() {
                    self.lp.add_constraint(
                        format!("{relation}({label},{p})"),
                        LinearExpr::from(*flow_total) - LinearExpr::term(*reference, ratio),
                        Sense::Eq,
                        0.0,
                    )?;
                }
            }
        }

        let sequence = content.iter().flatten().copied().collect();
        self.registry.add_sequence(&key, "storage_content", sequence);
        self.storages
            .insert(label.clone(), StorageEntry { content, capacity });
        Ok(())
    }

    /// Creates the content variables of period `p`, bounded by the capacity
    /// and the storage levels.  The content before step `t` is bounded by
    /// the levels of step `t`, the content after the last step by the levels
    /// of the last step.
    fn add_content(
        &mut self,
        storage: &Storage,
        capacity: &Capacity,
        p: usize,
    ) -> Result<Vec<VarId>, Error> {
        let axis = self.axis;
        let label = &storage.label;
        let steps = axis.period_steps(p);
        let cap = capacity_expr(capacity, p)?;

        let mut vars = Vec::with_capacity(steps.len() + 1);
        for k in 0..=steps.len() {
            let t = steps.start + k.min(steps.len() - 1);
            let (min_level, max_level) = (storage.min_level.get(t), storage.max_level.get(t));
            let name = if axis.is_multi_period() {
                format!("storage_content({label},{p},{k})")
            } else {
                format!("storage_content({label},{k})")
            };

            let var = match capacity {
                Capacity::Fixed(nominal) => self.lp.add_variable(
                    name,
                    nominal * min_level,
                    nominal * max_level,
                    Domain::Continuous,
                )?,
                _ => {
                    let var = self.lp.add_variable(
                        name.clone(),
                        0.0,
                        f64::INFINITY,
                        Domain::Continuous,
                    )?;
                    let mut expr = LinearExpr::from(var);
                    expr.add_scaled(&cap, -max_level);
                    self.lp
                        .add_constraint(format!("max_{name}"), expr, Sense::Le, 0.0)?;
                    if min_level > 0.0 {
                        let mut expr = LinearExpr::from(var);
                        expr.add_scaled(&cap, -min_level);
                        self.lp
                            .add_constraint(format!("min_{name}"), expr, Sense::Ge, 0.0)?;
                    }
                    var
                }
            };
            vars.push(var);
        }
        Ok(vars)
    }

    /// The per-period capacity variables of an invested flow.
    fn flow_invest_total(
        &self,
        source: &str,
        target: &str,
        relation: &str,
    ) -> Result<Vec<VarId>, Error> {
        match &self.flow_entry(source, target)?.capacity {
            Capacity::Invest(vars) => Ok(vars.total.clone()),
            _ => Err(Error::configuration(format!(
                "Flow:({source}, {target}) needs an investment for {relation}."
            ))),
        }
    }
}

fn capacity_expr(capacity: &Capacity, p: usize) -> Result<LinearExpr, Error> {
    capacity.expr(p).ok_or_else(|| {
        Error::internal("Storage capacity was not resolved before building its content.")
    })
}
