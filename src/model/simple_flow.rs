// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Flow variables, their bounds, gradients, full load times and costs.

use crate::lp::{Domain, LinearExpr, Sense};
use crate::{Error, ResultKey};

use super::builder::ModelBuilder;
use super::{Capacity, FlowEntry};

impl ModelBuilder<'_> {
    /// Creates one variable per flow and step.
    ///
    /// Flows with a fixed nominal capacity are bounded directly by
    /// `nominal * [min(t), max(t)]`, or fixed to `nominal * fix(t)`.  The
    /// lower bound of nonconvex flows is left to the nonconvex block.
    pub(super) fn add_flow_variables(&mut self) -> Result<(), Error> {
        let axis = self.axis;
        for flow_ref in self.es.iter_flows() {
            let (source, target) = (flow_ref.source.label(), flow_ref.target.label());
            let flow = flow_ref.flow;
            let nominal = match flow.investment {
                Some(_) => None,
                None => flow.nominal_capacity,
            };
            let domain = if flow.integer {
                Domain::Integer
            } else {
                Domain::Continuous
            };

            let mut vars = Vec::with_capacity(self.steps());
            for t in 0..self.steps() {
                let (mut lower, mut upper) = (0.0, f64::INFINITY);
                if let Some(nominal) = nominal {
                    upper = nominal * flow.max.get(t);
                    if flow.nonconvex.is_none() {
                        lower = nominal * flow.min.get(t).max(0.0);
                    }
                    if let Some(fix) = &flow.fix {
                        lower = nominal * fix.get(t);
                        upper = lower;
                    }
                }
                if axis.is_multi_period() && flow.investment.is_none() && self.is_retired(flow, t)
                {
                    lower = 0.0;
                    upper = 0.0;
                }
                vars.push(self.lp.add_variable(
                    format!("flow({source},{target},{t})"),
                    lower,
                    upper,
                    domain,
                )?);
            }

            self.registry
                .add_sequence(&ResultKey::flow(source, target), "flow", vars.clone());
            self.flows.push(FlowEntry {
                source: source.to_string(),
                target: target.to_string(),
                flow: flow.clone(),
                vars,
                status: None,
                capacity: match nominal {
                    Some(nominal) => Capacity::Fixed(nominal),
                    None => Capacity::Unknown,
                },
            });
        }

        tracing::debug!("Added variables for {} flows.", self.flows.len());
        Ok(())
    }

    /// Whether a flow without investment has reached the end of its lifetime
    /// in the period of step `t`.
    fn is_retired(&self, flow: &crate::Flow, t: usize) -> bool {
        match flow.lifetime {
            Some(lifetime) => {
                lifetime as i32 - flow.age as i32 <= self.axis.period_years(self.axis.period(t))
            }
            None => false,
        }
    }

    /// Adds gradient limits, full load time limits, variable costs and, in
    /// multi-period models, the fixed costs of flows without investment.
    pub(super) fn add_simple_flow_constraints(&mut self) -> Result<(), Error> {
        let axis = self.axis;
        let flows = std::mem::take(&mut self.flows);

        for entry in &flows {
            let flow = &entry.flow;
            let name = format!("{},{}", entry.source, entry.target);

            if let Some(costs) = &flow.variable_costs {
                let mut expr = LinearExpr::new();
                for t in 0..self.steps() {
                    let coefficient =
                        costs.get(t) * self.objective_weight(t) * self.discount(axis.period(t));
                    expr.add_term(entry.vars[t], coefficient);
                }
                self.add_cost("variable_costs", expr);
            }

            for (positive, limit) in [
                (true, &flow.positive_gradient_limit),
                (false, &flow.negative_gradient_limit),
            ] {
                let Some(limit) = limit else {
                    continue;
                };
                if (0..self.steps()).any(|t| limit.get(t) <= 1e-9) {
                    tracing::warn!(
                        "Flow:({}, {}) has a gradient limit of zero, which freezes the flow.",
                        entry.source,
                        entry.target
                    );
                }
                let kind = if positive { "positive" } else { "negative" };
                for t in 1..self.steps() {
                    let Some(capacity) = entry.capacity.expr(axis.period(t)) else {
                        return Err(Error::unresolved_capacity(format!(
                            "Flow:({}, {}) has a gradient limit but no nominal_capacity.",
                            entry.source, entry.target
                        )));
                    };
                    let (current, previous) = (entry.vars[t], entry.vars[t - 1]);
                    let mut expr = if positive {
                        LinearExpr::from(current) - LinearExpr::from(previous)
                    } else {
                        LinearExpr::from(previous) - LinearExpr::from(current)
                    };
                    expr.add_scaled(&capacity, -limit.get(t));
                    self.lp.add_constraint(
                        format!("{kind}_gradient({name},{t})"),
                        expr,
                        Sense::Le,
                        0.0,
                    )?;
                }
            }

            for (sense, hours) in [
                (Sense::Le, flow.full_load_time_max),
                (Sense::Ge, flow.full_load_time_min),
            ] {
                let Some(hours) = hours else {
                    continue;
                };
                let bound = if sense == Sense::Le { "max" } else { "min" };
                let capacity = match &entry.capacity {
                    Capacity::Unknown => {
                        return Err(Error::unresolved_capacity(format!(
                            "Flow:({}, {}) has a full load time but no nominal_capacity.",
                            entry.source, entry.target
                        )))
                    }
                    Capacity::Fixed(nominal) => LinearExpr::constant_expr(*nominal),
                    Capacity::Invest(vars) => {
                        let mut expr = LinearExpr::new();
                        for total in &vars.total {
                            expr.add_term(*total, 1.0);
                        }
                        expr
                    }
                };
                let mut expr = LinearExpr::new();
                for t in 0..self.steps() {
                    expr.add_term(entry.vars[t], axis.weight(t));
                }
                expr.add_scaled(&capacity, -hours);
                self.lp.add_constraint(
                    format!("full_load_time_{bound}({name})"),
                    expr,
                    sense,
                    0.0,
                )?;
            }

            if let (true, Some(fixed_costs), Capacity::Fixed(nominal)) = (
                axis.is_multi_period(),
                &flow.fixed_costs,
                &entry.capacity,
            ) {
                let until = match flow.lifetime {
                    Some(lifetime) => (lifetime as i32 - flow.age as i32).min(axis.end_year()),
                    None => axis.end_year(),
                };
                let factor = self.yearly_costs_factor(fixed_costs, 0, until);
                self.add_cost(
                    "fixed_costs",
                    LinearExpr::constant_expr(nominal * factor),
                );
            }
        }

        self.flows = flows;
        tracing::debug!("Added simple flow constraints.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{assert_close, assert_seq_close, hourly_axis, hours, solve};
    use crate::{Bus, EnergySystem, Error, Flow, ModelConfig, Sink, Source, TimeAxis};

    fn single_source_system(steps: usize, flow: Flow) -> Result<EnergySystem, Error> {
        let mut es = EnergySystem::new(hourly_axis(steps));
        es.add_node(Source::new("plant"))?;
        es.add_node(Bus::new("el"))?;
        es.add_node(Sink::new("excess"))?;
        es.add_flow("plant", "el", flow)?;
        es.add_flow("el", "excess", Flow::new())?;
        es.freeze()?;
        Ok(es)
    }

    #[test]
    fn test_gradient_limits() -> Result<(), Error> {
        let mut costs = vec![-1.0; 10];
        costs[0] = 8.0;
        costs[9] = 8.0;
        let es = single_source_system(
            10,
            Flow::new()
                .with_nominal_capacity(2.0)
                .with_variable_costs(costs)
                .with_positive_gradient_limit(0.4)
                .with_negative_gradient_limit(0.25),
        )?;
        let (model, results) = solve(&es, ModelConfig::default())?;

        assert_seq_close(
            &results.flow("plant", "el")?.sequences["flow"],
            &[0.0, 0.8, 1.6, 2.0, 2.0, 2.0, 1.5, 1.0, 0.5, 0.0],
        );
        assert!(model.constraint("positive_gradient(plant,el,1)").is_some());
        assert!(model.constraint("positive_gradient(plant,el,0)").is_none());
        assert!(model.constraint("negative_gradient(plant,el,9)").is_some());
        Ok(())
    }

    #[test]
    fn test_full_load_time_max() -> Result<(), Error> {
        let es = single_source_system(
            10,
            Flow::new()
                .with_nominal_capacity(2.0)
                .with_variable_costs((0..10).map(|c| -(c as f64)).collect::<Vec<_>>())
                .with_full_load_time_max(4.5),
        )?;
        let (_, results) = solve(&es, ModelConfig::default())?;

        assert_seq_close(
            &results.flow("plant", "el")?.sequences["flow"],
            &[0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 2.0, 2.0, 2.0],
        );
        assert_close(results.objective(), -(5.0 + 2.0 * (6.0 + 7.0 + 8.0 + 9.0)));
        Ok(())
    }

    #[test]
    fn test_full_load_time_min() -> Result<(), Error> {
        let es = single_source_system(
            4,
            Flow::new()
                .with_nominal_capacity(2.0)
                .with_variable_costs([4.0, 1.0, 3.0, 2.0])
                .with_full_load_time_min(1.5),
        )?;
        let (_, results) = solve(&es, ModelConfig::default())?;

        assert_seq_close(
            &results.flow("plant", "el")?.sequences["flow"],
            &[0.0, 2.0, 0.0, 1.0],
        );
        Ok(())
    }

    #[test]
    fn test_full_load_time_spans_all_periods() -> Result<(), Error> {
        let mut es = EnergySystem::new(TimeAxis::multi_period(vec![
            hours(2020, 2),
            hours(2025, 2),
        ])?);
        es.add_node(Source::new("plant"))?;
        es.add_node(Bus::new("el"))?;
        es.add_node(Sink::new("excess"))?;
        es.add_flow(
            "plant",
            "el",
            Flow::new()
                .with_nominal_capacity(1.0)
                .with_variable_costs([-1.0, -1.0, -4.0, -4.0])
                .with_full_load_time_max(2.0),
        )?;
        es.add_flow("el", "excess", Flow::new())?;
        let (model, results) = solve(&es, ModelConfig::default())?;

        // Two full load hours for the whole horizon, spent in the second
        // period.
        assert_seq_close(
            &results.flow("plant", "el")?.sequences["flow"],
            &[0.0, 0.0, 1.0, 1.0],
        );
        assert!(model.constraint("full_load_time_max(plant,el)").is_some());
        assert!(model.constraint("full_load_time_max(plant,el,0)").is_none());
        Ok(())
    }

    #[test]
    fn test_retirement_without_investment() -> Result<(), Error> {
        let mut es = EnergySystem::new(TimeAxis::multi_period(vec![
            hours(2020, 2),
            hours(2025, 2),
        ])?);
        es.add_node(Source::new("plant"))?;
        es.add_node(Source::new("new_plant"))?;
        es.add_node(Source::new("grid"))?;
        es.add_node(Bus::new("el"))?;
        es.add_node(Sink::new("demand"))?;
        es.add_flow(
            "plant",
            "el",
            Flow::new()
                .with_nominal_capacity(1.0)
                .with_variable_costs(1.0)
                .with_lifetime(6)
                .with_age(1),
        )?;
        es.add_flow(
            "new_plant",
            "el",
            Flow::new()
                .with_nominal_capacity(0.5)
                .with_variable_costs(2.0)
                .with_lifetime(10)
                .with_age(2),
        )?;
        es.add_flow("grid", "el", Flow::new().with_variable_costs(10.0))?;
        es.add_flow(
            "el",
            "demand",
            Flow::new().with_nominal_capacity(1.0).with_fix(1.0),
        )?;
        let (model, results) = solve(&es, ModelConfig::default())?;

        // `plant` reaches the end of its lifetime five years in, at the start
        // of the second period.
        assert_seq_close(
            &results.flow("plant", "el")?.sequences["flow"],
            &[1.0, 1.0, 0.0, 0.0],
        );
        assert_seq_close(
            &results.flow("new_plant", "el")?.sequences["flow"],
            &[0.0, 0.0, 0.5, 0.5],
        );
        assert_seq_close(
            &results.flow("grid", "el")?.sequences["flow"],
            &[0.0, 0.0, 0.5, 0.5],
        );
        let retired = model.flow_variable("plant", "el", 2)?;
        assert_eq!(model.lp().variable(retired).upper, 0.0);
        Ok(())
    }

    #[test]
    fn test_bounds_and_fix() -> Result<(), Error> {
        let mut es = EnergySystem::new(hourly_axis(3));
        es.add_node(Source::new("pv"))?;
        es.add_node(Source::new("grid"))?;
        es.add_node(Bus::new("el"))?;
        es.add_node(Sink::new("demand"))?;
        es.add_flow(
            "pv",
            "el",
            Flow::new().with_nominal_capacity(5.0).with_fix([0.2, 0.6, 0.0]),
        )?;
        es.add_flow(
            "grid",
            "el",
            Flow::new()
                .with_nominal_capacity(10.0)
                .with_min(0.1)
                .with_variable_costs(1.0),
        )?;
        es.add_flow(
            "el",
            "demand",
            Flow::new().with_nominal_capacity(1.0).with_fix([4.0, 4.0, 4.0]),
        )?;
        let (model, results) = solve(&es, ModelConfig::default())?;

        assert_seq_close(&results.flow("pv", "el")?.sequences["flow"], &[1.0, 3.0, 0.0]);
        assert_seq_close(&results.flow("grid", "el")?.sequences["flow"], &[3.0, 1.0, 4.0]);
        let grid = model.flow_variable("grid", "el", 1)?;
        assert_eq!(model.lp().variable(grid).lower, 1.0);
        assert_eq!(model.lp().variable(grid).upper, 10.0);
        Ok(())
    }

    #[test]
    fn test_integer_flow() -> Result<(), Error> {
        let mut es = EnergySystem::new(hourly_axis(2));
        es.add_node(Source::new("units"))?;
        es.add_node(Source::new("backup"))?;
        es.add_node(Bus::new("el"))?;
        es.add_node(Sink::new("demand"))?;
        es.add_flow(
            "units",
            "el",
            Flow::new().with_integer().with_variable_costs(1.0),
        )?;
        es.add_flow("backup", "el", Flow::new().with_variable_costs(5.0))?;
        es.add_flow(
            "el",
            "demand",
            Flow::new().with_nominal_capacity(1.0).with_fix([2.5, 1.2]),
        )?;
        let (_, results) = solve(&es, ModelConfig::default())?;

        assert_seq_close(&results.flow("units", "el")?.sequences["flow"], &[2.0, 1.0]);
        assert_seq_close(&results.flow("backup", "el")?.sequences["flow"], &[0.5, 0.2]);
        Ok(())
    }

    #[test]
    fn test_objective_weighting() -> Result<(), Error> {
        let es = single_source_system(
            2,
            Flow::new()
                .with_nominal_capacity(1.0)
                .with_fix([1.0, 1.0])
                .with_variable_costs(3.0),
        )?;
        let config = ModelConfig {
            objective_weighting: Some([2.0, 0.5].into()),
            ..Default::default()
        };
        let (_, results) = solve(&es, config)?;
        assert_close(results.objective(), 3.0 * 2.0 + 3.0 * 0.5);
        Ok(())
    }
}
