// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Balances of buses.

use crate::lp::{Domain, LinearExpr, Sense, VarId};
use crate::{Bus, Error, Node, ResultKey};

use super::builder::ModelBuilder;

impl ModelBuilder<'_> {
    /// Adds `sum(inflows) - sum(outflows) = 0` for every step and balanced
    /// bus, with optional `excess` and `shortage` slack variables.
    pub(super) fn add_bus_balances(&mut self) -> Result<(), Error> {
        let es = self.es;
        let mut count = 0;
        for node in es.iter_nodes() {
            let Node::Bus(bus) = node else {
                continue;
            };
            if !bus.balanced {
                continue;
            }

            let mut balances: Vec<LinearExpr> = vec![LinearExpr::new(); self.steps()];
            for flow in es.inputs(&bus.label)? {
                let vars = self.flow_vars(flow.source.label(), &bus.label)?;
                for (balance, var) in balances.iter_mut().zip(vars) {
                    balance.add_term(var, 1.0);
                }
            }
            for flow in es.outputs(&bus.label)? {
                let vars = self.flow_vars(&bus.label, flow.target.label())?;
                for (balance, var) in balances.iter_mut().zip(vars) {
                    balance.add_term(var, -1.0);
                }
            }

            let (excess_costs, shortage_costs) = self.slack_costs(bus);
            for (metric, costs, sign) in [
                ("excess", excess_costs, -1.0),
                ("shortage", shortage_costs, 1.0),
            ] {
                let Some(costs) = costs else {
                    continue;
                };
                let vars = self.add_slack(bus, metric, costs)?;
                for (balance, var) in balances.iter_mut().zip(vars) {
                    balance.add_term(var, sign);
                }
            }

            for (t, balance) in balances.into_iter().enumerate() {
                self.lp.add_constraint(
                    format!("bus_balance({},{t})", bus.label),
                    balance,
                    Sense::Eq,
                    0.0,
                )?;
            }
            count += 1;
        }

        tracing::debug!("Added balances for {count} buses.");
        Ok(())
    }

    /// The penalty costs of the slack variables of `bus`, if it has any.
    fn slack_costs(&self, bus: &Bus) -> (Option<f64>, Option<f64>) {
        let config = &self.config;
        (
            bus.excess_costs
                .or(config.slack_excess.then_some(config.excess_costs)),
            bus.shortage_costs
                .or(config.slack_shortage.then_some(config.shortage_costs)),
        )
    }

    fn add_slack(&mut self, bus: &Bus, metric: &str, costs: f64) -> Result<Vec<VarId>, Error> {
        let mut vars = Vec::with_capacity(self.steps());
        let mut expr = LinearExpr::new();
        for t in 0..self.steps() {
            let var = self.lp.add_variable(
                format!("{metric}({},{t})", bus.label),
                0.0,
                f64::INFINITY,
                Domain::Continuous,
            )?;
            let factor = self.objective_weight(t) * self.discount(self.axis.period(t));
            expr.add_term(var, costs * factor);
            vars.push(var);
        }
        self.add_cost("bus_slack_costs", expr);
        self.registry
            .add_sequence(&ResultKey::node(&bus.label), metric, vars.clone());
        Ok(vars)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{assert_close, assert_seq_close, hourly_axis, solve};
    use crate::{Bus, EnergySystem, Error, Flow, ModelConfig, Sink, Source};

    fn system(bus: Bus, supply: Flow, demand: Flow) -> Result<EnergySystem, Error> {
        let mut es = EnergySystem::new(hourly_axis(2));
        es.add_node(Source::new("grid"))?;
        es.add_node(bus)?;
        es.add_node(Sink::new("demand"))?;
        es.add_flow("grid", "el", supply)?;
        es.add_flow("el", "demand", demand)?;
        es.freeze()?;
        Ok(es)
    }

    #[test]
    fn test_balance() -> Result<(), Error> {
        let es = system(
            Bus::new("el"),
            Flow::new().with_variable_costs(2.0),
            Flow::new().with_nominal_capacity(1.0).with_fix([3.0, 1.0]),
        )?;
        let (model, results) = solve(&es, ModelConfig::default())?;

        assert_seq_close(&results.flow("grid", "el")?.sequences["flow"], &[3.0, 1.0]);
        assert_close(results.objective(), 8.0);
        let balance = model.constraint("bus_balance(el,0)").unwrap();
        assert_eq!(balance.terms.len(), 2);
        assert!(results.node("el").is_err());
        Ok(())
    }

    #[test]
    fn test_shortage_from_config() -> Result<(), Error> {
        let es = system(
            Bus::new("el"),
            Flow::new().with_nominal_capacity(3.0).with_variable_costs(1.0),
            Flow::new().with_nominal_capacity(1.0).with_fix([5.0, 2.0]),
        )?;
        let config = ModelConfig {
            slack_shortage: true,
            shortage_costs: 100.0,
            ..Default::default()
        };
        let (model, results) = solve(&es, config)?;

        let el = results.node("el")?;
        assert_seq_close(&el.sequences["shortage"], &[2.0, 0.0]);
        assert!(!el.sequences.contains_key("excess"));
        assert_close(results.objective(), 5.0 + 200.0);
        assert!(model.objective_terms().contains_key("bus_slack_costs"));
        Ok(())
    }

    #[test]
    fn test_slack_per_bus() -> Result<(), Error> {
        let es = system(
            Bus::new("el").with_slack(10.0, 1000.0),
            Flow::new().with_nominal_capacity(1.0).with_fix([5.0, 5.0]),
            Flow::new().with_nominal_capacity(1.0).with_fix([3.0, 5.0]),
        )?;
        let (_, results) = solve(&es, ModelConfig::default())?;

        let el = results.node("el")?;
        assert_seq_close(&el.sequences["excess"], &[2.0, 0.0]);
        assert_seq_close(&el.sequences["shortage"], &[0.0, 0.0]);
        assert_close(results.objective(), 20.0);
        Ok(())
    }

    #[test]
    fn test_unbalanced_bus() -> Result<(), Error> {
        let es = system(
            Bus::new("el").unbalanced(),
            Flow::new().with_nominal_capacity(1.0).with_fix([5.0, 5.0]),
            Flow::new().with_nominal_capacity(1.0).with_fix([3.0, 1.0]),
        )?;
        let (model, _) = solve(&es, ModelConfig::default())?;
        assert!(model.constraint("bus_balance(el,0)").is_none());
        Ok(())
    }
}
