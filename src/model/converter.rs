// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Conversion equations of converters.

use crate::lp::{LinearExpr, Sense};
use crate::{Converter, Error, Node};

use super::builder::ModelBuilder;

impl ModelBuilder<'_> {
    /// Relates every flow of a converter to its reference input:
    ///
    /// ```text
    /// flow(x, t) * cf(r, t) = flow(r, t) * cf(x, t)
    /// ```
    pub(super) fn add_converters(&mut self) -> Result<(), Error> {
        let es = self.es;
        for node in es.iter_nodes() {
            if let Node::Converter(converter) = node {
                self.add_converter(converter)?;
            }
        }

        tracing::debug!("Added converters.");
        Ok(())
    }

    fn add_converter(&mut self, converter: &Converter) -> Result<(), Error> {
        let es = self.es;
        let label = &converter.label;

        let inputs: Vec<&str> = es.inputs(label)?.map(|f| f.source.label()).collect();
        let outputs: Vec<&str> = es.outputs(label)?.map(|f| f.target.label()).collect();
        let reference = match &converter.reference_input {
            Some(reference) => reference.as_str(),
            None => inputs.first().copied().ok_or_else(|| {
                Error::invalid_graph(format!("Converter:{label} has no input flows."))
            })?,
        };
        let reference_vars = self.flow_vars(reference, label)?;
        let factor = |node: &str, t: usize| converter.factor(node).map_or(1.0, |cf| cf.get(t));

        let related = inputs
            .iter()
            .filter(|input| **input != reference)
            .map(|input| (*input, label.as_str(), *input))
            .chain(outputs.iter().map(|output| (label.as_str(), *output, *output)));

        for (source, target, node) in related {
            let vars = self.flow_vars(source, target)?;
            for t in 0..self.steps() {
                let own = factor(node, t);
                if own.abs() < 1e-9 {
                    tracing::warn!(
                        "Converter:{label} has a conversion factor of {own} for {node} at step {t}."
                    );
                }
                self.lp.add_constraint(
                    format!("conversion({source},{target},{t})"),
                    LinearExpr::term(vars[t], factor(reference, t))
                        - LinearExpr::term(reference_vars[t], own),
                    Sense::Eq,
                    0.0,
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{assert_close, assert_seq_close, hourly_axis, solve};
    use crate::{Bus, Converter, EnergySystem, Error, Flow, ModelConfig, Sink, Source};

    #[test]
    fn test_boiler() -> Result<(), Error> {
        let mut es = EnergySystem::new(hourly_axis(4));
        es.add_node(Source::new("gas_grid"))?;
        es.add_node(Bus::new("gas"))?;
        es.add_node(Converter::new("boiler").with_conversion_factor("heat", 0.9))?;
        es.add_node(Bus::new("heat"))?;
        es.add_node(Sink::new("demand"))?;
        es.add_flow("gas_grid", "gas", Flow::new().with_variable_costs(0.1))?;
        es.add_flow("gas", "boiler", Flow::new())?;
        es.add_flow("boiler", "heat", Flow::new().with_nominal_capacity(10.0))?;
        es.add_flow(
            "heat",
            "demand",
            Flow::new()
                .with_nominal_capacity(1.0)
                .with_fix([5.0, 7.0, 2.0, 0.0]),
        )?;
        let (model, results) = solve(&es, ModelConfig::default())?;

        assert_close(results.objective(), 14.0 / 0.9 * 0.1);
        assert_seq_close(
            &results.flow("gas", "boiler")?.sequences["flow"],
            &[5.0 / 0.9, 7.0 / 0.9, 2.0 / 0.9, 0.0],
        );
        assert!(model.constraint("conversion(boiler,heat,3)").is_some());
        Ok(())
    }

    #[test]
    fn test_chp() -> Result<(), Error> {
        let mut es = EnergySystem::new(hourly_axis(2));
        es.add_node(Source::new("gas"))?;
        es.add_node(
            Converter::new("chp")
                .with_conversion_factor("el", 0.3)
                .with_conversion_factor("heat", 0.5),
        )?;
        es.add_node(Bus::new("el"))?;
        es.add_node(Bus::new("heat"))?;
        es.add_node(Sink::new("el_demand"))?;
        es.add_node(Sink::new("heat_demand"))?;
        es.add_node(Sink::new("heat_excess"))?;
        es.add_flow("gas", "chp", Flow::new().with_variable_costs(1.0))?;
        es.add_flow("chp", "el", Flow::new())?;
        es.add_flow("chp", "heat", Flow::new())?;
        es.add_flow(
            "el",
            "el_demand",
            Flow::new().with_nominal_capacity(1.0).with_fix([3.0, 6.0]),
        )?;
        es.add_flow(
            "heat",
            "heat_demand",
            Flow::new().with_nominal_capacity(1.0).with_fix([5.0, 5.0]),
        )?;
        es.add_flow("heat", "heat_excess", Flow::new())?;
        let (_, results) = solve(&es, ModelConfig::default())?;

        assert_seq_close(&results.flow("gas", "chp")?.sequences["flow"], &[10.0, 20.0]);
        assert_seq_close(&results.flow("chp", "heat")?.sequences["flow"], &[5.0, 10.0]);
        assert_seq_close(
            &results.flow("heat", "heat_excess")?.sequences["flow"],
            &[0.0, 5.0],
        );
        assert_close(results.objective(), 30.0);
        Ok(())
    }

    #[test]
    fn test_multiple_inputs() -> Result<(), Error> {
        let mut es = EnergySystem::new(hourly_axis(1));
        es.add_node(Source::new("gas"))?;
        es.add_node(Source::new("h2"))?;
        es.add_node(
            Converter::new("turbine")
                .with_reference_input("gas")
                .with_conversion_factor("h2", 0.5)
                .with_conversion_factor("el", 0.4),
        )?;
        es.add_node(Bus::new("el"))?;
        es.add_node(Sink::new("demand"))?;
        es.add_flow("h2", "turbine", Flow::new().with_variable_costs(3.0))?;
        es.add_flow("gas", "turbine", Flow::new().with_variable_costs(1.0))?;
        es.add_flow("turbine", "el", Flow::new())?;
        es.add_flow(
            "el",
            "demand",
            Flow::new().with_nominal_capacity(1.0).with_fix([4.0]),
        )?;
        let (model, results) = solve(&es, ModelConfig::default())?;

        assert_seq_close(&results.flow("gas", "turbine")?.sequences["flow"], &[10.0]);
        assert_seq_close(&results.flow("h2", "turbine")?.sequences["flow"], &[5.0]);
        assert_close(results.objective(), 25.0);
        assert!(model.constraint("conversion(h2,turbine,0)").is_some());
        assert!(model.constraint("conversion(gas,turbine,0)").is_none());
        Ok(())
    }
}
