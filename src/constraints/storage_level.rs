// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Access to a storage that depends on its level.
//!
//! A storage has exactly one input and one output flow.  To give it several
//! inputs and outputs, it is connected to a multiplexer bus, and each input
//! and output of the multiplexer bus gets a level:
//!
//! - an output can only be served while the content after the step is at
//!   least at its level, and
//! - an input can only charge while the content before the step is at most at
//!   its level.
//!
//! Both conditions are modelled with one binary variable per flow and step.

use crate::lp::{Domain, LinearExpr, Sense, VarId};
use crate::model::Capacity;
use crate::{Error, Model, ResultKey};

/// Gates the flows of `multiplexer` by the relative content of `storage`.
///
/// `input_levels` are `(source, level)` pairs for the flows from `source`
/// into the multiplexer bus, `output_levels` are `(target, level)` pairs for
/// the flows from the multiplexer bus to `target`.  The storage and all
/// these flows need a fixed nominal capacity.
///
/// The binary variables are reported as the `active_output(<target>)` and
/// `inactive_input(<source>)` sequences of the node result `name`.
pub fn storage_level_constraint(
    model: &mut Model,
    name: &str,
    storage: &str,
    multiplexer: &str,
    input_levels: &[(&str, f64)],
    output_levels: &[(&str, f64)],
) -> Result<(), Error> {
    let entry = model.storage_entry(storage)?;
    let capacity = match entry.capacity {
        Capacity::Fixed(capacity) if capacity > 0.0 => capacity,
        _ => {
            return Err(Error::configuration(format!(
                "{name}: Storage:{storage} needs a fixed, positive nominal_capacity."
            )))
        }
    };
    let axis = model.time_axis();
    let steps = axis.steps();
    let before: Vec<VarId> = (0..steps).map(|t| entry.content_before(axis, t)).collect();
    let after: Vec<VarId> = (0..steps).map(|t| entry.content_after(axis, t)).collect();

    let key = ResultKey::node(name);

    for (target, level) in output_levels {
        let (flow, nominal) = fixed_flow(model, name, multiplexer, target)?;
        let mut active = Vec::with_capacity(steps);
        for t in 0..steps {
            let lp = model.lp_mut();
            let var = lp.add_variable(
                format!("{name}_active_output({target},{t})"),
                0.0,
                1.0,
                Domain::Binary,
            )?;

            let mut expr = LinearExpr::term(after[t], 1.0 / capacity);
            expr.add_term(var, -level);
            lp.add_constraint(
                format!("{name}_output_active_constraint({target},{t})"),
                expr,
                Sense::Ge,
                0.0,
            )?;

            let mut expr = LinearExpr::term(flow[t], 1.0 / nominal);
            expr.add_term(var, -1.0);
            lp.add_constraint(
                format!("{name}_output_constraint({target},{t})"),
                expr,
                Sense::Le,
                0.0,
            )?;
            active.push(var);
        }
        model
            .registry_mut()
            .add_sequence(&key, &format!("active_output({target})"), active);
    }

    for (source, level) in input_levels {
        let (flow, nominal) = fixed_flow(model, name, source, multiplexer)?;
        let mut inactive = Vec::with_capacity(steps);
        for t in 0..steps {
            let lp = model.lp_mut();
            let var = lp.add_variable(
                format!("{name}_inactive_input({source},{t})"),
                0.0,
                1.0,
                Domain::Binary,
            )?;

            let mut expr = LinearExpr::term(before[t], 1.0 / capacity);
            expr.add_term(var, -1.0);
            lp.add_constraint(
                format!("{name}_input_active_constraint({source},{t})"),
                expr,
                Sense::Le,
                *level,
            )?;

            let mut expr = LinearExpr::term(flow[t], 1.0 / nominal);
            expr.add_term(var, 1.0);
            lp.add_constraint(
                format!("{name}_input_constraint({source},{t})"),
                expr,
                Sense::Le,
                1.0,
            )?;
            inactive.push(var);
        }
        model
            .registry_mut()
            .add_sequence(&key, &format!("inactive_input({source})"), inactive);
    }

    tracing::debug!(
        "Added level dependent access to Storage:{storage} for {} input(s) and {} output(s).",
        input_levels.len(),
        output_levels.len()
    );
    Ok(())
}

/// The variables and the nominal capacity of a flow with a fixed capacity.
fn fixed_flow(
    model: &Model,
    name: &str,
    source: &str,
    target: &str,
) -> Result<(Vec<VarId>, f64), Error> {
    let entry = model.flow_entry(source, target)?;
    match entry.capacity {
        Capacity::Fixed(nominal) if nominal > 0.0 => Ok((entry.vars.clone(), nominal)),
        _ => Err(Error::configuration(format!(
            "{name}: Flow:({source}, {target}) needs a fixed nominal_capacity."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{assert_close, assert_seq_close, hourly_axis, solve, solve_model};
    use crate::{Bus, EnergySystem, Flow, ModelConfig, Sink, Source, Storage};

    fn system() -> Result<EnergySystem, Error> {
        let mut es = EnergySystem::new(hourly_axis(3));
        es.add_node(Source::new("cheap"))?;
        es.add_node(Bus::new("mux"))?;
        es.add_node(
            Storage::new("battery")
                .with_nominal_capacity(10.0)
                .with_initial_level(0.5)
                .with_balanced(false),
        )?;
        es.add_node(Sink::new("high"))?;
        es.add_flow(
            "cheap",
            "mux",
            Flow::new().with_nominal_capacity(1.0).with_variable_costs(0.5),
        )?;
        es.add_flow("mux", "battery", Flow::new())?;
        es.add_flow("battery", "mux", Flow::new())?;
        es.add_flow(
            "mux",
            "high",
            Flow::new().with_nominal_capacity(1.0).with_variable_costs(-1.0),
        )?;
        es.freeze()?;
        Ok(es)
    }

    #[test]
    fn test_storage_level_constraint() -> Result<(), Error> {
        let es = system()?;
        let (_, results) = solve(&es, ModelConfig::default())?;
        assert_close(results.objective(), -3.0);

        let mut model = Model::new(&es, ModelConfig::default())?;
        storage_level_constraint(
            &mut model,
            "multiplexer",
            "battery",
            "mux",
            &[("cheap", 0.45)],
            &[("high", 0.4)],
        )?;
        assert!(model
            .constraint("multiplexer_output_active_constraint(high,2)")
            .is_some());

        let results = solve_model(&mut model)?;
        assert_seq_close(
            &results.node("battery")?.sequences["storage_content"],
            &[5.0, 4.0, 4.0, 4.0],
        );
        assert_seq_close(&results.flow("cheap", "mux")?.sequences["flow"], &[0.0, 1.0, 1.0]);
        assert_seq_close(&results.flow("mux", "high")?.sequences["flow"], &[1.0, 1.0, 1.0]);
        assert_seq_close(
            &results.node("multiplexer")?.sequences["inactive_input(cheap)"][..1],
            &[1.0],
        );
        assert_close(results.objective(), -2.0);
        Ok(())
    }

    #[test]
    fn test_storage_level_constraint_errors() -> Result<(), Error> {
        let es = system()?;
        let mut model = Model::new(&es, ModelConfig::default())?;
        assert!(
            storage_level_constraint(&mut model, "mux", "tank", "mux", &[], &[])
                .is_err_and(|e| e == Error::node_not_found("Storage with label tank not found."))
        );
        assert!(storage_level_constraint(
            &mut model,
            "multiplexer",
            "battery",
            "mux",
            &[],
            &[("battery", 0.4)]
        )
        .is_err_and(|e| e
            == Error::configuration(
                "multiplexer: Flow:(mux, battery) needs a fixed nominal_capacity."
            )));
        Ok(())
    }
}
