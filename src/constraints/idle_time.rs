// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! A minimum idle time between two nonconvex flows.

use crate::lp::{LinearExpr, Sense};
use crate::{Error, Model};

use super::status_vars;

/// Keeps `flow2` inactive for `n` steps after `flow1` was active.
///
/// `flow2` can only be active at step `t` if `flow1` was inactive in all
/// steps from `t - n` to `t`.  The product of the statuses is linearised as
/// `status2(t) + status1(s) <= 1` for each of these steps `s`, named
/// `<name>(t,s)`.
///
/// Both flows have to be nonconvex, and `n` has to be shorter than the
/// time axis.
pub fn set_idle_time(
    model: &mut Model,
    flow1: (&str, &str),
    flow2: (&str, &str),
    n: usize,
    name: &str,
) -> Result<(), Error> {
    let steps = model.time_axis().steps();
    if n >= steps {
        return Err(Error::configuration(format!(
            "{name}: the idle time of {n} steps is not shorter than the time axis of {steps} steps."
        )));
    }
    let status1 = status_vars(model, flow1)?;
    let status2 = status_vars(model, flow2)?;

    for t in 0..steps {
        for s in t.saturating_sub(n)..=t {
            let mut expr = LinearExpr::term(status2[t], 1.0);
            expr.add_term(status1[s], 1.0);
            model
                .lp_mut()
                .add_constraint(format!("{name}({t},{s})"), expr, Sense::Le, 1.0)?;
        }
    }

    tracing::debug!(
        "Added an idle time of {n} steps from Flow:({}, {}) to Flow:({}, {}).",
        flow1.0,
        flow1.1,
        flow2.0,
        flow2.1
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{assert_close, assert_seq_close, hourly_axis, solve_model};
    use crate::{Bus, EnergySystem, Flow, ModelConfig, NonConvex, Sink, Source};

    fn system() -> Result<EnergySystem, Error> {
        let nonconvex = |costs: Vec<f64>| {
            Flow::new()
                .with_nominal_capacity(1.0)
                .with_min(0.2)
                .with_variable_costs(costs)
                .with_nonconvex(NonConvex::new())
        };
        let mut es = EnergySystem::new(hourly_axis(8));
        es.add_node(Source::new("chp"))?;
        es.add_node(Source::new("grid"))?;
        es.add_node(Bus::new("el"))?;
        es.add_node(Sink::new("excess"))?;
        es.add_node(Sink::new("pump"))?;
        es.add_flow(
            "chp",
            "el",
            nonconvex(vec![-10.0, -10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0]),
        )?;
        es.add_flow("grid", "el", Flow::new())?;
        es.add_flow("el", "excess", Flow::new())?;
        es.add_flow("el", "pump", nonconvex(vec![-1.0; 8]))?;
        es.freeze()?;
        Ok(es)
    }

    #[test]
    fn test_idle_time() -> Result<(), Error> {
        let es = system()?;
        let mut model = Model::new(&es, ModelConfig::default())?;
        set_idle_time(&mut model, ("chp", "el"), ("el", "pump"), 3, "idle")?;
        assert!(model.constraint("idle(4,1)").is_some());
        assert!(model.constraint("idle(4,0)").is_none());

        let results = solve_model(&mut model)?;
        assert_seq_close(
            &results.flow("chp", "el")?.sequences["status"],
            &[1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        );
        assert_seq_close(
            &results.flow("el", "pump")?.sequences["status"],
            &[0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
        );
        assert_close(results.objective(), -23.0);
        Ok(())
    }

    #[test]
    fn test_idle_time_errors() -> Result<(), Error> {
        let es = system()?;
        let mut model = Model::new(&es, ModelConfig::default())?;
        assert!(
            set_idle_time(&mut model, ("chp", "el"), ("el", "pump"), 8, "idle").is_err_and(|e| e
                == Error::configuration(
                    "idle: the idle time of 8 steps is not shorter than the time axis of 8 steps."
                ))
        );
        assert!(
            set_idle_time(&mut model, ("grid", "el"), ("el", "pump"), 3, "idle")
                .is_err_and(|e| e == Error::configuration("Flow:(grid, el) is not nonconvex."))
        );
        Ok(())
    }
}
