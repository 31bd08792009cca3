// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Constraints that keep flows or variables in a fixed ratio.

use crate::lp::{LinearExpr, Sense, VarId};
use crate::{Error, Model};

/// Forces `factor * sum(flows1) == sum(flows2)` at every step.
///
/// The constraints are named `<name>(t)`.
pub fn equate_flows(
    model: &mut Model,
    name: &str,
    flows1: &[(&str, &str)],
    flows2: &[(&str, &str)],
    factor: f64,
) -> Result<(), Error> {
    let vars1 = flows1
        .iter()
        .map(|(source, target)| model.flow_entry(source, target).map(|f| f.vars.clone()))
        .collect::<Result<Vec<_>, Error>>()?;
    let vars2 = flows2
        .iter()
        .map(|(source, target)| model.flow_entry(source, target).map(|f| f.vars.clone()))
        .collect::<Result<Vec<_>, Error>>()?;

    for t in 0..model.time_axis().steps() {
        let mut expr = LinearExpr::new();
        for vars in &vars1 {
            expr.add_term(vars[t], factor);
        }
        for vars in &vars2 {
            expr.add_term(vars[t], -1.0);
        }
        model
            .lp_mut()
            .add_constraint(format!("{name}({t})"), expr, Sense::Eq, 0.0)?;
    }

    tracing::debug!(
        "Equated {} flow(s) with {} flow(s) in {name}.",
        flows1.len(),
        flows2.len()
    );
    Ok(())
}

/// Like [`equate_flows`], for the flows that carry the custom attribute
/// `keyword1` on one side and `keyword2` on the other.
pub fn equate_flows_by_keyword(
    model: &mut Model,
    name: &str,
    keyword1: &str,
    keyword2: &str,
    factor: f64,
) -> Result<(), Error> {
    let select = |keyword: &str| -> Vec<(String, String)> {
        model
            .flows()
            .iter()
            .filter(|f| f.flow.custom_attributes.contains_key(keyword))
            .map(|f| (f.source.clone(), f.target.clone()))
            .collect()
    };
    let flows1 = select(keyword1);
    let flows2 = select(keyword2);
    if flows1.is_empty() || flows2.is_empty() {
        return Err(Error::configuration(format!(
            "No flows with the attribute {} to equate.",
            if flows1.is_empty() { keyword1 } else { keyword2 }
        )));
    }

    fn as_refs(flows: &[(String, String)]) -> Vec<(&str, &str)> {
        flows.iter().map(|(s, t)| (s.as_str(), t.as_str())).collect()
    }
    let (refs1, refs2) = (as_refs(&flows1), as_refs(&flows2));
    equate_flows(model, name, &refs1, &refs2, factor)
}

/// Forces `factor * var1 == var2`, for example to couple the investments of
/// the two directions of a line.
pub fn equate_variables(
    model: &mut Model,
    name: &str,
    var1: VarId,
    var2: VarId,
    factor: f64,
) -> Result<(), Error> {
    let variables = model.lp().variables().len();
    if var1.index() >= variables || var2.index() >= variables {
        return Err(Error::configuration(format!(
            "{name}: the variables don't belong to this model."
        )));
    }
    let mut expr = LinearExpr::term(var1, factor);
    expr.add_term(var2, -1.0);
    model.lp_mut().add_constraint(name, expr, Sense::Eq, 0.0)?;
    Ok(())
}
