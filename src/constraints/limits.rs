// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Global limits across several flows.

use crate::lp::{Domain, LinearExpr, Sense, VarId};
use crate::model::Capacity;
use crate::{Error, Model, ResultKey};

use super::status_vars;

/// Limits the flows weighted by their custom attribute `keyword` to `limit`:
///
/// ```text
/// sum(flow(t) * keyword(t) * weight(t)) <= limit
/// ```
///
/// Without `flows`, all flows with the attribute are included.  The total
/// is reported as the `integral_limit` scalar of the node result `keyword`.
pub fn generic_integral_limit(
    model: &mut Model,
    keyword: &str,
    flows: Option<&[(&str, &str)]>,
    limit: f64,
) -> Result<(), Error> {
    let selected: Vec<(String, String)> = match flows {
        Some(flows) => flows
            .iter()
            .map(|(source, target)| {
                let entry = model.flow_entry(source, target)?;
                if !entry.flow.custom_attributes.contains_key(keyword) {
                    return Err(Error::configuration(format!(
                        "Flow:({source}, {target}) has no attribute {keyword}."
                    )));
                }
                Ok((source.to_string(), target.to_string()))
            })
            .collect::<Result<_, Error>>()?,
        None => model
            .flows()
            .iter()
            .filter(|f| f.flow.custom_attributes.contains_key(keyword))
            .map(|f| (f.source.clone(), f.target.clone()))
            .collect(),
    };
    if selected.is_empty() {
        return Err(Error::configuration(format!(
            "No flows with the attribute {keyword}."
        )));
    }

    let mut expr = LinearExpr::new();
    for (source, target) in &selected {
        let entry = model.flow_entry(source, target)?;
        let Some(factors) = entry.flow.custom_attributes.get(keyword) else {
            continue;
        };
        for (t, var) in entry.vars.iter().enumerate() {
            expr.add_term(*var, factors.get(t) * model.time_axis().weight(t));
        }
    }

    let name = format!("integral_limit_{keyword}");
    let total = model
        .lp_mut()
        .add_variable(&name, f64::NEG_INFINITY, limit, Domain::Continuous)?;
    expr.add_term(total, -1.0);
    model
        .lp_mut()
        .add_constraint(format!("{name}_constraint"), expr, Sense::Eq, 0.0)?;
    model
        .registry_mut()
        .add_scalar(&ResultKey::node(keyword), "integral_limit", total);

    tracing::debug!(
        "Limited {keyword} of {} flow(s) to {limit}.",
        selected.len()
    );
    Ok(())
}

/// [`generic_integral_limit`] for the `emission_factor` attribute.
pub fn emission_limit(
    model: &mut Model,
    flows: Option<&[(&str, &str)]>,
    limit: f64,
) -> Result<(), Error> {
    generic_integral_limit(model, "emission_factor", flows, limit)
}

/// Limits the number of concurrently active nonconvex `flows` to
/// `[lower, upper]` at every step.
///
/// The counts are reported as the `count` sequence of the node result
/// `name`.
pub fn limit_active_flow_count(
    model: &mut Model,
    name: &str,
    flows: &[(&str, &str)],
    lower: usize,
    upper: Option<usize>,
) -> Result<(), Error> {
    if upper.is_some_and(|upper| upper < lower) {
        return Err(Error::configuration(format!(
            "{name}: the lower limit {lower} exceeds the upper limit."
        )));
    }
    let statuses = flows
        .iter()
        .map(|flow| status_vars(model, *flow))
        .collect::<Result<Vec<_>, Error>>()?;

    let upper = upper.map_or(f64::INFINITY, |u| u as f64);
    let mut counts: Vec<VarId> = vec![];
    for t in 0..model.time_axis().steps() {
        let count = model.lp_mut().add_variable(
            format!("{name}_count({t})"),
            lower as f64,
            upper,
            Domain::Continuous,
        )?;
        let mut expr = LinearExpr::term(count, -1.0);
        for status in &statuses {
            expr.add_term(status[t], 1.0);
        }
        model
            .lp_mut()
            .add_constraint(format!("{name}_constraint({t})"), expr, Sense::Eq, 0.0)?;
        counts.push(count);
    }
    model
        .registry_mut()
        .add_sequence(&ResultKey::node(name), "count", counts);
    Ok(())
}

/// [`limit_active_flow_count`] for all nonconvex flows with the custom
/// attribute `keyword`.  The counts are reported under `keyword`.
pub fn limit_active_flow_count_by_keyword(
    model: &mut Model,
    keyword: &str,
    lower: usize,
    upper: Option<usize>,
) -> Result<(), Error> {
    let flows: Vec<(String, String)> = model
        .flows()
        .iter()
        .filter(|f| f.status.is_some() && f.flow.custom_attributes.contains_key(keyword))
        .map(|f| (f.source.clone(), f.target.clone()))
        .collect();
    if flows.is_empty() {
        return Err(Error::configuration(format!(
            "No nonconvex flows with the attribute {keyword}."
        )));
    }
    let flows: Vec<(&str, &str)> = flows
        .iter()
        .map(|(s, t)| (s.as_str(), t.as_str()))
        .collect();
    limit_active_flow_count(model, keyword, &flows, lower, upper)
}

/// Limits the total investment costs of flows and storages to `limit`.
pub fn investment_limit(model: &mut Model, limit: f64) -> Result<(), Error> {
    let costs = model.investment_costs().clone();
    if costs.is_empty() {
        return Err(Error::configuration(
            "The model has no investment costs to limit.",
        ));
    }
    model
        .lp_mut()
        .add_constraint("investment_limit", costs, Sense::Le, limit)?;
    Ok(())
}

/// Limits the invested capacity of flows, weighted by the custom attribute
/// `keyword` of their [`Investment`][crate::Investment], to `limit`:
///
/// ```text
/// sum(invest(p) * keyword) <= limit
/// ```
///
/// Investments in storage capacity are not included.  The total is reported
/// as the `invest_limit` scalar of the node result `keyword`.
pub fn additional_investment_flow_limit(
    model: &mut Model,
    keyword: &str,
    limit: f64,
) -> Result<(), Error> {
    let mut expr = LinearExpr::new();
    let mut count = 0;
    for entry in model.flows() {
        let (Capacity::Invest(vars), Some(investment)) = (&entry.capacity, &entry.flow.investment)
        else {
            continue;
        };
        let Some(weight) = investment.custom_attributes.get(keyword) else {
            continue;
        };
        for var in &vars.invest {
            expr.add_term(*var, *weight);
        }
        count += 1;
    }
    if count == 0 {
        return Err(Error::configuration(format!(
            "No investment flows with the attribute {keyword}."
        )));
    }

    let name = format!("invest_limit_{keyword}");
    let total = model
        .lp_mut()
        .add_variable(&name, f64::NEG_INFINITY, limit, Domain::Continuous)?;
    expr.add_term(total, -1.0);
    model
        .lp_mut()
        .add_constraint(format!("{name}_constraint"), expr, Sense::Eq, 0.0)?;
    model
        .registry_mut()
        .add_scalar(&ResultKey::node(keyword), "invest_limit", total);

    tracing::debug!("Limited {keyword} of {count} investment flow(s) to {limit}.");
    Ok(())
}

/// Keeps the weighted sum of `quantities` within `[lower, upper]` at every
/// step.
///
/// Each quantity is a variable per step with its weight, e.g. the contents
/// of storages that share one physical tank:
///
/// ```ignore
/// let quantities = [
///     (model.storage_content("party_1")?, 1.0),
///     (model.storage_content("party_2")?, 1.0),
/// ];
/// constraints::shared_limit(&mut model, "tank", &quantities, 0.0, Some(5.0))?;
/// ```
///
/// The weighted sums are reported as the `shared_limit` sequence of the node
/// result `name`.
pub fn shared_limit(
    model: &mut Model,
    name: &str,
    quantities: &[(Vec<VarId>, f64)],
    lower: f64,
    upper: Option<f64>,
) -> Result<(), Error> {
    let steps = model.time_axis().steps();
    if let Some((vars, _)) = quantities.iter().find(|(vars, _)| vars.len() != steps) {
        return Err(Error::invalid_length(format!(
            "{name}: a quantity has {} variables for {steps} steps.",
            vars.len()
        )));
    }
    let upper = upper.unwrap_or(f64::INFINITY);
    if upper < lower {
        return Err(Error::configuration(format!(
            "{name}: the lower limit {lower} exceeds the upper limit {upper}."
        )));
    }

    let mut sums = Vec::with_capacity(steps);
    for t in 0..steps {
        let lp = model.lp_mut();
        let sum = lp.add_variable(format!("{name}({t})"), lower, upper, Domain::Continuous)?;
        let mut expr = LinearExpr::term(sum, -1.0);
        for (vars, weight) in quantities {
            expr.add_term(vars[t], *weight);
        }
        lp.add_constraint(format!("{name}_constraint({t})"), expr, Sense::Eq, 0.0)?;
        sums.push(sum);
    }
    model
        .registry_mut()
        .add_sequence(&ResultKey::node(name), "shared_limit", sums);
    Ok(())
}
