// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! On/off behaviour of flows with a [`NonConvex`][crate::NonConvex].
//!
//! Every nonconvex flow gets a binary `status(t)`.  With a fixed nominal
//! capacity `N` the flow is bounded by
//!
//! ```text
//! N * min(t) * status(t) <= flow(t) <= N * max(t) * status(t)
//! ```
//!
//! With an investment, the product of status and capacity is linearised into
//! `status_nominal(t)` with a big-M of `existing + sum of the maxima`.
//!
//! Startups and shutdowns count changes of the status, with
//! `initial_status` acting as the status before the first step.  Minimum up
//! and down times are truncated to the steps left in the horizon.

use crate::lp::{Domain, LinearExpr, Sense, VarId};
use crate::{Error, NonConvex, ResultKey};

use super::builder::ModelBuilder;
use super::{Capacity, FlowEntry};

impl ModelBuilder<'_> {
    pub(super) fn add_nonconvex_flows(&mut self) -> Result<(), Error> {
        let mut flows = std::mem::take(&mut self.flows);
        let result = flows
            .iter_mut()
            .filter(|entry| entry.flow.nonconvex.is_some())
            .try_for_each(|entry| self.add_nonconvex_flow(entry));
        self.flows = flows;
        result?;

        tracing::debug!("Added nonconvex flows.");
        Ok(())
    }

    fn add_nonconvex_flow(&mut self, entry: &mut FlowEntry) -> Result<(), Error> {
        let Some(nonconvex) = entry.flow.nonconvex.clone() else {
            return Ok(());
        };
        let name = format!("{},{}", entry.source, entry.target);
        let key = ResultKey::flow(&entry.source, &entry.target);

        let mut status = Vec::with_capacity(self.steps());
        for t in 0..self.steps() {
            status.push(self.lp.add_variable(
                format!("status({name},{t})"),
                0.0,
                1.0,
                Domain::Binary,
            )?);
        }
        self.registry.add_sequence(&key, "status", status.clone());

        self.add_status_bounds(entry, &name, &key, &status)?;
        self.add_status_changes(&nonconvex, &name, &key, &status)?;
        self.add_minimum_times(&nonconvex, &name, &status)?;
        self.add_nonconvex_gradients(entry, &nonconvex, &name, &status)?;

        let mut costs = LinearExpr::new();
        for t in 0..self.steps() {
            let factor = self.objective_weight(t) * self.discount(self.axis.period(t));
            if let Some(activity) = &nonconvex.activity_costs {
                costs.add_term(status[t], activity.get(t) * factor);
            }
            if let Some(inactivity) = &nonconvex.inactivity_costs {
                costs.add_constant(inactivity.get(t) * factor);
                costs.add_term(status[t], -inactivity.get(t) * factor);
            }
        }
        self.add_cost("nonconvex_costs", costs);

        entry.status = Some(status);
        Ok(())
    }

    /// Links the flow to its status and capacity.
    fn add_status_bounds(
        &mut self,
        entry: &FlowEntry,
        name: &str,
        key: &ResultKey,
        status: &[VarId],
    ) -> Result<(), Error> {
        let axis = self.axis;
        let flow = &entry.flow;
        match &entry.capacity {
            Capacity::Fixed(nominal) => {
                for (t, (var, on)) in entry.vars.iter().zip(status).enumerate() {
                    self.lp.add_constraint(
                        format!("max({name},{t})"),
                        LinearExpr::from(*var) - LinearExpr::term(*on, nominal * flow.max.get(t)),
                        Sense::Le,
                        0.0,
                    )?;
                    self.lp.add_constraint(
                        format!("min({name},{t})"),
                        LinearExpr::from(*var) - LinearExpr::term(*on, nominal * flow.min.get(t)),
                        Sense::Ge,
                        0.0,
                    )?;
                }
            }
            Capacity::Invest(vars) => {
                let Some(investment) = &flow.investment else {
                    return Err(Error::internal(format!(
                        "Flow:({name}) has investment variables but no investment."
                    )));
                };
                let big_m = investment.existing
                    + (0..axis.periods().len())
                        .map(|p| investment.maximum.get(p))
                        .sum::<f64>();

                let mut status_nominal = Vec::with_capacity(self.steps());
                for (t, (var, on)) in entry.vars.iter().zip(status).enumerate() {
                    let total = vars.total[axis.period(t)];
                    let linked = self.lp.add_variable(
                        format!("status_nominal({name},{t})"),
                        0.0,
                        big_m,
                        Domain::Continuous,
                    )?;
                    self.lp.add_constraint(
                        format!("status_nominal_upper({name},{t})"),
                        LinearExpr::from(linked) - LinearExpr::term(*on, big_m),
                        Sense::Le,
                        0.0,
                    )?;
                    self.lp.add_constraint(
                        format!("status_nominal_capacity({name},{t})"),
                        LinearExpr::from(linked) - LinearExpr::from(total),
                        Sense::Le,
                        0.0,
                    )?;
                    self.lp.add_constraint(
                        format!("status_nominal_lower({name},{t})"),
                        LinearExpr::from(total) - LinearExpr::from(linked)
                            + LinearExpr::term(*on, big_m),
                        Sense::Le,
                        big_m,
                    )?;
                    self.lp.add_constraint(
                        format!("max({name},{t})"),
                        LinearExpr::from(*var) - LinearExpr::term(linked, flow.max.get(t)),
                        Sense::Le,
                        0.0,
                    )?;
                    self.lp.add_constraint(
                        format!("min({name},{t})"),
                        LinearExpr::from(*var) - LinearExpr::term(linked, flow.min.get(t)),
                        Sense::Ge,
                        0.0,
                    )?;
                    status_nominal.push(linked);
                }
                self.registry.add_sequence(key, "status_nominal", status_nominal);
            }
            Capacity::Unknown => {
                return Err(Error::unresolved_capacity(format!(
                    "Flow:({name}) is NonConvex but has no nominal_capacity or investment."
                )));
            }
        }
        Ok(())
    }

    /// Startup and shutdown variables, their limits and costs.
    fn add_status_changes(
        &mut self,
        nonconvex: &NonConvex,
        name: &str,
        key: &ResultKey,
        status: &[VarId],
    ) -> Result<(), Error> {
        let initial = if nonconvex.initial_status { 1.0 } else { 0.0 };

        for (kind, needed, costs, maximum) in [
            (
                "startup",
                nonconvex.needs_startup(),
                &nonconvex.startup_costs,
                nonconvex.maximum_startups,
            ),
            (
                "shutdown",
                nonconvex.needs_shutdown(),
                &nonconvex.shutdown_costs,
                nonconvex.maximum_shutdowns,
            ),
        ] {
            if !needed {
                continue;
            }
            // A startup is a step up of the status, a shutdown a step down.
            let sign = if kind == "startup" { 1.0 } else { -1.0 };

            let mut changes = Vec::with_capacity(self.steps());
            for t in 0..self.steps() {
                let var = self.lp.add_variable(
                    format!("{kind}({name},{t})"),
                    0.0,
                    1.0,
                    Domain::Binary,
                )?;
                let mut expr = LinearExpr::from(var) - LinearExpr::term(status[t], sign);
                let rhs = match t {
                    0 => -sign * initial,
                    _ => {
                        expr.add_term(status[t - 1], sign);
                        0.0
                    }
                };
                self.lp
                    .add_constraint(format!("{kind}({name},{t})"), expr, Sense::Ge, rhs)?;
                changes.push(var);
            }

            if let Some(maximum) = maximum {
                let expr = changes.iter().map(|v| LinearExpr::from(*v)).sum();
                self.lp
                    .add_constraint(format!("max_{kind}s({name})"), expr, Sense::Le, maximum)?;
            }
            if let Some(costs) = costs {
                let mut expr = LinearExpr::new();
                for (t, var) in changes.iter().enumerate() {
                    expr.add_term(*var, costs.get(t) * self.discount(self.axis.period(t)));
                }
                self.add_cost("nonconvex_costs", expr);
            }
            self.registry.add_sequence(key, kind, changes);
        }
        Ok(())
    }

    /// Minimum up and down times.
    ///
    /// With `U(t) = min(uptime, steps - t)`, a startup at `t` requires the
    /// status to stay on for `U(t)` steps:
    ///
    /// ```text
    /// U(t) * (status(t) - status(t-1)) <= sum(status(t..t+U(t)))
    /// ```
    ///
    /// and symmetrically for shutdowns.
    fn add_minimum_times(
        &mut self,
        nonconvex: &NonConvex,
        name: &str,
        status: &[VarId],
    ) -> Result<(), Error> {
        let steps = self.steps();
        let initial = if nonconvex.initial_status { 1.0 } else { 0.0 };

        for (kind, minimum) in [
            ("min_uptime", nonconvex.minimum_uptime),
            ("min_downtime", nonconvex.minimum_downtime),
        ] {
            if minimum <= 1 {
                continue;
            }
            let up = kind == "min_uptime";
            for t in 0..steps {
                let span = minimum.min(steps - t) as f64;
                let mut expr = LinearExpr::new();
                let mut rhs = 0.0;

                // Uptime:   span * status(t) - span * prev - window <= 0
                // Downtime: span * prev - span * status(t) + window <= span
                let sign = if up { 1.0 } else { -1.0 };
                expr.add_term(status[t], sign * span);
                match t {
                    0 => rhs += sign * span * initial,
                    _ => expr.add_term(status[t - 1], -sign * span),
                }
                for var in &status[t..t + span as usize] {
                    expr.add_term(*var, -sign);
                }
                if !up {
                    rhs += span;
                }

                self.lp
                    .add_constraint(format!("{kind}({name},{t})"), expr, Sense::Le, rhs)?;
            }
        }
        Ok(())
    }

    /// Gradient limits that only apply while the flow stays active.
    ///
    /// ```text
    /// flow(t) - flow(t-1) <= limit(t) * N + N * max(t) * (1 - status(t-1))
    /// flow(t-1) - flow(t) <= limit(t) * N + N * max(t-1) * (1 - status(t))
    /// ```
    fn add_nonconvex_gradients(
        &mut self,
        entry: &FlowEntry,
        nonconvex: &NonConvex,
        name: &str,
        status: &[VarId],
    ) -> Result<(), Error> {
        if nonconvex.positive_gradient_limit.is_none() && nonconvex.negative_gradient_limit.is_none()
        {
            return Ok(());
        }
        let Capacity::Fixed(nominal) = entry.capacity else {
            return Err(Error::unresolved_capacity(format!(
                "Flow:({name}) has a NonConvex gradient limit but no fixed nominal_capacity."
            )));
        };
        let flow = &entry.flow;

        for t in 1..self.steps() {
            let (current, previous) = (entry.vars[t], entry.vars[t - 1]);
            if let Some(limit) = &nonconvex.positive_gradient_limit {
                let big_m = nominal * flow.max.get(t);
                let expr = LinearExpr::from(current) - LinearExpr::from(previous)
                    + LinearExpr::term(status[t - 1], big_m);
                self.lp.add_constraint(
                    format!("positive_gradient({name},{t})"),
                    expr,
                    Sense::Le,
                    limit.get(t) * nominal + big_m,
                )?;
            }
            if let Some(limit) = &nonconvex.negative_gradient_limit {
                let big_m = nominal * flow.max.get(t - 1);
                let expr = LinearExpr::from(previous) - LinearExpr::from(current)
                    + LinearExpr::term(status[t], big_m);
                self.lp.add_constraint(
                    format!("negative_gradient({name},{t})"),
                    expr,
                    Sense::Le,
                    limit.get(t) * nominal + big_m,
                )?;
            }
        }
        Ok(())
    }
}
