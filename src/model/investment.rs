// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Capacity investments, shared by flows and storages.
//!
//! Every period `p` gets an `invest(p)` variable for newly installed capacity
//! and a `total(p)` variable for the capacity available in that period:
//!
//! ```text
//! total(p) = total(p-1) + invest(p) - old(p),    total(-1) = existing
//! ```
//!
//! In multi-period models, `old(p)` is the capacity that reaches the end of
//! its lifetime in period `p`: investments of earlier periods, and the
//! existing capacity once its remaining lifetime has passed.  Single-period
//! models have no retirement, so `total = invest + existing`.
//!
//! Costs are `ep_costs * invest` in single-period models.  In multi-period
//! models, `ep_costs` are annualised over the lifetime, and only the annuities
//! falling within the horizon are counted, discounted to its start.

use crate::economics::{annuity, discount_factor, present_value_factor};
use crate::lp::{Domain, LinearExpr, Sense, VarId};
use crate::{Error, Investment, ResultKey, Sequence};

use super::builder::ModelBuilder;
use super::Capacity;

/// The variables of an investment.
#[derive(Clone, Debug)]
pub(crate) struct InvestVars {
    pub(crate) invest: Vec<VarId>,
    pub(crate) total: Vec<VarId>,
    pub(crate) status: Option<Vec<VarId>>,
}

impl ModelBuilder<'_> {
    /// Creates the investment variables, constraints and costs of `owner`.
    pub(super) fn add_investment(
        &mut self,
        owner: &str,
        key: &ResultKey,
        investment: &Investment,
    ) -> Result<InvestVars, Error> {
        let axis = self.axis;
        let periods = axis.periods().len();
        let multi_period = axis.is_multi_period();

        let mut invest = Vec::with_capacity(periods);
        let mut status = Vec::with_capacity(periods);
        let mut total = Vec::with_capacity(periods);

        for p in 0..periods {
            let (minimum, maximum) = (investment.minimum.get(p), investment.maximum.get(p));
            let lower = if investment.nonconvex { 0.0 } else { minimum };
            let var = self.lp.add_variable(
                format!("invest({owner},{p})"),
                lower,
                maximum,
                Domain::Continuous,
            )?;
            invest.push(var);

            if investment.nonconvex {
                let flag = self.lp.add_variable(
                    format!("invest_status({owner},{p})"),
                    0.0,
                    1.0,
                    Domain::Binary,
                )?;
                self.lp.add_constraint(
                    format!("invest_max({owner},{p})"),
                    LinearExpr::from(var) - LinearExpr::term(flag, maximum),
                    Sense::Le,
                    0.0,
                )?;
                self.lp.add_constraint(
                    format!("invest_min({owner},{p})"),
                    LinearExpr::from(var) - LinearExpr::term(flag, minimum),
                    Sense::Ge,
                    0.0,
                )?;
                status.push(flag);
            }

            total.push(self.lp.add_variable(
                format!("total({owner},{p})"),
                0.0,
                f64::INFINITY,
                Domain::Continuous,
            )?);
        }

        let old = if multi_period {
            self.add_retirement(owner, investment, &invest)?
        } else {
            vec![]
        };

        for p in 0..periods {
            let mut expr = LinearExpr::from(total[p]) - LinearExpr::from(invest[p]);
            if p > 0 {
                expr -= LinearExpr::from(total[p - 1]);
            }
            if let Some(old) = old.get(p) {
                expr += LinearExpr::from(*old);
            }
            let rhs = if p == 0 { investment.existing } else { 0.0 };
            self.lp
                .add_constraint(format!("total({owner},{p})"), expr, Sense::Eq, rhs)?;

            if let Some(maximum) = investment.overall_maximum {
                self.lp.add_constraint(
                    format!("overall_maximum({owner},{p})"),
                    total[p].into(),
                    Sense::Le,
                    maximum,
                )?;
            }
        }
        if let (Some(minimum), Some(last)) = (investment.overall_minimum, total.last()) {
            self.lp.add_constraint(
                format!("overall_minimum({owner})"),
                (*last).into(),
                Sense::Ge,
                minimum,
            )?;
        }

        let status = (!status.is_empty()).then_some(status);
        self.add_investment_costs(investment, &invest, status.as_deref());

        if multi_period {
            self.registry.add_periods(key, "invest", invest.clone());
            self.registry.add_periods(key, "total", total.clone());
            self.registry.add_periods(key, "old", old);
            if let Some(status) = &status {
                self.registry.add_periods(key, "invest_status", status.clone());
            }
        } else {
            self.registry.add_scalar(key, "invest", invest[0]);
            self.registry.add_scalar(key, "total", total[0]);
            if let Some(status) = &status {
                self.registry.add_scalar(key, "invest_status", status[0]);
            }
        }
        self.investment_vars.extend(invest.iter().copied());
        if let Some(status) = &status {
            self.investment_vars.extend(status.iter().copied());
        }

        Ok(InvestVars {
            invest,
            total,
            status,
        })
    }

    /// Creates the `old(p)` variables of a multi-period investment.
    fn add_retirement(
        &mut self,
        owner: &str,
        investment: &Investment,
        invest: &[VarId],
    ) -> Result<Vec<VarId>, Error> {
        let axis = self.axis;
        let periods = axis.periods().len();
        let lifetime = investment.lifetime.ok_or_else(|| {
            Error::configuration(format!(
                "{owner} needs an investment lifetime in multi-period models."
            ))
        })? as i32;

        if axis.periods().iter().any(|period| lifetime < period.years()) {
            tracing::warn!(
                "Investment lifetime of {owner} is shorter than a period; \
                 capacity is only retired at period boundaries."
            );
        }

        // The period in which capacity installed in period `q` is retired.
        let retirement_period = |q: usize| {
            (q + 1..periods).find(|p| axis.period_years(*p) - axis.period_years(q) >= lifetime)
        };
        let existing_retirement = (0..periods)
            .find(|p| lifetime - investment.age as i32 <= axis.period_years(*p));

        let mut old = Vec::with_capacity(periods);
        for p in 0..periods {
            let var = self.lp.add_variable(
                format!("old({owner},{p})"),
                0.0,
                f64::INFINITY,
                Domain::Continuous,
            )?;
            let mut expr = LinearExpr::from(var);
            for (q, installed) in invest.iter().enumerate() {
                if retirement_period(q) == Some(p) {
                    expr.add_term(*installed, -1.0);
                }
            }
            let rhs = if existing_retirement == Some(p) {
                investment.existing
            } else {
                0.0
            };
            self.lp
                .add_constraint(format!("old({owner},{p})"), expr, Sense::Eq, rhs)?;
            old.push(var);
        }

        Ok(old)
    }

    fn add_investment_costs(
        &mut self,
        investment: &Investment,
        invest: &[VarId],
        status: Option<&[VarId]>,
    ) {
        let axis = self.axis;
        let mut costs = LinearExpr::new();
        let mut fixed_costs = LinearExpr::new();

        if !axis.is_multi_period() {
            costs.add_term(invest[0], investment.ep_costs.get(0));
            if let Some(status) = status {
                costs.add_term(status[0], investment.offset.get(0));
            }
        } else {
            let lifetime = investment.lifetime.unwrap_or(1);
            let rate = match investment.interest_rate {
                Some(rate) => rate,
                None => {
                    tracing::warn!(
                        "No interest rate given for an investment, using the discount rate {}.",
                        self.config.discount_rate
                    );
                    self.config.discount_rate
                }
            };

            for (p, var) in invest.iter().enumerate() {
                let years = axis.period_years(p);
                let duration = (axis.end_year() - years).min(lifetime as i32).max(1) as u32;
                let factor = present_value_factor(duration, rate) * self.discount(p);

                costs.add_term(
                    *var,
                    annuity(investment.ep_costs.get(p), lifetime, rate) * factor,
                );
                if let Some(status) = status {
                    costs.add_term(
                        status[p],
                        annuity(investment.offset.get(p), lifetime, rate) * factor,
                    );
                }

                if let Some(yearly) = &investment.fixed_costs {
                    let until = (years + lifetime as i32).min(axis.end_year());
                    fixed_costs.add_term(*var, self.yearly_costs_factor(yearly, years, until));
                }
            }

            if let Some(yearly) = &investment.fixed_costs {
                let remaining = lifetime as i32 - investment.age as i32;
                let until = remaining.min(axis.end_year());
                fixed_costs.add_constant(
                    investment.existing * self.yearly_costs_factor(yearly, 0, until),
                );
            }
        }

        self.investment_costs += &costs;
        self.add_cost("investment_costs", costs);
        self.add_cost("fixed_costs", fixed_costs);
    }

    /// Sum of the discounted per-period yearly costs over the years
    /// `from..until` of the horizon.
    pub(super) fn yearly_costs_factor(&self, yearly: &Sequence, from: i32, until: i32) -> f64 {
        (from.max(0)..until)
            .map(|year| {
                yearly.get(self.axis.period_of_year(year))
                    * discount_factor(self.config.discount_rate, year)
            })
            .sum()
    }

    /// Creates the investments of all flows that have one, and bounds the
    /// flows by the invested capacity.
    pub(super) fn add_flow_investments(&mut self) -> Result<(), Error> {
        let axis = self.axis;
        for index in 0..self.flows.len() {
            let Some(investment) = self.flows[index].flow.investment.clone() else {
                continue;
            };
            let (source, target) = (
                self.flows[index].source.clone(),
                self.flows[index].target.clone(),
            );
            let owner = format!("{source},{target}");
            let vars = self.add_investment(&owner, &ResultKey::flow(&source, &target), &investment)?;

            let entry = &self.flows[index];
            let flow = &entry.flow;
            for t in 0..self.steps() {
                let total = vars.total[axis.period(t)];
                let var = entry.vars[t];
                if let Some(fix) = &flow.fix {
                    self.lp.add_constraint(
                        format!("flow_invest_fix({owner},{t})"),
                        LinearExpr::from(var) - LinearExpr::term(total, fix.get(t)),
                        Sense::Eq,
                        0.0,
                    )?;
                    continue;
                }
                self.lp.add_constraint(
                    format!("flow_invest_max({owner},{t})"),
                    LinearExpr::from(var) - LinearExpr::term(total, flow.max.get(t)),
                    Sense::Le,
                    0.0,
                )?;
                if flow.nonconvex.is_none() && flow.min.get(t) > 0.0 {
                    self.lp.add_constraint(
                        format!("flow_invest_min({owner},{t})"),
                        LinearExpr::from(var) - LinearExpr::term(total, flow.min.get(t)),
                        Sense::Ge,
                        0.0,
                    )?;
                }
            }

            self.flows[index].capacity = Capacity::Invest(vars);
        }

        tracing::debug!("Added flow investments.");
        Ok(())
    }
}
