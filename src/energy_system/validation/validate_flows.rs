// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for validating the flows of an [`EnergySystem`].

use crate::iterators::FlowRef;
use crate::{Error, Sequence};

use super::EnergySystemValidator;

impl EnergySystemValidator<'_> {
    /// Validates the sequences, capacity and profiles of a flow, and the
    /// features attached to it.
    pub(super) fn validate_flow(&self, flow_ref: FlowRef) -> Result<(), Error> {
        let flow = flow_ref.flow;
        let owner = format!(
            "Flow:({}, {})",
            flow_ref.source.label(),
            flow_ref.target.label()
        );

        self.ensure_steps(&owner, "max", &flow.max)?;
        self.ensure_steps(&owner, "min", &flow.min)?;
        for (name, sequence) in [
            ("fix", &flow.fix),
            ("variable_costs", &flow.variable_costs),
            ("positive_gradient_limit", &flow.positive_gradient_limit),
            ("negative_gradient_limit", &flow.negative_gradient_limit),
        ] {
            if let Some(sequence) = sequence {
                self.ensure_steps(&owner, name, sequence)?;
            }
        }
        for (keyword, sequence) in &flow.custom_attributes {
            self.ensure_steps(&owner, keyword, sequence)?;
        }
        if let Some(fixed_costs) = &flow.fixed_costs {
            self.ensure_periods(&owner, "fixed_costs", fixed_costs)?;
        }
        if let Some(nonconvex) = &flow.nonconvex {
            for (name, sequence) in [
                ("startup_costs", &nonconvex.startup_costs),
                ("shutdown_costs", &nonconvex.shutdown_costs),
                ("activity_costs", &nonconvex.activity_costs),
                ("inactivity_costs", &nonconvex.inactivity_costs),
                ("nonconvex positive_gradient_limit", &nonconvex.positive_gradient_limit),
                ("nonconvex negative_gradient_limit", &nonconvex.negative_gradient_limit),
            ] {
                if let Some(sequence) = sequence {
                    self.ensure_steps(&owner, name, sequence)?;
                }
            }
        }
        if let Some(multiobjective) = &flow.multiobjective {
            for (objective, costs) in &multiobjective.costs {
                self.ensure_steps(&owner, &format!("costs({objective})"), costs)?;
            }
        }

        if flow.nominal_capacity.is_some_and(|c| c < 0.0) {
            return Err(Error::configuration(format!(
                "{owner} has a negative nominal_capacity."
            )));
        }

        let has_gradient =
            flow.positive_gradient_limit.is_some() || flow.negative_gradient_limit.is_some();
        if has_gradient && !flow.has_capacity() {
            return Err(Error::unresolved_capacity(format!(
                "{owner} has a gradient limit but no nominal_capacity."
            )));
        }
        if flow.needs_capacity() && !flow.has_capacity() {
            return Err(Error::unresolved_capacity(format!(
                "{owner} has bounds relative to its capacity, but neither a nominal_capacity nor an investment."
            )));
        }

        self.ensure_ordered(&owner, ("min", &flow.min), ("max", &flow.max))?;
        if let Some(fix) = &flow.fix {
            if !flow.min.is_zero() || flow.max != Sequence::from(1.0) {
                return Err(Error::infeasible_profile(format!(
                    "{owner} can't have min or max together with fix."
                )));
            }
            if let Some(t) = (0..self.steps).find(|&t| fix.get(t) < 0.0) {
                return Err(Error::infeasible_profile(format!(
                    "{owner} fix {} at step {t} is negative.",
                    fix.get(t)
                )));
            }
        }

        if let (Some(min), Some(max)) = (flow.full_load_time_min, flow.full_load_time_max) {
            if min > max {
                return Err(Error::configuration(format!(
                    "{owner} full_load_time_min {min} exceeds full_load_time_max {max}."
                )));
            }
        }

        if let Some(investment) = &flow.investment {
            self.validate_investment(&owner, investment)?;
        }

        if let Some(nonconvex) = &flow.nonconvex {
            let has_nonconvex_gradient = nonconvex.positive_gradient_limit.is_some()
                || nonconvex.negative_gradient_limit.is_some();
            if has_nonconvex_gradient && has_gradient {
                return Err(Error::configuration(format!(
                    "{owner} has gradient limits both on the flow and on its NonConvex."
                )));
            }
            if has_nonconvex_gradient && (flow.investment.is_some() || flow.nominal_capacity.is_none()) {
                return Err(Error::configuration(format!(
                    "{owner} needs a fixed nominal_capacity for NonConvex gradient limits."
                )));
            }
            if let Some(investment) = &flow.investment {
                let big_m = investment.existing
                    + (0..self.periods)
                        .map(|p| investment.maximum.get(p))
                        .sum::<f64>();
                if !big_m.is_finite() {
                    return Err(Error::configuration(format!(
                        "{owner} needs a finite investment maximum to be NonConvex."
                    )));
                }
            }
        }

        Ok(())
    }
}
