// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for validating the converters and storages of an
//! [`EnergySystem`].

use crate::{Converter, Error, Investment, Storage};

use super::EnergySystemValidator;

impl EnergySystemValidator<'_> {
    /// Validates that a converter has inputs and outputs, that every output
    /// has a conversion factor, and that all factors and the reference input
    /// refer to connected nodes.
    pub(super) fn validate_converter(&self, converter: &Converter) -> Result<(), Error> {
        let label = converter.label.as_str();
        let node = self.es.node(label)?;
        let owner = format!("Converter:{label}");

        self.ensure_has_inputs(node)?;
        self.ensure_has_outputs(node)?;

        let inputs = self
            .es
            .inputs(label)?
            .map(|f| f.source.label())
            .collect::<Vec<_>>();
        let outputs = self
            .es
            .outputs(label)?
            .map(|f| f.target.label())
            .collect::<Vec<_>>();

        for output in &outputs {
            if converter.factor(output).is_none() {
                return Err(Error::configuration(format!(
                    "{owner} has no conversion factor for output {output}."
                )));
            }
        }

        for (other, factor) in &converter.conversion_factors {
            if !inputs.contains(&other.as_str()) && !outputs.contains(&other.as_str()) {
                return Err(Error::configuration(format!(
                    "{owner} has a conversion factor for {other}, which is not connected to it."
                )));
            }
            self.ensure_steps(&owner, &format!("conversion_factor({other})"), factor)?;
        }

        if let Some(reference) = &converter.reference_input {
            if !inputs.contains(&reference.as_str()) {
                return Err(Error::configuration(format!(
                    "{owner} reference input {reference} is not an input."
                )));
            }
        }

        Ok(())
    }

    /// Validates the flows, parameters and capacity of a storage.
    pub(super) fn validate_storage(&self, storage: &Storage) -> Result<(), Error> {
        let label = storage.label.as_str();
        let node = self.es.node(label)?;
        let owner = format!("Storage:{label}");

        self.ensure_input_count(node, 1)?;
        self.ensure_output_count(node, 1)?;

        for (name, sequence) in [
            ("loss_rate", &storage.loss_rate),
            ("fixed_losses_relative", &storage.fixed_losses_relative),
            ("fixed_losses_absolute", &storage.fixed_losses_absolute),
            ("inflow_conversion_factor", &storage.inflow_conversion_factor),
            ("outflow_conversion_factor", &storage.outflow_conversion_factor),
            ("min_level", &storage.min_level),
            ("max_level", &storage.max_level),
        ] {
            self.ensure_steps(&owner, name, sequence)?;
        }

        match (&storage.investment, storage.nominal_capacity) {
            (Some(investment), _) => self.validate_investment(&owner, investment)?,
            (None, Some(capacity)) if capacity < 0.0 => {
                return Err(Error::configuration(format!(
                    "{owner} has a negative nominal_capacity."
                )));
            }
            (None, Some(_)) => {}
            (None, None) => {
                return Err(Error::unresolved_capacity(format!(
                    "{owner} needs a nominal_capacity or an investment."
                )));
            }
        }

        if !self.es.config().allow_unbalanced_storage_profiles {
            self.ensure_ordered(
                &owner,
                ("min_level", &storage.min_level),
                ("max_level", &storage.max_level),
            )?;
        }

        if let Some(level) = storage.initial_level {
            let axis = self.es.time_axis();
            for p in 0..axis.periods().len() {
                let t = axis.period_steps(p).start;
                let (min, max) = (storage.min_level.get(t), storage.max_level.get(t));
                if level < min || level > max {
                    return Err(Error::infeasible_profile(format!(
                        "{owner} initial_level {level} is outside of [{min}, {max}] at step {t}."
                    )));
                }
            }
        }

        for t in 0..self.steps {
            if storage.outflow_conversion_factor.get(t) == 0.0 {
                return Err(Error::configuration(format!(
                    "{owner} outflow_conversion_factor is zero at step {t}."
                )));
            }
        }

        self.validate_invest_relations(storage)
    }

    fn validate_invest_relations(&self, storage: &Storage) -> Result<(), Error> {
        let label = storage.label.as_str();
        let input = self.es.inputs(label)?.map(|f| f.flow.investment.is_some()).next();
        let output = self.es.outputs(label)?.map(|f| f.flow.investment.is_some()).next();

        for (name, ratio, needs_input, needs_output) in [
            (
                "invest_relation_input_capacity",
                storage.invest_relation_input_capacity,
                true,
                false,
            ),
            (
                "invest_relation_output_capacity",
                storage.invest_relation_output_capacity,
                false,
                true,
            ),
            (
                "invest_relation_input_output",
                storage.invest_relation_input_output,
                true,
                true,
            ),
        ] {
            if ratio.is_none() {
                continue;
            }
            let storage_ok = name == "invest_relation_input_output" || storage.is_investment();
            let input_ok = !needs_input || input == Some(true);
            let output_ok = !needs_output || output == Some(true);
            if !(storage_ok && input_ok && output_ok) {
                return Err(Error::configuration(format!(
                    "Storage:{label} {name} needs investments on the storage and on the related flows."
                )));
            }
        }

        Ok(())
    }

    /// Validates the parameters of an investment, owned by a flow or a
    /// storage.
    pub(super) fn validate_investment(
        &self,
        owner: &str,
        investment: &Investment,
    ) -> Result<(), Error> {
        for (name, sequence) in [
            ("investment minimum", &investment.minimum),
            ("investment maximum", &investment.maximum),
            ("investment ep_costs", &investment.ep_costs),
            ("investment offset", &investment.offset),
        ] {
            self.ensure_periods(owner, name, sequence)?;
        }
        if let Some(fixed_costs) = &investment.fixed_costs {
            self.ensure_periods(owner, "investment fixed_costs", fixed_costs)?;
        }

        if investment.existing < 0.0 {
            return Err(Error::configuration(format!(
                "{owner} has a negative existing capacity."
            )));
        }

        for p in 0..self.periods {
            let (min, max) = (investment.minimum.get(p), investment.maximum.get(p));
            if max < min {
                return Err(Error::configuration(format!(
                    "{owner} investment maximum {max} is below its minimum {min} in period {p}."
                )));
            }
            if investment.nonconvex && !max.is_finite() {
                return Err(Error::configuration(format!(
                    "{owner} has a nonconvex investment without a finite maximum."
                )));
            }
        }

        if self.es.time_axis().is_multi_period() && investment.lifetime.is_none() {
            return Err(Error::configuration(format!(
                "{owner} needs an investment lifetime in multi-period models."
            )));
        }

        if let (Some(min), Some(max)) = (investment.overall_minimum, investment.overall_maximum) {
            if min > max {
                return Err(Error::configuration(format!(
                    "{owner} overall_minimum {min} exceeds overall_maximum {max}."
                )));
            }
        }

        Ok(())
    }
}
