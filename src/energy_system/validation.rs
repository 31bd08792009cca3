// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for validating an [`EnergySystem`].

mod invariant_checks;
mod validate_flows;
mod validate_graph;
mod validate_nodes;

use crate::{EnergySystem, Error, Node};

pub(crate) struct EnergySystemValidator<'a> {
    es: &'a EnergySystem,
    steps: usize,
    periods: usize,
}

impl EnergySystem {
    /// Validates the energy system without freezing it.
    ///
    /// Checks that all nodes are connected, that converters and storages have
    /// the flows they need, that all sequences cover the time axis, and that
    /// profiles and capacities are consistent.
    pub fn validate(&self) -> Result<(), Error> {
        let validator = EnergySystemValidator {
            es: self,
            steps: self.time_axis.steps(),
            periods: self.time_axis.periods().len(),
        };

        validator.validate_connected_nodes()?;

        for node in self.iter_nodes() {
            match node {
                Node::Converter(converter) => validator.validate_converter(converter)?,
                Node::Storage(storage) => validator.validate_storage(storage)?,
                Node::Bus(_) | Node::Source(_) | Node::Sink(_) => {}
            }
        }

        for flow in self.iter_flows() {
            validator.validate_flow(flow)?;
        }

        Ok(())
    }
}
