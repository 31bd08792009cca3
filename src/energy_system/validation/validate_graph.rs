// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for validating the connectedness of an [`EnergySystem`].

use crate::Error;

use super::EnergySystemValidator;

impl EnergySystemValidator<'_> {
    /// Validates that every node has at least one flow attached to it, unless
    /// the configuration allows unconnected nodes.
    pub(super) fn validate_connected_nodes(&self) -> Result<(), Error> {
        if self.es.config().allow_unconnected_nodes {
            return Ok(());
        }

        let graph = self.es.graph();
        let unconnected = graph
            .node_indices()
            .filter(|i| graph.neighbors_undirected(*i).next().is_none())
            .map(|i| graph[i].label().to_string())
            .collect::<Vec<_>>();

        if !unconnected.is_empty() {
            return Err(Error::invalid_graph(format!(
                "Nodes {:?} have no flows.",
                unconnected
            )));
        }

        Ok(())
    }
}
