// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for retrieving nodes and flows from an [`EnergySystem`].

use petgraph::{graph::NodeIndex, Direction};

use crate::iterators::{Flows, Neighbors, Nodes};
use crate::{EnergySystem, EnergySystemConfig, Error, Flow, Node, TimeAxis};

/// `Node` and `Flow` retrieval.
impl EnergySystem {
    /// Returns the node with the given `label`, if it exists.
    pub fn node(&self, label: &str) -> Result<&Node, Error> {
        self.index(label).map(|i| &self.graph[i])
    }

    /// Returns the flow from `source` to `target`, if it exists.
    pub fn flow(&self, source: &str, target: &str) -> Result<&Flow, Error> {
        let key = (self.index(source)?, self.index(target)?);
        self.flows.get(&key).ok_or_else(|| {
            Error::flow_not_found(format!("Flow:({source}, {target}) not found."))
        })
    }

    /// Returns an iterator over the nodes, in insertion order.
    pub fn iter_nodes(&self) -> Nodes<'_> {
        Nodes {
            iter: self.graph.raw_nodes().iter(),
        }
    }

    /// Returns an iterator over the flows, in insertion order.
    pub fn iter_flows(&self) -> Flows<'_> {
        Flows {
            es: self,
            iter: self.flows.iter(),
        }
    }

    /// Returns an iterator over the flows going into the node with the given
    /// `label`, in insertion order.
    pub fn inputs(&self, label: &str) -> Result<Neighbors<'_>, Error> {
        let index = self.index(label)?;
        Ok(Neighbors {
            flows: self.iter_flows(),
            index,
            direction: Direction::Incoming,
        })
    }

    /// Returns an iterator over the flows coming out of the node with the
    /// given `label`, in insertion order.
    pub fn outputs(&self, label: &str) -> Result<Neighbors<'_>, Error> {
        let index = self.index(label)?;
        Ok(Neighbors {
            flows: self.iter_flows(),
            index,
            direction: Direction::Outgoing,
        })
    }

    pub fn time_axis(&self) -> &TimeAxis {
        &self.time_axis
    }

    pub fn config(&self) -> &EnergySystemConfig {
        &self.config
    }

    /// Whether the system was validated and not modified since.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// A counter that changes whenever nodes or flows are added.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn index(&self, label: &str) -> Result<NodeIndex, Error> {
        self.node_indices
            .get(label)
            .copied()
            .ok_or_else(|| Error::node_not_found(format!("Node with label {label} not found.")))
    }

    pub(crate) fn graph(&self) -> &petgraph::graph::DiGraph<Node, ()> {
        &self.graph
    }
}
