// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Iterators over nodes and flows in an `EnergySystem`.

use petgraph::{graph::NodeIndex, Direction};

use crate::{EnergySystem, Flow, Node};

/// An iterator over the nodes in an `EnergySystem`.
pub struct Nodes<'a> {
    pub(crate) iter: std::slice::Iter<'a, petgraph::graph::Node<Node>>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|n| &n.weight)
    }
}

/// A flow together with the nodes it connects.
#[derive(Clone, Copy, Debug)]
pub struct FlowRef<'a> {
    pub source: &'a Node,
    pub target: &'a Node,
    pub flow: &'a Flow,
    pub(crate) source_index: NodeIndex,
    pub(crate) target_index: NodeIndex,
}

/// An iterator over the flows in an `EnergySystem`.
pub struct Flows<'a> {
    pub(crate) es: &'a EnergySystem,
    pub(crate) iter: indexmap::map::Iter<'a, (NodeIndex, NodeIndex), Flow>,
}

impl<'a> Iterator for Flows<'a> {
    type Item = FlowRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(&(s, t), flow)| FlowRef {
            source: &self.es.graph()[s],
            target: &self.es.graph()[t],
            flow,
            source_index: s,
            target_index: t,
        })
    }
}

/// An iterator over the flows going into or coming out of a node.
pub struct Neighbors<'a> {
    pub(crate) flows: Flows<'a>,
    pub(crate) index: NodeIndex,
    pub(crate) direction: Direction,
}

impl<'a> Iterator for Neighbors<'a> {
    type Item = FlowRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, direction) = (self.index, self.direction);
        self.flows.by_ref().find(|f| match direction {
            Direction::Incoming => f.target_index == index,
            Direction::Outgoing => f.source_index == index,
        })
    }
}
