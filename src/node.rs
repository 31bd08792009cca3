// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! This module defines the node types of an energy system and the `NodeKind`
//! enum that tells them apart.

mod converter;
mod storage;

pub use converter::Converter;
pub use storage::Storage;

use std::fmt::Display;

/// Represents the kind of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Bus,
    Source,
    Sink,
    Converter,
    Storage,
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Bus => write!(f, "Bus"),
            NodeKind::Source => write!(f, "Source"),
            NodeKind::Sink => write!(f, "Sink"),
            NodeKind::Converter => write!(f, "Converter"),
            NodeKind::Storage => write!(f, "Storage"),
        }
    }
}

/// An energy-conservation node for a single commodity.
#[derive(Clone, Debug, PartialEq)]
pub struct Bus {
    pub label: String,

    /// Whether inflows and outflows have to match at every step.
    pub balanced: bool,

    /// Penalty costs of an `excess` slack variable on this bus.
    pub excess_costs: Option<f64>,

    /// Penalty costs of a `shortage` slack variable on this bus.
    pub shortage_costs: Option<f64>,
}

impl Bus {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            balanced: true,
            excess_costs: None,
            shortage_costs: None,
        }
    }

    pub fn unbalanced(mut self) -> Self {
        self.balanced = false;
        self
    }

    /// Adds `excess` and `shortage` slack variables to the balance of this
    /// bus, with the given penalty costs per unit of energy.
    pub fn with_slack(mut self, excess_costs: f64, shortage_costs: f64) -> Self {
        self.excess_costs = Some(excess_costs);
        self.shortage_costs = Some(shortage_costs);
        self
    }
}

/// Injects energy into the system.  Has outgoing flows only.
#[derive(Clone, Debug, PartialEq)]
pub struct Source {
    pub label: String,
}

impl Source {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

/// Absorbs energy from the system.  Has incoming flows only.
#[derive(Clone, Debug, PartialEq)]
pub struct Sink {
    pub label: String,
}

impl Sink {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

/// A node of an [`EnergySystem`][crate::EnergySystem].
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Bus(Bus),
    Source(Source),
    Sink(Sink),
    Converter(Converter),
    Storage(Storage),
}

impl Node {
    /// Returns the label that identifies the node in its energy system.
    pub fn label(&self) -> &str {
        match self {
            Node::Bus(n) => &n.label,
            Node::Source(n) => &n.label,
            Node::Sink(n) => &n.label,
            Node::Converter(n) => &n.label,
            Node::Storage(n) => &n.label,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Bus(_) => NodeKind::Bus,
            Node::Source(_) => NodeKind::Source,
            Node::Sink(_) => NodeKind::Sink,
            Node::Converter(_) => NodeKind::Converter,
            Node::Storage(_) => NodeKind::Storage,
        }
    }

    pub fn is_bus(&self) -> bool {
        self.kind() == NodeKind::Bus
    }

    pub fn is_source(&self) -> bool {
        self.kind() == NodeKind::Source
    }

    pub fn is_sink(&self) -> bool {
        self.kind() == NodeKind::Sink
    }

    pub fn is_converter(&self) -> bool {
        self.kind() == NodeKind::Converter
    }

    pub fn is_storage(&self) -> bool {
        self.kind() == NodeKind::Storage
    }
}

impl From<Bus> for Node {
    fn from(node: Bus) -> Self {
        Node::Bus(node)
    }
}

impl From<Source> for Node {
    fn from(node: Source) -> Self {
        Node::Source(node)
    }
}

impl From<Sink> for Node {
    fn from(node: Sink) -> Self {
        Node::Sink(node)
    }
}

impl From<Converter> for Node {
    fn from(node: Converter) -> Self {
        Node::Converter(node)
    }
}

impl From<Storage> for Node {
    fn from(node: Storage) -> Self {
        Node::Storage(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kind() {
        let nodes: Vec<Node> = vec![
            Bus::new("el").into(),
            Source::new("pv").into(),
            Sink::new("demand").into(),
            Converter::new("boiler").into(),
            Storage::new("battery").into(),
        ];
        assert_eq!(
            nodes
                .iter()
                .map(|n| format!("{}:{}", n.kind(), n.label()))
                .collect::<Vec<_>>(),
            vec![
                "Bus:el",
                "Source:pv",
                "Sink:demand",
                "Converter:boiler",
                "Storage:battery"
            ]
        );
        assert!(nodes[0].is_bus());
        assert!(nodes[1].is_source());
        assert!(nodes[2].is_sink());
        assert!(nodes[3].is_converter());
        assert!(nodes[4].is_storage());
    }

    #[test]
    fn test_bus_options() {
        let bus = Bus::new("heat").with_slack(10.0, 1000.0);
        assert!(bus.balanced);
        assert_eq!(bus.excess_costs, Some(10.0));
        assert_eq!(bus.shortage_costs, Some(1000.0));
        assert!(!Bus::new("heat").unbalanced().balanced);
    }
}
