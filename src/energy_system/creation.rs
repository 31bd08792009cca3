// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for creating [`EnergySystem`] instances and adding nodes and flows
//! to them.

use petgraph::graph::DiGraph;

use crate::{EnergySystem, EnergySystemConfig, Error, Flow, Node, TimeAxis};

use super::{FlowMap, NodeIndexMap};

/// `EnergySystem` instantiation.
impl EnergySystem {
    /// Creates an empty energy system over the given time axis.
    pub fn new(time_axis: TimeAxis) -> Self {
        Self::with_config(time_axis, EnergySystemConfig::default())
    }

    /// Creates an empty energy system with the given validation options.
    pub fn with_config(time_axis: TimeAxis, config: EnergySystemConfig) -> Self {
        Self {
            time_axis,
            graph: DiGraph::new(),
            node_indices: NodeIndexMap::new(),
            flows: FlowMap::new(),
            config,
            frozen: false,
            revision: 0,
        }
    }

    /// Creates a new [`EnergySystem`] from the given nodes and flows, and
    /// freezes it.
    ///
    /// Returns an error if the system is invalid.
    pub fn try_new<S: AsRef<str>>(
        time_axis: TimeAxis,
        nodes: impl IntoIterator<Item = Node>,
        flows: impl IntoIterator<Item = (S, S, Flow)>,
        config: EnergySystemConfig,
    ) -> Result<Self, Error> {
        let mut es = Self::with_config(time_axis, config);
        for node in nodes {
            es.add_node(node)?;
        }
        for (source, target, flow) in flows {
            es.add_flow(source.as_ref(), target.as_ref(), flow)?;
        }
        es.freeze()?;
        Ok(es)
    }

    /// Adds a node to the energy system.
    ///
    /// Returns an error if a node with the same label exists already.
    pub fn add_node(&mut self, node: impl Into<Node>) -> Result<(), Error> {
        let node = node.into();
        let label = node.label().to_string();

        if label.is_empty() {
            return Err(Error::configuration(format!(
                "{} nodes need a non-empty label.",
                node.kind()
            )));
        }
        if self.node_indices.contains_key(&label) {
            return Err(Error::invalid_graph(format!(
                "Duplicate node label found: {label}"
            )));
        }

        let idx = self.graph.add_node(node);
        self.node_indices.insert(label, idx);
        self.touch();

        Ok(())
    }

    /// Adds a flow from the node `source` to the node `target`.
    pub fn add_flow(&mut self, source: &str, target: &str, flow: Flow) -> Result<(), Error> {
        if source == target {
            return Err(Error::invalid_graph(format!(
                "Flow:({source}, {target}) Can't connect a node to itself."
            )));
        }
        for label in [source, target] {
            if !self.node_indices.contains_key(label) {
                return Err(Error::node_not_found(format!(
                    "Flow:({source}, {target}) Can't find a node with label {label}"
                )));
            }
        }

        let source_idx = self.node_indices[source];
        let target_idx = self.node_indices[target];

        if self.graph[source_idx].is_sink() {
            return Err(Error::invalid_graph(format!(
                "Flow:({source}, {target}) Sinks can't have outgoing flows."
            )));
        }
        if self.graph[target_idx].is_source() {
            return Err(Error::invalid_graph(format!(
                "Flow:({source}, {target}) Sources can't have incoming flows."
            )));
        }
        if self.flows.contains_key(&(source_idx, target_idx)) {
            return Err(Error::invalid_graph(format!(
                "Flow:({source}, {target}) exists already."
            )));
        }

        self.flows.insert((source_idx, target_idx), flow);
        self.graph.add_edge(source_idx, target_idx, ());
        self.touch();

        Ok(())
    }

    /// Validates the energy system and marks it as ready for building a
    /// model.
    ///
    /// Adding nodes or flows afterwards un-freezes the system, and models
    /// built before that no longer match it.
    pub fn freeze(&mut self) -> Result<(), Error> {
        self.validate()?;
        self.frozen = true;
        Ok(())
    }

    fn touch(&mut self) {
        self.frozen = false;
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::hourly_axis;
    use crate::{Bus, Sink, Source};

    #[test]
    fn test_add_node() -> Result<(), Error> {
        let mut es = EnergySystem::new(hourly_axis(2));
        es.add_node(Bus::new("el"))?;
        assert!(es
            .add_node(Sink::new("el"))
            .is_err_and(|e| e == Error::invalid_graph("Duplicate node label found: el")));
        assert!(es
            .add_node(Sink::new(""))
            .is_err_and(|e| e == Error::configuration("Sink nodes need a non-empty label.")));
        Ok(())
    }

    #[test]
    fn test_add_flow() -> Result<(), Error> {
        let mut es = EnergySystem::new(hourly_axis(2));
        es.add_node(Bus::new("el"))?;
        es.add_node(Source::new("grid"))?;
        es.add_node(Sink::new("demand"))?;

        es.add_flow("grid", "el", Flow::new())?;
        es.add_flow("el", "demand", Flow::new())?;

        assert!(es.add_flow("el", "el", Flow::new()).is_err_and(|e| e
            == Error::invalid_graph("Flow:(el, el) Can't connect a node to itself.")));
        assert!(es.add_flow("el", "pv", Flow::new()).is_err_and(|e| e
            == Error::node_not_found("Flow:(el, pv) Can't find a node with label pv")));
        assert!(es.add_flow("demand", "el", Flow::new()).is_err_and(|e| e
            == Error::invalid_graph("Flow:(demand, el) Sinks can't have outgoing flows.")));
        assert!(es.add_flow("el", "grid", Flow::new()).is_err_and(|e| e
            == Error::invalid_graph("Flow:(el, grid) Sources can't have incoming flows.")));
        assert!(es
            .add_flow("grid", "el", Flow::new())
            .is_err_and(|e| e == Error::invalid_graph("Flow:(grid, el) exists already.")));

        Ok(())
    }

    #[test]
    fn test_freeze_and_revision() -> Result<(), Error> {
        let mut es = EnergySystem::try_new(
            hourly_axis(2),
            vec![Source::new("grid").into(), Sink::new("demand").into()],
            vec![("grid", "demand", Flow::new())],
            EnergySystemConfig::default(),
        )?;
        assert!(es.is_frozen());
        let revision = es.revision();

        es.add_node(Bus::new("heat"))?;
        assert!(!es.is_frozen());
        assert!(es.revision() > revision);
        assert!(es.freeze().is_err());

        Ok(())
    }
}
