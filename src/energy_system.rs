// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! A graph representation of an energy system: buses, sources, sinks,
//! converters and storages, connected by flows.

mod creation;
mod export;
mod retrieval;
mod validation;

pub mod iterators;

use crate::{EnergySystemConfig, Flow, Node, TimeAxis};
use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// `Node`s stored in a `DiGraph` instance can be addressed with `NodeIndex`es.
///
/// `NodeIndexMap` stores the corresponding `NodeIndex` for any label, so that
/// nodes in the `DiGraph` can be retrieved from their labels.
pub(crate) type NodeIndexMap = HashMap<String, NodeIndex>;

/// `Flow`s are not stored in the `DiGraph` instance, so we need to store them
/// separately.
///
/// `FlowMap` can be used to lookup the `Flow` for any pair of source and
/// target `NodeIndex` values.  It keeps the order in which the flows were
/// added, which is the order the model builder emits them in.
pub(crate) type FlowMap = IndexMap<(NodeIndex, NodeIndex), Flow>;

/// An energy system: nodes connected by flows, over a time axis.
///
/// Nodes are addressed by their labels.  Two nodes are connected by at most
/// one flow in each direction.
#[derive(Clone, Debug)]
pub struct EnergySystem {
    time_axis: TimeAxis,
    graph: DiGraph<Node, ()>,
    node_indices: NodeIndexMap,
    flows: FlowMap,
    config: EnergySystemConfig,
    frozen: bool,
    revision: u64,
}
