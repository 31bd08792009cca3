// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Checks for energy systems that are valid, but probably not what was
//! meant.
//!
//! Unlike [`EnergySystem::validate`], these checks never fail.  Each finding
//! is logged as a warning and returned, so that callers can decide what to do
//! with it.

use petgraph::algo::kosaraju_scc;
use petgraph::Direction;

use crate::{EnergySystem, Node, Sequence};

const ZERO_TOLERANCE: f64 = 1e-9;

/// The kinds of findings of [`check`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Nodes that are connected in a cycle without a storage in it.  Energy
    /// can circulate in such a cycle without any effect on the objective.
    Cycle,
    /// An unbalanced bus without output flows, which absorbs any inflow.
    UnbalancedSink,
    /// A conversion factor or storage efficiency that is zero at some step.
    ZeroEfficiency,
}

/// A finding of [`check`].
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Checks `es` for suspicious usage and returns the findings in node order.
pub fn check(es: &EnergySystem) -> Vec<Diagnostic> {
    let mut diagnostics = vec![];
    find_cycles(es, &mut diagnostics);
    find_unbalanced_sinks(es, &mut diagnostics);
    find_zero_efficiencies(es, &mut diagnostics);

    for diagnostic in &diagnostics {
        tracing::warn!("{diagnostic}");
    }
    diagnostics
}

fn find_cycles(es: &EnergySystem, diagnostics: &mut Vec<Diagnostic>) {
    let without_storages = es.graph().filter_map(
        |_, node| (!node.is_storage()).then(|| node.label().to_string()),
        |_, _| Some(()),
    );
    let mut components = kosaraju_scc(&without_storages)
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|component| {
            let mut labels: Vec<&str> = component
                .iter()
                .map(|index| without_storages[*index].as_str())
                .collect();
            labels.sort_unstable();
            labels.join(", ")
        })
        .collect::<Vec<_>>();
    components.sort();

    diagnostics.extend(components.into_iter().map(|labels| Diagnostic {
        kind: DiagnosticKind::Cycle,
        message: format!("Nodes [{labels}] form a cycle without a storage."),
    }));
}

fn find_unbalanced_sinks(es: &EnergySystem, diagnostics: &mut Vec<Diagnostic>) {
    let graph = es.graph();
    for index in graph.node_indices() {
        let Node::Bus(bus) = &graph[index] else {
            continue;
        };
        if !bus.balanced
            && graph
                .neighbors_directed(index, Direction::Outgoing)
                .next()
                .is_none()
        {
            diagnostics.push(Diagnostic {
                kind: DiagnosticKind::UnbalancedSink,
                message: format!("Bus:{} is unbalanced and has no outputs.", bus.label),
            });
        }
    }
}

fn find_zero_efficiencies(es: &EnergySystem, diagnostics: &mut Vec<Diagnostic>) {
    let steps = es.time_axis().steps();
    let first_zero = |sequence: &Sequence| {
        sequence
            .to_vec(steps)
            .iter()
            .position(|v| v.abs() < ZERO_TOLERANCE)
    };

    for node in es.iter_nodes() {
        let factors: Vec<(String, &Sequence)> = match node {
            Node::Converter(converter) => converter
                .conversion_factors
                .iter()
                .map(|(label, factor)| (format!("conversion factor of {label}"), factor))
                .collect(),
            Node::Storage(storage) => vec![
                (
                    "inflow_conversion_factor".to_string(),
                    &storage.inflow_conversion_factor,
                ),
                (
                    "outflow_conversion_factor".to_string(),
                    &storage.outflow_conversion_factor,
                ),
            ],
            Node::Bus(_) | Node::Source(_) | Node::Sink(_) => continue,
        };
        for (name, factor) in factors {
            if let Some(t) = first_zero(factor) {
                diagnostics.push(Diagnostic {
                    kind: DiagnosticKind::ZeroEfficiency,
                    message: format!(
                        "{}:{}: {name} is zero at step {t}.",
                        node.kind(),
                        node.label()
                    ),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::hourly_axis;
    use crate::{Bus, Converter, Error, Flow, Sink, Source, Storage};

    #[test]
    fn test_cycles() -> Result<(), Error> {
        let mut es = EnergySystem::new(hourly_axis(2));
        es.add_node(Bus::new("el"))?;
        es.add_node(Bus::new("heat"))?;
        es.add_node(Converter::new("heat_pump").with_conversion_factor("heat", 3.0))?;
        es.add_node(Converter::new("chp").with_conversion_factor("el", 0.4))?;
        es.add_node(Storage::new("battery").with_nominal_capacity(1.0))?;
        es.add_flow("el", "heat_pump", Flow::new())?;
        es.add_flow("heat_pump", "heat", Flow::new())?;
        es.add_flow("heat", "chp", Flow::new())?;
        es.add_flow("chp", "el", Flow::new())?;
        es.add_flow("el", "battery", Flow::new())?;
        es.add_flow("battery", "el", Flow::new())?;

        assert_eq!(
            check(&es),
            vec![Diagnostic {
                kind: DiagnosticKind::Cycle,
                message: "Nodes [chp, el, heat, heat_pump] form a cycle without a storage."
                    .to_string(),
            }]
        );
        Ok(())
    }

    #[test]
    fn test_unbalanced_sinks_and_zero_efficiencies() -> Result<(), Error> {
        let mut es = EnergySystem::new(hourly_axis(3));
        es.add_node(Source::new("gas"))?;
        es.add_node(Bus::new("fuel"))?;
        es.add_node(Bus::new("heat").unbalanced())?;
        es.add_node(
            Converter::new("boiler")
                .with_conversion_factor("heat", [0.9, 0.0, 0.9])
                .with_conversion_factor("fuel", 1.0),
        )?;
        es.add_node(Storage::new("tank").with_outflow_conversion_factor(0.0))?;
        es.add_node(Sink::new("demand"))?;
        es.add_flow("gas", "fuel", Flow::new())?;
        es.add_flow("fuel", "boiler", Flow::new())?;
        es.add_flow("boiler", "heat", Flow::new())?;
        es.add_flow("fuel", "tank", Flow::new())?;
        es.add_flow("tank", "demand", Flow::new())?;

        let diagnostics = check(&es);
        assert_eq!(
            diagnostics
                .iter()
                .map(|d| (d.kind, d.message.as_str()))
                .collect::<Vec<_>>(),
            vec![
                (
                    DiagnosticKind::UnbalancedSink,
                    "Bus:heat is unbalanced and has no outputs."
                ),
                (
                    DiagnosticKind::ZeroEfficiency,
                    "Converter:boiler: conversion factor of heat is zero at step 1."
                ),
                (
                    DiagnosticKind::ZeroEfficiency,
                    "Storage:tank: outflow_conversion_factor is zero at step 0."
                ),
            ]
        );
        Ok(())
    }
}
