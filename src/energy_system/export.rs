// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Export of an [`EnergySystem`] to GraphML, for visualisation.

use std::fmt::Write;

use crate::EnergySystem;

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl EnergySystem {
    /// Returns the energy system as a GraphML document.
    ///
    /// Nodes carry their kind, edges carry the nominal capacity of their flow
    /// as `weight`, when it is known.
    pub fn to_graphml(&self) -> String {
        let mut out = String::new();
        // Writing into a `String` doesn't fail.
        let _ = self.write_graphml(&mut out);
        out
    }

    /// Writes the energy system as a GraphML document to `out`.
    pub fn write_graphml(&self, out: &mut impl Write) -> std::fmt::Result {
        writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(out, r#"<graphml xmlns="http://graphml.graphdrawing.org/xmlns">"#)?;
        writeln!(
            out,
            r#"  <key id="kind" for="node" attr.name="kind" attr.type="string"/>"#
        )?;
        writeln!(
            out,
            r#"  <key id="weight" for="edge" attr.name="weight" attr.type="double"/>"#
        )?;
        writeln!(out, r#"  <graph id="energy_system" edgedefault="directed">"#)?;

        for node in self.iter_nodes() {
            writeln!(
                out,
                r#"    <node id="{}"><data key="kind">{}</data></node>"#,
                escape(node.label()),
                node.kind()
            )?;
        }

        for flow in self.iter_flows() {
            let source = escape(flow.source.label());
            let target = escape(flow.target.label());
            match flow.flow.nominal_capacity {
                Some(capacity) => writeln!(
                    out,
                    r#"    <edge source="{source}" target="{target}"><data key="weight">{capacity}</data></edge>"#
                )?,
                None => writeln!(out, r#"    <edge source="{source}" target="{target}"/>"#)?,
            }
        }

        writeln!(out, "  </graph>")?;
        writeln!(out, "</graphml>")
    }
}
