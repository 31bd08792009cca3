// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

use indexmap::IndexMap;

use crate::Sequence;

/// Transforms its inputs into its outputs in fixed ratios.
///
/// Conversion factors are keyed by the label of the connected node.  For the
/// reference input `r`, every output `o` satisfies
/// `flow(o, t) * cf(r, t) = flow(r, t) * cf(o, t)`, and every other input `i`
/// satisfies `flow(i, t) * cf(r, t) = flow(r, t) * cf(i, t)`.  Inputs without
/// an explicit factor have a factor of `1.0`.  Every output needs a factor.
#[derive(Clone, Debug, PartialEq)]
pub struct Converter {
    pub label: String,
    pub conversion_factors: IndexMap<String, Sequence>,

    /// Label of the input all other flows are related to.  Defaults to the
    /// first input flow added to the energy system.
    pub reference_input: Option<String>,
}

impl Converter {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            conversion_factors: IndexMap::new(),
            reference_input: None,
        }
    }

    pub fn with_conversion_factor(
        mut self,
        node: impl Into<String>,
        factor: impl Into<Sequence>,
    ) -> Self {
        self.conversion_factors.insert(node.into(), factor.into());
        self
    }

    pub fn with_reference_input(mut self, node: impl Into<String>) -> Self {
        self.reference_input = Some(node.into());
        self
    }

    /// Returns the conversion factor of the flow from or to `node`.
    pub(crate) fn factor(&self, node: &str) -> Option<&Sequence> {
        self.conversion_factors.get(node)
    }
}
