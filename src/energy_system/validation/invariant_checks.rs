// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Helper methods for checking invariants of an [`EnergySystem`].

use crate::{Error, Node, Sequence};

use super::EnergySystemValidator;

impl EnergySystemValidator<'_> {
    /// Checks that the given node has exactly `count` input flows.
    pub(super) fn ensure_input_count(&self, node: &Node, count: usize) -> Result<(), Error> {
        let found = self.es.inputs(node.label())?.count();
        if found != count {
            return Err(Error::invalid_graph(format!(
                "{}:{} must have exactly {count} input flow{}, found {found}.",
                node.kind(),
                node.label(),
                if count == 1 { "" } else { "s" }
            )));
        }
        Ok(())
    }

    /// Checks that the given node has exactly `count` output flows.
    pub(super) fn ensure_output_count(&self, node: &Node, count: usize) -> Result<(), Error> {
        let found = self.es.outputs(node.label())?.count();
        if found != count {
            return Err(Error::invalid_graph(format!(
                "{}:{} must have exactly {count} output flow{}, found {found}.",
                node.kind(),
                node.label(),
                if count == 1 { "" } else { "s" }
            )));
        }
        Ok(())
    }

    /// Checks that the given node has at least one input flow.
    pub(super) fn ensure_has_inputs(&self, node: &Node) -> Result<(), Error> {
        if self.es.inputs(node.label())?.next().is_none() {
            return Err(Error::invalid_graph(format!(
                "{}:{} must have at least one input flow.",
                node.kind(),
                node.label()
            )));
        }
        Ok(())
    }

    /// Checks that the given node has at least one output flow.
    pub(super) fn ensure_has_outputs(&self, node: &Node) -> Result<(), Error> {
        if self.es.outputs(node.label())?.next().is_none() {
            return Err(Error::invalid_graph(format!(
                "{}:{} must have at least one output flow.",
                node.kind(),
                node.label()
            )));
        }
        Ok(())
    }

    /// Checks that a per-step sequence covers all steps of the time axis.
    pub(super) fn ensure_steps(
        &self,
        owner: &str,
        name: &str,
        sequence: &Sequence,
    ) -> Result<(), Error> {
        sequence
            .check_len(self.steps)
            .map_err(|e| Error::invalid_length(format!("{owner} {name}: {}", e.description())))
    }

    /// Checks that a per-period sequence covers all periods of the time axis.
    pub(super) fn ensure_periods(
        &self,
        owner: &str,
        name: &str,
        sequence: &Sequence,
    ) -> Result<(), Error> {
        sequence
            .check_len(self.periods)
            .map_err(|e| Error::invalid_length(format!("{owner} {name}: {}", e.description())))
    }

    /// Checks that `lower(t) <= upper(t)` for all steps.
    pub(super) fn ensure_ordered(
        &self,
        owner: &str,
        (lower_name, lower): (&str, &Sequence),
        (upper_name, upper): (&str, &Sequence),
    ) -> Result<(), Error> {
        for t in 0..self.steps {
            if lower.get(t) > upper.get(t) {
                return Err(Error::infeasible_profile(format!(
                    "{owner} {lower_name} {} exceeds {upper_name} {} at step {t}.",
                    lower.get(t),
                    upper.get(t)
                )));
            }
        }
        Ok(())
    }
}
