// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Bookkeeping of the variables that are reported in the results.

use indexmap::IndexMap;

use crate::lp::VarId;
use crate::ResultKey;

/// The variables reported for one result key, by metric name.
#[derive(Clone, Debug, Default)]
pub(crate) struct RegistryEntry {
    /// One variable.
    pub(crate) scalars: IndexMap<String, VarId>,
    /// One variable per step.
    pub(crate) sequences: IndexMap<String, Vec<VarId>>,
    /// One variable per period.
    pub(crate) periods: IndexMap<String, Vec<VarId>>,
}

/// The variables reported in the results, in the order they were created.
#[derive(Clone, Debug, Default)]
pub(crate) struct VariableRegistry {
    entries: IndexMap<ResultKey, RegistryEntry>,
}

impl VariableRegistry {
    fn entry(&mut self, key: &ResultKey) -> &mut RegistryEntry {
        self.entries.entry(key.clone()).or_default()
    }

    pub(crate) fn add_scalar(&mut self, key: &ResultKey, metric: &str, var: VarId) {
        self.entry(key).scalars.insert(metric.to_string(), var);
    }

    pub(crate) fn add_sequence(&mut self, key: &ResultKey, metric: &str, vars: Vec<VarId>) {
        self.entry(key).sequences.insert(metric.to_string(), vars);
    }

    pub(crate) fn add_periods(&mut self, key: &ResultKey, metric: &str, vars: Vec<VarId>) {
        self.entry(key).periods.insert(metric.to_string(), vars);
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&ResultKey, &RegistryEntry)> {
        self.entries.iter()
    }
}
