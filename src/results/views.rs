// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Selections of [`Results`].

use indexmap::IndexMap;

use crate::{NodeResults, ResultKey, Results};

/// Returns the results of the node with the given `label` and of all flows
/// going into or coming out of it.
pub fn node<'a>(results: &'a Results, label: &str) -> IndexMap<&'a ResultKey, &'a NodeResults> {
    results
        .iter()
        .filter(|(key, _)| key.source == label || key.target.as_deref() == Some(label))
        .collect()
}

/// Returns the sequence `metric` of every flow or node that has one.
pub fn filter_by_metric<'a>(
    results: &'a Results,
    metric: &str,
) -> IndexMap<&'a ResultKey, &'a [f64]> {
    results
        .iter()
        .filter_map(|(key, r)| r.sequences.get(metric).map(|values| (key, values.as_slice())))
        .collect()
}
