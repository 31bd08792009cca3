// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! This module defines the `Flow` struct, the directed edge between two nodes
//! of an energy system.

use indexmap::IndexMap;

use crate::{Investment, MultiObjective, NonConvex, Sequence};

/// A directed, nonnegative power between two nodes, with one variable per
/// step.
///
/// Without a feature attached, `0 <= flow(t) <= nominal_capacity * max(t)`
/// and `flow(t) >= nominal_capacity * min(t)`.  An attached [`Investment`]
/// replaces `nominal_capacity` with a decision variable, and an attached
/// [`NonConvex`] makes the lower bound apply only while the flow is active.
#[derive(Clone, Debug, PartialEq)]
pub struct Flow {
    pub nominal_capacity: Option<f64>,

    /// Upper bound relative to the capacity.  Defaults to `1.0`.
    pub max: Sequence,

    /// Lower bound relative to the capacity.  Defaults to `0.0`.
    pub min: Sequence,

    /// Fixes the flow to `capacity * fix(t)`.  Replaces `min` and `max`, which
    /// have to keep their defaults.
    pub fix: Option<Sequence>,

    /// Costs per unit of energy.
    pub variable_costs: Option<Sequence>,

    /// Largest increase from one step to the next, relative to the capacity.
    pub positive_gradient_limit: Option<Sequence>,

    /// Largest decrease from one step to the next, relative to the capacity.
    pub negative_gradient_limit: Option<Sequence>,

    /// Lower bound on the full load hours of the flow over the whole time
    /// axis, all periods together.  With an investment, the capacity is the
    /// sum of the capacities of all periods.
    pub full_load_time_min: Option<f64>,

    /// Upper bound on the full load hours of the flow over the whole time
    /// axis, see `full_load_time_min`.
    pub full_load_time_max: Option<f64>,

    /// Restricts the flow to nonnegative integers.
    pub integer: bool,

    /// Yearly costs per unit of capacity, per period.  Only used in
    /// multi-period models.
    pub fixed_costs: Option<Sequence>,

    /// Years the flow can operate.  Only used in multi-period models.
    pub lifetime: Option<u32>,

    /// Age in years at the start of the horizon.
    pub age: u32,

    pub investment: Option<Investment>,
    pub nonconvex: Option<NonConvex>,
    pub multiobjective: Option<MultiObjective>,

    /// Keyword-tagged values, used by keyword based constraints and by
    /// integral limits.
    pub custom_attributes: IndexMap<String, Sequence>,
}

impl Default for Flow {
    fn default() -> Self {
        Self {
            nominal_capacity: None,
            max: 1.0.into(),
            min: 0.0.into(),
            fix: None,
            variable_costs: None,
            positive_gradient_limit: None,
            negative_gradient_limit: None,
            full_load_time_min: None,
            full_load_time_max: None,
            integer: false,
            fixed_costs: None,
            lifetime: None,
            age: 0,
            investment: None,
            nonconvex: None,
            multiobjective: None,
            custom_attributes: IndexMap::new(),
        }
    }
}

impl Flow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nominal_capacity(mut self, capacity: f64) -> Self {
        self.nominal_capacity = Some(capacity);
        self
    }

    pub fn with_max(mut self, max: impl Into<Sequence>) -> Self {
        self.max = max.into();
        self
    }

    pub fn with_min(mut self, min: impl Into<Sequence>) -> Self {
        self.min = min.into();
        self
    }

    pub fn with_fix(mut self, fix: impl Into<Sequence>) -> Self {
        self.fix = Some(fix.into());
        self
    }

    pub fn with_variable_costs(mut self, costs: impl Into<Sequence>) -> Self {
        self.variable_costs = Some(costs.into());
        self
    }

    pub fn with_positive_gradient_limit(mut self, limit: impl Into<Sequence>) -> Self {
        self.positive_gradient_limit = Some(limit.into());
        self
    }

    pub fn with_negative_gradient_limit(mut self, limit: impl Into<Sequence>) -> Self {
        self.negative_gradient_limit = Some(limit.into());
        self
    }

    pub fn with_full_load_time_min(mut self, hours: f64) -> Self {
        self.full_load_time_min = Some(hours);
        self
    }

    pub fn with_full_load_time_max(mut self, hours: f64) -> Self {
        self.full_load_time_max = Some(hours);
        self
    }

    pub fn with_integer(mut self) -> Self {
        self.integer = true;
        self
    }

    pub fn with_fixed_costs(mut self, costs: impl Into<Sequence>) -> Self {
        self.fixed_costs = Some(costs.into());
        self
    }

    pub fn with_lifetime(mut self, lifetime: u32) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = age;
        self
    }

    pub fn with_investment(mut self, investment: Investment) -> Self {
        self.investment = Some(investment);
        self
    }

    pub fn with_nonconvex(mut self, nonconvex: NonConvex) -> Self {
        self.nonconvex = Some(nonconvex);
        self
    }

    pub fn with_multiobjective(mut self, multiobjective: MultiObjective) -> Self {
        self.multiobjective = Some(multiobjective);
        self
    }

    pub fn with_custom_attribute(
        mut self,
        keyword: impl Into<String>,
        value: impl Into<Sequence>,
    ) -> Self {
        self.custom_attributes.insert(keyword.into(), value.into());
        self
    }

    /// Returns `true` if the capacity of the flow is known, either as a fixed
    /// value or as an investment decision.
    pub fn has_capacity(&self) -> bool {
        self.nominal_capacity.is_some() || self.investment.is_some()
    }

    /// Returns `true` if any of the bounds of the flow is relative to its
    /// capacity.
    pub(crate) fn needs_capacity(&self) -> bool {
        self.fix.is_some()
            || !self.min.is_zero()
            || self.positive_gradient_limit.is_some()
            || self.negative_gradient_limit.is_some()
            || self.full_load_time_min.is_some()
            || self.full_load_time_max.is_some()
            || self.nonconvex.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let flow = Flow::new();
        assert_eq!(flow.max, Sequence::Scalar(1.0));
        assert_eq!(flow.min, Sequence::Scalar(0.0));
        assert!(!flow.has_capacity());
        assert!(!flow.needs_capacity());
    }

    #[test]
    fn test_needs_capacity() {
        assert!(Flow::new().with_fix([1.0, 0.5]).needs_capacity());
        assert!(Flow::new().with_min(0.2).needs_capacity());
        assert!(Flow::new()
            .with_positive_gradient_limit(0.1)
            .needs_capacity());
        assert!(Flow::new().with_full_load_time_max(10.0).needs_capacity());
        assert!(Flow::new()
            .with_nonconvex(NonConvex::default())
            .needs_capacity());
        assert!(!Flow::new().with_variable_costs(5.0).needs_capacity());
        assert!(Flow::new()
            .with_investment(Investment::default())
            .has_capacity());
    }
}
