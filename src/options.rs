// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Optional features that can be attached to flows and storages.

use indexmap::IndexMap;

use crate::Sequence;

/// Makes a capacity a decision variable.
///
/// Sequence-valued fields are indexed by period.  A single-period model only
/// uses their first value.
#[derive(Clone, Debug, PartialEq)]
pub struct Investment {
    /// Smallest investment, if any investment is made at all.
    pub minimum: Sequence,

    /// Largest investment.
    pub maximum: Sequence,

    /// Equivalent periodical costs per unit of invested capacity.
    pub ep_costs: Sequence,

    /// Capacity that exists without any investment.
    pub existing: f64,

    /// Fixed costs of a nonconvex investment, paid if any capacity is
    /// installed.
    pub offset: Sequence,

    /// Whether an investment is a yes/no decision with `minimum` applying only
    /// when it is made.
    pub nonconvex: bool,

    /// Years the invested capacity can operate.  Required in multi-period
    /// models.
    pub lifetime: Option<u32>,

    /// Age of the existing capacity at the start of the horizon.
    pub age: u32,

    /// Interest rate for annualising investment costs.  Defaults to the
    /// discount rate of the model.
    pub interest_rate: Option<f64>,

    /// Yearly costs per unit of capacity, per period.
    pub fixed_costs: Option<Sequence>,

    /// Upper bound on the total capacity in every period.
    pub overall_maximum: Option<f64>,

    /// Lower bound on the total capacity in the last period.
    pub overall_minimum: Option<f64>,

    /// Weights per unit of invested capacity, by keyword, for
    /// [`additional_investment_flow_limit`][crate::constraints::additional_investment_flow_limit].
    pub custom_attributes: IndexMap<String, f64>,
}

impl Default for Investment {
    fn default() -> Self {
        Self {
            minimum: 0.0.into(),
            maximum: f64::INFINITY.into(),
            ep_costs: 0.0.into(),
            existing: 0.0,
            offset: 0.0.into(),
            nonconvex: false,
            lifetime: None,
            age: 0,
            interest_rate: None,
            fixed_costs: None,
            overall_maximum: None,
            overall_minimum: None,
            custom_attributes: IndexMap::new(),
        }
    }
}

impl Investment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_minimum(mut self, minimum: impl Into<Sequence>) -> Self {
        self.minimum = minimum.into();
        self
    }

    pub fn with_maximum(mut self, maximum: impl Into<Sequence>) -> Self {
        self.maximum = maximum.into();
        self
    }

    pub fn with_ep_costs(mut self, costs: impl Into<Sequence>) -> Self {
        self.ep_costs = costs.into();
        self
    }

    pub fn with_existing(mut self, existing: f64) -> Self {
        self.existing = existing;
        self
    }

    /// Makes the investment nonconvex, with `offset` paid whenever capacity is
    /// installed.
    pub fn with_offset(mut self, offset: impl Into<Sequence>) -> Self {
        self.offset = offset.into();
        self.nonconvex = true;
        self
    }

    pub fn with_nonconvex(mut self, nonconvex: bool) -> Self {
        self.nonconvex = nonconvex;
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

    pub fn with_interest_rate(mut self, rate: f64) -> Self {
        self.interest_rate = Some(rate);
        self
    }

    pub fn with_fixed_costs(mut self, costs: impl Into<Sequence>) -> Self {
        self.fixed_costs = Some(costs.into());
        self
    }

    pub fn with_overall_maximum(mut self, maximum: f64) -> Self {
        self.overall_maximum = Some(maximum);
        self
    }

    pub fn with_overall_minimum(mut self, minimum: f64) -> Self {
        self.overall_minimum = Some(minimum);
        self
    }

    pub fn with_custom_attribute(mut self, keyword: impl Into<String>, value: f64) -> Self {
        self.custom_attributes.insert(keyword.into(), value);
        self
    }
}

/// On/off behaviour of a flow.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NonConvex {
    pub startup_costs: Option<Sequence>,
    pub shutdown_costs: Option<Sequence>,

    /// Costs per hour of being active.
    pub activity_costs: Option<Sequence>,

    /// Costs per hour of being inactive.
    pub inactivity_costs: Option<Sequence>,

    /// Steps the flow stays active after a startup.
    pub minimum_uptime: usize,

    /// Steps the flow stays inactive after a shutdown.
    pub minimum_downtime: usize,

    pub maximum_startups: Option<f64>,
    pub maximum_shutdowns: Option<f64>,

    /// Status before the first step.
    pub initial_status: bool,

    /// Largest increase between two steps while active, relative to the
    /// capacity.
    pub positive_gradient_limit: Option<Sequence>,

    /// Largest decrease between two steps while active, relative to the
    /// capacity.
    pub negative_gradient_limit: Option<Sequence>,
}

impl NonConvex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_startup_costs(mut self, costs: impl Into<Sequence>) -> Self {
        self.startup_costs = Some(costs.into());
        self
    }

    pub fn with_shutdown_costs(mut self, costs: impl Into<Sequence>) -> Self {
        self.shutdown_costs = Some(costs.into());
        self
    }

    pub fn with_activity_costs(mut self, costs: impl Into<Sequence>) -> Self {
        self.activity_costs = Some(costs.into());
        self
    }

    pub fn with_inactivity_costs(mut self, costs: impl Into<Sequence>) -> Self {
        self.inactivity_costs = Some(costs.into());
        self
    }

    pub fn with_minimum_uptime(mut self, steps: usize) -> Self {
        self.minimum_uptime = steps;
        self
    }

    pub fn with_minimum_downtime(mut self, steps: usize) -> Self {
        self.minimum_downtime = steps;
        self
    }

    pub fn with_maximum_startups(mut self, startups: f64) -> Self {
        self.maximum_startups = Some(startups);
        self
    }

    pub fn with_maximum_shutdowns(mut self, shutdowns: f64) -> Self {
        self.maximum_shutdowns = Some(shutdowns);
        self
    }

    pub fn with_initial_status(mut self, active: bool) -> Self {
        self.initial_status = active;
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

    pub(crate) fn needs_startup(&self) -> bool {
        self.startup_costs.is_some() || self.maximum_startups.is_some()
    }

    pub(crate) fn needs_shutdown(&self) -> bool {
        self.shutdown_costs.is_some() || self.maximum_shutdowns.is_some()
    }
}

/// Variable costs of a flow per named objective.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultiObjective {
    pub costs: IndexMap<String, Sequence>,
}

impl MultiObjective {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_costs(mut self, objective: impl Into<String>, costs: impl Into<Sequence>) -> Self {
        self.costs.insert(objective.into(), costs.into());
        self
    }
}
