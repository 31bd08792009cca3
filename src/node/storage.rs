// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

use crate::{Investment, Sequence};

/// A node that holds energy across steps.
///
/// A storage has exactly one input flow (charging) and one output flow
/// (discharging).  Its content evolves as
///
/// ```text
/// content(t+1) = content(t) * (1 - loss_rate(t))^weight(t)
///              - fixed_losses_relative(t) * capacity * weight(t)
///              - fixed_losses_absolute(t) * weight(t)
///              + inflow_conversion_factor(t) * inflow(t) * weight(t)
///              - outflow(t) * weight(t) / outflow_conversion_factor(t)
/// ```
///
/// and stays within `capacity * [min_level(t), max_level(t)]`.  The loss rate
/// is a relative loss per hour, compounded over the hours of a step.
#[derive(Clone, Debug, PartialEq)]
pub struct Storage {
    pub label: String,

    /// Fixed storage capacity.  Ignored when `investment` is set.
    pub nominal_capacity: Option<f64>,

    /// Makes the storage capacity a decision variable.
    pub investment: Option<Investment>,

    /// Content at the start of the horizon (of each period, in multi-period
    /// models), relative to the capacity.
    pub initial_level: Option<f64>,

    /// Whether the content at the end of the horizon has to match the content
    /// at its start.
    pub balanced: bool,

    pub loss_rate: Sequence,
    pub fixed_losses_relative: Sequence,
    pub fixed_losses_absolute: Sequence,
    pub inflow_conversion_factor: Sequence,
    pub outflow_conversion_factor: Sequence,
    pub min_level: Sequence,
    pub max_level: Sequence,

    /// Ratio between the invested input flow capacity and the invested
    /// storage capacity.
    pub invest_relation_input_capacity: Option<f64>,

    /// Ratio between the invested output flow capacity and the invested
    /// storage capacity.
    pub invest_relation_output_capacity: Option<f64>,

    /// Ratio between the invested input flow capacity and the invested output
    /// flow capacity.
    pub invest_relation_input_output: Option<f64>,
}

impl Storage {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            nominal_capacity: None,
            investment: None,
            initial_level: None,
            balanced: true,
            loss_rate: 0.0.into(),
            fixed_losses_relative: 0.0.into(),
            fixed_losses_absolute: 0.0.into(),
            inflow_conversion_factor: 1.0.into(),
            outflow_conversion_factor: 1.0.into(),
            min_level: 0.0.into(),
            max_level: 1.0.into(),
            invest_relation_input_capacity: None,
            invest_relation_output_capacity: None,
            invest_relation_input_output: None,
        }
    }

    pub fn with_nominal_capacity(mut self, capacity: f64) -> Self {
        self.nominal_capacity = Some(capacity);
        self
    }

    pub fn with_investment(mut self, investment: Investment) -> Self {
        self.investment = Some(investment);
        self
    }

    pub fn with_initial_level(mut self, level: f64) -> Self {
        self.initial_level = Some(level);
        self
    }

    pub fn with_balanced(mut self, balanced: bool) -> Self {
        self.balanced = balanced;
        self
    }

    pub fn with_loss_rate(mut self, rate: impl Into<Sequence>) -> Self {
        self.loss_rate = rate.into();
        self
    }

    pub fn with_fixed_losses_relative(mut self, losses: impl Into<Sequence>) -> Self {
        self.fixed_losses_relative = losses.into();
        self
    }

    pub fn with_fixed_losses_absolute(mut self, losses: impl Into<Sequence>) -> Self {
        self.fixed_losses_absolute = losses.into();
        self
    }

    pub fn with_inflow_conversion_factor(mut self, factor: impl Into<Sequence>) -> Self {
        self.inflow_conversion_factor = factor.into();
        self
    }

    pub fn with_outflow_conversion_factor(mut self, factor: impl Into<Sequence>) -> Self {
        self.outflow_conversion_factor = factor.into();
        self
    }

    pub fn with_min_level(mut self, level: impl Into<Sequence>) -> Self {
        self.min_level = level.into();
        self
    }

    pub fn with_max_level(mut self, level: impl Into<Sequence>) -> Self {
        self.max_level = level.into();
        self
    }

    pub fn with_invest_relation_input_capacity(mut self, ratio: f64) -> Self {
        self.invest_relation_input_capacity = Some(ratio);
        self
    }

    pub fn with_invest_relation_output_capacity(mut self, ratio: f64) -> Self {
        self.invest_relation_output_capacity = Some(ratio);
        self
    }

    pub fn with_invest_relation_input_output(mut self, ratio: f64) -> Self {
        self.invest_relation_input_output = Some(ratio);
        self
    }

    /// Returns `true` if the storage capacity is a decision variable.
    pub fn is_investment(&self) -> bool {
        self.investment.is_some()
    }
}
