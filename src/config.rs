// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! This module contains the configuration options for building an
//! [`EnergySystem`][crate::EnergySystem], turning it into a
//! [`Model`][crate::Model] and solving that model.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use indexmap::IndexMap;

use crate::Sequence;

/// Configuration options for the `EnergySystem`.
#[derive(Clone, Default, Debug)]
pub struct EnergySystemConfig {
    /// Whether to allow nodes that have no flows attached to them.
    pub allow_unconnected_nodes: bool,

    /// Whether to accept storages whose `min_level` exceeds `max_level` at
    /// some step.  Such storages are infeasible, so this is only useful for
    /// inspecting the generated problem.
    pub allow_unbalanced_storage_profiles: bool,
}

/// Weights used to combine the objectives of a multi-objective model.
///
/// Objectives that have no explicit weight are weighted with `1.0`.
#[derive(Clone, Default, Debug)]
pub struct ObjectiveWeights(IndexMap<String, f64>);

impl ObjectiveWeights {
    /// Returns the weights with `weight` set for the objective `name`.
    pub fn with(mut self, name: impl Into<String>, weight: f64) -> Self {
        self.0.insert(name.into(), weight);
        self
    }

    /// Returns the weight of the objective `name`.
    pub fn weight(&self, name: &str) -> f64 {
        self.0.get(name).copied().unwrap_or(1.0)
    }
}

/// Configuration options for building a `Model`.
#[derive(Clone, Debug)]
pub struct ModelConfig {
    /// Per-step weights applied to all time-integrated cost terms.  When
    /// `None`, the step weights of the time axis are used.
    pub objective_weighting: Option<Sequence>,

    /// Discount rate for multi-period models.
    pub discount_rate: f64,

    /// Whether balanced buses get a nonnegative `excess` variable.
    pub slack_excess: bool,

    /// Whether balanced buses get a nonnegative `shortage` variable.
    pub slack_shortage: bool,

    /// Penalty per unit of energy for `excess` variables.
    pub excess_costs: f64,

    /// Penalty per unit of energy for `shortage` variables.
    pub shortage_costs: f64,

    /// Whether to build the LP relaxation of the problem.
    pub relax_integrality: bool,

    /// Weights of the named objectives of multi-objective flows.
    pub objective: ObjectiveWeights,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            objective_weighting: None,
            discount_rate: 0.02,
            slack_excess: false,
            slack_shortage: false,
            excess_costs: 1e6,
            shortage_costs: 1e6,
            relax_integrality: false,
            objective: ObjectiveWeights::default(),
        }
    }
}

/// The solver that a `Model` is handed to.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum SolverBackend {
    /// The pure-rust `microlp` solver, running in-process.
    #[default]
    Microlp,
    /// An external `cbc` executable.  The path can be overridden with the
    /// `SOLPH_CBC_PATH` environment variable.
    Cbc,
}

/// A handle for interrupting a running solve from another thread.
#[derive(Clone, Default, Debug)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Requests the cancellation of the solve that holds this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` if the cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Configuration options for solving a `Model`.
#[derive(Clone, Default, Debug)]
pub struct SolverConfig {
    /// The solver to use.
    pub backend: SolverBackend,

    /// Wall time limit for the solver.
    pub time_limit: Option<Duration>,

    /// Relative MIP gap at which the solver may stop.
    pub mip_gap: Option<f64>,

    /// When `true`, a non-optimal termination is returned as an error
    /// instead of being reported on the `SolveResult`.
    pub strict: bool,

    /// Whether to keep the temporary files written for external solvers.
    pub keep_files: bool,

    /// Interrupts the solver subprocess when cancelled.
    pub cancellation: Option<CancellationToken>,
}

impl SolverConfig {
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}
