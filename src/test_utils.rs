// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! This module is only compiled when running unit tests and contains helpers
//! that are shared by the tests of all modules:
//!
//! - `hourly_axis`, for a time axis of hourly steps starting in 2020, and
//!   `hours`, for the timestamps of one period of a multi-period axis.
//! - `solve` and `solve_model`, which solve with the in-process backend and
//!   fail unless the solution is optimal.
//! - `assert_close` and `assert_seq_close`, for comparing solution values.

use chrono::{NaiveDate, NaiveDateTime};

use crate::{
    EnergySystem, Error, Model, ModelConfig, Results, SolverConfig, SolverStatus,
    TerminationCondition, TimeAxis,
};

const TOLERANCE: f64 = 1e-6;

pub(crate) fn hourly_axis(steps: usize) -> TimeAxis {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap();
    TimeAxis::hourly(start, steps).unwrap()
}

/// `steps` hourly steps from the start of `year`, including the end of the
/// last step.
pub(crate) fn hours(year: i32, steps: u32) -> Vec<NaiveDateTime> {
    (0..=steps)
        .map(|h| {
            NaiveDate::from_ymd_opt(year, 1, 1)
                .and_then(|d| d.and_hms_opt(h, 0, 0))
                .unwrap()
        })
        .collect()
}

/// Builds the model for `es` and solves it.
pub(crate) fn solve(es: &EnergySystem, config: ModelConfig) -> Result<(Model, Results), Error> {
    let mut model = Model::new(es, config)?;
    let results = solve_model(&mut model)?;
    Ok((model, results))
}

/// Solves a model that was built already, for example one with additional
/// constraints.
pub(crate) fn solve_model(model: &mut Model) -> Result<Results, Error> {
    let result = model.solve(&SolverConfig::default())?;
    assert_eq!(
        (result.status, &result.termination),
        (SolverStatus::Ok, &TerminationCondition::Optimal)
    );
    model.results()
}

#[track_caller]
pub(crate) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= TOLERANCE * expected.abs().max(1.0),
        "expected {expected}, got {actual}"
    );
}

#[track_caller]
pub(crate) fn assert_seq_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "expected {expected:?}, got {actual:?}"
    );
    for (a, e) in actual.iter().zip(expected) {
        assert!(
            (a - e).abs() <= TOLERANCE * e.abs().max(1.0),
            "expected {expected:?}, got {actual:?}"
        );
    }
}
