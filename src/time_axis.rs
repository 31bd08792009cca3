// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! The time axis of an energy system: steps, their weights and the periods
//! they belong to.

use std::ops::Range;

use chrono::{Datelike, Duration, NaiveDateTime};

use crate::Error;

/// A contiguous block of years with its own investment decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Period {
    pub start: i32,
    pub end: i32,
}

impl Period {
    /// Creates a new period spanning the years `start..=end`.
    pub fn new(start: i32, end: i32) -> Result<Self, Error> {
        if start > end {
            return Err(Error::configuration(format!(
                "Period start year {start} is after its end year {end}."
            )));
        }
        Ok(Self { start, end })
    }

    /// Number of years in the period.
    pub fn years(&self) -> i32 {
        self.end - self.start + 1
    }
}

/// A monotonically increasing sequence of timestamps.
///
/// `N` timestamps define `N - 1` steps; step `t` spans
/// `[timestamp(t), timestamp(t + 1))`, and its weight is the length of that
/// span in hours.  In multi-period mode every period brings its own
/// timestamps, and steps are numbered consecutively across periods.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeAxis {
    starts: Vec<NaiveDateTime>,
    weights: Vec<f64>,
    step_periods: Vec<usize>,
    periods: Vec<Period>,
    period_steps: Vec<Range<usize>>,
    multi_period: bool,
}

impl TimeAxis {
    /// Creates a single-period time axis from the given timestamps.
    pub fn new(timestamps: Vec<NaiveDateTime>) -> Result<Self, Error> {
        let weights = Self::segment_weights(&timestamps)?;
        let steps = weights.len();
        let first = timestamps[0];
        let last = timestamps[steps];
        let period = Period::new(first.year(), last.year())?;

        Ok(Self {
            starts: timestamps[..steps].to_vec(),
            weights,
            step_periods: vec![0; steps],
            periods: vec![period],
            period_steps: vec![0..steps],
            multi_period: false,
        })
    }

    /// Creates a single-period time axis with `steps` hourly steps starting at
    /// `start`.
    pub fn hourly(start: NaiveDateTime, steps: usize) -> Result<Self, Error> {
        Self::new(
            (0..=steps)
                .map(|h| start + Duration::hours(h as i64))
                .collect(),
        )
    }

    /// Creates a multi-period time axis, with one segment of timestamps per
    /// period.
    ///
    /// A period starts in the year of its first timestamp and ends in the year
    /// before the next period starts.  The last period ends in the year of its
    /// last timestamp.
    pub fn multi_period(segments: Vec<Vec<NaiveDateTime>>) -> Result<Self, Error> {
        if segments.is_empty() {
            return Err(Error::configuration(
                "A multi-period time axis needs at least one period.",
            ));
        }

        let mut axis = Self {
            starts: vec![],
            weights: vec![],
            step_periods: vec![],
            periods: vec![],
            period_steps: vec![],
            multi_period: true,
        };

        for (p, segment) in segments.iter().enumerate() {
            let weights = Self::segment_weights(segment)?;
            let steps = weights.len();

            if let Some(prev) = p.checked_sub(1).and_then(|q| segments[q].last()) {
                if segment[0] < *prev {
                    return Err(Error::configuration(format!(
                        "Period {p} starts at {}, before the end of the previous period.",
                        segment[0]
                    )));
                }
            }

            let start = segment[0].year();
            let end = match segments.get(p + 1) {
                Some(next) => next[0].year() - 1,
                None => segment[steps].year(),
            };
            axis.periods.push(Period::new(start, end)?);

            let offset = axis.starts.len();
            axis.period_steps.push(offset..offset + steps);
            axis.starts.extend_from_slice(&segment[..steps]);
            axis.weights.extend(weights);
            axis.step_periods.extend(std::iter::repeat(p).take(steps));
        }

        Ok(axis)
    }

    fn segment_weights(timestamps: &[NaiveDateTime]) -> Result<Vec<f64>, Error> {
        if timestamps.len() < 2 {
            return Err(Error::invalid_length(format!(
                "A time axis needs at least 2 timestamps, got {}.",
                timestamps.len()
            )));
        }
        timestamps
            .windows(2)
            .map(|w| {
                if w[1] <= w[0] {
                    return Err(Error::configuration(format!(
                        "Timestamps are not strictly increasing: {} -> {}",
                        w[0], w[1]
                    )));
                }
                Ok((w[1] - w[0]).num_seconds() as f64 / 3600.0)
            })
            .collect()
    }

    /// Number of steps on the axis.
    pub fn steps(&self) -> usize {
        self.weights.len()
    }

    /// Length of step `t` in hours.
    pub fn weight(&self, t: usize) -> f64 {
        self.weights[t]
    }

    /// Index of the period that step `t` belongs to.
    pub fn period(&self, t: usize) -> usize {
        self.step_periods[t]
    }

    /// The periods of the axis.  A single-period axis has exactly one.
    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    /// The range of steps that belong to period `p`.
    pub fn period_steps(&self, p: usize) -> Range<usize> {
        self.period_steps[p].clone()
    }

    /// Years between the start of the horizon and the start of period `p`.
    pub fn period_years(&self, p: usize) -> i32 {
        self.periods[p].start - self.periods[0].start
    }

    /// Years from the start of the horizon to the end of the last period.
    pub fn end_year(&self) -> i32 {
        match (self.periods.first(), self.periods.last()) {
            (Some(first), Some(last)) => last.end - first.start + 1,
            _ => 0,
        }
    }

    /// Index of the period that contains the year `year` of the horizon,
    /// counted from its start.
    pub fn period_of_year(&self, year: i32) -> usize {
        (0..self.periods.len())
            .rev()
            .find(|p| self.period_years(*p) <= year)
            .unwrap_or(0)
    }

    /// Start timestamp of step `t`.
    pub fn timestamp(&self, t: usize) -> NaiveDateTime {
        self.starts[t]
    }

    /// Whether the axis was created with [`multi_period`][TimeAxis::multi_period].
    pub fn is_multi_period(&self) -> bool {
        self.multi_period
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(year: i32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    #[test]
    fn test_single_period() -> Result<(), Error> {
        let axis = TimeAxis::new(vec![ts(2020, 0), ts(2020, 1), ts(2020, 3), ts(2020, 4)])?;
        assert_eq!(axis.steps(), 3);
        assert_eq!(
            (0..3).map(|t| axis.weight(t)).collect::<Vec<_>>(),
            vec![1.0, 2.0, 1.0]
        );
        assert_eq!(axis.periods(), &[Period { start: 2020, end: 2020 }]);
        assert_eq!(axis.period(2), 0);
        assert_eq!(axis.end_year(), 1);
        assert!(!axis.is_multi_period());
        assert_eq!(axis.timestamp(2), ts(2020, 3));
        Ok(())
    }

    #[test]
    fn test_hourly() -> Result<(), Error> {
        let axis = TimeAxis::hourly(ts(2021, 0), 24)?;
        assert_eq!(axis.steps(), 24);
        assert!((0..24).all(|t| axis.weight(t) == 1.0));
        assert!(TimeAxis::hourly(ts(2021, 0), 0).is_err_and(|e| e
            == Error::invalid_length("A time axis needs at least 2 timestamps, got 1.")));
        Ok(())
    }

    #[test]
    fn test_invalid_timestamps() {
        assert!(TimeAxis::new(vec![ts(2020, 2), ts(2020, 1)]).is_err_and(|e| e
            == Error::configuration(
                "Timestamps are not strictly increasing: 2020-01-01 02:00:00 -> 2020-01-01 01:00:00"
            )));
    }

    #[test]
    fn test_multi_period() -> Result<(), Error> {
        let axis = TimeAxis::multi_period(vec![
            vec![ts(2020, 0), ts(2020, 1), ts(2020, 2)],
            vec![ts(2025, 0), ts(2025, 1), ts(2025, 2), ts(2025, 3)],
            vec![ts(2030, 0), ts(2030, 2)],
        ])?;
        assert!(axis.is_multi_period());
        assert_eq!(axis.steps(), 6);
        assert_eq!(
            axis.periods(),
            &[
                Period { start: 2020, end: 2024 },
                Period { start: 2025, end: 2029 },
                Period { start: 2030, end: 2030 },
            ]
        );
        assert_eq!(axis.period_steps(1), 2..5);
        assert_eq!(axis.period(4), 1);
        assert_eq!(axis.period(5), 2);
        assert_eq!(axis.weight(5), 2.0);
        assert_eq!(axis.period_years(2), 10);
        assert_eq!(axis.end_year(), 11);
        assert_eq!(axis.period_of_year(7), 1);
        assert_eq!(axis.timestamp(2), ts(2025, 0));
        Ok(())
    }

    #[test]
    fn test_overlapping_periods() {
        let axis = TimeAxis::multi_period(vec![
            vec![ts(2020, 0), ts(2020, 5)],
            vec![ts(2020, 1), ts(2020, 2)],
        ]);
        assert!(axis.is_err_and(|e| e.kind() == crate::ErrorKind::ConfigurationError));
    }
}
