// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! CSV export of results.

use std::io::Write;

use chrono::{Duration, NaiveDateTime};

use crate::{Error, Results, TimeAxis};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

impl Results {
    /// Returns the results as CSV, see [`Results::write_csv`].
    pub fn to_csv(&self, time_axis: &TimeAxis) -> Result<String, Error> {
        let mut buffer = Vec::new();
        self.write_csv(time_axis, &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| Error::internal(format!("The CSV export isn't valid UTF-8: {e}")))
    }

    /// Writes the results as CSV to `out`, one row per value:
    ///
    /// ```text
    /// source,target,metric,timestamp,value
    /// ```
    ///
    /// Sequences are stamped with the start of their step, storage contents
    /// with the point in time they refer to, per-period values with the
    /// start of their period.  Scalars have an empty timestamp.
    pub fn write_csv(&self, time_axis: &TimeAxis, out: impl Write) -> Result<(), Error> {
        let steps: Vec<NaiveDateTime> = (0..time_axis.steps())
            .map(|t| time_axis.timestamp(t))
            .collect();
        let timepoints = timepoints(time_axis);
        let period_starts: Vec<NaiveDateTime> = (0..time_axis.periods().len())
            .map(|p| time_axis.timestamp(time_axis.period_steps(p).start))
            .collect();

        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(["source", "target", "metric", "timestamp", "value"])?;
        for (key, results) in self.iter() {
            let target = key.target.as_deref().unwrap_or_default();
            let mut row = |metric: &str,
                           timestamp: Option<&NaiveDateTime>,
                           value: f64|
             -> Result<(), Error> {
                let timestamp = timestamp
                    .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
                    .unwrap_or_default();
                writer.write_record([
                    key.source.as_str(),
                    target,
                    metric,
                    timestamp.as_str(),
                    value.to_string().as_str(),
                ])?;
                Ok(())
            };

            for (metric, value) in &results.scalars {
                row(metric, None, *value)?;
            }
            for (metric, values) in &results.sequences {
                let stamps = if values.len() == steps.len() {
                    &steps
                } else {
                    &timepoints
                };
                for (t, value) in values.iter().enumerate() {
                    row(metric, stamps.get(t), *value)?;
                }
            }
            for (metric, values) in &results.periods {
                for (p, value) in values.iter().enumerate() {
                    row(metric, period_starts.get(p), *value)?;
                }
            }
        }
        writer.flush()?;
        Ok(())
    }
}

/// The start of every step plus the end of the last step of every period.
fn timepoints(axis: &TimeAxis) -> Vec<NaiveDateTime> {
    let mut timepoints = Vec::with_capacity(axis.steps() + axis.periods().len());
    for p in 0..axis.periods().len() {
        let steps = axis.period_steps(p);
        timepoints.extend(steps.clone().map(|t| axis.timestamp(t)));
        if let Some(last) = steps.last() {
            let seconds = (axis.weight(last) * 3600.0).round() as i64;
            timepoints.push(axis.timestamp(last) + Duration::seconds(seconds));
        }
    }
    timepoints
}
