// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! A scalar-or-sequence parameter type.

use crate::Error;

/// A parameter that is either a single value for all time steps, or one
/// value per time step.
///
/// All cost, efficiency and profile parameters are `Sequence`s.  Indexing a
/// `Scalar` returns the same value for every step, indexing a `Series`
/// returns the value at that step.
#[derive(Clone, Debug, PartialEq)]
pub enum Sequence {
    Scalar(f64),
    Series(Vec<f64>),
}

impl Sequence {
    /// Returns the value at step `t`.
    ///
    /// Series have to be checked with [`check_len`][Sequence::check_len]
    /// before being indexed.  `EnergySystem::validate` does that for all the
    /// sequences of the system, so the model builder can index freely.
    pub fn get(&self, t: usize) -> f64 {
        match self {
            Self::Scalar(v) => *v,
            Self::Series(values) => values[t],
        }
    }

    /// Returns an error if the sequence is a series with fewer than `len`
    /// values.
    pub fn check_len(&self, len: usize) -> Result<(), Error> {
        match self {
            Self::Series(values) if values.len() < len => Err(Error::invalid_length(format!(
                "Sequence has {} values, but {len} are required.",
                values.len()
            ))),
            _ => Ok(()),
        }
    }

    /// Returns the largest value of the sequence.
    pub fn max(&self) -> f64 {
        match self {
            Self::Scalar(v) => *v,
            Self::Series(values) => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }

    /// Returns the smallest value of the sequence.
    pub fn min(&self) -> f64 {
        match self {
            Self::Scalar(v) => *v,
            Self::Series(values) => values.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }

    /// Returns `true` if all values are zero.
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Scalar(v) => *v == 0.0,
            Self::Series(values) => values.iter().all(|v| *v == 0.0),
        }
    }

    /// Returns the first `len` values as a vector.
    pub fn to_vec(&self, len: usize) -> Vec<f64> {
        (0..len).map(|t| self.get(t)).collect()
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::Scalar(0.0)
    }
}

impl From<f64> for Sequence {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<f64>> for Sequence {
    fn from(values: Vec<f64>) -> Self {
        Self::Series(values)
    }
}

impl From<&[f64]> for Sequence {
    fn from(values: &[f64]) -> Self {
        Self::Series(values.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for Sequence {
    fn from(values: [f64; N]) -> Self {
        Self::Series(values.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_broadcast() {
        let scalar = Sequence::from(2.5);
        let series = Sequence::from(vec![2.5; 4]);
        assert_eq!(scalar.to_vec(4), series.to_vec(4));
        assert!(scalar.check_len(1_000).is_ok());
    }

    #[test]
    fn test_check_len() {
        let series = Sequence::from([1.0, 2.0, 3.0]);
        assert!(series.check_len(3).is_ok());
        assert!(series.check_len(2).is_ok());
        assert!(series
            .check_len(4)
            .is_err_and(|e| e == Error::invalid_length("Sequence has 3 values, but 4 are required.")));
    }

    #[test]
    fn test_min_max() {
        let series = Sequence::from([1.0, -2.0, 3.0]);
        assert_eq!(series.max(), 3.0);
        assert_eq!(series.min(), -2.0);
        assert!(!series.is_zero());
        assert!(Sequence::default().is_zero());
        assert!(Sequence::from([0.0, 0.0]).is_zero());
    }
}
