// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Functions for annualising investment costs and discounting future costs.

/// Returns the annuity of `capex`, paid over `n` years at the interest rate
/// `wacc`.
///
/// ```
/// use solph::economics::annuity;
///
/// assert!((annuity(1000.0, 20, 0.05) - 80.2426).abs() < 1e-4);
/// assert_eq!(annuity(1000.0, 20, 0.0), 50.0);
/// ```
pub fn annuity(capex: f64, n: u32, wacc: f64) -> f64 {
    if n == 0 {
        return capex;
    }
    if wacc == 0.0 {
        return capex / n as f64;
    }
    let factor = (1.0 + wacc).powi(n as i32);
    capex * (wacc * factor) / (factor - 1.0)
}

/// Returns the factor that discounts costs in year `year` to the start of the
/// horizon.
pub fn discount_factor(rate: f64, year: i32) -> f64 {
    (1.0 + rate).powi(-year)
}

/// Returns the present value of an annual payment of `1` over `n` years.
pub fn present_value_factor(n: u32, rate: f64) -> f64 {
    1.0 / annuity(1.0, n, rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annuity() {
        assert!((annuity(100.0, 10, 0.1) - 16.2745).abs() < 1e-4);
        assert_eq!(annuity(100.0, 4, 0.0), 25.0);
        assert_eq!(annuity(100.0, 0, 0.1), 100.0);
    }

    #[test]
    fn test_discounting() {
        assert_eq!(discount_factor(0.1, 0), 1.0);
        assert!((discount_factor(0.1, 2) - 1.0 / 1.21).abs() < 1e-12);
        assert_eq!(present_value_factor(5, 0.0), 5.0);
        let pv = present_value_factor(10, 0.05);
        let expected: f64 = (1..=10).map(|y| 1.0 / 1.05f64.powi(y)).sum();
        assert!((pv - expected).abs() < 1e-9);
    }
}
