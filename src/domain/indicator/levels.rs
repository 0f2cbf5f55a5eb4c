//! Rolling resistance / support levels.
//!
//! Both look at the `n` bars before the current one, so the current bar can
//! break through the level it is compared against.

use crate::domain::bar_series::BarSeries;
use crate::domain::error::EngineError;

/// max(high) over the prior `n` bars.
pub fn resistance(series: &BarSeries, n: usize) -> Result<f64, EngineError> {
    series.require("RESISTANCE", n.max(1) + 1)?;
    Ok(series
        .prior_window(n.max(1))
        .map(|b| b.high)
        .fold(f64::NEG_INFINITY, f64::max))
}

/// min(low) over the prior `n` bars.
pub fn support(series: &BarSeries, n: usize) -> Result<f64, EngineError> {
    series.require("SUPPORT", n.max(1) + 1)?;
    Ok(series
        .prior_window(n.max(1))
        .map(|b| b.low)
        .fold(f64::INFINITY, f64::min))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::series_of;

    #[test]
    fn resistance_ignores_current_bar() {
        let series = series_of(&[
            (101.0, 99.0, 100.0, 1000),
            (102.0, 100.0, 101.0, 1000),
            (100.5, 98.0, 99.0, 1000),
            (110.0, 104.0, 108.0, 1000),
        ]);
        assert!((resistance(&series, 3).unwrap() - 102.0).abs() < f64::EPSILON);
    }

    #[test]
    fn resistance_only_uses_last_n_prior() {
        let series = series_of(&[
            (150.0, 99.0, 100.0, 1000),
            (102.0, 100.0, 101.0, 1000),
            (100.5, 98.0, 99.0, 1000),
            (110.0, 104.0, 108.0, 1000),
        ]);
        assert!((resistance(&series, 2).unwrap() - 102.0).abs() < f64::EPSILON);
    }

    #[test]
    fn support_is_lowest_prior_low() {
        let series = series_of(&[
            (101.0, 99.0, 100.0, 1000),
            (102.0, 97.5, 101.0, 1000),
            (100.5, 98.0, 99.0, 1000),
            (99.0, 90.0, 91.0, 1000),
        ]);
        assert!((support(&series, 3).unwrap() - 97.5).abs() < f64::EPSILON);
    }

    #[test]
    fn insufficient_history() {
        let series = series_of(&[(101.0, 99.0, 100.0, 1000), (102.0, 100.0, 101.0, 1000)]);
        assert!(matches!(
            resistance(&series, 2),
            Err(EngineError::InsufficientHistory {
                needed: 3,
                available: 2,
                ..
            })
        ));
        assert!(support(&series, 2).is_err());
    }
}
