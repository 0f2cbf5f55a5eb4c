//! Technical indicators over a [`BarSeries`].
//!
//! Every indicator is a pure function of the series contents and fails with
//! `InsufficientHistory` until enough bars are buffered:
//! - `levels`: resistance / support over the prior `n` bars
//! - `atr`: Wilder average true range
//! - `rsi`: Wilder relative strength oscillator in [0, 100]
//! - `volume`: simple moving average of volume

pub mod atr;
pub mod levels;
pub mod rsi;
pub mod volume;

pub use atr::atr;
pub use levels::{resistance, support};
pub use rsi::rsi;
pub use volume::volume_sma;

use std::fmt;

use crate::domain::bar_series::BarSeries;
use crate::domain::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Resistance(usize),
    Support(usize),
    Atr(usize),
    Rsi(usize),
    VolumeSma(usize),
}

impl IndicatorType {
    /// Bars that must be buffered before the indicator produces a value.
    pub fn required_bars(&self) -> usize {
        match *self {
            IndicatorType::Resistance(n) | IndicatorType::Support(n) => n + 1,
            IndicatorType::Atr(p) | IndicatorType::Rsi(p) => p + 1,
            IndicatorType::VolumeSma(p) => p,
        }
    }

    pub fn compute(&self, series: &BarSeries) -> Result<f64, EngineError> {
        match *self {
            IndicatorType::Resistance(n) => resistance(series, n),
            IndicatorType::Support(n) => support(series, n),
            IndicatorType::Atr(p) => atr(series, p),
            IndicatorType::Rsi(p) => rsi(series, p),
            IndicatorType::VolumeSma(p) => volume_sma(series, p),
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Resistance(n) => write!(f, "RESISTANCE({})", n),
            IndicatorType::Support(n) => write!(f, "SUPPORT({})", n),
            IndicatorType::Atr(p) => write!(f, "ATR({})", p),
            IndicatorType::Rsi(p) => write!(f, "RSI({})", p),
            IndicatorType::VolumeSma(p) => write!(f, "VOLUME_SMA({})", p),
        }
    }
}

/// Indicator values for the current bar of one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSet {
    pub resistance: f64,
    pub support: f64,
    pub atr: f64,
    pub rsi: f64,
    pub volume_sma: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPeriods {
    pub lookback: usize,
    pub atr: usize,
    pub rsi: usize,
    pub volume: usize,
}

impl IndicatorPeriods {
    pub fn types(&self) -> [IndicatorType; 5] {
        [
            IndicatorType::Resistance(self.lookback),
            IndicatorType::Support(self.lookback),
            IndicatorType::Atr(self.atr),
            IndicatorType::Rsi(self.rsi),
            IndicatorType::VolumeSma(self.volume),
        ]
    }

    /// Longest history any configured indicator needs.
    pub fn max_required_bars(&self) -> usize {
        self.types()
            .iter()
            .map(IndicatorType::required_bars)
            .max()
            .unwrap_or(1)
    }
}

impl IndicatorSet {
    pub fn compute(series: &BarSeries, periods: &IndicatorPeriods) -> Result<Self, EngineError> {
        Ok(IndicatorSet {
            resistance: resistance(series, periods.lookback)?,
            support: support(series, periods.lookback)?,
            atr: atr(series, periods.atr)?,
            rsi: rsi(series, periods.rsi)?,
            volume_sma: volume_sma(series, periods.volume)?,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn indicator_type_display() {
        assert_eq!(IndicatorType::Rsi(14).to_string(), "RSI(14)");
        assert_eq!(IndicatorType::VolumeSma(20).to_string(), "VOLUME_SMA(20)");
    }

    #[test]
    fn required_bars_per_indicator() {
        assert_eq!(IndicatorType::Resistance(20).required_bars(), 21);
        assert_eq!(IndicatorType::Atr(14).required_bars(), 15);
        assert_eq!(IndicatorType::VolumeSma(20).required_bars(), 20);
    }

    #[test]
    fn max_required_bars_picks_longest() {
        let periods = IndicatorPeriods {
            lookback: 5,
            atr: 14,
            rsi: 4,
            volume: 8,
        };
        assert_eq!(periods.max_required_bars(), 15);
    }

    #[test]
    fn set_fails_until_all_indicators_ready() {
        let periods = IndicatorPeriods {
            lookback: 2,
            atr: 2,
            rsi: 2,
            volume: 2,
        };
        let short = closes(&[100.0, 101.0]);
        assert!(matches!(
            IndicatorSet::compute(&short, &periods),
            Err(EngineError::InsufficientHistory { .. })
        ));

        let ready = closes(&[100.0, 101.0, 102.0]);
        let set = IndicatorSet::compute(&ready, &periods).unwrap();
        assert!((set.resistance - 101.0).abs() < f64::EPSILON);
        assert!((set.volume_sma - 1000.0).abs() < f64::EPSILON);
    }
}
