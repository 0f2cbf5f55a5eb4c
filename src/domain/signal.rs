//! Breakout signal detection with volume and momentum confirmation.
//!
//! A long entry needs ALL of:
//! 1. close > resistance and (close - resistance) / resistance ≥ min_breakout_pct × breakout_mult
//! 2. volume ≥ volume_sma × volume_threshold × volume_mult
//! 3. rsi_lower ≤ RSI ≤ rsi_upper
//! 4. bar timestamp inside the trading window
//! 5. ATR / close ≥ min_volatility_pct (only when the floor is non-zero)
//!
//! Threshold comparisons are inclusive so the boundary is deterministic.

use std::fmt;

use chrono::NaiveDateTime;

use super::bar_series::BarSeries;
use super::calibration::Calibration;
use super::error::EngineError;
use super::indicator::{IndicatorPeriods, IndicatorSet};
use super::ohlcv::Bar;
use super::session::TradingWindow;

#[derive(Debug, Clone, PartialEq)]
pub struct SignalParams {
    pub periods: IndicatorPeriods,
    pub volume_threshold: f64,
    pub rsi_lower: f64,
    pub rsi_upper: f64,
    pub min_breakout_pct: f64,
    pub min_volatility_pct: f64,
}

impl Default for SignalParams {
    fn default() -> Self {
        SignalParams {
            periods: IndicatorPeriods {
                lookback: 20,
                atr: 14,
                rsi: 14,
                volume: 20,
            },
            volume_threshold: 1.5,
            rsi_lower: 40.0,
            rsi_upper: 70.0,
            min_breakout_pct: 0.003,
            min_volatility_pct: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    None,
}

/// The first entry condition that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryFilter {
    NoBreakout,
    BreakoutTooSmall,
    Volume,
    Oscillator,
    OutsideWindow,
    Volatility,
}

impl fmt::Display for EntryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryFilter::NoBreakout => "no breakout",
            EntryFilter::BreakoutTooSmall => "breakout below minimum",
            EntryFilter::Volume => "volume below threshold",
            EntryFilter::Oscillator => "oscillator outside band",
            EntryFilter::OutsideWindow => "outside trading window",
            EntryFilter::Volatility => "volatility below floor",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub instrument: String,
    pub timestamp: NaiveDateTime,
    pub direction: Direction,
    pub breakout_pct: f64,
    pub volume_ratio: f64,
    pub oscillator_value: f64,
    pub failed: Option<EntryFilter>,
}

impl Signal {
    pub fn is_long(&self) -> bool {
        self.direction == Direction::Long
    }
}

/// Compute indicators for the current bar of `series` and evaluate entry.
pub fn detect(
    series: &BarSeries,
    params: &SignalParams,
    calibration: &Calibration,
    window: &TradingWindow,
) -> Result<Signal, EngineError> {
    let indicators = IndicatorSet::compute(series, &params.periods)?;
    let bar = series.last().ok_or_else(|| EngineError::InsufficientHistory {
        indicator: "BAR",
        needed: 1,
        available: 0,
    })?;
    Ok(evaluate(
        series.instrument(),
        bar,
        &indicators,
        params,
        calibration,
        window,
    ))
}

/// Evaluate entry conditions against precomputed indicators.
pub fn evaluate(
    instrument: &str,
    bar: &Bar,
    indicators: &IndicatorSet,
    params: &SignalParams,
    calibration: &Calibration,
    window: &TradingWindow,
) -> Signal {
    let breakout_pct = if indicators.resistance > 0.0 {
        (bar.close - indicators.resistance) / indicators.resistance
    } else {
        0.0
    };
    let volume_ratio = if indicators.volume_sma > 0.0 {
        bar.volume as f64 / indicators.volume_sma
    } else {
        0.0
    };

    let min_breakout = params.min_breakout_pct * calibration.breakout_mult;
    let required_volume = indicators.volume_sma * params.volume_threshold * calibration.volume_mult;

    let failed = if bar.close <= indicators.resistance {
        Some(EntryFilter::NoBreakout)
    } else if breakout_pct < min_breakout {
        Some(EntryFilter::BreakoutTooSmall)
    } else if (bar.volume as f64) < required_volume {
        Some(EntryFilter::Volume)
    } else if indicators.rsi < params.rsi_lower || indicators.rsi > params.rsi_upper {
        Some(EntryFilter::Oscillator)
    } else if !window.allows_entry(bar.timestamp) {
        Some(EntryFilter::OutsideWindow)
    } else if params.min_volatility_pct > 0.0
        && bar.close > 0.0
        && indicators.atr / bar.close < params.min_volatility_pct
    {
        Some(EntryFilter::Volatility)
    } else {
        None
    };

    Signal {
        instrument: instrument.to_string(),
        timestamp: bar.timestamp,
        direction: if failed.is_none() {
            Direction::Long
        } else {
            Direction::None
        },
        breakout_pct,
        volume_ratio,
        oscillator_value: indicators.rsi,
        failed,
    }
}
