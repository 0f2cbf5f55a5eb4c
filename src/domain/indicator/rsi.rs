//! RSI (Relative Strength Index) with Wilder smoothing.
//!
//! - First average: simple mean of gains/losses over the first `p` close changes
//! - Subsequent: avg = (prev_avg * (p-1) + current) / p
//!
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! avg_loss == 0: 100 when avg_gain > 0, 50 when the series is flat.
//!
//! Needs `p + 1` bars.

use crate::domain::bar_series::BarSeries;
use crate::domain::error::EngineError;

pub fn rsi(series: &BarSeries, period: usize) -> Result<f64, EngineError> {
    let period = period.max(1);
    series.require("RSI", period + 1)?;

    let closes: Vec<f64> = series.iter().map(|b| b.close).collect();
    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain = changes[..period].iter().map(|c| c.max(0.0)).sum::<f64>() / period as f64;
    let mut avg_loss = changes[..period].iter().map(|c| (-c).max(0.0)).sum::<f64>() / period as f64;

    for change in &changes[period..] {
        avg_gain = (avg_gain * (period - 1) as f64 + change.max(0.0)) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + (-change).max(0.0)) / period as f64;
    }

    Ok(oscillator(avg_gain, avg_loss))
}

fn oscillator(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return if avg_gain == 0.0 { 50.0 } else { 100.0 };
    }
    let value = 100.0 - 100.0 / (1.0 + avg_gain / avg_loss);
    value.clamp(0.0, 100.0)
}
