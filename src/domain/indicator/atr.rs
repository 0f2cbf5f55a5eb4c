//! Average True Range with Wilder smoothing.
//!
//! TR[i] = max(H[i]-L[i], |H[i]-C[i-1]|, |L[i]-C[i-1]|) for every bar with a predecessor.
//! Seed: simple mean of the first `p` true ranges.
//! Subsequent: ATR = (prev_atr * (p-1) + TR) / p
//!
//! Needs `p + 1` bars.

use crate::domain::bar_series::BarSeries;
use crate::domain::error::EngineError;

pub fn atr(series: &BarSeries, period: usize) -> Result<f64, EngineError> {
    let period = period.max(1);
    series.require("ATR", period + 1)?;

    let bars: Vec<_> = series.iter().collect();
    let true_ranges: Vec<f64> = bars
        .windows(2)
        .map(|pair| pair[1].true_range(pair[0].close))
        .collect();

    let mut value = true_ranges[..period].iter().sum::<f64>() / period as f64;
    for tr in &true_ranges[period..] {
        value = (value * (period - 1) as f64 + tr) / period as f64;
    }
    Ok(value)
}
