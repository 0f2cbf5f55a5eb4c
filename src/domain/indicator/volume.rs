//! Simple moving average of volume over the last `p` bars, current bar included.

use crate::domain::bar_series::BarSeries;
use crate::domain::error::EngineError;

pub fn volume_sma(series: &BarSeries, period: usize) -> Result<f64, EngineError> {
    let period = period.max(1);
    series.require("VOLUME_SMA", period)?;
    let total: i64 = series.window(period).map(|b| b.volume).sum();
    Ok(total as f64 / period as f64)
}
