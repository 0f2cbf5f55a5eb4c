//! Bounded, append-only bar buffer per instrument.

use std::collections::VecDeque;

use super::error::EngineError;
use super::ohlcv::Bar;

#[derive(Debug, Clone)]
pub struct BarSeries {
    instrument: String,
    bars: VecDeque<Bar>,
    capacity: usize,
}

impl BarSeries {
    /// `capacity` is the lookback window; the oldest bar is evicted once it is exceeded.
    pub fn new(instrument: impl Into<String>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        BarSeries {
            instrument: instrument.into(),
            bars: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.back()
    }

    /// Append a bar. Timestamps must be strictly increasing.
    pub fn push(&mut self, bar: Bar) -> Result<(), EngineError> {
        if let Some(prev) = self.bars.back() {
            if bar.timestamp <= prev.timestamp {
                return Err(EngineError::MalformedBarSequence {
                    instrument: self.instrument.clone(),
                    previous: prev.timestamp,
                    received: bar.timestamp,
                });
            }
        }
        if self.bars.len() == self.capacity {
            self.bars.pop_front();
        }
        self.bars.push_back(bar);
        Ok(())
    }

    /// The most recent `n` bars, oldest first.
    pub fn window(&self, n: usize) -> impl Iterator<Item = &Bar> {
        let skip = self.bars.len().saturating_sub(n);
        self.bars.iter().skip(skip)
    }

    /// The `n` bars preceding the current one, oldest first.
    pub fn prior_window(&self, n: usize) -> impl Iterator<Item = &Bar> {
        let end = self.bars.len().saturating_sub(1);
        let start = end.saturating_sub(n);
        self.bars.range(start..end)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }

    pub(crate) fn require(&self, indicator: &'static str, needed: usize) -> Result<(), EngineError> {
        if self.bars.len() < needed {
            return Err(EngineError::InsufficientHistory {
                indicator,
                needed,
                available: self.bars.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(10, minute, 0)
            .unwrap()
    }

    fn bar(minute: u32, close: f64) -> Bar {
        Bar {
            timestamp: ts(minute),
            open: close,
            high: close,
            low: close,
            close,
            volume: 100,
        }
    }

    #[test]
    fn push_in_order() {
        let mut series = BarSeries::new("TCS", 10);
        series.push(bar(0, 1.0)).unwrap();
        series.push(bar(1, 2.0)).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.last().unwrap().close, 2.0);
    }

    #[test]
    fn duplicate_timestamp_rejected() {
        let mut series = BarSeries::new("TCS", 10);
        series.push(bar(5, 1.0)).unwrap();
        let err = series.push(bar(5, 2.0)).unwrap_err();
        assert!(matches!(err, EngineError::MalformedBarSequence { .. }));
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn out_of_order_rejected() {
        let mut series = BarSeries::new("TCS", 10);
        series.push(bar(5, 1.0)).unwrap();
        assert!(series.push(bar(4, 2.0)).is_err());
        assert_eq!(series.last().unwrap().close, 1.0);
    }

    #[test]
    fn oldest_evicted_at_capacity() {
        let mut series = BarSeries::new("TCS", 3);
        for m in 0..5 {
            series.push(bar(m, m as f64)).unwrap();
        }
        assert_eq!(series.len(), 3);
        let closes: Vec<f64> = series.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn prior_window_excludes_current() {
        let mut series = BarSeries::new("TCS", 10);
        for m in 0..5 {
            series.push(bar(m, m as f64)).unwrap();
        }
        let prior: Vec<f64> = series.prior_window(2).map(|b| b.close).collect();
        assert_eq!(prior, vec![2.0, 3.0]);
        let recent: Vec<f64> = series.window(2).map(|b| b.close).collect();
        assert_eq!(recent, vec![3.0, 4.0]);
    }

    #[test]
    fn require_reports_shortfall() {
        let mut series = BarSeries::new("TCS", 10);
        series.push(bar(0, 1.0)).unwrap();
        match series.require("SMA", 4) {
            Err(EngineError::InsufficientHistory {
                needed, available, ..
            }) => {
                assert_eq!(needed, 4);
                assert_eq!(available, 1);
            }
            other => panic!("expected InsufficientHistory, got {other:?}"),
        }
    }
}
