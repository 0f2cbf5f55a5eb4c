//! Intraday OHLCV bar.

use chrono::NaiveDateTime;

/// One sampling interval of one instrument. Immutable once appended to a series.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl Bar {
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Range widened to include a gap from the previous close.
    pub fn true_range(&self, prev_close: f64) -> f64 {
        self.high.max(prev_close) - self.low.min(prev_close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn minute_bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 4)
                .unwrap()
                .and_hms_opt(9, 16, 0)
                .unwrap(),
            open,
            high,
            low,
            close,
            volume: 4_200,
        }
    }

    #[test]
    fn prev_close_inside_range() {
        let bar = minute_bar(250.0, 252.5, 249.0, 251.0);
        assert_eq!(bar.range(), 3.5);
        assert_eq!(bar.true_range(250.2), 3.5);
    }

    #[test]
    fn gap_up_extends_to_prev_close() {
        let bar = minute_bar(256.0, 257.0, 255.5, 256.5);
        assert_eq!(bar.true_range(251.0), 6.0);
    }

    #[test]
    fn gap_down_extends_to_prev_close() {
        let bar = minute_bar(246.0, 247.0, 245.0, 245.5);
        assert_eq!(bar.true_range(250.0), 5.0);
    }
}
