//! Trading session and entry window.

use chrono::{Duration, NaiveDateTime, NaiveTime};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradingWindow {
    pub session_open: NaiveTime,
    pub session_close: NaiveTime,
    pub warmup_minutes: i64,
    pub cooldown_minutes: i64,
}

impl TradingWindow {
    pub fn new(session_open: NaiveTime, session_close: NaiveTime) -> Self {
        TradingWindow {
            session_open,
            session_close,
            warmup_minutes: 0,
            cooldown_minutes: 0,
        }
    }

    pub fn with_offsets(mut self, warmup_minutes: i64, cooldown_minutes: i64) -> Self {
        self.warmup_minutes = warmup_minutes;
        self.cooldown_minutes = cooldown_minutes;
        self
    }

    pub fn entry_start(&self) -> NaiveTime {
        self.session_open + Duration::minutes(self.warmup_minutes)
    }

    pub fn entry_end(&self) -> NaiveTime {
        self.session_close - Duration::minutes(self.cooldown_minutes)
    }

    /// Half-open: open + warm-up ≤ t < close − cool-down. With no cool-down
    /// the closing bar itself takes no entry.
    pub fn allows_entry(&self, timestamp: NaiveDateTime) -> bool {
        let t = timestamp.time();
        t >= self.entry_start() && t < self.entry_end()
    }

    pub fn is_session_close(&self, timestamp: NaiveDateTime) -> bool {
        timestamp.time() >= self.session_close
    }
}
