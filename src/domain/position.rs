//! Open positions and closed trade records.

use std::fmt;

use chrono::NaiveDateTime;

use super::order::PositionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub id: PositionId,
    pub instrument: String,
    pub entry_price: f64,
    pub size: i64,
    pub entry_timestamp: NaiveDateTime,
    pub stop_price: f64,
    pub target_price: f64,
    pub entry_commission: f64,
    pub bars_held: usize,
    pub status: PositionStatus,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.size as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.size as f64 * (price - self.entry_price)
    }

    pub fn should_stop_loss(&self, low: f64) -> bool {
        low <= self.stop_price
    }

    pub fn should_take_profit(&self, high: f64) -> bool {
        high >= self.target_price
    }

    /// Ratchet the stop upward; a looser stop is ignored.
    pub fn raise_stop(&mut self, candidate: f64) -> bool {
        if candidate > self.stop_price {
            self.stop_price = candidate;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    Time,
    Technical,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::Time => "time",
            ExitReason::Technical => "technical",
        };
        f.write_str(s)
    }
}

/// Per-fill trade record handed to reporting collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub instrument: String,
    pub entry_timestamp: NaiveDateTime,
    pub exit_timestamp: NaiveDateTime,
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: i64,
    pub commission: f64,
    pub pnl: f64,
    pub exit_reason: ExitReason,
}
