//! Portfolio ledger: cash, realized P&L and the equity curve.
//!
//! Mutated only by order fills. Cash going negative after a fill is a defect
//! in sizing or the funds check and aborts the run.

use chrono::NaiveDateTime;

use super::error::EngineError;
use super::position::TradeRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    pub cash: f64,
    pub initial_capital: f64,
    pub realized_pnl: f64,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Ledger {
    pub fn new(initial_capital: f64) -> Self {
        Ledger {
            cash: initial_capital,
            initial_capital,
            realized_pnl: 0.0,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    /// Debit a buy fill: size × price + commission.
    pub fn apply_buy(&mut self, size: i64, price: f64, commission: f64) -> Result<(), EngineError> {
        let total_cost = size as f64 * price + commission;
        self.cash -= total_cost;
        self.check_cash("buy fill")
    }

    /// Credit a sell fill and book the closed trade.
    pub fn apply_sell(
        &mut self,
        size: i64,
        price: f64,
        commission: f64,
        trade: TradeRecord,
    ) -> Result<(), EngineError> {
        self.cash += size as f64 * price - commission;
        self.realized_pnl += trade.pnl;
        self.trades.push(trade);
        self.check_cash("sell fill")
    }

    /// Append one equity point: cash + mark-to-market of open positions.
    pub fn record_equity(&mut self, timestamp: NaiveDateTime, open_value: f64) {
        self.equity_curve.push(EquityPoint {
            timestamp,
            equity: self.cash + open_value,
        });
    }

    pub fn equity(&self, open_value: f64) -> f64 {
        self.cash + open_value
    }

    pub fn last_equity_timestamp(&self) -> Option<NaiveDateTime> {
        self.equity_curve.last().map(|p| p.timestamp)
    }

    fn check_cash(&self, context: &str) -> Result<(), EngineError> {
        if self.cash < 0.0 {
            return Err(EngineError::InvariantViolation {
                reason: format!("cash {:.2} negative after {}", self.cash, context),
            });
        }
        Ok(())
    }
}
