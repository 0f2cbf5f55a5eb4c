//! Performance metrics over a finished run.

use super::ledger::{EquityPoint, Ledger};

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    pub final_equity: f64,
    pub realized_pnl: f64,
    pub total_commission: f64,
    pub max_drawdown: f64,
    /// Longest run of equity points spent below a prior peak.
    pub max_drawdown_duration: usize,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_hold_minutes: f64,
}

impl Metrics {
    pub fn compute(ledger: &Ledger) -> Self {
        let final_equity = ledger
            .equity_curve
            .last()
            .map_or(ledger.cash, |p| p.equity);
        let total_return = match ledger.initial_capital {
            capital if capital > 0.0 => final_equity / capital - 1.0,
            _ => 0.0,
        };
        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&ledger.equity_curve);

        let wins: Vec<f64> = ledger.trades.iter().map(|t| t.pnl).filter(|&p| p > 0.0).collect();
        let losses: Vec<f64> = ledger
            .trades
            .iter()
            .map(|t| t.pnl)
            .filter(|&p| p < 0.0)
            .map(f64::abs)
            .collect();
        let total_trades = ledger.trades.len();
        let gross_profit: f64 = wins.iter().sum();
        let gross_loss: f64 = losses.iter().sum();

        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let hold_minutes: Vec<f64> = ledger
            .trades
            .iter()
            .map(|t| (t.exit_timestamp - t.entry_timestamp).num_minutes() as f64)
            .collect();

        Metrics {
            total_return,
            final_equity,
            realized_pnl: ledger.realized_pnl,
            total_commission: ledger.trades.iter().map(|t| t.commission).sum(),
            max_drawdown,
            max_drawdown_duration,
            total_trades,
            trades_won: wins.len(),
            trades_lost: losses.len(),
            trades_breakeven: total_trades - wins.len() - losses.len(),
            win_rate: ratio(wins.len() as f64, total_trades),
            profit_factor,
            avg_win: ratio(gross_profit, wins.len()),
            avg_loss: ratio(gross_loss, losses.len()),
            largest_win: wins.iter().copied().fold(0.0, f64::max),
            largest_loss: losses.iter().copied().fold(0.0, f64::max),
            avg_hold_minutes: ratio(hold_minutes.iter().sum(), hold_minutes.len()),
        }
    }
}

/// `total / count`, or 0 when there is nothing to average.
fn ratio(total: f64, count: usize) -> f64 {
    if count == 0 { 0.0 } else { total / count as f64 }
}

/// Deepest peak-to-trough fall as a fraction of the peak, and the longest
/// run of consecutive points below a prior peak.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let mut high_water = f64::NEG_INFINITY;
    let mut depth = 0.0_f64;
    let mut underwater = 0usize;
    let mut longest = 0usize;

    for point in equity_curve {
        if point.equity >= high_water {
            high_water = point.equity;
            underwater = 0;
            continue;
        }
        underwater += 1;
        longest = longest.max(underwater);
        if high_water > 0.0 {
            depth = depth.max(1.0 - point.equity / high_water);
        }
    }

    (depth, longest)
}
