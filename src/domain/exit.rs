//! Exit-condition evaluation for open positions.
//!
//! Precedence, first match wins:
//! 1. stop loss: low ≤ stop, resting order at the stop
//! 2. take profit: high ≥ target, resting order at the target
//! 3. time: session close reached or held `max_hold_bars`, market at close
//! 4. technical: RSI back below the entry band (if enabled), market at close
//!
//! `ExitPriority::TargetFirst` swaps 1 and 2 when both trigger on one bar.

use super::calibration::Calibration;
use super::indicator::IndicatorSet;
use super::ohlcv::Bar;
use super::order::OrderPrice;
use super::position::{ExitReason, Position};
use super::session::TradingWindow;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopRule {
    /// Fraction below entry.
    Percent(f64),
    /// Multiple of ATR below entry.
    AtrMultiple(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetRule {
    Percent(f64),
    AtrMultiple(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitPriority {
    #[default]
    StopFirst,
    TargetFirst,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitParams {
    pub stop: StopRule,
    pub target: TargetRule,
    pub priority: ExitPriority,
    /// RSI floor for the technical exit; `None` disables it.
    pub technical_floor: Option<f64>,
    pub trailing_stop_pct: f64,
    pub trailing_activation_pct: f64,
    pub max_hold_bars: usize,
}

impl ExitParams {
    pub fn percent(stop_loss_pct: f64, take_profit_pct: f64) -> Self {
        ExitParams {
            stop: StopRule::Percent(stop_loss_pct),
            target: TargetRule::Percent(take_profit_pct),
            priority: ExitPriority::StopFirst,
            technical_floor: None,
            trailing_stop_pct: 0.0,
            trailing_activation_pct: 0.0,
            max_hold_bars: 0,
        }
    }

    pub fn uses_atr(&self) -> bool {
        matches!(self.stop, StopRule::AtrMultiple(_))
            || matches!(self.target, TargetRule::AtrMultiple(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitLevels {
    pub stop_price: f64,
    pub target_price: f64,
}

/// Stop and target for an entry at `entry_price`. The class stop multiplier widens or
/// tightens the stop distance.
pub fn exit_levels(
    entry_price: f64,
    atr: f64,
    params: &ExitParams,
    calibration: &Calibration,
) -> ExitLevels {
    let stop_price = match params.stop {
        StopRule::Percent(pct) => entry_price * (1.0 - pct * calibration.stop_mult),
        StopRule::AtrMultiple(k) => entry_price - atr * k * calibration.stop_mult,
    };
    let target_price = match params.target {
        TargetRule::Percent(pct) => entry_price * (1.0 + pct),
        TargetRule::AtrMultiple(m) => entry_price + atr * m,
    };
    ExitLevels {
        stop_price,
        target_price,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitDecision {
    pub reason: ExitReason,
    pub price: OrderPrice,
}

pub fn evaluate_exit(
    position: &Position,
    bar: &Bar,
    indicators: Option<&IndicatorSet>,
    params: &ExitParams,
    window: &TradingWindow,
) -> Option<ExitDecision> {
    let stop = position.should_stop_loss(bar.low).then_some(ExitDecision {
        reason: ExitReason::StopLoss,
        price: OrderPrice::Limit(position.stop_price),
    });
    let target = position.should_take_profit(bar.high).then_some(ExitDecision {
        reason: ExitReason::TakeProfit,
        price: OrderPrice::Limit(position.target_price),
    });

    let resting = match params.priority {
        ExitPriority::StopFirst => stop.or(target),
        ExitPriority::TargetFirst => target.or(stop),
    };
    if resting.is_some() {
        return resting;
    }

    let held_too_long = params.max_hold_bars > 0 && position.bars_held >= params.max_hold_bars;
    if window.is_session_close(bar.timestamp) || held_too_long {
        return Some(ExitDecision {
            reason: ExitReason::Time,
            price: OrderPrice::Market,
        });
    }

    if let (Some(floor), Some(ind)) = (params.technical_floor, indicators) {
        if ind.rsi < floor {
            return Some(ExitDecision {
                reason: ExitReason::Technical,
                price: OrderPrice::Market,
            });
        }
    }

    None
}

/// New stop from the trailing rule, if it would tighten the current one.
pub fn trailing_stop(position: &Position, close: f64, params: &ExitParams) -> Option<f64> {
    if params.trailing_stop_pct <= 0.0 || position.entry_price <= 0.0 {
        return None;
    }
    let gain = (close - position.entry_price) / position.entry_price;
    if gain <= params.trailing_activation_pct {
        return None;
    }
    let candidate = close * (1.0 - params.trailing_stop_pct);
    (candidate > position.stop_price).then_some(candidate)
}
