//! Simulated fill model.
//!
//! Market orders fill at the reference price adjusted for slippage against the
//! trader; limit orders (resting stop/target exits) fill exactly at their level.
//! Commission = flat fee + trade_value × commission_pct. A buy is rejected when
//! cash cannot cover cost plus commission.

use std::fmt;

use chrono::NaiveDateTime;

use super::order::{Fill, Order, OrderPrice, RejectReason, Side};

/// When an entry order fills relative to the bar that produced its signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillTiming {
    #[default]
    SameBarClose,
    NextBarOpen,
}

impl fmt::Display for FillTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillTiming::SameBarClose => f.write_str("close"),
            FillTiming::NextBarOpen => f.write_str("next_open"),
        }
    }
}

/// Execution cost parameters. Percentages are fractions (0.001 = 0.1%).
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub commission_per_trade: f64,
    pub commission_pct: f64,
    pub slippage_pct: f64,
    pub fill_timing: FillTiming,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            commission_per_trade: 0.0,
            commission_pct: 0.0,
            slippage_pct: 0.0,
            fill_timing: FillTiming::SameBarClose,
        }
    }
}

/// Reference market price an order executes against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub price: f64,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExecutionReport {
    Filled(Fill),
    Rejected(RejectReason),
}

/// flat_fee + trade_value × pct
pub fn calculate_commission(trade_value: f64, config: &ExecutionConfig) -> f64 {
    config.commission_per_trade + trade_value * config.commission_pct
}

/// Buys pay up, sells receive less.
pub fn apply_slippage(market_price: f64, side: Side, slippage_pct: f64) -> f64 {
    match side {
        Side::Buy => market_price * (1.0 + slippage_pct),
        Side::Sell => market_price * (1.0 - slippage_pct),
    }
}

pub fn execution_price(order: &Order, quote: &Quote, config: &ExecutionConfig) -> f64 {
    match order.price {
        OrderPrice::Limit(level) => level,
        OrderPrice::Market => apply_slippage(quote.price, order.side, config.slippage_pct),
    }
}

pub fn simulate_fill(
    order: &Order,
    quote: &Quote,
    available_cash: f64,
    config: &ExecutionConfig,
) -> ExecutionReport {
    if order.size <= 0 {
        return ExecutionReport::Rejected(RejectReason::InvalidSize);
    }

    let price = execution_price(order, quote, config);
    let value = order.size as f64 * price;
    let commission = calculate_commission(value, config);

    let affordable = match order.side {
        Side::Buy => value + commission <= available_cash,
        Side::Sell => available_cash + value - commission >= 0.0,
    };
    if !affordable {
        return ExecutionReport::Rejected(RejectReason::InsufficientFunds);
    }

    ExecutionReport::Filled(Fill {
        price,
        commission,
        timestamp: quote.timestamp,
    })
}
