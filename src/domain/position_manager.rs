//! Owner of open positions and the orders that open and close them.
//!
//! For each bar of an instrument, in this order:
//! 1. a pending next-open entry fills at the bar's open, or is canceled at session close
//! 2. an open position is checked for exit, at most one exit order per bar
//! 3. a position that stays open gets its trailing stop ratcheted
//! 4. a long signal is sized and sent when the instrument is flat, has nothing
//!    pending and did not exit on this bar

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use super::calibration::Calibration;
use super::error::EngineError;
use super::event::EngineEvent;
use super::execution::{ExecutionReport, FillTiming, Quote};
use super::exit::{self, ExitDecision, ExitParams, exit_levels, trailing_stop};
use super::indicator::IndicatorSet;
use super::ledger::Ledger;
use super::ohlcv::Bar;
use super::order::{
    CancelReason, Fill, Order, OrderId, OrderPrice, OrderPurpose, PositionId, RejectReason, Side,
};
use super::position::{ExitReason, Position, PositionStatus, TradeRecord};
use super::risk::{RiskLimits, SizingRequest, position_size};
use super::session::TradingWindow;
use super::signal::Signal;
use crate::ports::execution_port::ExecutionPort;

/// Everything the manager needs to know about one instrument's current bar.
#[derive(Debug, Clone, Copy)]
pub struct BarContext<'a> {
    pub bar: &'a Bar,
    /// `None` while the series is still warming up.
    pub indicators: Option<&'a IndicatorSet>,
    pub signal: Option<&'a Signal>,
    pub calibration: Calibration,
    pub window: &'a TradingWindow,
}

/// A submitted entry waiting for the next bar's open.
#[derive(Debug, Clone)]
struct PendingEntry {
    order: Order,
    atr: f64,
    calibration: Calibration,
}

#[derive(Debug)]
pub struct PositionManager {
    exits: ExitParams,
    limits: RiskLimits,
    timing: FillTiming,
    positions: BTreeMap<String, Position>,
    closed: Vec<Position>,
    pending: BTreeMap<String, PendingEntry>,
    halted: BTreeSet<String>,
    last_close: BTreeMap<String, f64>,
    orders: Vec<Order>,
    next_order_id: u64,
    next_position_id: u64,
}

impl PositionManager {
    pub fn new(exits: ExitParams, limits: RiskLimits, timing: FillTiming) -> Self {
        PositionManager {
            exits,
            limits,
            timing,
            positions: BTreeMap::new(),
            closed: Vec::new(),
            pending: BTreeMap::new(),
            halted: BTreeSet::new(),
            last_close: BTreeMap::new(),
            orders: Vec::new(),
            next_order_id: 1,
            next_position_id: 1,
        }
    }

    pub fn position(&self, instrument: &str) -> Option<&Position> {
        self.positions.get(instrument)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Positions whose closing order filled, in closing order.
    pub fn closed_positions(&self) -> &[Position] {
        &self.closed
    }

    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    pub fn has_pending(&self, instrument: &str) -> bool {
        self.pending.contains_key(instrument)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Orders that reached a terminal state, oldest first.
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn halt(&mut self, instrument: &str) {
        self.halted.insert(instrument.to_string());
    }

    pub fn resume(&mut self, instrument: &str) -> bool {
        self.halted.remove(instrument)
    }

    pub fn is_halted(&self, instrument: &str) -> bool {
        self.halted.contains(instrument)
    }

    /// Mark-to-market value of all open positions at their last seen close.
    pub fn open_value(&self) -> f64 {
        self.positions
            .values()
            .map(|p| {
                let price = self
                    .last_close
                    .get(&p.instrument)
                    .copied()
                    .unwrap_or(p.entry_price);
                p.market_value(price)
            })
            .sum()
    }

    /// Exit decision for the open position in `instrument`, if any.
    pub fn evaluate_exit(
        &self,
        instrument: &str,
        bar: &Bar,
        indicators: Option<&IndicatorSet>,
        window: &TradingWindow,
    ) -> Option<ExitDecision> {
        self.positions
            .get(instrument)
            .and_then(|p| exit::evaluate_exit(p, bar, indicators, &self.exits, window))
    }

    pub fn on_bar(
        &mut self,
        instrument: &str,
        ctx: &BarContext<'_>,
        ledger: &mut Ledger,
        execution: &mut dyn ExecutionPort,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        let mut events = Vec::new();
        self.last_close.insert(instrument.to_string(), ctx.bar.close);

        if self.pending.contains_key(instrument) {
            if ctx.window.is_session_close(ctx.bar.timestamp) {
                events.extend(self.cancel_pending(Some(instrument), CancelReason::SessionEnd)?);
            } else if let Some(pending) = self.pending.remove(instrument) {
                let quote = Quote {
                    price: ctx.bar.open,
                    timestamp: ctx.bar.timestamp,
                };
                self.complete_entry(instrument, pending, &quote, ledger, execution, &mut events)?;
            }
        }

        if self.positions.contains_key(instrument) {
            self.manage_exit(instrument, ctx, ledger, execution, &mut events)?;
        } else if !self.pending.contains_key(instrument) {
            if let Some(signal) = ctx.signal.filter(|s| s.is_long()) {
                debug!(
                    instrument,
                    breakout_pct = signal.breakout_pct,
                    volume_ratio = signal.volume_ratio,
                    rsi = signal.oscillator_value,
                    "long signal"
                );
                self.dispatch_entry(instrument, ctx, ledger, execution, &mut events)?;
            }
        }

        Ok(events)
    }

    /// Cancel pending entries for one instrument, or all of them with `None`.
    pub fn cancel_pending(
        &mut self,
        instrument: Option<&str>,
        reason: CancelReason,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        let keys: Vec<String> = match instrument {
            Some(name) => self
                .pending
                .contains_key(name)
                .then(|| name.to_string())
                .into_iter()
                .collect(),
            None => self.pending.keys().cloned().collect(),
        };

        let mut events = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(mut pending) = self.pending.remove(&key) {
                pending.order.cancel(reason)?;
                info!(instrument = %key, order = %pending.order.id, "pending entry canceled");
                events.push(EngineEvent::OrderCanceled {
                    order: pending.order.id,
                    instrument: key,
                    reason,
                });
                self.orders.push(pending.order);
            }
        }
        Ok(events)
    }

    fn manage_exit(
        &mut self,
        instrument: &str,
        ctx: &BarContext<'_>,
        ledger: &mut Ledger,
        execution: &mut dyn ExecutionPort,
        events: &mut Vec<EngineEvent>,
    ) -> Result<(), EngineError> {
        match self.positions.get_mut(instrument) {
            Some(position) => position.bars_held += 1,
            None => return Ok(()),
        }

        let decision = self.evaluate_exit(instrument, ctx.bar, ctx.indicators, ctx.window);
        let Some(decision) = decision else {
            self.ratchet_stop(instrument, ctx.bar.close, events);
            return Ok(());
        };
        let Some(position) = self.positions.get(instrument).cloned() else {
            return Ok(());
        };
        let mut order = Order::new(
            self.order_id(),
            instrument,
            Side::Sell,
            position.size,
            decision.price,
            OrderPurpose::Close(position.id),
            ctx.bar.timestamp,
        );
        order.submit()?;
        events.push(submitted(&order));

        let quote = Quote {
            price: ctx.bar.close,
            timestamp: ctx.bar.timestamp,
        };
        match self.execute(&order, &quote, ledger.cash, execution) {
            ExecutionReport::Filled(fill) => {
                order.fill(fill)?;
                events.push(filled(&order, fill));
                let trade = self.close_position(&position, &fill, decision.reason);
                ledger.apply_sell(position.size, fill.price, fill.commission, trade.clone())?;
                info!(
                    instrument,
                    reason = %decision.reason,
                    price = fill.price,
                    pnl = trade.pnl,
                    "position closed"
                );
                events.push(EngineEvent::PositionClosed(trade));
            }
            ExecutionReport::Rejected(reason) => {
                order.reject(reason)?;
                warn!(instrument, %reason, "exit order rejected");
                events.push(rejected(&order, reason));
            }
        }
        self.orders.push(order);
        Ok(())
    }

    fn ratchet_stop(&mut self, instrument: &str, close: f64, events: &mut Vec<EngineEvent>) {
        let Some(position) = self.positions.get_mut(instrument) else {
            return;
        };
        if let Some(stop) = trailing_stop(position, close, &self.exits) {
            position.raise_stop(stop);
            debug!(instrument, stop, "trailing stop raised");
            events.push(EngineEvent::StopRaised {
                position: position.id,
                instrument: instrument.to_string(),
                stop_price: stop,
            });
        }
    }

    fn dispatch_entry(
        &mut self,
        instrument: &str,
        ctx: &BarContext<'_>,
        ledger: &mut Ledger,
        execution: &mut dyn ExecutionPort,
        events: &mut Vec<EngineEvent>,
    ) -> Result<(), EngineError> {
        let bar = ctx.bar;
        let atr = ctx.indicators.map_or(0.0, |i| i.atr);
        let levels = exit_levels(bar.close, atr, &self.exits, &ctx.calibration);
        let request = SizingRequest {
            account_equity: ledger.equity(self.open_value()),
            available_cash: ledger.cash,
            entry_price: bar.close,
            stop_price: levels.stop_price,
            existing_exposure: 0.0,
        };

        let size = match position_size(&request, &self.limits) {
            Ok(size) => size,
            Err(e) if e.is_recoverable() => {
                warn!(instrument, error = %e, "entry skipped");
                events.push(skipped(instrument, bar, e.to_string()));
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        if size == 0 {
            debug!(instrument, cash = ledger.cash, "entry skipped: size rounds to zero");
            events.push(skipped(instrument, bar, "size rounds to zero".to_string()));
            return Ok(());
        }

        let mut order = Order::new(
            self.order_id(),
            instrument,
            Side::Buy,
            size,
            OrderPrice::Market,
            OrderPurpose::Open,
            bar.timestamp,
        );
        order.submit()?;
        events.push(submitted(&order));

        let pending = PendingEntry {
            order,
            atr,
            calibration: ctx.calibration,
        };
        match self.timing {
            FillTiming::SameBarClose => {
                let quote = Quote {
                    price: bar.close,
                    timestamp: bar.timestamp,
                };
                self.complete_entry(instrument, pending, &quote, ledger, execution, events)
            }
            FillTiming::NextBarOpen => {
                debug!(instrument, size, "entry pending next open");
                self.pending.insert(instrument.to_string(), pending);
                Ok(())
            }
        }
    }

    fn complete_entry(
        &mut self,
        instrument: &str,
        pending: PendingEntry,
        quote: &Quote,
        ledger: &mut Ledger,
        execution: &mut dyn ExecutionPort,
        events: &mut Vec<EngineEvent>,
    ) -> Result<(), EngineError> {
        let PendingEntry {
            mut order,
            atr,
            calibration,
        } = pending;

        match self.execute(&order, quote, ledger.cash, execution) {
            ExecutionReport::Filled(fill) => {
                order.fill(fill)?;
                events.push(filled(&order, fill));
                if self.positions.contains_key(instrument) {
                    return Err(EngineError::InvariantViolation {
                        reason: format!("second open position for {}", instrument),
                    });
                }
                ledger.apply_buy(order.size, fill.price, fill.commission)?;

                let levels = exit_levels(fill.price, atr, &self.exits, &calibration);
                let position = Position {
                    id: self.position_id(),
                    instrument: instrument.to_string(),
                    entry_price: fill.price,
                    size: order.size,
                    entry_timestamp: fill.timestamp,
                    stop_price: levels.stop_price,
                    target_price: levels.target_price,
                    entry_commission: fill.commission,
                    bars_held: 0,
                    status: PositionStatus::Open,
                };
                info!(
                    instrument,
                    size = position.size,
                    price = fill.price,
                    stop = position.stop_price,
                    target = position.target_price,
                    "position opened"
                );
                events.push(EngineEvent::PositionOpened {
                    position: position.id,
                    instrument: instrument.to_string(),
                    entry_price: position.entry_price,
                    size: position.size,
                    stop_price: position.stop_price,
                    target_price: position.target_price,
                });
                self.positions.insert(instrument.to_string(), position);
            }
            ExecutionReport::Rejected(reason) => {
                order.reject(reason)?;
                warn!(instrument, %reason, size = order.size, "entry order rejected");
                events.push(rejected(&order, reason));
            }
        }
        self.orders.push(order);
        Ok(())
    }

    fn close_position(&mut self, position: &Position, fill: &Fill, reason: ExitReason) -> TradeRecord {
        let mut closed = self
            .positions
            .remove(&position.instrument)
            .unwrap_or_else(|| position.clone());
        closed.status = PositionStatus::Closed;
        self.closed.push(closed);

        let commission = position.entry_commission + fill.commission;
        TradeRecord {
            instrument: position.instrument.clone(),
            entry_timestamp: position.entry_timestamp,
            exit_timestamp: fill.timestamp,
            entry_price: position.entry_price,
            exit_price: fill.price,
            size: position.size,
            commission,
            pnl: (fill.price - position.entry_price) * position.size as f64 - commission,
            exit_reason: reason,
        }
    }

    fn execute(
        &self,
        order: &Order,
        quote: &Quote,
        available_cash: f64,
        execution: &mut dyn ExecutionPort,
    ) -> ExecutionReport {
        if self.halted.contains(&order.instrument) {
            return ExecutionReport::Rejected(RejectReason::Halted);
        }
        execution.execute(order, quote, available_cash)
    }

    fn order_id(&mut self) -> OrderId {
        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        id
    }

    fn position_id(&mut self) -> PositionId {
        let id = PositionId(self.next_position_id);
        self.next_position_id += 1;
        id
    }
}

fn submitted(order: &Order) -> EngineEvent {
    EngineEvent::OrderSubmitted {
        order: order.id,
        instrument: order.instrument.clone(),
        side: order.side,
        size: order.size,
    }
}

fn filled(order: &Order, fill: Fill) -> EngineEvent {
    EngineEvent::OrderFilled {
        order: order.id,
        instrument: order.instrument.clone(),
        side: order.side,
        size: order.size,
        fill,
    }
}

fn rejected(order: &Order, reason: RejectReason) -> EngineEvent {
    EngineEvent::OrderRejected {
        order: order.id,
        instrument: order.instrument.clone(),
        reason,
    }
}

fn skipped(instrument: &str, bar: &Bar, reason: String) -> EngineEvent {
    EngineEvent::EntrySkipped {
        instrument: instrument.to_string(),
        timestamp: bar.timestamp,
        reason,
    }
}
