//! Effects produced by processing one bar.

use chrono::NaiveDateTime;

use super::order::{CancelReason, Fill, OrderId, PositionId, RejectReason, Side};
use super::position::TradeRecord;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The bar was out of order or duplicated and was dropped.
    BarRejected {
        instrument: String,
        timestamp: NaiveDateTime,
        reason: String,
    },
    /// A long signal did not turn into an order (sizing or funds).
    EntrySkipped {
        instrument: String,
        timestamp: NaiveDateTime,
        reason: String,
    },
    OrderSubmitted {
        order: OrderId,
        instrument: String,
        side: Side,
        size: i64,
    },
    OrderFilled {
        order: OrderId,
        instrument: String,
        side: Side,
        size: i64,
        fill: Fill,
    },
    OrderRejected {
        order: OrderId,
        instrument: String,
        reason: RejectReason,
    },
    OrderCanceled {
        order: OrderId,
        instrument: String,
        reason: CancelReason,
    },
    PositionOpened {
        position: PositionId,
        instrument: String,
        entry_price: f64,
        size: i64,
        stop_price: f64,
        target_price: f64,
    },
    PositionClosed(TradeRecord),
    StopRaised {
        position: PositionId,
        instrument: String,
        stop_price: f64,
    },
}

impl EngineEvent {
    pub fn instrument(&self) -> &str {
        match self {
            EngineEvent::BarRejected { instrument, .. }
            | EngineEvent::EntrySkipped { instrument, .. }
            | EngineEvent::OrderSubmitted { instrument, .. }
            | EngineEvent::OrderFilled { instrument, .. }
            | EngineEvent::OrderRejected { instrument, .. }
            | EngineEvent::OrderCanceled { instrument, .. }
            | EngineEvent::PositionOpened { instrument, .. }
            | EngineEvent::StopRaised { instrument, .. } => instrument,
            EngineEvent::PositionClosed(trade) => &trade.instrument,
        }
    }
}
