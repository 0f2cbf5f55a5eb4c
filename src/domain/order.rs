//! Order lifecycle state machine.
//!
//! CREATED → SUBMITTED → FILLED | REJECTED | CANCELED
//!
//! Terminal states accept no further transitions.

use std::fmt;

use chrono::NaiveDateTime;

use super::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PositionId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderPrice {
    Market,
    /// Resting price; fills exactly at this level.
    Limit(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    InvalidSize,
    Halted,
    InsufficientFunds,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::InvalidSize => "invalid size",
            RejectReason::Halted => "instrument halted",
            RejectReason::InsufficientFunds => "insufficient funds",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    SessionEnd,
    Requested,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub price: f64,
    pub commission: f64,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderState {
    Created,
    Submitted,
    Filled(Fill),
    Rejected(RejectReason),
    Canceled(CancelReason),
}

impl OrderState {
    pub fn name(&self) -> &'static str {
        match self {
            OrderState::Created => "CREATED",
            OrderState::Submitted => "SUBMITTED",
            OrderState::Filled(_) => "FILLED",
            OrderState::Rejected(_) => "REJECTED",
            OrderState::Canceled(_) => "CANCELED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderState::Filled(_) | OrderState::Rejected(_) | OrderState::Canceled(_)
        )
    }
}

/// What the order does to a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderPurpose {
    Open,
    Close(PositionId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub instrument: String,
    pub side: Side,
    pub size: i64,
    pub price: OrderPrice,
    pub purpose: OrderPurpose,
    pub created_at: NaiveDateTime,
    pub state: OrderState,
}

impl Order {
    pub fn new(
        id: OrderId,
        instrument: &str,
        side: Side,
        size: i64,
        price: OrderPrice,
        purpose: OrderPurpose,
        created_at: NaiveDateTime,
    ) -> Self {
        Order {
            id,
            instrument: instrument.to_string(),
            side,
            size,
            price,
            purpose,
            created_at,
            state: OrderState::Created,
        }
    }

    /// The position this order closes, if any.
    pub fn closes(&self) -> Option<PositionId> {
        match self.purpose {
            OrderPurpose::Close(id) => Some(id),
            OrderPurpose::Open => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, OrderState::Created | OrderState::Submitted)
    }

    pub fn submit(&mut self) -> Result<(), EngineError> {
        match self.state {
            OrderState::Created => self.transition(OrderState::Submitted),
            _ => Err(self.invalid("SUBMITTED")),
        }
    }

    pub fn fill(&mut self, fill: Fill) -> Result<(), EngineError> {
        match self.state {
            OrderState::Submitted => self.transition(OrderState::Filled(fill)),
            _ => Err(self.invalid("FILLED")),
        }
    }

    pub fn reject(&mut self, reason: RejectReason) -> Result<(), EngineError> {
        match self.state {
            OrderState::Submitted => self.transition(OrderState::Rejected(reason)),
            _ => Err(self.invalid("REJECTED")),
        }
    }

    /// Created or submitted orders may be canceled.
    pub fn cancel(&mut self, reason: CancelReason) -> Result<(), EngineError> {
        if self.is_pending() {
            self.transition(OrderState::Canceled(reason))
        } else {
            Err(self.invalid("CANCELED"))
        }
    }

    fn transition(&mut self, to: OrderState) -> Result<(), EngineError> {
        self.state = to;
        Ok(())
    }

    fn invalid(&self, to: &'static str) -> EngineError {
        EngineError::InvalidTransition {
            order: self.id.0,
            from: self.state.name(),
            to,
        }
    }
}
