//! Order execution sink port.

use crate::domain::execution::{ExecutionReport, Quote};
use crate::domain::order::Order;

/// Receives submitted orders and answers with a fill or a rejection.
///
/// Paper trading and a live broker implement the same contract.
pub trait ExecutionPort {
    fn execute(&mut self, order: &Order, quote: &Quote, available_cash: f64) -> ExecutionReport;
}
