//! Paper-trading execution sink backed by the simulated fill model.

use tracing::debug;

use crate::domain::execution::{ExecutionConfig, ExecutionReport, Quote, simulate_fill};
use crate::domain::order::Order;
use crate::ports::execution_port::ExecutionPort;

pub struct PaperExecution {
    config: ExecutionConfig,
    fills: usize,
    rejections: usize,
}

impl PaperExecution {
    pub fn new(config: ExecutionConfig) -> Self {
        Self {
            config,
            fills: 0,
            rejections: 0,
        }
    }

    pub fn fills(&self) -> usize {
        self.fills
    }

    pub fn rejections(&self) -> usize {
        self.rejections
    }
}

impl ExecutionPort for PaperExecution {
    fn execute(&mut self, order: &Order, quote: &Quote, available_cash: f64) -> ExecutionReport {
        let report = simulate_fill(order, quote, available_cash, &self.config);
        match &report {
            ExecutionReport::Filled(fill) => {
                self.fills += 1;
                debug!(order = %order.id, price = fill.price, commission = fill.commission, "paper fill");
            }
            ExecutionReport::Rejected(reason) => {
                self.rejections += 1;
                debug!(order = %order.id, %reason, "paper rejection");
            }
        }
        report
    }
}
