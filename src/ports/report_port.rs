//! Report generation port trait.

use crate::domain::error::EngineError;
use crate::domain::ledger::Ledger;
use crate::domain::metrics::Metrics;

/// Port for writing run results: trade records, equity curve and summary.
pub trait ReportPort {
    fn write(&self, ledger: &Ledger, metrics: &Metrics) -> Result<(), EngineError>;
}
