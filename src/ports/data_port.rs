//! Bar supplier port trait.

use crate::domain::error::EngineError;
use crate::domain::ohlcv::Bar;

pub trait DataPort {
    /// Bars for one instrument in feed order. The engine rejects bars that
    /// are out of order, so implementations must not sort.
    fn fetch_bars(&self, instrument: &str) -> Result<Vec<Bar>, EngineError>;

    fn list_instruments(&self) -> Result<Vec<String>, EngineError>;
}
