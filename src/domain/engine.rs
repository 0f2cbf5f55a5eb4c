//! Top-level bar-driven driver.
//!
//! Each timestamp group is processed to completion before the next: every
//! instrument in name order gets buffer update, indicators, signal and
//! position management, then one equity point is recorded. Cash contention
//! between instruments signalling on the same bar is therefore resolved in
//! instrument-name order.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

use super::bar_series::BarSeries;
use super::config::EngineConfig;
use super::error::EngineError;
use super::event::EngineEvent;
use super::feed::TimestampGroup;
use super::indicator::IndicatorSet;
use super::ledger::Ledger;
use super::ohlcv::Bar;
use super::order::CancelReason;
use super::position_manager::{BarContext, PositionManager};
use super::signal;
use crate::ports::execution_port::ExecutionPort;

pub struct Engine<E: ExecutionPort> {
    config: EngineConfig,
    series: BTreeMap<String, BarSeries>,
    manager: PositionManager,
    ledger: Ledger,
    execution: E,
    session_date: Option<NaiveDate>,
}

impl<E: ExecutionPort> Engine<E> {
    pub fn new(config: EngineConfig, execution: E) -> Self {
        let manager = PositionManager::new(
            config.exits.clone(),
            config.risk,
            config.execution.fill_timing,
        );
        let ledger = Ledger::new(config.initial_capital);
        Engine {
            config,
            series: BTreeMap::new(),
            manager,
            ledger,
            execution,
            session_date: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn manager(&self) -> &PositionManager {
        &self.manager
    }

    pub fn series(&self, instrument: &str) -> Option<&BarSeries> {
        self.series.get(instrument)
    }

    pub fn into_ledger(self) -> Ledger {
        self.ledger
    }

    pub fn halt(&mut self, instrument: &str) {
        info!(instrument, "instrument halted");
        self.manager.halt(instrument);
    }

    pub fn resume(&mut self, instrument: &str) {
        if self.manager.resume(instrument) {
            info!(instrument, "instrument resumed");
        }
    }

    /// Process one bar of one instrument.
    pub fn on_bar(&mut self, instrument: &str, bar: Bar) -> Result<Vec<EngineEvent>, EngineError> {
        let mut events = self.roll_session(bar.timestamp.date())?;

        let capacity = self.config.history_window;
        let series = self
            .series
            .entry(instrument.to_string())
            .or_insert_with(|| BarSeries::new(instrument, capacity));

        if let Err(e) = series.push(bar.clone()) {
            warn!(instrument, error = %e, "bar rejected");
            events.push(EngineEvent::BarRejected {
                instrument: instrument.to_string(),
                timestamp: bar.timestamp,
                reason: e.to_string(),
            });
            return Ok(events);
        }

        let indicators = match IndicatorSet::compute(series, &self.config.signal.periods) {
            Ok(set) => Some(set),
            Err(e) if e.is_recoverable() => {
                debug!(instrument, error = %e, "no signal possible yet");
                None
            }
            Err(e) => return Err(e),
        };

        let calibration = self.config.calibration.for_instrument(instrument);
        let signal = indicators.as_ref().map(|set| {
            signal::evaluate(
                instrument,
                &bar,
                set,
                &self.config.signal,
                &calibration,
                &self.config.window,
            )
        });

        let ctx = BarContext {
            bar: &bar,
            indicators: indicators.as_ref(),
            signal: signal.as_ref(),
            calibration,
            window: &self.config.window,
        };
        events.extend(
            self.manager
                .on_bar(instrument, &ctx, &mut self.ledger, &mut self.execution)?,
        );
        Ok(events)
    }

    /// Process every bar sharing `timestamp`, then record equity once.
    pub fn process_timestamp(
        &mut self,
        timestamp: NaiveDateTime,
        mut bars: Vec<(String, Bar)>,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        let mut events = self.roll_session(timestamp.date())?;

        bars.sort_by(|a, b| a.0.cmp(&b.0));
        for (instrument, bar) in bars {
            events.extend(self.on_bar(&instrument, bar)?);
        }

        let advanced = self
            .ledger
            .last_equity_timestamp()
            .is_none_or(|last| timestamp > last);
        if advanced {
            self.ledger.record_equity(timestamp, self.manager.open_value());
        }
        Ok(events)
    }

    /// Force-cancel everything still pending; nothing carries into the next session.
    pub fn end_session(&mut self) -> Result<Vec<EngineEvent>, EngineError> {
        let events = self.manager.cancel_pending(None, CancelReason::SessionEnd)?;
        info!(
            session = ?self.session_date,
            canceled = events.len(),
            open_positions = self.manager.open_count(),
            cash = self.ledger.cash,
            "session ended"
        );
        Ok(events)
    }

    /// Drive a whole feed. Data and sizing faults are absorbed per bar;
    /// invariant violations abort the run.
    pub fn run<I>(&mut self, timeline: I) -> Result<Vec<EngineEvent>, EngineError>
    where
        I: IntoIterator<Item = TimestampGroup>,
    {
        let mut events = Vec::new();
        for group in timeline {
            events.extend(self.process_timestamp(group.timestamp, group.bars)?);
        }
        events.extend(self.end_session()?);
        Ok(events)
    }

    fn roll_session(&mut self, date: NaiveDate) -> Result<Vec<EngineEvent>, EngineError> {
        let events = match self.session_date {
            Some(current) if current != date => self.end_session()?,
            _ => Vec::new(),
        };
        self.session_date = Some(date);
        Ok(events)
    }
}
