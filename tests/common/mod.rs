#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use intradar::domain::calibration::CalibrationTable;
use intradar::domain::config::EngineConfig;
use intradar::domain::error::EngineError;
use intradar::domain::execution::{ExecutionConfig, FillTiming};
use intradar::domain::exit::ExitParams;
use intradar::domain::indicator::IndicatorPeriods;
pub use intradar::domain::ohlcv::Bar;
use intradar::domain::risk::RiskLimits;
use intradar::domain::session::TradingWindow;
use intradar::domain::signal::SignalParams;
use intradar::ports::data_port::DataPort;
use std::collections::BTreeMap;

pub struct MockDataPort {
    pub data: BTreeMap<String, Vec<Bar>>,
    pub errors: BTreeMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }

    pub fn with_bars(mut self, instrument: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(instrument.to_string(), bars);
        self
    }

    pub fn with_error(mut self, instrument: &str, reason: &str) -> Self {
        self.errors.insert(instrument.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, instrument: &str) -> Result<Vec<Bar>, EngineError> {
        if let Some(reason) = self.errors.get(instrument) {
            return Err(EngineError::DataFormat {
                reason: reason.clone(),
            });
        }
        match self.data.get(instrument) {
            Some(bars) if !bars.is_empty() => Ok(bars.clone()),
            _ => Err(EngineError::NoData {
                instrument: instrument.to_string(),
            }),
        }
    }

    fn list_instruments(&self) -> Result<Vec<String>, EngineError> {
        Ok(self.data.keys().cloned().collect())
    }
}

pub fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

pub fn bar(timestamp: NaiveDateTime, high: f64, low: f64, close: f64, volume: i64) -> Bar {
    Bar {
        timestamp,
        open: close,
        high,
        low,
        close,
        volume,
    }
}

/// Three quiet bars from 10:00, then a breakout close at 105 on heavy volume
/// at 10:03. Under [`sample_config`] the breakout sizes to 476 shares with a
/// stop at 103.95 and a target at 106.575.
pub fn breakout_bars(day: u32) -> Vec<Bar> {
    breakout_bars_from(at(day, 10, 0))
}

/// The breakout pattern on consecutive minutes starting at `start`.
pub fn breakout_bars_from(start: NaiveDateTime) -> Vec<Bar> {
    let minute = |i: i64| start + Duration::minutes(i);
    vec![
        bar(minute(0), 100.5, 99.5, 100.0, 1000),
        bar(minute(1), 102.0, 100.0, 101.5, 1000),
        bar(minute(2), 98.0, 96.5, 97.0, 1000),
        bar(minute(3), 105.5, 100.0, 105.0, 1800),
    ]
}

/// Same warm-up and breakout, followed by a bar that trades through the stop.
pub fn stop_out_bars(day: u32) -> Vec<Bar> {
    let mut bars = breakout_bars(day);
    bars.push(bar(at(day, 10, 4), 104.5, 103.0, 103.0, 1500));
    bars
}

pub fn sample_config() -> EngineConfig {
    EngineConfig {
        initial_capital: 100_000.0,
        history_window: 50,
        instruments: Vec::new(),
        signal: SignalParams {
            periods: IndicatorPeriods {
                lookback: 3,
                atr: 3,
                rsi: 3,
                volume: 4,
            },
            volume_threshold: 1.2,
            ..SignalParams::default()
        },
        risk: RiskLimits {
            risk_fraction: 0.02,
            max_position_value: 50_000.0,
            max_shares: 1_000_000,
        },
        exits: ExitParams::percent(0.01, 0.015),
        execution: ExecutionConfig::default(),
        window: TradingWindow::new(
            NaiveTime::from_hms_opt(9, 15, 0).unwrap(),
            NaiveTime::from_hms_opt(15, 30, 0).unwrap(),
        ),
        calibration: CalibrationTable::new(),
    }
}

pub fn config_with_timing(fill_timing: FillTiming) -> EngineConfig {
    let mut config = sample_config();
    config.execution.fill_timing = fill_timing;
    config
}

/// INI equivalent of [`sample_config`].
pub const SAMPLE_INI: &str = r#"
[engine]
initial_capital = 100000
history_window = 50

[signal]
lookback_period = 3
volume_threshold = 1.2
rsi_period = 3
volume_period = 4

[risk]
risk_per_trade = 0.02
max_position_value = 50000

[exits]
stop_loss_pct = 0.01
take_profit_pct = 0.015
atr_period = 3

[session]
open = 09:15
close = 15:30
"#;

pub fn bars_to_csv(bars: &[Bar]) -> String {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.timestamp.format("%Y-%m-%d %H:%M:%S"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    out
}
