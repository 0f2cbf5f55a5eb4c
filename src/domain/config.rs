//! Typed engine configuration built from a [`ConfigPort`].
//!
//! Safety thresholds (stop, target, risk fraction, position cap, breakout
//! lookback, volume threshold, trading window) have no defaults: a missing or
//! out-of-range value refuses the run.

use chrono::NaiveTime;

use crate::domain::calibration::{Calibration, CalibrationTable};
use crate::domain::error::EngineError;
use crate::domain::execution::{ExecutionConfig, FillTiming};
use crate::domain::exit::{ExitParams, ExitPriority, StopRule, TargetRule};
use crate::domain::feed::parse_instruments;
use crate::domain::indicator::IndicatorPeriods;
use crate::domain::risk::RiskLimits;
use crate::domain::session::TradingWindow;
use crate::domain::signal::SignalParams;
use crate::ports::config_port::ConfigPort;

const SECTOR_PREFIX: &str = "sector.";

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub initial_capital: f64,
    pub history_window: usize,
    /// Empty means every instrument the data source offers.
    pub instruments: Vec<String>,
    pub signal: SignalParams,
    pub risk: RiskLimits,
    pub exits: ExitParams,
    pub execution: ExecutionConfig,
    pub window: TradingWindow,
    pub calibration: CalibrationTable,
}

impl EngineConfig {
    pub fn from_port(config: &dyn ConfigPort) -> Result<Self, EngineError> {
        let signal = build_signal(config)?;
        let exits = build_exits(config, signal.rsi_lower)?;

        let initial_capital = optional_f64(config, "engine", "initial_capital", 100_000.0)?;
        if initial_capital <= 0.0 {
            return Err(EngineError::config_invalid(
                "engine",
                "initial_capital",
                "initial_capital must be positive",
            ));
        }

        let history_window = optional_usize(config, "engine", "history_window", 200)?;
        let needed = signal.periods.max_required_bars();
        if history_window < needed {
            return Err(EngineError::config_invalid(
                "engine",
                "history_window",
                format!("history_window {} is shorter than the {} bars indicators need", history_window, needed),
            ));
        }

        let instruments = match config.get_string("engine", "instruments") {
            Some(list) if !list.trim().is_empty() => parse_instruments(&list)
                .map_err(|e| EngineError::config_invalid("engine", "instruments", e.to_string()))?,
            _ => Vec::new(),
        };

        Ok(EngineConfig {
            initial_capital,
            history_window,
            instruments,
            signal,
            risk: build_risk(config)?,
            exits,
            execution: build_execution(config)?,
            window: build_window(config)?,
            calibration: build_calibration(config)?,
        })
    }
}

fn build_signal(config: &dyn ConfigPort) -> Result<SignalParams, EngineError> {
    let lookback = required_usize(config, "signal", "lookback_period")?;
    let volume_threshold = required_f64(config, "signal", "volume_threshold")?;
    if volume_threshold <= 0.0 {
        return Err(EngineError::config_invalid(
            "signal",
            "volume_threshold",
            "volume_threshold must be positive",
        ));
    }

    let rsi_lower = optional_f64(config, "signal", "rsi_lower", 40.0)?;
    let rsi_upper = optional_f64(config, "signal", "rsi_upper", 70.0)?;
    if !(0.0..=100.0).contains(&rsi_lower) || !(0.0..=100.0).contains(&rsi_upper) || rsi_lower >= rsi_upper {
        return Err(EngineError::config_invalid(
            "signal",
            "rsi_lower",
            "rsi band must satisfy 0 <= rsi_lower < rsi_upper <= 100",
        ));
    }

    let min_breakout_pct = non_negative(config, "signal", "min_breakout_pct", 0.003)?;
    let min_volatility_pct = non_negative(config, "signal", "min_volatility_pct", 0.0)?;

    Ok(SignalParams {
        periods: IndicatorPeriods {
            lookback,
            atr: optional_usize(config, "exits", "atr_period", 14)?,
            rsi: optional_usize(config, "signal", "rsi_period", 14)?,
            volume: optional_usize(config, "signal", "volume_period", 20)?,
        },
        volume_threshold,
        rsi_lower,
        rsi_upper,
        min_breakout_pct,
        min_volatility_pct,
    })
}

fn build_risk(config: &dyn ConfigPort) -> Result<RiskLimits, EngineError> {
    let risk_fraction = required_f64(config, "risk", "risk_per_trade")?;
    if risk_fraction <= 0.0 || risk_fraction > 1.0 {
        return Err(EngineError::config_invalid(
            "risk",
            "risk_per_trade",
            "risk_per_trade must be in (0, 1]",
        ));
    }
    let max_position_value = required_f64(config, "risk", "max_position_value")?;
    if max_position_value <= 0.0 {
        return Err(EngineError::config_invalid(
            "risk",
            "max_position_value",
            "max_position_value must be positive",
        ));
    }
    let max_shares = optional_usize(config, "risk", "max_shares", 1_000_000)?;

    Ok(RiskLimits {
        risk_fraction,
        max_position_value,
        max_shares: max_shares as i64,
    })
}

fn build_exits(config: &dyn ConfigPort, rsi_lower: f64) -> Result<ExitParams, EngineError> {
    let stop = match exclusive(config, "exits", "stop_loss_pct", "stop_atr_multiple")? {
        Choice::First(pct) if pct < 1.0 => StopRule::Percent(pct),
        Choice::First(_) => {
            return Err(EngineError::config_invalid(
                "exits",
                "stop_loss_pct",
                "stop_loss_pct must be below 1",
            ));
        }
        Choice::Second(k) => StopRule::AtrMultiple(k),
    };
    let target = match exclusive(config, "exits", "take_profit_pct", "take_profit_atr_multiple")? {
        Choice::First(pct) => TargetRule::Percent(pct),
        Choice::Second(m) => TargetRule::AtrMultiple(m),
    };

    let priority = match config.get_string("exits", "same_bar_priority").as_deref().map(str::trim) {
        None | Some("stop") => ExitPriority::StopFirst,
        Some("target") => ExitPriority::TargetFirst,
        Some(other) => {
            return Err(EngineError::config_invalid(
                "exits",
                "same_bar_priority",
                format!("expected 'stop' or 'target', got '{}'", other),
            ));
        }
    };

    let technical_floor = config
        .get_bool("exits", "technical_exit", false)
        .then_some(rsi_lower);

    Ok(ExitParams {
        stop,
        target,
        priority,
        technical_floor,
        trailing_stop_pct: non_negative(config, "exits", "trailing_stop_pct", 0.0)?,
        trailing_activation_pct: non_negative(config, "exits", "trailing_activation_pct", 0.0)?,
        max_hold_bars: config_usize(config.get_int("exits", "max_hold_bars", 0), "exits", "max_hold_bars")?,
    })
}

fn build_execution(config: &dyn ConfigPort) -> Result<ExecutionConfig, EngineError> {
    let fill_timing = match config.get_string("engine", "fill_timing").as_deref().map(str::trim) {
        None | Some("close") => FillTiming::SameBarClose,
        Some("next_open") => FillTiming::NextBarOpen,
        Some(other) => {
            return Err(EngineError::config_invalid(
                "engine",
                "fill_timing",
                format!("expected 'close' or 'next_open', got '{}'", other),
            ));
        }
    };

    Ok(ExecutionConfig {
        commission_per_trade: non_negative(config, "engine", "commission_per_trade", 0.0)?,
        commission_pct: non_negative(config, "engine", "commission_pct", 0.0)?,
        slippage_pct: non_negative(config, "engine", "slippage_pct", 0.0)?,
        fill_timing,
    })
}

fn build_window(config: &dyn ConfigPort) -> Result<TradingWindow, EngineError> {
    let open = required_time(config, "session", "open")?;
    let close = required_time(config, "session", "close")?;
    if open >= close {
        return Err(EngineError::config_invalid(
            "session",
            "open",
            "session open must be before session close",
        ));
    }

    let warmup = config.get_int("session", "warmup_minutes", 0);
    let cooldown = config.get_int("session", "cooldown_minutes", 0);
    if warmup < 0 || cooldown < 0 {
        return Err(EngineError::config_invalid(
            "session",
            if warmup < 0 { "warmup_minutes" } else { "cooldown_minutes" },
            "offsets must be non-negative",
        ));
    }

    // Checked in minutes: NaiveTime arithmetic wraps at midnight.
    let session_minutes = (close - open).num_minutes();
    if warmup.saturating_add(cooldown) >= session_minutes {
        return Err(EngineError::config_invalid(
            "session",
            "cooldown_minutes",
            format!(
                "warm-up {} + cool-down {} leave no entry window in a {}-minute session",
                warmup, cooldown, session_minutes
            ),
        ));
    }
    Ok(TradingWindow::new(open, close).with_offsets(warmup, cooldown))
}

fn build_calibration(config: &dyn ConfigPort) -> Result<CalibrationTable, EngineError> {
    let mut table = CalibrationTable::new();

    let mut sections = config.sections();
    sections.sort();
    for section in sections {
        let Some(class) = section.strip_prefix(SECTOR_PREFIX) else {
            continue;
        };
        let calibration = Calibration {
            breakout_mult: positive_mult(config, &section, "breakout_mult")?,
            volume_mult: positive_mult(config, &section, "volume_mult")?,
            stop_mult: positive_mult(config, &section, "stop_mult")?,
        };
        table.insert_class(class, calibration);
    }

    for instrument in config.keys("instruments") {
        let class = config
            .get_string("instruments", &instrument)
            .unwrap_or_default();
        let class = class.trim();
        if !table.has_class(class) {
            return Err(EngineError::config_invalid(
                "instruments",
                &instrument,
                format!("unknown sector class '{}'", class),
            ));
        }
        table.assign(&instrument, class);
    }

    Ok(table)
}

fn positive_mult(config: &dyn ConfigPort, section: &str, key: &str) -> Result<f64, EngineError> {
    let value = optional_f64(config, section, key, 1.0)?;
    if value <= 0.0 {
        return Err(EngineError::config_invalid(section, key, "multiplier must be positive"));
    }
    Ok(value)
}

enum Choice {
    First(f64),
    Second(f64),
}

/// Exactly one of two keys must be set, to a positive number.
fn exclusive(
    config: &dyn ConfigPort,
    section: &str,
    first: &str,
    second: &str,
) -> Result<Choice, EngineError> {
    let a = config.get_string(section, first);
    let b = config.get_string(section, second);
    let (key, raw, is_first) = match (a, b) {
        (Some(_), Some(_)) => {
            return Err(EngineError::config_invalid(
                section,
                first,
                format!("set either {} or {}, not both", first, second),
            ));
        }
        (Some(raw), None) => (first, raw, true),
        (None, Some(raw)) => (second, raw, false),
        (None, None) => return Err(EngineError::config_missing(section, first)),
    };
    let value = parse_f64(section, key, &raw)?;
    if value <= 0.0 {
        return Err(EngineError::config_invalid(section, key, format!("{} must be positive", key)));
    }
    Ok(if is_first {
        Choice::First(value)
    } else {
        Choice::Second(value)
    })
}

fn required_time(config: &dyn ConfigPort, section: &str, key: &str) -> Result<NaiveTime, EngineError> {
    let raw = config
        .get_string(section, key)
        .ok_or_else(|| EngineError::config_missing(section, key))?;
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| EngineError::config_invalid(section, key, "invalid time format (expected HH:MM)"))
}

fn required_f64(config: &dyn ConfigPort, section: &str, key: &str) -> Result<f64, EngineError> {
    let raw = config
        .get_string(section, key)
        .ok_or_else(|| EngineError::config_missing(section, key))?;
    parse_f64(section, key, &raw)
}

fn optional_f64(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<f64, EngineError> {
    match config.get_string(section, key) {
        Some(raw) => parse_f64(section, key, &raw),
        None => Ok(default),
    }
}

fn non_negative(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<f64, EngineError> {
    let value = optional_f64(config, section, key, default)?;
    if value < 0.0 {
        return Err(EngineError::config_invalid(section, key, format!("{} must be non-negative", key)));
    }
    Ok(value)
}

fn required_usize(config: &dyn ConfigPort, section: &str, key: &str) -> Result<usize, EngineError> {
    let raw = config
        .get_string(section, key)
        .ok_or_else(|| EngineError::config_missing(section, key))?;
    parse_period(section, key, &raw)
}

fn optional_usize(config: &dyn ConfigPort, section: &str, key: &str, default: usize) -> Result<usize, EngineError> {
    match config.get_string(section, key) {
        Some(raw) => parse_period(section, key, &raw),
        None => Ok(default),
    }
}

fn parse_f64(section: &str, key: &str, raw: &str) -> Result<f64, EngineError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| EngineError::config_invalid(section, key, format!("'{}' is not a number", raw.trim())))
}

/// Periods and counts: a positive integer.
fn parse_period(section: &str, key: &str, raw: &str) -> Result<usize, EngineError> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(EngineError::config_invalid(section, key, format!("{} must be positive", key))),
        Ok(n) => Ok(n),
        Err(_) => Err(EngineError::config_invalid(
            section,
            key,
            format!("'{}' is not a positive integer", raw.trim()),
        )),
    }
}

fn config_usize(value: i64, section: &str, key: &str) -> Result<usize, EngineError> {
    usize::try_from(value)
        .map_err(|_| EngineError::config_invalid(section, key, format!("{} must be non-negative", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    const BASE: &str = r#"
[engine]
initial_capital = 100000
history_window = 50

[signal]
lookback_period = 20
volume_threshold = 1.5

[risk]
risk_per_trade = 0.02
max_position_value = 50000

[exits]
stop_loss_pct = 0.01
take_profit_pct = 0.015

[session]
open = 09:15
close = 15:30
"#;

    fn make_config(extra: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(&format!("{}\n{}", BASE, extra)).unwrap()
    }

    fn without(key: &str) -> FileConfigAdapter {
        let content: String = BASE
            .lines()
            .filter(|l| !l.starts_with(key))
            .map(|l| format!("{}\n", l))
            .collect();
        FileConfigAdapter::from_string(&content).unwrap()
    }

    fn invalid_key(err: EngineError) -> String {
        match err {
            EngineError::ConfigInvalid { key, .. } => key,
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }

    #[test]
    fn valid_config_builds() {
        let cfg = EngineConfig::from_port(&make_config("")).unwrap();
        assert_eq!(cfg.initial_capital, 100_000.0);
        assert_eq!(cfg.history_window, 50);
        assert_eq!(cfg.signal.periods.lookback, 20);
        assert_eq!(cfg.signal.periods.rsi, 14);
        assert_eq!(cfg.signal.rsi_lower, 40.0);
        assert_eq!(cfg.risk.risk_fraction, 0.02);
        assert_eq!(cfg.exits.stop, StopRule::Percent(0.01));
        assert_eq!(cfg.exits.target, TargetRule::Percent(0.015));
        assert_eq!(cfg.exits.priority, ExitPriority::StopFirst);
        assert_eq!(cfg.exits.technical_floor, None);
        assert_eq!(cfg.execution.fill_timing, FillTiming::SameBarClose);
        assert!(cfg.instruments.is_empty());
    }

    #[test]
    fn safety_parameters_are_required() {
        for key in [
            "lookback_period",
            "volume_threshold",
            "risk_per_trade",
            "max_position_value",
            "stop_loss_pct",
            "take_profit_pct",
            "open",
            "close",
        ] {
            let err = EngineConfig::from_port(&without(key)).unwrap_err();
            assert!(
                matches!(&err, EngineError::ConfigMissing { key: k, .. } if k == key),
                "{key}: {err:?}"
            );
        }
    }

    #[test]
    fn risk_fraction_out_of_range() {
        let content = BASE.replace("risk_per_trade = 0.02", "risk_per_trade = 1.5");
        let err = EngineConfig::from_port(&FileConfigAdapter::from_string(&content).unwrap()).unwrap_err();
        assert_eq!(invalid_key(err), "risk_per_trade");
    }

    #[test]
    fn non_numeric_value_is_invalid() {
        let content = BASE.replace("volume_threshold = 1.5", "volume_threshold = lots");
        let err = EngineConfig::from_port(&FileConfigAdapter::from_string(&content).unwrap()).unwrap_err();
        assert_eq!(invalid_key(err), "volume_threshold");
    }

    #[test]
    fn history_window_must_cover_indicators() {
        let content = BASE.replace("history_window = 50", "history_window = 10");
        let err = EngineConfig::from_port(&FileConfigAdapter::from_string(&content).unwrap()).unwrap_err();
        assert_eq!(invalid_key(err), "history_window");
    }

    #[test]
    fn stop_rules_are_exclusive() {
        let content = BASE.replace(
            "stop_loss_pct = 0.01",
            "stop_loss_pct = 0.01\nstop_atr_multiple = 1.5",
        );
        let err = EngineConfig::from_port(&FileConfigAdapter::from_string(&content).unwrap()).unwrap_err();
        assert_eq!(invalid_key(err), "stop_loss_pct");
    }

    #[test]
    fn atr_exits() {
        let content = BASE
            .replace("stop_loss_pct = 0.01", "stop_atr_multiple = 1.5")
            .replace("take_profit_pct = 0.015", "take_profit_atr_multiple = 3\natr_period = 10");
        let cfg = EngineConfig::from_port(&FileConfigAdapter::from_string(&content).unwrap()).unwrap();
        assert_eq!(cfg.exits.stop, StopRule::AtrMultiple(1.5));
        assert_eq!(cfg.exits.target, TargetRule::AtrMultiple(3.0));
        assert_eq!(cfg.signal.periods.atr, 10);
        assert!(cfg.exits.uses_atr());
    }

    #[test]
    fn session_order_checked() {
        let content = BASE.replace("open = 09:15", "open = 16:00");
        let err = EngineConfig::from_port(&FileConfigAdapter::from_string(&content).unwrap()).unwrap_err();
        assert_eq!(invalid_key(err), "open");
    }

    #[test]
    fn offsets_must_fit_inside_session() {
        let with_offsets = |warmup: i64, cooldown: i64| {
            let content = BASE.replace(
                "close = 15:30",
                &format!("close = 15:30\nwarmup_minutes = {warmup}\ncooldown_minutes = {cooldown}"),
            );
            EngineConfig::from_port(&FileConfigAdapter::from_string(&content).unwrap())
        };

        // 09:15..15:30 is 375 minutes.
        let cfg = with_offsets(15, 359).unwrap();
        assert_eq!(cfg.window.entry_start(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(cfg.window.entry_end(), NaiveTime::from_hms_opt(9, 31, 0).unwrap());

        assert_eq!(invalid_key(with_offsets(15, 360).unwrap_err()), "cooldown_minutes");
        assert_eq!(invalid_key(with_offsets(0, 1000).unwrap_err()), "cooldown_minutes");
        assert_eq!(invalid_key(with_offsets(0, i64::MAX).unwrap_err()), "cooldown_minutes");
    }

    #[test]
    fn policies_parse() {
        let content = BASE.replace(
            "take_profit_pct = 0.015",
            "take_profit_pct = 0.015\nsame_bar_priority = target\ntechnical_exit = true",
        );
        let cfg = EngineConfig::from_port(&FileConfigAdapter::from_string(&content).unwrap()).unwrap();
        assert_eq!(cfg.exits.priority, ExitPriority::TargetFirst);
        assert_eq!(cfg.exits.technical_floor, Some(40.0));

        let content = BASE.replace("history_window = 50", "history_window = 50\nfill_timing = next_open");
        let cfg = EngineConfig::from_port(&FileConfigAdapter::from_string(&content).unwrap()).unwrap();
        assert_eq!(cfg.execution.fill_timing, FillTiming::NextBarOpen);

        let content = BASE.replace("history_window = 50", "history_window = 50\nfill_timing = later");
        let err = EngineConfig::from_port(&FileConfigAdapter::from_string(&content).unwrap()).unwrap_err();
        assert_eq!(invalid_key(err), "fill_timing");
    }

    #[test]
    fn sector_calibration_and_assignments() {
        let cfg = EngineConfig::from_port(&make_config(
            r#"
[sector.high_vol]
breakout_mult = 1.5
volume_mult = 0.8
stop_mult = 1.2

[instruments]
ADANIENT = high_vol
"#,
        ))
        .unwrap();
        let cal = cfg.calibration.for_instrument("ADANIENT");
        assert_eq!(cal.breakout_mult, 1.5);
        assert_eq!(cal.volume_mult, 0.8);
        assert_eq!(cal.stop_mult, 1.2);
        assert_eq!(cfg.calibration.for_instrument("TCS"), Calibration::NEUTRAL);
    }

    #[test]
    fn unknown_sector_class_rejected() {
        let err = EngineConfig::from_port(&make_config("[instruments]\nTCS = banking\n")).unwrap_err();
        assert_eq!(invalid_key(err), "TCS");
    }

    #[test]
    fn instrument_list_parsed() {
        let content = BASE.replace("history_window = 50", "history_window = 50\ninstruments = TCS, INFY");
        let cfg = EngineConfig::from_port(&FileConfigAdapter::from_string(&content).unwrap()).unwrap();
        assert_eq!(cfg.instruments, vec!["TCS", "INFY"]);
    }
}
