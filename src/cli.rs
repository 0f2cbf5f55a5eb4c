//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::paper_execution::PaperExecution;
use crate::domain::config::EngineConfig;
use crate::domain::engine::Engine;
use crate::domain::error::EngineError;
use crate::domain::feed::{build_timeline, parse_instruments};
use crate::domain::ledger::Ledger;
use crate::domain::metrics::Metrics;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "intradar", about = "Intraday breakout trading engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay CSV bars through the engine with paper execution
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of `<INSTRUMENT>.csv` bar files
        #[arg(short, long)]
        data: PathBuf,
        /// Comma-separated instruments; overrides the config list
        #[arg(long)]
        instruments: Option<String>,
        /// Directory for trades.csv, equity.csv and summary.csv
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file without running
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Install the tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging();
    match cli.command {
        Command::Backtest {
            config,
            data,
            instruments,
            output,
        } => run_backtest(&config, &data, instruments.as_deref(), output.as_ref()),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = EngineError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn build_config(adapter: &FileConfigAdapter) -> Result<EngineConfig, ExitCode> {
    EngineConfig::from_port(adapter).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

pub fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let config = match build_config(&adapter) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let periods = &config.signal.periods;
    eprintln!(
        "  signal:  lookback {}, volume {}x over {}, RSI({}) in [{}, {}]",
        periods.lookback,
        config.signal.volume_threshold,
        periods.volume,
        periods.rsi,
        config.signal.rsi_lower,
        config.signal.rsi_upper
    );
    eprintln!(
        "  risk:    {:.2}% per trade, max position {:.0}",
        config.risk.risk_fraction * 100.0,
        config.risk.max_position_value
    );
    eprintln!(
        "  exits:   stop {:?}, target {:?}, priority {:?}",
        config.exits.stop, config.exits.target, config.exits.priority
    );
    eprintln!(
        "  session: {} - {}, entries {} - {}, fills at {}",
        config.window.session_open,
        config.window.session_close,
        config.window.entry_start(),
        config.window.entry_end(),
        config.execution.fill_timing
    );
    for (instrument, class) in config.calibration.assignments() {
        eprintln!("  {instrument}: {class}");
    }
    eprintln!("Config is valid");
    ExitCode::SUCCESS
}

pub fn run_backtest(
    config_path: &PathBuf,
    data_dir: &PathBuf,
    instruments: Option<&str>,
    output: Option<&PathBuf>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let config = match build_config(&adapter) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let data_port = CsvAdapter::new(data_dir.clone());
    let report = output.map(|dir| CsvReportAdapter::new(dir.clone()));
    let outcome = run_backtest_pipeline(
        config,
        &data_port,
        instruments,
        report.as_ref().map(|r| r as &dyn ReportPort),
    );

    match outcome {
        Ok(outcome) => {
            print_summary(&outcome.metrics);
            if let Some(dir) = output {
                eprintln!("\nReports written to: {}", dir.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

#[derive(Debug)]
pub struct BacktestOutcome {
    pub ledger: Ledger,
    pub metrics: Metrics,
}

/// Instruments to trade: CLI override, then config list, then everything the source has.
pub fn resolve_instruments(
    cli_override: Option<&str>,
    config: &EngineConfig,
    data_port: &dyn DataPort,
) -> Result<Vec<String>, EngineError> {
    if let Some(list) = cli_override {
        return parse_instruments(list).map_err(|e| EngineError::DataFormat {
            reason: format!("--instruments: {}", e),
        });
    }
    if !config.instruments.is_empty() {
        return Ok(config.instruments.clone());
    }
    data_port.list_instruments()
}

/// Fetch bars per instrument; instruments without usable data are skipped.
pub fn load_feeds(
    data_port: &dyn DataPort,
    instruments: &[String],
) -> Result<BTreeMap<String, Vec<Bar>>, EngineError> {
    let mut feeds = BTreeMap::new();
    for instrument in instruments {
        match data_port.fetch_bars(instrument) {
            Ok(bars) => {
                info!(instrument = %instrument, bars = bars.len(), "loaded bars");
                feeds.insert(instrument.clone(), bars);
            }
            Err(e @ (EngineError::NoData { .. } | EngineError::DataFormat { .. })) => {
                warn!(instrument = %instrument, error = %e, "skipping instrument");
            }
            Err(e) => return Err(e),
        }
    }

    if feeds.is_empty() {
        return Err(EngineError::NoData {
            instrument: instruments.join(","),
        });
    }
    Ok(feeds)
}

pub fn run_backtest_pipeline(
    config: EngineConfig,
    data_port: &dyn DataPort,
    instruments: Option<&str>,
    report: Option<&dyn ReportPort>,
) -> Result<BacktestOutcome, EngineError> {
    let instruments = resolve_instruments(instruments, &config, data_port)?;
    let feeds = load_feeds(data_port, &instruments)?;
    let timeline = build_timeline(&feeds);
    eprintln!(
        "  Processing: {} instruments, {} timestamps",
        feeds.len(),
        timeline.len()
    );

    let execution = PaperExecution::new(config.execution.clone());
    let mut engine = Engine::new(config, execution);
    engine.run(timeline)?;

    let ledger = engine.into_ledger();
    let metrics = Metrics::compute(&ledger);
    if let Some(report) = report {
        report.write(&ledger, &metrics)?;
    }
    Ok(BacktestOutcome { ledger, metrics })
}

fn print_summary(metrics: &Metrics) {
    eprintln!("\n=== Results ===");
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!("Final Equity:     {:.2}", metrics.final_equity);
    eprintln!("Realized P&L:     {:.2}", metrics.realized_pnl);
    eprintln!("Commission:       {:.2}", metrics.total_commission);
    eprintln!("Max Drawdown:     -{:.2}%", metrics.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", metrics.total_trades);
    eprintln!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", metrics.profit_factor);
    eprintln!(
        "Avg Win / Loss:   {:.2} / {:.2}",
        metrics.avg_win, metrics.avg_loss
    );
    eprintln!("Avg Hold:         {:.1} min", metrics.avg_hold_minutes);
}
