//! CSV report writer: `trades.csv`, `equity.csv` and `summary.csv` in an
//! output directory.

use std::fs;
use std::path::PathBuf;

use crate::domain::error::EngineError;
use crate::domain::ledger::Ledger;
use crate::domain::metrics::Metrics;
use crate::ports::report_port::ReportPort;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct CsvReportAdapter {
    output_dir: PathBuf,
}

impl CsvReportAdapter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    fn write_trades(&self, ledger: &Ledger) -> Result<(), EngineError> {
        let mut wtr = csv::Writer::from_path(self.output_dir.join("trades.csv"))?;
        wtr.write_record([
            "instrument",
            "entry_timestamp",
            "exit_timestamp",
            "entry_price",
            "exit_price",
            "size",
            "commission",
            "pnl",
            "exit_reason",
        ])?;
        for trade in &ledger.trades {
            wtr.write_record([
                trade.instrument.clone(),
                trade.entry_timestamp.format(TIMESTAMP_FORMAT).to_string(),
                trade.exit_timestamp.format(TIMESTAMP_FORMAT).to_string(),
                format!("{:.4}", trade.entry_price),
                format!("{:.4}", trade.exit_price),
                trade.size.to_string(),
                format!("{:.2}", trade.commission),
                format!("{:.2}", trade.pnl),
                trade.exit_reason.to_string(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_equity(&self, ledger: &Ledger) -> Result<(), EngineError> {
        let mut wtr = csv::Writer::from_path(self.output_dir.join("equity.csv"))?;
        wtr.write_record(["timestamp", "equity"])?;
        for point in &ledger.equity_curve {
            wtr.write_record([
                point.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                format!("{:.2}", point.equity),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_summary(&self, metrics: &Metrics) -> Result<(), EngineError> {
        let mut wtr = csv::Writer::from_path(self.output_dir.join("summary.csv"))?;
        wtr.write_record(["metric", "value"])?;
        let rows = [
            ("total_return", format!("{:.6}", metrics.total_return)),
            ("final_equity", format!("{:.2}", metrics.final_equity)),
            ("realized_pnl", format!("{:.2}", metrics.realized_pnl)),
            ("total_commission", format!("{:.2}", metrics.total_commission)),
            ("max_drawdown", format!("{:.6}", metrics.max_drawdown)),
            ("total_trades", metrics.total_trades.to_string()),
            ("win_rate", format!("{:.4}", metrics.win_rate)),
            ("profit_factor", format!("{:.4}", metrics.profit_factor)),
            ("avg_win", format!("{:.2}", metrics.avg_win)),
            ("avg_loss", format!("{:.2}", metrics.avg_loss)),
            ("largest_win", format!("{:.2}", metrics.largest_win)),
            ("largest_loss", format!("{:.2}", metrics.largest_loss)),
        ];
        for (name, value) in rows {
            wtr.write_record([name, value.as_str()])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, ledger: &Ledger, metrics: &Metrics) -> Result<(), EngineError> {
        fs::create_dir_all(&self.output_dir)?;
        self.write_trades(ledger)?;
        self.write_equity(ledger)?;
        self.write_summary(metrics)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{ExitReason, TradeRecord};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample_ledger() -> Ledger {
        let ts = |m: u32| {
            NaiveDate::from_ymd_opt(2024, 3, 4)
                .unwrap()
                .and_hms_opt(10, m, 0)
                .unwrap()
        };
        let mut ledger = Ledger::new(100_000.0);
        ledger.apply_buy(100, 50.0, 0.0).unwrap();
        ledger
            .apply_sell(
                100,
                51.0,
                0.0,
                TradeRecord {
                    instrument: "MARUTI".into(),
                    entry_timestamp: ts(0),
                    exit_timestamp: ts(5),
                    entry_price: 50.0,
                    exit_price: 51.0,
                    size: 100,
                    commission: 0.0,
                    pnl: 100.0,
                    exit_reason: ExitReason::TakeProfit,
                },
            )
            .unwrap();
        ledger.record_equity(ts(0), 5_000.0);
        ledger.record_equity(ts(5), 0.0);
        ledger
    }

    #[test]
    fn writes_all_reports() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("run");
        let ledger = sample_ledger();
        let metrics = Metrics::compute(&ledger);

        CsvReportAdapter::new(out.clone())
            .write(&ledger, &metrics)
            .unwrap();

        let trades = fs::read_to_string(out.join("trades.csv")).unwrap();
        let mut lines = trades.lines();
        assert!(lines.next().unwrap().starts_with("instrument,entry_timestamp"));
        assert_eq!(
            lines.next().unwrap(),
            "MARUTI,2024-03-04 10:00:00,2024-03-04 10:05:00,50.0000,51.0000,100,0.00,100.00,take_profit"
        );

        let equity = fs::read_to_string(out.join("equity.csv")).unwrap();
        assert_eq!(equity.lines().count(), 3);

        let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
        assert!(summary.contains("total_trades,1"));
    }
}
