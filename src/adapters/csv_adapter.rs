//! CSV bar files, one per instrument: `<dir>/<INSTRUMENT>.csv` with header
//! `timestamp,open,high,low,close,volume`.
//!
//! Rows are returned in file order. Ordering faults are left for the engine
//! to reject bar by bar.

use crate::domain::error::EngineError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDateTime;
use std::fs;
use std::path::PathBuf;

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, instrument: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", instrument))
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw.trim(), fmt).ok())
}

fn field<T: std::str::FromStr>(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    row: usize,
) -> Result<T, EngineError> {
    let raw = record.get(index).ok_or_else(|| EngineError::DataFormat {
        reason: format!("row {}: missing {} column", row, name),
    })?;
    raw.trim().parse().map_err(|_| EngineError::DataFormat {
        reason: format!("row {}: invalid {} value '{}'", row, name, raw),
    })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(&self, instrument: &str) -> Result<Vec<Bar>, EngineError> {
        let path = self.csv_path(instrument);
        if !path.is_file() {
            return Err(EngineError::NoData {
                instrument: instrument.to_string(),
            });
        }

        let mut rdr = csv::Reader::from_path(&path)?;
        let mut bars = Vec::new();

        for (i, result) in rdr.records().enumerate() {
            let record = result?;
            let row = i + 2;

            let raw_ts = record.get(0).unwrap_or_default();
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| EngineError::DataFormat {
                reason: format!("row {}: invalid timestamp '{}'", row, raw_ts),
            })?;

            bars.push(Bar {
                timestamp,
                open: field(&record, 1, "open", row)?,
                high: field(&record, 2, "high", row)?,
                low: field(&record, 3, "low", row)?,
                close: field(&record, 4, "close", row)?,
                volume: field(&record, 5, "volume", row)?,
            });
        }

        if bars.is_empty() {
            return Err(EngineError::NoData {
                instrument: instrument.to_string(),
            });
        }
        Ok(bars)
    }

    fn list_instruments(&self) -> Result<Vec<String>, EngineError> {
        let mut instruments = Vec::new();

        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    instruments.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        instruments.sort();
        Ok(instruments)
    }
}
