//! Feed assembly: instrument lists and the timestamp-grouped bar timeline.
//!
//! Per-instrument bars are merged into groups that share a timestamp. Each
//! instrument's own order is preserved, so an out-of-order or duplicated bar
//! reaches the engine exactly where the supplier put it and is rejected there.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDateTime;

use super::ohlcv::Bar;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InstrumentListError {
    #[error("empty token in instrument list")]
    EmptyToken,

    #[error("duplicate instrument: {0}")]
    Duplicate(String),
}

/// Parse `"A, B,C"` into `["A", "B", "C"]`.
pub fn parse_instruments(input: &str) -> Result<Vec<String>, InstrumentListError> {
    let mut instruments = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let name = token.trim();
        if name.is_empty() {
            return Err(InstrumentListError::EmptyToken);
        }
        if !seen.insert(name.to_string()) {
            return Err(InstrumentListError::Duplicate(name.to_string()));
        }
        instruments.push(name.to_string());
    }

    Ok(instruments)
}

/// Bars that arrive together, one per instrument, sorted by instrument name.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampGroup {
    pub timestamp: NaiveDateTime,
    pub bars: Vec<(String, Bar)>,
}

pub fn build_timeline(feeds: &BTreeMap<String, Vec<Bar>>) -> Vec<TimestampGroup> {
    let mut cursors: Vec<(&str, &[Bar])> = feeds
        .iter()
        .map(|(name, bars)| (name.as_str(), bars.as_slice()))
        .collect();
    let mut groups: Vec<TimestampGroup> = Vec::new();

    loop {
        // BTreeMap order makes the first minimum the alphabetically first instrument.
        let next = cursors
            .iter()
            .enumerate()
            .filter_map(|(i, (_, rest))| rest.first().map(|bar| (i, bar.timestamp)))
            .min_by_key(|&(_, ts)| ts);
        let Some((i, timestamp)) = next else {
            break;
        };

        let (name, rest) = cursors[i];
        cursors[i].1 = &rest[1..];
        let entry = (name.to_string(), rest[0].clone());

        match groups.last_mut() {
            Some(group)
                if group.timestamp == timestamp
                    && group.bars.iter().all(|(n, _)| n.as_str() != name) =>
            {
                group.bars.push(entry);
            }
            _ => groups.push(TimestampGroup {
                timestamp,
                bars: vec![entry],
            }),
        }
    }

    groups
}
