//! Per-instrument calibration by sector class.
//!
//! A flat lookup from instrument → class → multiplier set. Classes are pure
//! data loaded from config; instruments without a class use neutral multipliers.

use std::collections::BTreeMap;

/// Multipliers applied to raw signal/exit thresholds for one instrument class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Scales the minimum breakout percentage.
    pub breakout_mult: f64,
    /// Scales the volume threshold multiplier.
    pub volume_mult: f64,
    /// Scales the stop distance.
    pub stop_mult: f64,
}

impl Calibration {
    pub const NEUTRAL: Calibration = Calibration {
        breakout_mult: 1.0,
        volume_mult: 1.0,
        stop_mult: 1.0,
    };
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration::NEUTRAL
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationTable {
    classes: BTreeMap<String, Calibration>,
    instruments: BTreeMap<String, String>,
}

impl CalibrationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, class: &str, calibration: Calibration) -> Self {
        self.insert_class(class, calibration);
        self
    }

    pub fn with_instrument(mut self, instrument: &str, class: &str) -> Self {
        self.assign(instrument, class);
        self
    }

    pub fn insert_class(&mut self, class: &str, calibration: Calibration) {
        self.classes.insert(class.to_string(), calibration);
    }

    pub fn assign(&mut self, instrument: &str, class: &str) {
        self.instruments
            .insert(instrument.to_string(), class.to_string());
    }

    pub fn class_of(&self, instrument: &str) -> Option<&str> {
        self.instruments.get(instrument).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    /// Instrument → class assignments, for validation.
    pub fn assignments(&self) -> impl Iterator<Item = (&str, &str)> {
        self.instruments
            .iter()
            .map(|(i, c)| (i.as_str(), c.as_str()))
    }

    pub fn for_instrument(&self, instrument: &str) -> Calibration {
        self.class_of(instrument)
            .and_then(|class| self.classes.get(class))
            .copied()
            .unwrap_or_default()
    }
}
