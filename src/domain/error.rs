//! Domain error types.

use chrono::NaiveDateTime;

/// Top-level error type for intradar.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("insufficient history for {indicator}: have {available} bars, need {needed}")]
    InsufficientHistory {
        indicator: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("malformed bar sequence for {instrument}: {received} does not follow {previous}")]
    MalformedBarSequence {
        instrument: String,
        previous: NaiveDateTime,
        received: NaiveDateTime,
    },

    #[error("invalid stop distance: entry {entry} is not above stop {stop}")]
    InvalidStopDistance { entry: f64, stop: f64 },

    #[error("insufficient funds: required {required:.2}, available {available:.2}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("order {order}: invalid transition {from} -> {to}")]
    InvalidTransition {
        order: u64,
        from: &'static str,
        to: &'static str,
    },

    #[error("invariant violated: {reason}")]
    InvariantViolation { reason: String },

    #[error("no data for {instrument}")]
    NoData { instrument: String },

    #[error("data format error: {reason}")]
    DataFormat { reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub(crate) fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        EngineError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn config_missing(section: &str, key: &str) -> Self {
        EngineError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    /// Data and sizing faults: the affected instrument skips the bar and the run goes on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::InsufficientHistory { .. }
                | EngineError::MalformedBarSequence { .. }
                | EngineError::InvalidStopDistance { .. }
                | EngineError::InsufficientFunds { .. }
        )
    }
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err {
            EngineError::Io(_) | EngineError::Csv(_) => 1,
            EngineError::ConfigParse { .. }
            | EngineError::ConfigMissing { .. }
            | EngineError::ConfigInvalid { .. } => 2,
            EngineError::NoData { .. }
            | EngineError::DataFormat { .. }
            | EngineError::InsufficientHistory { .. }
            | EngineError::MalformedBarSequence { .. } => 3,
            EngineError::InvalidTransition { .. }
            | EngineError::InvariantViolation { .. }
            | EngineError::InvalidStopDistance { .. }
            | EngineError::InsufficientFunds { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
