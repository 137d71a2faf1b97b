//! Domain error types.

/// Top-level error type for bandtrader.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
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

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("invalid price {value} at index {index}: prices must be finite and positive")]
    InvalidPrice { index: usize, value: f64 },

    #[error("price series is empty")]
    EmptySeries,

    #[error("length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BacktestError {
    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        BacktestError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn length_mismatch(what: &str, expected: usize, actual: usize) -> Self {
        BacktestError::LengthMismatch {
            what: what.to_string(),
            expected,
            actual,
        }
    }
}

impl From<&BacktestError> for std::process::ExitCode {
    fn from(err: &BacktestError) -> Self {
        let code: u8 = match err {
            BacktestError::Io(_) => 1,
            BacktestError::ConfigParse { .. }
            | BacktestError::ConfigMissing { .. }
            | BacktestError::ConfigInvalid { .. } => 2,
            BacktestError::InvalidParameter { .. }
            | BacktestError::InvalidPrice { .. }
            | BacktestError::LengthMismatch { .. } => 3,
            BacktestError::EmptySeries | BacktestError::Data { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
