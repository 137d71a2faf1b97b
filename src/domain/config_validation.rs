//! Configuration validation.
//!
//! Each section is checked up front so a bad file fails before any data is
//! loaded or any run starts.

use crate::domain::allocation::BreakpointTable;
use crate::domain::error::BacktestError;
use crate::domain::metrics::DEFAULT_ANNUALIZATION;
use crate::domain::strategy::{
    StrategyKind, DEFAULT_ENTRY_Z_SCORE, DEFAULT_EXIT_Z_SCORE, DEFAULT_LOOKBACK,
};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DEFAULT_INITIAL_CASH: f64 = 100_000.0;
const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    require_string(config, "backtest", "prices")?;
    validate_positive(config, "backtest", "initial_cash", DEFAULT_INITIAL_CASH)?;
    validate_positive(config, "backtest", "annualization", DEFAULT_ANNUALIZATION)?;
    validate_dates(config, "backtest")?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_kind(config)?;
    validate_lookback(config)?;
    validate_z_scores(config)?;
    Ok(())
}

pub fn validate_rebalance_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    for key in ["prices", "first", "second", "signal_numerator", "signal_denominator"] {
        require_string(config, "rebalance", key)?;
    }
    validate_table(config)?;
    validate_positive(config, "rebalance", "initial_cash", DEFAULT_INITIAL_CASH)?;
    validate_dates(config, "rebalance")?;
    Ok(())
}

pub fn validate_sweep_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    if config.get_int("sweep", "samples", 1000) < 1 {
        return Err(invalid("sweep", "samples", "samples must be at least 1"));
    }
    let lookback_min = config.get_int("sweep", "lookback_min", 2);
    let lookback_max = config.get_int("sweep", "lookback_max", 92);
    if lookback_min < 1 {
        return Err(invalid("sweep", "lookback_min", "lookback_min must be at least 1"));
    }
    if lookback_max <= lookback_min {
        return Err(invalid(
            "sweep",
            "lookback_max",
            "lookback_max must exceed lookback_min",
        ));
    }
    validate_range(config, "entry_min", "entry_max", (0.0, 5.0))?;
    validate_range(config, "exit_min", "exit_max", (-5.0, 0.0))?;
    Ok(())
}

/// A non-empty string value, or `ConfigMissing`.
pub fn require_string(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, BacktestError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(BacktestError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

/// An optional `YYYY-MM-DD` date. Present but malformed is `ConfigInvalid`.
pub fn optional_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, BacktestError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map(Some)
            .map_err(|_| invalid(section, key, format!("invalid {key} format, expected YYYY-MM-DD"))),
        _ => Ok(None),
    }
}

fn validate_dates(config: &dyn ConfigPort, section: &str) -> Result<(), BacktestError> {
    let start = optional_date(config, section, "start_date")?;
    let end = optional_date(config, section, "end_date")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(invalid(section, "start_date", "start_date must be before end_date"));
        }
    }
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> BacktestError {
    BacktestError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_positive(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<(), BacktestError> {
    let value = config.get_double(section, key, default);
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(section, key, format!("{key} must be positive")));
    }
    Ok(())
}

fn validate_kind(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    if let Some(kind) = config.get_string("strategy", "kind") {
        kind.parse::<StrategyKind>()
            .map_err(|e| invalid("strategy", "kind", e.to_string()))?;
    }
    Ok(())
}

fn validate_lookback(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let value = config.get_int("strategy", "lookback", DEFAULT_LOOKBACK as i64);
    if value < 1 {
        return Err(invalid("strategy", "lookback", "lookback must be at least 1"));
    }
    Ok(())
}

fn validate_z_scores(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let entry = config.get_double("strategy", "entry_z_score", DEFAULT_ENTRY_Z_SCORE);
    let exit = config.get_double("strategy", "exit_z_score", DEFAULT_EXIT_Z_SCORE);
    if !entry.is_finite() {
        return Err(invalid("strategy", "entry_z_score", "entry_z_score must be finite"));
    }
    if !exit.is_finite() {
        return Err(invalid("strategy", "exit_z_score", "exit_z_score must be finite"));
    }
    if entry <= exit {
        return Err(invalid(
            "strategy",
            "exit_z_score",
            format!("entry_z_score ({entry}) must exceed exit_z_score ({exit})"),
        ));
    }
    Ok(())
}

fn validate_table(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let name = require_string(config, "rebalance", "table")?;
    name.parse::<BreakpointTable>()
        .map_err(|e| invalid("rebalance", "table", e.to_string()))?;
    Ok(())
}

fn validate_range(
    config: &dyn ConfigPort,
    min_key: &str,
    max_key: &str,
    default: (f64, f64),
) -> Result<(), BacktestError> {
    let min = config.get_double("sweep", min_key, default.0);
    let max = config.get_double("sweep", max_key, default.1);
    if !min.is_finite() || !max.is_finite() || max <= min {
        return Err(invalid(
            "sweep",
            max_key,
            format!("{max_key} must exceed {min_key}"),
        ));
    }
    Ok(())
}
