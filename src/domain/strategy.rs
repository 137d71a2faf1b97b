//! Band strategy definition and parameter validation.

use std::fmt;
use std::str::FromStr;

use super::error::BacktestError;

pub const DEFAULT_LOOKBACK: usize = 20;
pub const DEFAULT_ENTRY_Z_SCORE: f64 = 2.0;
pub const DEFAULT_EXIT_Z_SCORE: f64 = 0.0;

/// Lookback window and z-score thresholds shared by both band generators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandParams {
    pub lookback: usize,
    pub entry_z_score: f64,
    pub exit_z_score: f64,
}

impl Default for BandParams {
    fn default() -> Self {
        BandParams {
            lookback: DEFAULT_LOOKBACK,
            entry_z_score: DEFAULT_ENTRY_Z_SCORE,
            exit_z_score: DEFAULT_EXIT_Z_SCORE,
        }
    }
}

impl BandParams {
    /// Builds parameters, failing if they could never produce a valid run.
    pub fn new(lookback: usize, entry_z_score: f64, exit_z_score: f64) -> Result<Self, BacktestError> {
        let params = BandParams {
            lookback,
            entry_z_score,
            exit_z_score,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.lookback == 0 {
            return Err(BacktestError::invalid_parameter(
                "lookback",
                "lookback must be positive",
            ));
        }
        if !self.entry_z_score.is_finite() || !self.exit_z_score.is_finite() {
            return Err(BacktestError::invalid_parameter(
                "entry_z_score",
                format!(
                    "z scores must be finite: entry_z_score={}, exit_z_score={}",
                    self.entry_z_score, self.exit_z_score
                ),
            ));
        }
        if self.entry_z_score <= self.exit_z_score {
            return Err(BacktestError::invalid_parameter(
                "exit_z_score",
                format!(
                    "entry_z_score must exceed exit_z_score: entry_z_score={}, exit_z_score={}",
                    self.entry_z_score, self.exit_z_score
                ),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for BandParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lookback={}, entry_z_score={}, exit_z_score={}",
            self.lookback, self.entry_z_score, self.exit_z_score
        )
    }
}

/// Which band generator drives the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    /// One open trade at a time; held until the exit band is crossed.
    #[default]
    ExclusiveTrend,
    /// Long and short channels tracked independently and netted.
    IndependentChannel,
}

impl FromStr for StrategyKind {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exclusive" | "exclusive_trend" | "moving_average" => Ok(StrategyKind::ExclusiveTrend),
            "channel" | "independent_channel" | "chan" => Ok(StrategyKind::IndependentChannel),
            other => Err(BacktestError::invalid_parameter(
                "kind",
                format!("unknown strategy kind '{other}' (expected exclusive or channel)"),
            )),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::ExclusiveTrend => write!(f, "exclusive"),
            StrategyKind::IndependentChannel => write!(f, "channel"),
        }
    }
}
