//! Monte Carlo parameter sweep over band strategies.
//!
//! Parameters are drawn up front from a seeded RNG so a given seed always
//! yields the same candidates. Combinations that fail validation are skipped;
//! the remaining runs are independent and execute in parallel.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use super::backtest::BandBacktest;
use super::error::BacktestError;
use super::metrics::DEFAULT_ANNUALIZATION;
use super::price_series::PriceSeries;
use super::series::max_vector;
use super::strategy::{BandParams, StrategyKind};

#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    pub samples: usize,
    pub seed: u64,
    /// Half-open `[min, max)` ranges sampled uniformly.
    pub lookback: (usize, usize),
    pub entry_z_score: (f64, f64),
    pub exit_z_score: (f64, f64),
    pub kind: StrategyKind,
    pub annualization: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            samples: 1000,
            seed: 42,
            lookback: (2, 92),
            entry_z_score: (0.0, 5.0),
            exit_z_score: (-5.0, 0.0),
            kind: StrategyKind::ExclusiveTrend,
            annualization: DEFAULT_ANNUALIZATION,
        }
    }
}

impl SweepConfig {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.samples == 0 {
            return Err(BacktestError::invalid_parameter(
                "samples",
                "at least one sample is required",
            ));
        }
        let (lo, hi) = self.lookback;
        if lo == 0 || lo >= hi {
            return Err(BacktestError::invalid_parameter(
                "lookback",
                format!("lookback range [{lo}, {hi}) must be non-empty and start above zero"),
            ));
        }
        check_range("entry_z_score", self.entry_z_score)?;
        check_range("exit_z_score", self.exit_z_score)?;
        Ok(())
    }

    /// Candidate parameters in draw order, including invalid combinations.
    pub fn draw(&self) -> Result<Vec<BandParams>, BacktestError> {
        self.validate()?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        Ok((0..self.samples)
            .map(|_| BandParams {
                lookback: rng.gen_range(self.lookback.0..self.lookback.1),
                entry_z_score: rng.gen_range(self.entry_z_score.0..self.entry_z_score.1),
                exit_z_score: rng.gen_range(self.exit_z_score.0..self.exit_z_score.1),
            })
            .collect())
    }
}

fn check_range(name: &str, (lo, hi): (f64, f64)) -> Result<(), BacktestError> {
    if !lo.is_finite() || !hi.is_finite() || lo >= hi {
        return Err(BacktestError::invalid_parameter(
            name,
            format!("range [{lo}, {hi}) must be finite and non-empty"),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepOutcome {
    pub lookback: usize,
    pub entry_z_score: f64,
    pub exit_z_score: f64,
    pub sharpe: f64,
}

impl SweepOutcome {
    /// `[sharpe, lookback, entry_z_score, exit_z_score]`.
    pub fn to_row(&self) -> Vec<f64> {
        vec![
            self.sharpe,
            self.lookback as f64,
            self.entry_z_score,
            self.exit_z_score,
        ]
    }

    pub fn from_row(row: &[f64]) -> Option<Self> {
        match row {
            &[sharpe, lookback, entry_z_score, exit_z_score] => Some(SweepOutcome {
                lookback: lookback as usize,
                entry_z_score,
                exit_z_score,
                sharpe,
            }),
            _ => None,
        }
    }

    pub fn params(&self) -> BandParams {
        BandParams {
            lookback: self.lookback,
            entry_z_score: self.entry_z_score,
            exit_z_score: self.exit_z_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepReport {
    pub outcomes: Vec<SweepOutcome>,
    pub skipped: usize,
}

impl SweepReport {
    /// The outcome with the highest Sharpe ratio, ignoring NaN.
    pub fn best(&self) -> Option<SweepOutcome> {
        let rows: Vec<Vec<f64>> = self.outcomes.iter().map(SweepOutcome::to_row).collect();
        max_vector(&rows, 0).and_then(SweepOutcome::from_row)
    }

    /// Outcomes labelled by their parameters, highest Sharpe first.
    pub fn ranked(&self) -> Vec<(String, f64)> {
        let labelled: Vec<(String, f64)> = self
            .outcomes
            .iter()
            .map(|o| (o.params().to_string(), o.sharpe))
            .collect();
        order_results_desc(&labelled)
    }
}

pub fn run_sweep(prices: &PriceSeries, config: &SweepConfig) -> Result<SweepReport, BacktestError> {
    let candidates = config.draw()?;
    let total = candidates.len();

    let valid: Vec<BandParams> = candidates
        .into_iter()
        .filter(|params| match params.validate() {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "skipping sweep sample");
                false
            }
        })
        .collect();
    let skipped = total - valid.len();

    let outcomes = valid
        .par_iter()
        .map(|params| {
            let result = BandBacktest::new(*params, config.kind)
                .with_annualization(config.annualization)
                .run(prices)?;
            Ok(SweepOutcome {
                lookback: params.lookback,
                entry_z_score: params.entry_z_score,
                exit_z_score: params.exit_z_score,
                sharpe: result.report.sharpe,
            })
        })
        .collect::<Result<Vec<_>, BacktestError>>()?;

    debug!(
        samples = total,
        skipped,
        completed = outcomes.len(),
        "parameter sweep complete"
    );

    Ok(SweepReport { outcomes, skipped })
}

/// Sorts `(label, value)` pairs by value, highest first. Equal values keep
/// their input order and NaN values go last.
pub fn order_results_desc<T: Clone>(results: &[(T, f64)]) -> Vec<(T, f64)> {
    let mut sorted = results.to_vec();
    sorted.sort_by(|a, b| {
        a.1.is_nan()
            .cmp(&b.1.is_nan())
            .then_with(|| b.1.total_cmp(&a.1))
    });
    sorted
}
