//! Single-instrument band backtest.
//!
//! validate → signals → P&L path → returns → report. The exclusive-trend
//! variant trades one unit per signal and reports the cumulative traded
//! path; the channel variant reports the value of the unit held each step.

use tracing::debug;

use super::error::BacktestError;
use super::indicator::BandSeries;
use super::metrics::{calculate_returns, PerformanceReport, DEFAULT_ANNUALIZATION};
use super::position::{cumulative_positions, holding_values};
use super::price_series::PriceSeries;
use super::side::{actions, Side, Signal};
use super::signal::generator_for;
use super::strategy::{BandParams, StrategyKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandBacktest {
    pub params: BandParams,
    pub kind: StrategyKind,
    pub annualization: f64,
}

impl Default for BandBacktest {
    fn default() -> Self {
        BandBacktest {
            params: BandParams::default(),
            kind: StrategyKind::default(),
            annualization: DEFAULT_ANNUALIZATION,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub signals: Vec<Side>,
    pub positions: Vec<Side>,
    pub path: Vec<f64>,
    pub returns: Vec<f64>,
    pub report: PerformanceReport,
    /// Envelope the signals were generated from.
    pub bands: BandSeries,
}

impl BacktestResult {
    pub fn final_pnl(&self) -> f64 {
        self.path.last().copied().unwrap_or(0.0)
    }

    /// Every step that traded, in order.
    pub fn trades(&self) -> Vec<Signal> {
        actions(&self.signals)
    }

    pub fn trade_count(&self) -> usize {
        self.trades().len()
    }
}

impl BandBacktest {
    pub fn new(params: BandParams, kind: StrategyKind) -> Self {
        BandBacktest {
            params,
            kind,
            ..BandBacktest::default()
        }
    }

    pub fn with_annualization(mut self, annualization: f64) -> Self {
        self.annualization = annualization;
        self
    }

    pub fn run(&self, prices: &PriceSeries) -> Result<BacktestResult, BacktestError> {
        self.params.validate()?;
        if !self.annualization.is_finite() || self.annualization <= 0.0 {
            return Err(BacktestError::invalid_parameter(
                "annualization",
                format!("annualization must be positive, got {}", self.annualization),
            ));
        }

        let generated = generator_for(self.kind, self.params).generate(prices)?;
        let path = match self.kind {
            StrategyKind::ExclusiveTrend => cumulative_positions(prices.close(), &generated.signals),
            StrategyKind::IndependentChannel => holding_values(prices.close(), &generated.positions),
        };
        let returns = calculate_returns(&path);
        let report = PerformanceReport::from_returns(&returns, self.annualization);

        let result = BacktestResult {
            signals: generated.signals,
            positions: generated.positions,
            path,
            returns,
            report,
            bands: generated.bands,
        };

        debug!(
            kind = %self.kind,
            params = %self.params,
            trades = result.trade_count(),
            final_pnl = result.final_pnl(),
            sharpe = result.report.sharpe,
            "band backtest complete"
        );

        Ok(result)
    }
}
