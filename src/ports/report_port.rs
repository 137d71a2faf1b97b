//! Report generation port.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BacktestError;
use crate::domain::price_series::PriceSeries;
use crate::domain::rebalance::{RebalancePerformance, RebalanceResult};
use crate::domain::sweep::SweepReport;

/// Port for writing run results.
pub trait ReportPort {
    fn write_backtest(
        &self,
        result: &BacktestResult,
        prices: &PriceSeries,
        output_path: &Path,
    ) -> Result<(), BacktestError>;

    fn write_rebalance(
        &self,
        result: &RebalanceResult,
        performance: &RebalancePerformance,
        output_path: &Path,
    ) -> Result<(), BacktestError>;

    fn write_sweep(&self, report: &SweepReport, output_path: &Path) -> Result<(), BacktestError>;
}
