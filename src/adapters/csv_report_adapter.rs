//! CSV report adapter.
//!
//! Each run writes a per-step table to the output path and a two-column
//! `metric,value` summary next to it (`<stem>.summary.csv`).

use std::path::{Path, PathBuf};

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BacktestError;
use crate::domain::metrics::PerformanceReport;
use crate::domain::price_series::PriceSeries;
use crate::domain::rebalance::{RebalancePerformance, RebalanceResult};
use crate::domain::sweep::SweepReport;
use crate::ports::report_port::ReportPort;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvReportAdapter {
    /// Adds the chart series (bands, equity) to the per-step tables.
    pub plot: bool,
}

impl CsvReportAdapter {
    pub fn new(plot: bool) -> Self {
        Self { plot }
    }

    pub fn summary_path(output_path: &Path) -> PathBuf {
        output_path.with_extension("summary.csv")
    }
}

type CsvWriter = csv::Writer<std::fs::File>;

fn open(path: &Path) -> Result<CsvWriter, BacktestError> {
    csv::Writer::from_path(path).map_err(|e| std::io::Error::from(e).into())
}

fn write_row<I, T>(wtr: &mut CsvWriter, row: I) -> Result<(), BacktestError>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    wtr.write_record(row)
        .map_err(|e| std::io::Error::from(e).into())
}

fn finish(mut wtr: CsvWriter, path: &Path) -> Result<(), BacktestError> {
    wtr.flush()?;
    info!(path = %path.display(), "report written");
    Ok(())
}

fn report_rows(report: &PerformanceReport) -> Vec<(&'static str, String)> {
    vec![
        ("sharpe", report.sharpe.to_string()),
        ("sortino", report.sortino.to_string()),
        ("max_drawdown", report.max_drawdown.to_string()),
        ("max_drawdown_duration", report.max_drawdown_duration.to_string()),
        ("drawdown_index", report.drawdown_index.to_string()),
        ("duration_end_index", report.duration_end_index.to_string()),
        ("highwatermark_index", report.highwatermark_index.to_string()),
    ]
}

fn write_summary(output_path: &Path, rows: &[(&str, String)]) -> Result<(), BacktestError> {
    let path = CsvReportAdapter::summary_path(output_path);
    let mut wtr = open(&path)?;
    write_row(&mut wtr, ["metric", "value"])?;
    for (metric, value) in rows {
        write_row(&mut wtr, [*metric, value.as_str()])?;
    }
    finish(wtr, &path)
}

impl ReportPort for CsvReportAdapter {
    fn write_backtest(
        &self,
        result: &BacktestResult,
        prices: &PriceSeries,
        output_path: &Path,
    ) -> Result<(), BacktestError> {
        let mut wtr = open(output_path)?;
        let mut header = vec!["index", "price", "signal", "position", "path", "return"];
        if self.plot {
            header.extend(["upper", "middle", "lower"]);
        }
        write_row(&mut wtr, &header)?;

        for (i, point) in prices.points().enumerate() {
            let mut row = vec![
                i.to_string(),
                point.close.to_string(),
                result.signals[i].value().to_string(),
                result.positions[i].value().to_string(),
                result.path[i].to_string(),
                result.returns[i].to_string(),
            ];
            if self.plot {
                let band = result.bands.values[i];
                row.extend([band.upper, band.middle, band.lower].map(|v| v.to_string()));
            }
            write_row(&mut wtr, &row)?;
        }
        finish(wtr, output_path)?;

        let mut summary = vec![
            ("final_pnl", result.final_pnl().to_string()),
            ("trades", result.trade_count().to_string()),
        ];
        summary.extend(report_rows(&result.report));
        write_summary(output_path, &summary)
    }

    fn write_rebalance(
        &self,
        result: &RebalanceResult,
        performance: &RebalancePerformance,
        output_path: &Path,
    ) -> Result<(), BacktestError> {
        let mut wtr = open(output_path)?;
        let mut header = vec![
            "index",
            "alloc_first",
            "alloc_second",
            "order_first",
            "order_second",
            "position_first",
            "position_second",
            "cash",
            "cash_delta",
            "return",
        ];
        if self.plot {
            header.push("equity");
        }
        write_row(&mut wtr, &header)?;

        for i in 0..result.returns.len() {
            let mut row = vec![
                i.to_string(),
                result.allocations[i].first.to_string(),
                result.allocations[i].second.to_string(),
                result.orders[i][0].to_string(),
                result.orders[i][1].to_string(),
                result.positions[i][0].to_string(),
                result.positions[i][1].to_string(),
                result.cash[i].to_string(),
                result.cash_delta[i].to_string(),
                result.returns[i].to_string(),
            ];
            if self.plot {
                row.push(performance.equity[i].to_string());
            }
            write_row(&mut wtr, &row)?;
        }
        finish(wtr, output_path)?;

        let mut summary = vec![("final_return_pct", performance.final_return_pct.to_string())];
        summary.extend(report_rows(&performance.report));
        write_summary(output_path, &summary)
    }

    fn write_sweep(&self, report: &SweepReport, output_path: &Path) -> Result<(), BacktestError> {
        let mut wtr = open(output_path)?;
        write_row(&mut wtr, ["rank", "params", "sharpe"])?;
        for (rank, (label, sharpe)) in report.ranked().iter().enumerate() {
            write_row(&mut wtr, [(rank + 1).to_string(), label.clone(), sharpe.to_string()])?;
        }
        finish(wtr, output_path)?;

        let mut summary = vec![
            ("completed", report.outcomes.len().to_string()),
            ("skipped", report.skipped.to_string()),
        ];
        if let Some(best) = report.best() {
            summary.extend([
                ("best_lookback", best.lookback.to_string()),
                ("best_entry_z_score", best.entry_z_score.to_string()),
                ("best_exit_z_score", best.exit_z_score.to_string()),
                ("best_sharpe", best.sharpe.to_string()),
            ]);
        }
        write_summary(output_path, &summary)
    }
}
