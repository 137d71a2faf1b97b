//! CLI definition and dispatch.

use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvPriceAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::allocation::BreakpointTable;
use crate::domain::backtest::BandBacktest;
use crate::domain::config_validation::{
    optional_date, require_string, validate_backtest_config, validate_rebalance_config,
    validate_strategy_config, validate_sweep_config, DEFAULT_INITIAL_CASH,
};
use crate::domain::error::BacktestError;
use crate::domain::metrics::{PerformanceReport, DEFAULT_ANNUALIZATION};
use crate::domain::price_series::PriceSeries;
use crate::domain::rebalance::{performance, run_rebalance};
use crate::domain::strategy::{
    BandParams, StrategyKind, DEFAULT_ENTRY_Z_SCORE, DEFAULT_EXIT_Z_SCORE, DEFAULT_LOOKBACK,
};
use crate::domain::sweep::{run_sweep, SweepConfig};
use crate::logging;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceProvider;
use crate::ports::report_port::ReportPort;

const DEFAULT_COLUMN: &str = "Close";

#[derive(Parser, Debug)]
#[command(name = "bandtrader", about = "Band-crossing strategy backtester")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single-instrument band backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run a two-instrument ratio rebalance
    Rebalance {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Monte Carlo sweep over band parameters
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    logging::init(cli.verbose);
    match cli.command {
        Command::Backtest { config, output } => run_backtest(&config, output.as_deref()),
        Command::Rebalance { config, output } => run_rebalance_command(&config, output.as_deref()),
        Command::Sweep {
            config,
            output,
            seed,
        } => run_sweep_command(&config, output.as_deref(), seed),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = BacktestError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(e: BacktestError) -> ExitCode {
    eprintln!("error: {e}");
    (&e).into()
}

pub fn build_band_params(adapter: &dyn ConfigPort) -> Result<BandParams, BacktestError> {
    let lookback = adapter.get_int("strategy", "lookback", DEFAULT_LOOKBACK as i64);
    let lookback = usize::try_from(lookback).map_err(|_| BacktestError::ConfigInvalid {
        section: "strategy".into(),
        key: "lookback".into(),
        reason: format!("lookback must be at least 1, got {lookback}"),
    })?;
    BandParams::new(
        lookback,
        adapter.get_double("strategy", "entry_z_score", DEFAULT_ENTRY_Z_SCORE),
        adapter.get_double("strategy", "exit_z_score", DEFAULT_EXIT_Z_SCORE),
    )
}

pub fn build_strategy_kind(adapter: &dyn ConfigPort) -> Result<StrategyKind, BacktestError> {
    adapter
        .get_string("strategy", "kind")
        .map(|kind| kind.parse())
        .transpose()
        .map(Option::unwrap_or_default)
}

pub fn build_backtest(adapter: &dyn ConfigPort) -> Result<BandBacktest, BacktestError> {
    Ok(
        BandBacktest::new(build_band_params(adapter)?, build_strategy_kind(adapter)?)
            .with_annualization(annualization(adapter)),
    )
}

pub fn build_sweep_config(
    adapter: &dyn ConfigPort,
    seed_override: Option<u64>,
) -> Result<SweepConfig, BacktestError> {
    let defaults = SweepConfig::default();
    let int = |key: &str, default: usize| -> Result<usize, BacktestError> {
        let value = adapter.get_int("sweep", key, default as i64);
        usize::try_from(value).map_err(|_| BacktestError::ConfigInvalid {
            section: "sweep".into(),
            key: key.into(),
            reason: format!("{key} must not be negative, got {value}"),
        })
    };
    let double = |key: &str, default: f64| adapter.get_double("sweep", key, default);

    let seed = match seed_override {
        Some(seed) => seed,
        None => int("seed", defaults.seed as usize)? as u64,
    };

    let config = SweepConfig {
        samples: int("samples", defaults.samples)?,
        seed,
        lookback: (
            int("lookback_min", defaults.lookback.0)?,
            int("lookback_max", defaults.lookback.1)?,
        ),
        entry_z_score: (
            double("entry_min", defaults.entry_z_score.0),
            double("entry_max", defaults.entry_z_score.1),
        ),
        exit_z_score: (
            double("exit_min", defaults.exit_z_score.0),
            double("exit_max", defaults.exit_z_score.1),
        ),
        kind: build_strategy_kind(adapter)?,
        annualization: annualization(adapter),
    };
    config.validate()?;
    Ok(config)
}

/// Price adapter for `section`. A relative `prices` path is taken relative
/// to the config file.
pub fn build_price_adapter(
    adapter: &dyn ConfigPort,
    section: &str,
    config_path: &Path,
) -> Result<CsvPriceAdapter, BacktestError> {
    let prices = PathBuf::from(require_string(adapter, section, "prices")?);
    let prices = match config_path.parent() {
        Some(dir) if prices.is_relative() => dir.join(prices),
        _ => prices,
    };
    Ok(CsvPriceAdapter::new(prices).with_date_range(
        optional_date(adapter, section, "start_date")?,
        optional_date(adapter, section, "end_date")?,
    ))
}

fn annualization(adapter: &dyn ConfigPort) -> f64 {
    adapter.get_double("backtest", "annualization", DEFAULT_ANNUALIZATION)
}

/// `--output` wins over `[report] output`.
fn resolve_output(adapter: &dyn ConfigPort, output: Option<&Path>) -> Option<PathBuf> {
    output
        .map(Path::to_path_buf)
        .or_else(|| adapter.get_string("report", "output").map(PathBuf::from))
}

fn report_adapter(adapter: &dyn ConfigPort) -> CsvReportAdapter {
    CsvReportAdapter::new(adapter.get_bool("report", "plot", false))
}

fn print_report(report: &PerformanceReport) {
    eprintln!("Sharpe Ratio:     {:.2}", report.sharpe);
    eprintln!("Sortino Ratio:    {:.2}", report.sortino);
    eprintln!("Max Drawdown:     {:.1}%", report.max_drawdown * 100.0);
    eprintln!(
        "DD Duration:      {} steps (ending at {})",
        report.max_drawdown_duration, report.duration_end_index
    );
}

fn run_backtest(config_path: &Path, output: Option<&Path>) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Validate
    if let Err(e) = validate_backtest_config(&adapter).and_then(|_| validate_strategy_config(&adapter)) {
        return fail(e);
    }

    // Stage 3: Build backtest
    let backtest = match build_backtest(&adapter) {
        Ok(b) => b,
        Err(e) => return fail(e),
    };
    eprintln!("Strategy: {} ({})", backtest.kind, backtest.params);

    // Stage 4: Load prices
    let column = adapter
        .get_string("backtest", "column")
        .unwrap_or_else(|| DEFAULT_COLUMN.to_string());
    let prices = match build_price_adapter(&adapter, "backtest", config_path)
        .and_then(|provider| provider.fetch_prices(&column))
    {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    info!(column = %column, points = prices.len(), "prices loaded");

    // Stage 5: Run
    let result = match backtest.run(&prices) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    // Stage 6: Print console summary to stderr
    eprintln!("\n=== Backtest Results ===");
    eprintln!("Data Points:      {}", prices.len());
    eprintln!("Signals:          {}", result.trade_count());
    eprintln!("Final P&L:        {:.2}", result.final_pnl());
    print_report(&result.report);

    // Stage 7: Write report
    write_report(&adapter, output, |reporter, path| {
        reporter.write_backtest(&result, &prices, path)
    })
}

fn run_rebalance_command(config_path: &Path, output: Option<&Path>) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Validate
    if let Err(e) = validate_rebalance_config(&adapter) {
        return fail(e);
    }

    // Stage 3: Resolve table and columns
    let table = match require_string(&adapter, "rebalance", "table")
        .and_then(|name| name.parse::<BreakpointTable>())
    {
        Ok(t) => t,
        Err(e) => return fail(e),
    };
    let columns = match ["first", "second", "signal_numerator", "signal_denominator"]
        .iter()
        .map(|key| require_string(&adapter, "rebalance", key))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    eprintln!(
        "Rebalancing {} / {} on {}/{} with table {}",
        columns[0], columns[1], columns[2], columns[3], table
    );

    // Stage 4: Load prices
    let names: Vec<&str> = columns.iter().map(String::as_str).collect();
    let series = match build_price_adapter(&adapter, "rebalance", config_path)
        .and_then(|provider| provider.fetch_columns(&names))
    {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let [first, second, numerator, denominator] = match <[PriceSeries; 4]>::try_from(series) {
        Ok(s) => s,
        Err(s) => {
            return fail(BacktestError::length_mismatch("columns", 4, s.len()));
        }
    };
    let ratio: Vec<f64> = numerator
        .close()
        .iter()
        .zip(denominator.close())
        .map(|(n, d)| n / d)
        .collect();
    info!(points = ratio.len(), "rebalance inputs loaded");

    // Stage 5: Run
    let start_cash = adapter.get_double("rebalance", "initial_cash", DEFAULT_INITIAL_CASH);
    let result = match run_rebalance(&first, &second, &ratio, &table, start_cash) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    let perf = performance(&result.returns, start_cash, annualization(&adapter));

    // Stage 6: Print console summary to stderr
    eprintln!("\n=== Rebalance Results ===");
    eprintln!("Data Points:      {}", result.returns.len());
    eprintln!("Total Return:     {:.2}%", perf.final_return_pct);
    eprintln!(
        "Final Equity:     {:.2}",
        perf.equity.last().copied().unwrap_or(start_cash)
    );
    print_report(&perf.report);

    // Stage 7: Write report
    write_report(&adapter, output, |reporter, path| {
        reporter.write_rebalance(&result, &perf, path)
    })
}

fn run_sweep_command(config_path: &Path, output: Option<&Path>, seed: Option<u64>) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Validate
    if let Err(e) = validate_backtest_config(&adapter)
        .and_then(|_| validate_strategy_config(&adapter))
        .and_then(|_| validate_sweep_config(&adapter))
    {
        return fail(e);
    }

    // Stage 3: Build sweep
    let sweep = match build_sweep_config(&adapter, seed) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    // Stage 4: Load prices
    let column = adapter
        .get_string("backtest", "column")
        .unwrap_or_else(|| DEFAULT_COLUMN.to_string());
    let prices = match build_price_adapter(&adapter, "backtest", config_path)
        .and_then(|provider| provider.fetch_prices(&column))
    {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    // Stage 5: Run
    eprintln!(
        "Sweeping {} samples of {} (seed {})...",
        sweep.samples, sweep.kind, sweep.seed
    );
    let report = match run_sweep(&prices, &sweep) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    // Stage 6: Print console summary to stderr
    eprintln!("\n=== Sweep Results ===");
    eprintln!("Completed:        {}", report.outcomes.len());
    eprintln!("Skipped:          {}", report.skipped);
    match report.best() {
        Some(best) => {
            eprintln!("Best Sharpe:      {:.4}", best.sharpe);
            eprintln!("Best Parameters:  {}", best.params());
        }
        None => eprintln!("No valid parameter combinations"),
    }

    // Stage 7: Write report
    write_report(&adapter, output, |reporter, path| reporter.write_sweep(&report, path))
}

fn write_report<F>(adapter: &dyn ConfigPort, output: Option<&Path>, write: F) -> ExitCode
where
    F: FnOnce(&dyn ReportPort, &Path) -> Result<(), BacktestError>,
{
    let Some(path) = resolve_output(adapter, output) else {
        return ExitCode::SUCCESS;
    };
    match write(&report_adapter(adapter), &path) {
        Ok(()) => {
            eprintln!("\nReport written to: {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to write report: {e}");
            (&e).into()
        }
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let has_backtest = adapter.has_section("backtest");
    let has_rebalance = adapter.has_section("rebalance");

    type Check = fn(&dyn ConfigPort) -> Result<(), BacktestError>;
    let mut checks: Vec<(&str, Check)> = Vec::new();
    if has_backtest || !has_rebalance {
        checks.push(("backtest", validate_backtest_config));
    }
    checks.push(("strategy", validate_strategy_config));
    checks.push(("sweep", validate_sweep_config));
    if has_rebalance {
        checks.push(("rebalance", validate_rebalance_config));
    }

    for (section, check) in checks {
        if let Err(e) = check(&adapter) {
            return fail(e);
        }
        eprintln!("  [{section}] ok");
    }

    eprintln!("\nConfig validated successfully");
    ExitCode::SUCCESS
}
