//! End-to-end tests across the domain, ports and adapters.
//!
//! Tests cover:
//! - Band backtests fed through a mock `PriceProvider`
//! - Signal state-machine invariants on realistic series
//! - Rebalancing runs with preset breakpoint tables
//! - Parameter sweeps (determinism, best-result selection)
//! - CSV in, CSV report out

mod common;

use approx::assert_abs_diff_eq;
use bandtrader::adapters::csv_adapter::CsvPriceAdapter;
use bandtrader::adapters::csv_report_adapter::CsvReportAdapter;
use bandtrader::domain::allocation::BreakpointTable;
use bandtrader::domain::backtest::BandBacktest;
use bandtrader::domain::error::BacktestError;
use bandtrader::domain::rebalance::{performance, run_rebalance};
use bandtrader::domain::side::Side;
use bandtrader::domain::strategy::{BandParams, StrategyKind};
use bandtrader::domain::sweep::{run_sweep, SweepConfig};
use bandtrader::ports::data_port::PriceProvider;
use bandtrader::ports::report_port::ReportPort;
use common::*;
use std::fs;
use tempfile::TempDir;

fn params() -> BandParams {
    BandParams::new(10, 1.5, 0.0).unwrap()
}

mod band_backtest_pipeline {
    use super::*;

    #[test]
    fn exclusive_pipeline_with_mock_provider() {
        let provider = MockPriceProvider::new().with_column("SPY", wave_prices(200));
        let prices = provider.fetch_prices("SPY").unwrap();

        let result = BandBacktest::new(params(), StrategyKind::ExclusiveTrend)
            .run(&prices)
            .unwrap();

        assert_eq!(result.signals.len(), 200);
        assert_eq!(result.positions.len(), 200);
        assert_eq!(result.path.len(), 200);
        assert!(result.trade_count() > 0, "wave series should cross its bands");
        assert!(result.returns.iter().all(|r| r.is_finite()));
        assert!(result.report.max_drawdown <= 0.0);
    }

    #[test]
    fn no_signals_during_warmup() {
        let provider = MockPriceProvider::new().with_column("SPY", wave_prices(100));
        let prices = provider.fetch_prices("SPY").unwrap();
        for kind in [StrategyKind::ExclusiveTrend, StrategyKind::IndependentChannel] {
            let result = BandBacktest::new(params(), kind).run(&prices).unwrap();
            assert!(result.signals[..10].iter().all(|s| s.is_none()));
        }
    }

    #[test]
    fn exclusive_signals_mark_every_state_change() {
        let provider = MockPriceProvider::new().with_column("SPY", wave_prices(300));
        let prices = provider.fetch_prices("SPY").unwrap();
        let result = BandBacktest::new(params(), StrategyKind::ExclusiveTrend)
            .run(&prices)
            .unwrap();

        for i in 1..result.positions.len() {
            let changed = result.positions[i] != result.positions[i - 1];
            assert_eq!(changed, !result.signals[i].is_none(), "step {i}");
        }
        let net: i64 = result.signals.iter().map(|s| s.value() as i64).sum();
        assert!(net.abs() <= 1, "at most one trade open, net {net}");
    }

    #[test]
    fn exclusive_never_flips_without_exit() {
        let provider = MockPriceProvider::new().with_column("SPY", wave_prices(300));
        let prices = provider.fetch_prices("SPY").unwrap();
        let result = BandBacktest::new(params(), StrategyKind::ExclusiveTrend)
            .run(&prices)
            .unwrap();

        for pair in result.positions.windows(2) {
            let flipped = matches!(
                (pair[0], pair[1]),
                (Side::Buy, Side::Sell) | (Side::Sell, Side::Buy)
            );
            assert!(!flipped);
        }
    }

    #[test]
    fn channel_positions_are_net_exposure() {
        let provider = MockPriceProvider::new().with_column("SPY", wave_prices(200));
        let prices = provider.fetch_prices("SPY").unwrap();
        let result = BandBacktest::new(params(), StrategyKind::IndependentChannel)
            .run(&prices)
            .unwrap();

        for (i, side) in result.positions.iter().enumerate() {
            assert_abs_diff_eq!(result.path[i], prices.close()[i] * side.as_f64());
        }
    }

    #[test]
    fn provider_error_propagates() {
        let provider = MockPriceProvider::new().with_error("SPY", "feed down");
        let err = provider.fetch_prices("SPY").unwrap_err();
        assert!(matches!(err, BacktestError::Data { reason } if reason == "feed down"));
    }

    #[test]
    fn invalid_price_in_feed_is_rejected() {
        let provider = MockPriceProvider::new().with_column("SPY", vec![10.0, 0.0, 11.0]);
        assert!(matches!(
            provider.fetch_prices("SPY"),
            Err(BacktestError::InvalidPrice { index: 1, .. })
        ));
    }
}

mod rebalancing {
    use super::*;

    fn etn_provider(n: usize) -> MockPriceProvider {
        let vix: Vec<f64> = (0..n).map(|i| 15.0 + 3.0 * (i as f64 * 0.2).sin()).collect();
        let vxv: Vec<f64> = (0..n).map(|i| 16.0 + (i as f64 * 0.1).cos()).collect();
        let vxx: Vec<f64> = (0..n).map(|i| 30.0 - i as f64 * 0.05).collect();
        let vxz: Vec<f64> = (0..n).map(|i| 12.0 + (i as f64 * 0.3).sin()).collect();
        MockPriceProvider::new()
            .with_column("VIX", vix)
            .with_column("VXV", vxv)
            .with_column("VXX", vxx)
            .with_column("VXZ", vxz)
    }

    fn ratio(provider: &MockPriceProvider) -> Vec<f64> {
        let series = provider.fetch_columns(&["VIX", "VXV"]).unwrap();
        series[0]
            .close()
            .iter()
            .zip(series[1].close())
            .map(|(n, d)| n / d)
            .collect()
    }

    #[test]
    fn fixed_table_holds_constant_signs() {
        let provider = etn_provider(60);
        let series = provider.fetch_columns(&["VXX", "VXZ"]).unwrap();
        let table: BreakpointTable = "fixed".parse().unwrap();

        let result = run_rebalance(&series[0], &series[1], &ratio(&provider), &table, 100_000.0).unwrap();

        assert_eq!(result.positions.len(), 60);
        for position in &result.positions[1..] {
            assert!(position[0] < 0, "fixed table shorts the first leg");
            assert!(position[1] > 0, "fixed table is long the second leg");
        }
    }

    #[test]
    fn ledger_records_are_consistent() {
        let provider = etn_provider(80);
        let series = provider.fetch_columns(&["VXX", "VXZ"]).unwrap();
        let table = BreakpointTable::by_name("mojito").unwrap();

        let result = run_rebalance(&series[0], &series[1], &ratio(&provider), &table, 50_000.0).unwrap();

        assert_eq!(result.returns[0], 0.0);
        for i in 1..result.returns.len() {
            for leg in 0..2 {
                assert_eq!(
                    result.positions[i][leg],
                    result.positions[i - 1][leg] + result.orders[i][leg]
                );
            }
            assert_abs_diff_eq!(
                result.cash[i],
                result.cash[i - 1] + result.cash_delta[i],
                epsilon = 1e-6
            );
            assert!(result.returns[i].is_finite());
        }
    }

    #[test]
    fn performance_starts_from_initial_cash() {
        let provider = etn_provider(40);
        let series = provider.fetch_columns(&["VXX", "VXZ"]).unwrap();
        let table = BreakpointTable::by_name("dynamic_vix").unwrap();
        let result = run_rebalance(&series[0], &series[1], &ratio(&provider), &table, 10_000.0).unwrap();

        let perf = performance(&result.returns, 10_000.0, 252.0);
        assert_eq!(perf.equity.len(), 40);
        assert_abs_diff_eq!(perf.equity[0], 10_000.0);
        let last = perf.equity[39];
        assert_abs_diff_eq!(perf.final_return_pct, (last / 10_000.0 - 1.0) * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn mismatched_ratio_is_rejected() {
        let provider = etn_provider(20);
        let series = provider.fetch_columns(&["VXX", "VXZ"]).unwrap();
        let table = BreakpointTable::by_name("fixed").unwrap();
        let err = run_rebalance(&series[0], &series[1], &[1.0; 5], &table, 1_000.0).unwrap_err();
        assert!(matches!(err, BacktestError::LengthMismatch { .. }));
    }

    #[test]
    fn every_preset_runs() {
        let provider = etn_provider(30);
        let series = provider.fetch_columns(&["VXX", "VXZ"]).unwrap();
        let ratio = ratio(&provider);
        for name in bandtrader::domain::allocation::PRESET_NAMES {
            let table = BreakpointTable::by_name(name).unwrap();
            let result = run_rebalance(&series[0], &series[1], &ratio, &table, 25_000.0).unwrap();
            assert_eq!(result.returns.len(), 30, "table {name}");
        }
    }
}

mod parameter_sweep {
    use super::*;

    fn config(seed: u64) -> SweepConfig {
        SweepConfig {
            samples: 30,
            seed,
            lookback: (2, 15),
            ..SweepConfig::default()
        }
    }

    #[test]
    fn sweep_is_deterministic_per_seed() {
        let provider = MockPriceProvider::new().with_column("SPY", wave_prices(150));
        let prices = provider.fetch_prices("SPY").unwrap();

        let a = run_sweep(&prices, &config(11)).unwrap();
        let b = run_sweep(&prices, &config(11)).unwrap();
        assert_eq!(format!("{a:?}"), format!("{b:?}"));
        assert_ne!(config(11).draw().unwrap(), config(12).draw().unwrap());
    }

    #[test]
    fn best_outcome_reruns_to_same_sharpe() {
        let provider = MockPriceProvider::new().with_column("SPY", wave_prices(150));
        let prices = provider.fetch_prices("SPY").unwrap();
        let report = run_sweep(&prices, &config(5)).unwrap();
        let best = report.best().unwrap();

        let rerun = BandBacktest::new(best.params(), StrategyKind::ExclusiveTrend)
            .run(&prices)
            .unwrap();
        assert_eq!(
            format!("{:?}", rerun.report.sharpe),
            format!("{:?}", best.sharpe)
        );
    }
}

mod csv_round_trip {
    use super::*;

    #[test]
    fn csv_prices_through_backtest_to_report() {
        let dir = TempDir::new().unwrap();
        let close = wave_prices(120);
        let adj: Vec<f64> = close.iter().map(|c| c * 0.5).collect();
        let csv = write_price_csv(dir.path(), "spy.csv", &[("Close", close.clone()), ("Adj Close", adj)]);

        let prices = CsvPriceAdapter::new(csv)
            .with_date_range(Some(date(2020, 1, 11)), None)
            .fetch_prices("Close")
            .unwrap();
        assert_eq!(prices.len(), 110);
        assert_eq!(prices.close()[0], close[10]);

        let result = BandBacktest::new(params(), StrategyKind::ExclusiveTrend)
            .run(&prices)
            .unwrap();
        let out = dir.path().join("report.csv");
        CsvReportAdapter::new(true)
            .write_backtest(&result, &prices, &out)
            .unwrap();

        let content = fs::read_to_string(&out).unwrap();
        assert_eq!(content.lines().count(), 111);
        assert!(content.starts_with("index,price,signal,position,path,return,upper,middle,lower"));
        assert!(dir.path().join("report.summary.csv").exists());
    }

    #[test]
    fn rebalance_report_from_csv_columns() {
        let dir = TempDir::new().unwrap();
        let n = 30;
        let csv = write_price_csv(
            dir.path(),
            "etns.csv",
            &[
                ("VIX", (0..n).map(|i| 14.0 + (i % 5) as f64).collect()),
                ("VXV", vec![16.0; n]),
                ("VXX", (0..n).map(|i| 25.0 - i as f64 * 0.1).collect()),
                ("VXZ", (0..n).map(|i| 10.0 + i as f64 * 0.05).collect()),
            ],
        );

        let series = CsvPriceAdapter::new(csv)
            .fetch_columns(&["VXX", "VXZ", "VIX", "VXV"])
            .unwrap();
        let ratio: Vec<f64> = series[2]
            .close()
            .iter()
            .zip(series[3].close())
            .map(|(a, b)| a / b)
            .collect();
        let table = BreakpointTable::by_name("mojito_2_medium").unwrap();
        let result = run_rebalance(&series[0], &series[1], &ratio, &table, 20_000.0).unwrap();
        let perf = performance(&result.returns, 20_000.0, 252.0);

        let out = dir.path().join("rebalance.csv");
        CsvReportAdapter::default()
            .write_rebalance(&result, &perf, &out)
            .unwrap();
        let content = fs::read_to_string(&out).unwrap();
        assert_eq!(content.lines().count(), n + 1);
    }
}
