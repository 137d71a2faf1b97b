//! Two-instrument rebalancing driven by a term-structure ratio.
//!
//! At each step `i >= 1` the allocation is looked up from `ratio[i-1]` and
//! the ledger is rebalanced at the prices of `i-1`. The step return is the
//! price-change P&L of the resulting positions over the account value at
//! `i`.

use tracing::debug;

use super::allocation::{Allocation, BreakpointTable};
use super::error::BacktestError;
use super::ledger::Ledger;
use super::metrics::{cumulative_log_returns, PerformanceReport};
use super::price_series::PriceSeries;

/// Per-step record of a rebalancing run. Index 0 is the starting state.
#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceResult {
    pub allocations: Vec<Allocation>,
    pub orders: Vec<[i64; 2]>,
    pub positions: Vec<[i64; 2]>,
    pub cash: Vec<f64>,
    pub cash_delta: Vec<f64>,
    pub returns: Vec<f64>,
}

pub fn run_rebalance(
    first: &PriceSeries,
    second: &PriceSeries,
    ratio: &[f64],
    table: &BreakpointTable,
    start_cash: f64,
) -> Result<RebalanceResult, BacktestError> {
    let n = first.len();
    if second.len() != n {
        return Err(BacktestError::length_mismatch("second", n, second.len()));
    }
    if ratio.len() != n {
        return Err(BacktestError::length_mismatch("ratio", n, ratio.len()));
    }
    if !start_cash.is_finite() || start_cash < 0.0 {
        return Err(BacktestError::invalid_parameter(
            "initial_cash",
            format!("initial cash must be finite and non-negative, got {start_cash}"),
        ));
    }

    let p1 = first.close();
    let p2 = second.close();
    let mut ledger = Ledger::new(2, start_cash);

    let mut result = RebalanceResult {
        allocations: vec![Allocation::new(0.0, 0.0)],
        orders: vec![[0, 0]],
        positions: vec![[0, 0]],
        cash: vec![start_cash],
        cash_delta: vec![0.0],
        returns: vec![0.0],
    };

    for i in 1..n {
        let alloc = table.lookup(ratio[i - 1]);
        let fill = ledger.rebalance(&[p1[i - 1], p2[i - 1]], &alloc.weights())?;
        let held = [ledger.positions[0].quantity, ledger.positions[1].quantity];

        let pnl = ledger.positions[0].price_change_pnl(p1[i - 1], p1[i])
            + ledger.positions[1].price_change_pnl(p2[i - 1], p2[i]);
        let step_return = pnl / ledger.account_value(&[p1[i], p2[i]]);

        result.allocations.push(alloc);
        result.orders.push([fill.orders[0], fill.orders[1]]);
        result.positions.push(held);
        result.cash.push(ledger.cash);
        result.cash_delta.push(fill.cash_delta);
        result
            .returns
            .push(if step_return.is_finite() { step_return } else { 0.0 });
    }

    debug!(
        table = %table,
        steps = n,
        final_cash = ledger.cash,
        "rebalance run complete"
    );

    Ok(result)
}

/// Equity curve and risk summary of a rebalancing run.
#[derive(Debug, Clone, PartialEq)]
pub struct RebalancePerformance {
    /// `start_cash · exp(cumulative log return)`.
    pub equity: Vec<f64>,
    pub final_return_pct: f64,
    pub report: PerformanceReport,
}

pub fn performance(returns: &[f64], start_cash: f64, annualization: f64) -> RebalancePerformance {
    let log_cum = cumulative_log_returns(returns);
    let equity = log_cum.iter().map(|c| start_cash * c.exp()).collect();
    let final_return_pct = log_cum.last().map_or(0.0, |c| (c.exp() - 1.0) * 100.0);

    RebalancePerformance {
        equity,
        final_return_pct,
        report: PerformanceReport::from_returns(returns, annualization),
    }
}
