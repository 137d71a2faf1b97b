//! Cash and position ledger for target-allocation rebalancing.
//!
//! Orders are sized against the account's absolute notional plus any
//! positive cash, truncated toward zero so the target is always affordable.
//! Cash is tracked as unencumbered capital: buying spends it, shorting posts
//! the sale value as collateral, and closing either side releases it. A
//! trade that flips the sign of a position is booked as two legs, closing
//! the old side in full and opening the residual on the other side.

use super::error::BacktestError;
use super::position::Position;
use super::price_series::validate_prices;

/// Orders and cash movement produced by one rebalance step.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub orders: Vec<i64>,
    pub cash_delta: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    pub positions: Vec<Position>,
    pub cash: f64,
}

impl Ledger {
    /// Flat ledger over `instruments` with `initial_cash` available.
    pub fn new(instruments: usize, initial_cash: f64) -> Self {
        Ledger {
            positions: vec![Position::default(); instruments],
            cash: initial_cash,
        }
    }

    pub fn quantities(&self) -> Vec<i64> {
        self.positions.iter().map(|p| p.quantity).collect()
    }

    /// Absolute exposure plus cash, the denominator of a step return.
    pub fn account_value(&self, prices: &[f64]) -> f64 {
        self.positions
            .iter()
            .zip(prices)
            .map(|(p, &price)| p.market_value(price))
            .sum::<f64>()
            + self.cash
    }

    /// Moves the book toward `target_alloc` at `prices`. Positions and cash
    /// are committed together or not at all.
    pub fn rebalance(&mut self, prices: &[f64], target_alloc: &[f64]) -> Result<Fill, BacktestError> {
        let existing = self.quantities();
        let orders = calc_adjustments(&existing, prices, target_alloc, self.cash)?;
        let cash_delta = calc_cash_delta(&orders, prices, &existing)?;

        for (position, order) in self.positions.iter_mut().zip(&orders) {
            position.quantity += order;
        }
        self.cash += cash_delta;

        Ok(Fill { orders, cash_delta })
    }
}

/// Integer orders taking `existing_qty` to `target_alloc` of the account.
///
/// `target_shares = trunc(alloc · (Σ|qty·price| + max(0, cash)) / price)`,
/// `order = target_shares − qty`.
pub fn calc_adjustments(
    existing_qty: &[i64],
    prices: &[f64],
    target_alloc: &[f64],
    cash: f64,
) -> Result<Vec<i64>, BacktestError> {
    check_lengths(existing_qty.len(), prices, "prices")?;
    check_lengths(existing_qty.len(), target_alloc, "target_alloc")?;
    validate_prices(prices)?;
    if let Some(bad) = target_alloc.iter().find(|a| !a.is_finite()) {
        return Err(BacktestError::invalid_parameter(
            "target_alloc",
            format!("allocation must be finite, got {bad}"),
        ));
    }
    if !cash.is_finite() {
        return Err(BacktestError::invalid_parameter(
            "cash",
            format!("cash must be finite, got {cash}"),
        ));
    }

    let total_notional: f64 = existing_qty
        .iter()
        .zip(prices)
        .map(|(&q, &p)| (q as f64 * p).abs())
        .sum::<f64>()
        + cash.max(0.0);

    Ok(existing_qty
        .iter()
        .zip(prices)
        .zip(target_alloc)
        .map(|((&qty, &price), &alloc)| {
            let target_shares = (alloc * total_notional / price).trunc() as i64;
            target_shares - qty
        })
        .collect())
}

/// Cash movement of executing `orders` at `prices` against `positions`.
pub fn calc_cash_delta(orders: &[i64], prices: &[f64], positions: &[i64]) -> Result<f64, BacktestError> {
    check_lengths(orders.len(), prices, "prices")?;
    check_lengths(orders.len(), positions, "positions")?;
    validate_prices(prices)?;

    Ok(orders
        .iter()
        .zip(prices)
        .zip(positions)
        .map(|((&order, &price), &existing)| instrument_cash_delta(order, price, existing))
        .sum())
}

fn instrument_cash_delta(order: i64, price: f64, existing: i64) -> f64 {
    let resulting = existing + order;
    let (order, existing_f, resulting_f) = (order as f64, existing as f64, resulting as f64);

    if existing > 0 {
        if resulting >= 0 {
            -order * price
        } else {
            // Long to short: sell the whole long, then post the new short.
            existing_f * price + resulting_f * price
        }
    } else if existing < 0 {
        if resulting <= 0 {
            // Covering releases collateral, adding to the short posts more.
            order * price
        } else {
            // Short to long: release the whole short, then buy the new long.
            -existing_f * price - resulting_f * price
        }
    } else {
        -(order * price).abs()
    }
}

fn check_lengths<T>(expected: usize, values: &[T], what: &str) -> Result<(), BacktestError> {
    if values.len() != expected {
        return Err(BacktestError::length_mismatch(what, expected, values.len()));
    }
    Ok(())
}
