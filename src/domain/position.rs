//! Per-instrument positions and signal-driven P&L paths.

use super::series::cumsum;
use super::side::{to_values, Side};

/// Signed share quantity held in one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub quantity: i64,
}

impl Position {
    pub fn new(quantity: i64) -> Self {
        Position { quantity }
    }

    /// Absolute exposure at `price`.
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity.unsigned_abs() as f64 * price
    }

    /// Signed P&L of holding the position across a price move.
    pub fn price_change_pnl(&self, prev_price: f64, price: f64) -> f64 {
        self.quantity as f64 * (price - prev_price)
    }
}

/// Running account of one unit traded at each signal: `cumsum(close · signal)`.
pub fn cumulative_positions(close: &[f64], signals: &[Side]) -> Vec<f64> {
    cumsum(&holding_values(close, signals))
}

/// Value of the unit exposure held at each step: `close · position`.
pub fn holding_values(close: &[f64], positions: &[Side]) -> Vec<f64> {
    close
        .iter()
        .zip(to_values(positions))
        .map(|(price, unit)| price * unit)
        .collect()
}
