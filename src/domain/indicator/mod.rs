//! Band indicators used by the signal generators.
//!
//! - `BandPoint`: one step of an envelope (upper/middle/lower plus the window deviation)
//! - `BandSeries`: a full envelope with its identity
//! - `IndicatorType`: indicator identity + parameters, used for logging and reports

pub mod bollinger;
pub mod stddev;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPoint {
    pub valid: bool,
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub stddev: f64,
}

impl BandPoint {
    pub const INVALID: BandPoint = BandPoint {
        valid: false,
        upper: f64::NAN,
        middle: f64::NAN,
        lower: f64::NAN,
        stddev: f64::NAN,
    };

    /// Standard score of `price` against this window. `None` in warmup or
    /// when the window has no dispersion.
    pub fn z_score(&self, price: f64) -> Option<f64> {
        if !self.valid || self.stddev <= 0.0 {
            return None;
        }
        Some((price - self.middle) / self.stddev)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorType {
    Bollinger { period: usize, multiplier: f64 },
}

#[derive(Debug, Clone)]
pub struct BandSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<BandPoint>,
}

impl BandSeries {
    pub fn upper(&self) -> Vec<f64> {
        self.values.iter().map(|p| p.upper).collect()
    }

    pub fn lower(&self) -> Vec<f64> {
        self.values.iter().map(|p| p.lower).collect()
    }

    /// `middle + k·σ` per step; NaN in warmup.
    pub fn offset(&self, k: f64) -> Vec<f64> {
        self.values
            .iter()
            .map(|p| p.middle + k * p.stddev)
            .collect()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Bollinger { period, multiplier } => {
                write!(f, "BOLLINGER({},{})", period, multiplier)
            }
        }
    }
}
