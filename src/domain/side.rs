//! Trade direction and per-step signals.

use std::fmt;

/// Trade direction. The discriminant is the signed unit exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Side {
    Buy = 1,
    Sell = -1,
    #[default]
    None = 0,
}

impl Side {
    pub fn value(self) -> i8 {
        self as i8
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.value())
    }

    /// Maps a signed number onto a side by its sign.
    pub fn from_sign(value: f64) -> Self {
        if value > 0.0 {
            Side::Buy
        } else if value < 0.0 {
            Side::Sell
        } else {
            Side::None
        }
    }

    pub fn is_none(self) -> bool {
        self == Side::None
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
            Side::None => write!(f, "NONE"),
        }
    }
}

/// The action taken at a given step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    pub index: usize,
    pub side: Side,
}

/// Collects the non-NONE actions of a per-step side series.
pub fn actions(sides: &[Side]) -> Vec<Signal> {
    sides
        .iter()
        .enumerate()
        .filter(|(_, side)| !side.is_none())
        .map(|(index, &side)| Signal { index, side })
        .collect()
}

/// Converts a side series into its signed unit values.
pub fn to_values(sides: &[Side]) -> Vec<f64> {
    sides.iter().map(|s| s.as_f64()).collect()
}
