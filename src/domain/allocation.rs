//! Breakpoint tables mapping a term-structure ratio to a two-instrument
//! target allocation.
//!
//! A table is an ordered list of upper bounds. The first row whose bound
//! admits the ratio wins; a ratio past every row takes `otherwise`.

use std::fmt;
use std::str::FromStr;

use super::error::BacktestError;

/// Fractional target weights for the two instruments. Negative is short.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Allocation {
    pub first: f64,
    pub second: f64,
}

impl Allocation {
    pub const fn new(first: f64, second: f64) -> Self {
        Allocation { first, second }
    }

    pub fn weights(&self) -> [f64; 2] {
        [self.first, self.second]
    }
}

/// Upper bound of one table row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// Admits ratios strictly below the value.
    Below(f64),
    /// Admits ratios at or below the value.
    AtMost(f64),
}

impl Bound {
    pub fn admits(&self, ratio: f64) -> bool {
        match *self {
            Bound::Below(limit) => ratio < limit,
            Bound::AtMost(limit) => ratio <= limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakpointTable {
    pub name: String,
    pub rows: Vec<(Bound, Allocation)>,
    pub otherwise: Allocation,
}

const fn at_most(limit: f64, first: f64, second: f64) -> (Bound, Allocation) {
    (Bound::AtMost(limit), Allocation::new(first, second))
}

/// Names accepted by [`BreakpointTable::by_name`].
pub const PRESET_NAMES: [&str; 9] = [
    "mojito",
    "mojito_aggressive",
    "mojito_2_medium",
    "mojito_2_aggressive",
    "mojito_2_medium_30ts",
    "mojito_2_aggressive_30ts",
    "mojito_3_vix_vxv",
    "dynamic_vix",
    "fixed",
];

impl BreakpointTable {
    pub fn new(name: &str, rows: Vec<(Bound, Allocation)>, otherwise: Allocation) -> Self {
        BreakpointTable {
            name: name.to_string(),
            rows,
            otherwise,
        }
    }

    pub fn lookup(&self, ratio: f64) -> Allocation {
        self.rows
            .iter()
            .find(|(bound, _)| bound.admits(ratio))
            .map(|(_, alloc)| *alloc)
            .unwrap_or(self.otherwise)
    }

    /// One of the preset tables, or `None` for an unknown name.
    pub fn by_name(name: &str) -> Option<Self> {
        let (rows, otherwise) = match name {
            "mojito" => (
                vec![
                    at_most(0.91, -0.6, 0.4),
                    at_most(0.94, -0.32, 0.68),
                    at_most(0.97, -0.32, 0.68),
                    at_most(1.005, -0.25, 0.75),
                ],
                Allocation::new(-0.1, 0.9),
            ),
            "mojito_aggressive" => (
                vec![
                    at_most(0.91, -0.7, 0.3),
                    at_most(0.94, -0.32, 0.68),
                    at_most(0.97, -0.32, 0.68),
                    at_most(1.005, -0.28, 0.72),
                ],
                Allocation::new(0.0, 1.0),
            ),
            "mojito_2_medium" => (
                vec![
                    at_most(0.92, -0.6, 0.4),
                    at_most(0.94, -0.46, 0.54),
                    at_most(1.005, -0.36, 0.64),
                ],
                Allocation::new(0.5, 0.5),
            ),
            "mojito_2_aggressive" => (
                vec![
                    at_most(0.92, -0.7, 0.3),
                    at_most(0.94, -0.46, 0.54),
                    at_most(1.005, -0.36, 0.64),
                ],
                Allocation::new(0.5, 0.5),
            ),
            "mojito_2_medium_30ts" => (
                vec![
                    at_most(0.92, -0.6, 0.4),
                    at_most(0.94, -0.46, 0.54),
                    at_most(1.0, -0.36, 0.64),
                ],
                Allocation::new(0.5, 0.5),
            ),
            "mojito_2_aggressive_30ts" => (
                vec![
                    at_most(0.92, -0.7, 0.3),
                    at_most(0.94, -0.46, 0.54),
                    at_most(1.0, -0.36, 0.64),
                ],
                Allocation::new(0.5, 0.5),
            ),
            "mojito_3_vix_vxv" => (
                vec![
                    at_most(0.92, -0.6, 0.4),
                    at_most(0.94, -0.16, 0.84),
                    at_most(1.02, -0.03, 0.97),
                ],
                Allocation::new(0.79, 0.21),
            ),
            "dynamic_vix" => (
                vec![
                    (Bound::Below(0.90), Allocation::new(-0.3, 0.7)),
                    at_most(1.0, -0.2, 0.8),
                    at_most(1.05, 0.0, 1.0),
                    at_most(1.15, 0.25, 0.75),
                ],
                Allocation::new(0.5, 0.5),
            ),
            "fixed" => (Vec::new(), Allocation::new(-0.32, 0.68)),
            _ => return None,
        };
        Some(BreakpointTable::new(name, rows, otherwise))
    }
}

impl FromStr for BreakpointTable {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BreakpointTable::by_name(s.trim()).ok_or_else(|| {
            BacktestError::invalid_parameter(
                "table",
                format!("unknown table '{s}', expected one of: {}", PRESET_NAMES.join(", ")),
            )
        })
    }
}

impl fmt::Display for BreakpointTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
