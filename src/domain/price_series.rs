//! Validated price series handed to the core.

use super::error::BacktestError;

/// A single step of the series. Open/high/low are optional.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub close: f64,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
}

/// Time-ordered, gap-free prices. Construction rejects empty input and any
/// non-finite or non-positive value.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    close: Vec<f64>,
    open: Option<Vec<f64>>,
    high: Option<Vec<f64>>,
    low: Option<Vec<f64>>,
}

impl PriceSeries {
    pub fn new(close: Vec<f64>) -> Result<Self, BacktestError> {
        validate_prices(&close)?;
        Ok(PriceSeries {
            close,
            open: None,
            high: None,
            low: None,
        })
    }

    pub fn with_range(
        close: Vec<f64>,
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
    ) -> Result<Self, BacktestError> {
        validate_prices(&close)?;
        for (what, column) in [("open", &open), ("high", &high), ("low", &low)] {
            if column.len() != close.len() {
                return Err(BacktestError::length_mismatch(what, close.len(), column.len()));
            }
            validate_prices(column)?;
        }
        Ok(PriceSeries {
            close,
            open: Some(open),
            high: Some(high),
            low: Some(low),
        })
    }

    pub fn close(&self) -> &[f64] {
        &self.close
    }

    pub fn open(&self) -> Option<&[f64]> {
        self.open.as_deref()
    }

    pub fn high(&self) -> Option<&[f64]> {
        self.high.as_deref()
    }

    pub fn low(&self) -> Option<&[f64]> {
        self.low.as_deref()
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    pub fn point(&self, index: usize) -> Option<PricePoint> {
        let close = *self.close.get(index)?;
        Some(PricePoint {
            close,
            open: self.open.as_ref().map(|v| v[index]),
            high: self.high.as_ref().map(|v| v[index]),
            low: self.low.as_ref().map(|v| v[index]),
        })
    }

    pub fn points(&self) -> impl Iterator<Item = PricePoint> + '_ {
        (0..self.len()).filter_map(|i| self.point(i))
    }
}

/// Fails on the first empty, non-finite or non-positive input.
pub fn validate_prices(prices: &[f64]) -> Result<(), BacktestError> {
    if prices.is_empty() {
        return Err(BacktestError::EmptySeries);
    }
    match prices.iter().position(|p| !p.is_finite() || *p <= 0.0) {
        Some(index) => Err(BacktestError::InvalidPrice {
            index,
            value: prices[index],
        }),
        None => Ok(()),
    }
}
