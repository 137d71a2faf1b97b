//! Price data port.

use crate::domain::error::BacktestError;
use crate::domain::price_series::PriceSeries;

/// Supplies time-ordered, gap-filled price columns.
pub trait PriceProvider {
    /// Column names available from the source, excluding the date column.
    fn list_columns(&self) -> Result<Vec<String>, BacktestError>;

    /// One cleaned series per requested column, all of the same length.
    fn fetch_columns(&self, columns: &[&str]) -> Result<Vec<PriceSeries>, BacktestError>;

    fn fetch_prices(&self, column: &str) -> Result<PriceSeries, BacktestError> {
        self.fetch_columns(&[column])?
            .pop()
            .ok_or_else(|| BacktestError::Data {
                reason: format!("no data returned for column {column}"),
            })
    }
}
