//! CSV price file adapter.
//!
//! Expects a header row with the date in the first column and one column
//! per price field or symbol (`Date,Open,High,Low,Close,Adj Close,...` or
//! `Date,VIX,VXV,VXX,VXZ`). Rows are ordered by date and missing cells are
//! forward- then backward-filled.

use crate::domain::error::BacktestError;
use crate::domain::price_series::PriceSeries;
use crate::domain::series::{bfill, ffill};
use crate::ports::data_port::PriceProvider;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct CsvPriceAdapter {
    path: PathBuf,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

struct PriceTable {
    headers: Vec<String>,
    rows: Vec<(NaiveDate, Vec<String>)>,
}

impl CsvPriceAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            start_date: None,
            end_date: None,
        }
    }

    /// Keeps only rows dated within `[start, end]`. Either bound may be open.
    pub fn with_date_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    fn in_range(&self, date: NaiveDate) -> bool {
        self.start_date.is_none_or(|s| date >= s) && self.end_date.is_none_or(|e| date <= e)
    }

    fn read_table(&self) -> Result<PriceTable, BacktestError> {
        let mut rdr = csv::Reader::from_path(&self.path).map_err(|e| BacktestError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| BacktestError::Data {
                reason: format!("CSV header error: {}", e),
            })?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.len() < 2 {
            return Err(BacktestError::Data {
                reason: format!("{} has no price columns", self.path.display()),
            });
        }

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| BacktestError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(0).ok_or_else(|| BacktestError::Data {
                reason: "missing date column".into(),
            })?;
            let date = NaiveDate::parse_from_str(date_str.trim(), DATE_FORMAT).map_err(|e| {
                BacktestError::Data {
                    reason: format!("invalid date '{}': {}", date_str, e),
                }
            })?;

            if !self.in_range(date) {
                continue;
            }
            rows.push((date, record.iter().map(|v| v.trim().to_string()).collect()));
        }

        rows.sort_by_key(|(date, _)| *date);
        debug!(path = %self.path.display(), rows = rows.len(), "price table loaded");
        Ok(PriceTable { headers, rows })
    }
}

impl PriceTable {
    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .skip(1)
            .position(|h| h.eq_ignore_ascii_case(name))
            .map(|i| i + 1)
    }

    fn raw_column(&self, name: &str) -> Result<Vec<f64>, BacktestError> {
        let index = self.column_index(name).ok_or_else(|| BacktestError::Data {
            reason: format!("column '{}' not found", name),
        })?;

        self.rows
            .iter()
            .map(|(date, cells)| parse_cell(cells.get(index).map(String::as_str), name, *date))
            .collect()
    }

    fn series(&self, name: &str) -> Result<PriceSeries, BacktestError> {
        let close = clean_prices(&self.raw_column(name)?, name)?;
        PriceSeries::new(close)
    }
}

fn parse_cell(cell: Option<&str>, column: &str, date: NaiveDate) -> Result<f64, BacktestError> {
    match cell.unwrap_or("") {
        "" | "null" | "NaN" | "nan" | "NA" => Ok(f64::NAN),
        value => value.parse().map_err(|e| BacktestError::Data {
            reason: format!("invalid {} value '{}' on {}: {}", column, value, date, e),
        }),
    }
}

/// Forward- then backward-fills gaps. A column with no values at all is an
/// error.
pub fn clean_prices(raw: &[f64], column: &str) -> Result<Vec<f64>, BacktestError> {
    let cleaned = bfill(&ffill(raw));
    if cleaned.iter().any(|v| v.is_nan()) {
        return Err(BacktestError::Data {
            reason: format!("column '{}' has no prices", column),
        });
    }
    Ok(cleaned)
}

impl PriceProvider for CsvPriceAdapter {
    fn list_columns(&self) -> Result<Vec<String>, BacktestError> {
        let table = self.read_table()?;
        Ok(table.headers.into_iter().skip(1).collect())
    }

    fn fetch_columns(&self, columns: &[&str]) -> Result<Vec<PriceSeries>, BacktestError> {
        let table = self.read_table()?;
        if table.rows.is_empty() {
            return Err(BacktestError::EmptySeries);
        }
        columns.iter().map(|c| table.series(c)).collect()
    }

    /// The named column as close prices, with the `Open`/`High`/`Low`
    /// columns attached when the file has all three.
    fn fetch_prices(&self, column: &str) -> Result<PriceSeries, BacktestError> {
        let table = self.read_table()?;
        if table.rows.is_empty() {
            return Err(BacktestError::EmptySeries);
        }
        let close = clean_prices(&table.raw_column(column)?, column)?;

        let range: Option<Vec<Vec<f64>>> = ["Open", "High", "Low"]
            .iter()
            .map(|name| {
                table
                    .raw_column(name)
                    .ok()
                    .and_then(|raw| clean_prices(&raw, name).ok())
            })
            .collect();

        match range {
            Some(mut ohl) => {
                let low = ohl.pop().unwrap_or_default();
                let high = ohl.pop().unwrap_or_default();
                let open = ohl.pop().unwrap_or_default();
                PriceSeries::with_range(close, open, high, low)
            }
            None => PriceSeries::new(close),
        }
    }
}
