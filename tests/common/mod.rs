#![allow(dead_code)]

use bandtrader::domain::error::BacktestError;
use bandtrader::domain::price_series::PriceSeries;
use bandtrader::ports::data_port::PriceProvider;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

pub struct MockPriceProvider {
    pub columns: Vec<(String, Vec<f64>)>,
    pub errors: HashMap<String, String>,
}

impl MockPriceProvider {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_column(mut self, name: &str, values: Vec<f64>) -> Self {
        self.columns.push((name.to_string(), values));
        self
    }

    pub fn with_error(mut self, name: &str, reason: &str) -> Self {
        self.errors.insert(name.to_string(), reason.to_string());
        self
    }
}

impl PriceProvider for MockPriceProvider {
    fn list_columns(&self) -> Result<Vec<String>, BacktestError> {
        Ok(self.columns.iter().map(|(name, _)| name.clone()).collect())
    }

    fn fetch_columns(&self, columns: &[&str]) -> Result<Vec<PriceSeries>, BacktestError> {
        columns
            .iter()
            .map(|name| {
                if let Some(reason) = self.errors.get(*name) {
                    return Err(BacktestError::Data {
                        reason: reason.clone(),
                    });
                }
                let values = self
                    .columns
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, v)| v.clone())
                    .ok_or_else(|| BacktestError::Data {
                        reason: format!("column '{name}' not found"),
                    })?;
                PriceSeries::new(values)
            })
            .collect()
    }
}

/// A trending oscillation that crosses its bands several times.
pub fn wave_prices(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| 100.0 + 8.0 * (i as f64 * 0.35).sin() + i as f64 * 0.1)
        .collect()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Writes a dated price CSV with one row per step starting 2020-01-01.
pub fn write_price_csv(dir: &Path, name: &str, columns: &[(&str, Vec<f64>)]) -> PathBuf {
    let mut content = String::from("Date");
    for (column, _) in columns {
        content.push(',');
        content.push_str(column);
    }
    content.push('\n');

    let rows = columns.first().map_or(0, |(_, values)| values.len());
    let start = date(2020, 1, 1);
    for i in 0..rows {
        content.push_str(&(start + chrono::Duration::days(i as i64)).format("%Y-%m-%d").to_string());
        for (_, values) in columns {
            content.push_str(&format!(",{}", values[i]));
        }
        content.push('\n');
    }

    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

pub fn write_ini(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

pub fn exit_code_str(code: ExitCode) -> String {
    format!("{code:?}")
}

pub fn is_success(code: ExitCode) -> bool {
    exit_code_str(code) == exit_code_str(ExitCode::SUCCESS)
}

pub fn is_exit(code: ExitCode, expected: u8) -> bool {
    exit_code_str(code) == exit_code_str(ExitCode::from(expected))
}
