//! Core domain types and logic. Nothing here performs I/O.

pub mod allocation;
pub mod backtest;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod ledger;
pub mod metrics;
pub mod position;
pub mod price_series;
pub mod rebalance;
pub mod series;
pub mod side;
pub mod signal;
pub mod strategy;
pub mod sweep;
