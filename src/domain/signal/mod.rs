//! Band-cross signal generation.
//!
//! Two generators share the same Bollinger envelope:
//! - [`exclusive::ExclusiveTrend`]: a FLAT / IN_SHORT / IN_LONG state machine
//!   holding at most one trade at a time.
//! - [`channel::IndependentChannel`]: long and short channels driven by the
//!   z-score, each forward-filled on its own and netted.

pub mod channel;
pub mod exclusive;

use super::error::BacktestError;
use super::indicator::BandSeries;
use super::price_series::PriceSeries;
use super::side::Side;
use super::strategy::{BandParams, StrategyKind};

/// Output of a generator run. All vectors have the length of the input series.
#[derive(Debug, Clone)]
pub struct SignalSeries {
    /// The action taken at each step.
    pub signals: Vec<Side>,
    /// The exposure held after each step.
    pub positions: Vec<Side>,
    pub bands: BandSeries,
}

pub trait SignalGenerator {
    fn params(&self) -> BandParams;

    /// Validates the parameters, then walks the series once.
    fn generate(&self, prices: &PriceSeries) -> Result<SignalSeries, BacktestError>;
}

/// Builds the generator for a configured strategy kind.
pub fn generator_for(kind: StrategyKind, params: BandParams) -> Box<dyn SignalGenerator + Send + Sync> {
    match kind {
        StrategyKind::ExclusiveTrend => Box::new(exclusive::ExclusiveTrend::new(params)),
        StrategyKind::IndependentChannel => Box::new(channel::IndependentChannel::new(params)),
    }
}

/// `close[t-1] <= band[t-1] && close[t] > band[t]`. False at index 0, out of
/// range, or where the band is NaN.
pub fn break_upwards(close: &[f64], band: &[f64], index: usize) -> bool {
    if index == 0 || index >= close.len() || index >= band.len() {
        return false;
    }
    close[index - 1] <= band[index - 1] && close[index] > band[index]
}

/// `close[t-1] >= band[t-1] && close[t] < band[t]`. False at index 0, out of
/// range, or where the band is NaN.
pub fn break_downwards(close: &[f64], band: &[f64], index: usize) -> bool {
    if index == 0 || index >= close.len() || index >= band.len() {
        return false;
    }
    close[index - 1] >= band[index - 1] && close[index] < band[index]
}
