//! Independent-channel band generator ("single-day hold").
//!
//! The z-score of each close against its band drives two channels:
//! - long: enter when `z < -entry_z`, exit when `z >= -exit_z`
//! - short: enter when `z > entry_z`, exit when `z <= exit_z`
//!
//! Each channel keeps its last state until its own trigger fires again, and
//! the held exposure is the sum of both channels. Steps without a z-score
//! (warmup, zero deviation) trigger nothing.

use tracing::debug;

use super::{SignalGenerator, SignalSeries};
use crate::domain::error::BacktestError;
use crate::domain::indicator::bollinger::calculate_bollinger;
use crate::domain::price_series::PriceSeries;
use crate::domain::side::Side;
use crate::domain::strategy::BandParams;

#[derive(Debug, Clone)]
pub struct IndependentChannel {
    params: BandParams,
}

/// Per-channel states alongside the netted output.
#[derive(Debug, Clone)]
pub struct ChannelTrace {
    pub series: SignalSeries,
    pub long: Vec<Side>,
    pub short: Vec<Side>,
}

impl IndependentChannel {
    pub fn new(params: BandParams) -> Self {
        IndependentChannel { params }
    }

    pub fn trace(&self, prices: &PriceSeries) -> Result<ChannelTrace, BacktestError> {
        self.params.validate()?;

        let close = prices.close();
        let n = close.len();
        let bands = calculate_bollinger(close, self.params.lookback, self.params.entry_z_score);
        let entry = self.params.entry_z_score;
        let exit = self.params.exit_z_score;

        let mut long = Vec::with_capacity(n);
        let mut short = Vec::with_capacity(n);
        let mut long_state = Side::None;
        let mut short_state = Side::None;

        for (band, &price) in bands.values.iter().zip(close) {
            if let Some(z) = band.z_score(price) {
                if z >= -exit {
                    long_state = Side::None;
                } else if z < -entry {
                    long_state = Side::Buy;
                }

                if z <= exit {
                    short_state = Side::None;
                } else if z > entry {
                    short_state = Side::Sell;
                }
            }
            long.push(long_state);
            short.push(short_state);
        }

        let positions: Vec<Side> = long
            .iter()
            .zip(&short)
            .map(|(l, s)| Side::from_sign(l.as_f64() + s.as_f64()))
            .collect();

        let signals: Vec<Side> = positions
            .iter()
            .enumerate()
            .map(|(i, p)| match i {
                0 => Side::None,
                _ => Side::from_sign(p.as_f64() - positions[i - 1].as_f64()),
            })
            .collect();

        debug!(
            params = %self.params,
            changes = signals.iter().filter(|s| !s.is_none()).count(),
            "independent channel signals generated"
        );

        Ok(ChannelTrace {
            series: SignalSeries {
                signals,
                positions,
                bands,
            },
            long,
            short,
        })
    }
}

impl SignalGenerator for IndependentChannel {
    fn params(&self) -> BandParams {
        self.params
    }

    fn generate(&self, prices: &PriceSeries) -> Result<SignalSeries, BacktestError> {
        self.trace(prices).map(|t| t.series)
    }
}
