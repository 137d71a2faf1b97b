//! Bollinger band envelope.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//!
//! Warmup: first (period-1) values are invalid.

use super::stddev::rolling_stats;
use super::{BandPoint, BandSeries, IndicatorType};

pub fn calculate_bollinger(close: &[f64], period: usize, multiplier: f64) -> BandSeries {
    let values = rolling_stats(close, period)
        .into_iter()
        .map(|stats| match stats {
            Some(s) => BandPoint {
                valid: true,
                upper: s.mean + multiplier * s.stddev,
                middle: s.mean,
                lower: s.mean - multiplier * s.stddev,
                stddev: s.stddev,
            },
            None => BandPoint::INVALID,
        })
        .collect();

    BandSeries {
        indicator_type: IndicatorType::Bollinger { period, multiplier },
        values,
    }
}
