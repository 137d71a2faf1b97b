//! Exclusive-trend band generator.
//!
//! Upper and lower bands are breakout triggers. An upward break of the upper
//! band is faded (sell), a downward break of the lower band is bought. The
//! trade is held until price crosses back through the exit band at
//! `middle ± exit_z·σ`, after which the generator is flat again. Only one
//! trade is open at a time.

use tracing::debug;

use super::{break_downwards, break_upwards, SignalGenerator, SignalSeries};
use crate::domain::error::BacktestError;
use crate::domain::indicator::bollinger::calculate_bollinger;
use crate::domain::price_series::PriceSeries;
use crate::domain::side::Side;
use crate::domain::strategy::BandParams;

/// Generator state between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrendState {
    #[default]
    Flat,
    /// Entered on an upward breakout; holding a short.
    InShort,
    /// Entered on a downward breakout; holding a long.
    InLong,
}

impl TrendState {
    pub fn up_trend(self) -> bool {
        self == TrendState::InLong
    }

    pub fn down_trend(self) -> bool {
        self == TrendState::InShort
    }
}

#[derive(Debug, Clone)]
pub struct ExclusiveTrend {
    params: BandParams,
}

/// Generator output together with the per-step state trace.
#[derive(Debug, Clone)]
pub struct TrendTrace {
    pub series: SignalSeries,
    pub states: Vec<TrendState>,
}

impl ExclusiveTrend {
    pub fn new(params: BandParams) -> Self {
        ExclusiveTrend { params }
    }

    pub fn trace(&self, prices: &PriceSeries) -> Result<TrendTrace, BacktestError> {
        self.params.validate()?;

        let close = prices.close();
        let n = close.len();
        let bands = calculate_bollinger(close, self.params.lookback, self.params.entry_z_score);
        let upper = bands.upper();
        let lower = bands.lower();
        let exit_upper = bands.offset(self.params.exit_z_score);
        let exit_lower = bands.offset(-self.params.exit_z_score);

        let mut signals = vec![Side::None; n];
        let mut positions = vec![Side::None; n];
        let mut states = vec![TrendState::Flat; n];
        let mut state = TrendState::Flat;

        for i in 1..n {
            match state {
                TrendState::Flat => {
                    if break_upwards(close, &upper, i) {
                        signals[i] = Side::Sell;
                        positions[i] = Side::Sell;
                        state = TrendState::InShort;
                    } else if break_downwards(close, &lower, i) {
                        signals[i] = Side::Buy;
                        positions[i] = Side::Buy;
                        state = TrendState::InLong;
                    }
                }
                TrendState::InShort => {
                    if break_downwards(close, &exit_upper, i) {
                        signals[i] = Side::Buy;
                        state = TrendState::Flat;
                    } else {
                        positions[i] = Side::Sell;
                    }
                }
                TrendState::InLong => {
                    if break_upwards(close, &exit_lower, i) {
                        signals[i] = Side::Sell;
                        state = TrendState::Flat;
                    } else {
                        positions[i] = Side::Buy;
                    }
                }
            }
            states[i] = state;
        }

        debug!(
            params = %self.params,
            trades = signals.iter().filter(|s| !s.is_none()).count(),
            "exclusive trend signals generated"
        );

        Ok(TrendTrace {
            series: SignalSeries {
                signals,
                positions,
                bands,
            },
            states,
        })
    }
}

impl SignalGenerator for ExclusiveTrend {
    fn params(&self) -> BandParams {
        self.params
    }

    fn generate(&self, prices: &PriceSeries) -> Result<SignalSeries, BacktestError> {
        self.trace(prices).map(|t| t.series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn series(prices: &[f64]) -> PriceSeries {
        PriceSeries::new(prices.to_vec()).unwrap()
    }

    fn generator(lookback: usize, entry: f64, exit: f64) -> ExclusiveTrend {
        ExclusiveTrend::new(BandParams {
            lookback,
            entry_z_score: entry,
            exit_z_score: exit,
        })
    }

    #[test]
    fn invalid_params_fail_before_run() {
        let err = generator(3, 1.0, 1.0)
            .generate(&series(&[1.0, 2.0, 3.0]))
            .unwrap_err();
        assert!(matches!(err, BacktestError::InvalidParameter { .. }));
    }

    #[test]
    fn flat_series_never_trades() {
        let out = generator(3, 1.0, 0.0).generate(&series(&[10.0; 8])).unwrap();
        assert!(out.signals.iter().all(|s| s.is_none()));
        assert!(out.positions.iter().all(|s| s.is_none()));
    }

    #[test]
    fn inexact_flat_series_never_trades() {
        for prices in [vec![0.1; 8], vec![0.3, 0.2, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1]] {
            let out = generator(3, 0.5, 0.0).generate(&series(&prices)).unwrap();
            assert!(out.signals.iter().all(|s| s.is_none()));
            assert!(out.positions.iter().all(|s| s.is_none()));
        }
    }

    #[test]
    fn upward_breakout_sells_then_covers_below_middle() {
        // Window 3, 1σ bands. The jump at index 3 breaks the upper band;
        // the drop at index 4 crosses back under the middle.
        let prices = [10.0, 10.0, 10.0, 13.0, 9.0, 9.0];
        let trace = generator(3, 1.0, 0.0).trace(&series(&prices)).unwrap();
        let out = &trace.series;

        assert_eq!(out.signals[0], Side::None);
        assert_eq!(out.signals[3], Side::Sell);
        assert_eq!(out.positions[3], Side::Sell);
        assert_eq!(trace.states[3], TrendState::InShort);

        assert_eq!(out.signals[4], Side::Buy);
        assert_eq!(out.positions[4], Side::None);
        assert_eq!(trace.states[4], TrendState::Flat);
    }

    #[test]
    fn downward_breakout_buys_and_holds() {
        let prices = [10.0, 10.0, 10.0, 7.0, 7.5, 8.0];
        let trace = generator(3, 1.0, 0.0).trace(&series(&prices)).unwrap();
        let out = &trace.series;

        assert_eq!(out.signals[3], Side::Buy);
        assert_eq!(out.positions[3], Side::Buy);
        assert_eq!(trace.states[3], TrendState::InLong);
        // Still below the middle band: the long is carried.
        assert_eq!(out.signals[4], Side::None);
        assert_eq!(out.positions[4], Side::Buy);
    }

    #[test]
    fn long_closes_on_upward_cross_of_exit_band() {
        // Entry on the drop at index 3, exit when price pops above the middle.
        let prices = [10.0, 10.0, 10.0, 7.0, 12.0, 12.0];
        let trace = generator(3, 1.0, 0.0).trace(&series(&prices)).unwrap();
        let out = &trace.series;

        assert_eq!(out.signals[3], Side::Buy);
        assert_eq!(out.signals[4], Side::Sell);
        assert_eq!(out.positions[4], Side::None);
        assert_eq!(trace.states[4], TrendState::Flat);
    }

    #[test]
    fn trend_flags_are_exclusive() {
        let prices = [10.0, 10.0, 10.0, 13.0, 9.0, 6.0, 6.5, 11.0, 15.0, 9.0];
        let trace = generator(3, 1.0, 0.0).trace(&series(&prices)).unwrap();
        for state in &trace.states {
            assert!(!(state.up_trend() && state.down_trend()));
        }
    }

    #[test]
    fn warmup_suppresses_signals() {
        // The spike lands inside the warmup window of a 5-step lookback.
        let prices = [10.0, 30.0, 10.0, 10.0, 10.0, 10.0];
        let out = generator(5, 1.0, 0.0).generate(&series(&prices)).unwrap();
        assert!(out.signals[..5].iter().all(|s| s.is_none()));
    }

    proptest! {
        #[test]
        fn state_trace_matches_positions(
            prices in prop::collection::vec(1.0f64..200.0, 2..80),
            lookback in 1usize..10,
            entry in 0.1f64..3.0,
            exit in -1.0f64..0.1,
        ) {
            let trace = generator(lookback, entry, exit).trace(&series(&prices)).unwrap();
            let out = &trace.series;

            prop_assert_eq!(trace.states[0], TrendState::Flat);
            prop_assert!(out.signals[0].is_none());
            for i in 0..prices.len() {
                let state = trace.states[i];
                let expected = match state {
                    TrendState::Flat => Side::None,
                    TrendState::InShort => Side::Sell,
                    TrendState::InLong => Side::Buy,
                };
                prop_assert_eq!(out.positions[i], expected);
                prop_assert!(!(state.up_trend() && state.down_trend()));
                if i > 0 {
                    prop_assert_eq!(!out.signals[i].is_none(), state != trace.states[i - 1]);
                }
            }
        }
    }
}
