//! Returns and risk analytics.
//!
//! Ratios use the population standard deviation. Divisions by zero inside
//! return calculations recover to 0.0; degenerate ratio denominators resolve
//! to 0.0 or a signed infinity and are never raised as errors.

use super::indicator::stddev::window_stats;
use super::series::lag;

pub const DEFAULT_ANNUALIZATION: f64 = 252.0;

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// `(v[t] - v[t-1]) / v[t-1]`, 0.0 at index 0 and wherever the ratio is
/// not finite.
pub fn calculate_returns(values: &[f64]) -> Vec<f64> {
    let prev = lag(values);
    values
        .iter()
        .zip(&prev)
        .enumerate()
        .map(|(i, (v, p))| match i {
            0 => 0.0,
            _ => finite_or_zero((v - p) / p),
        })
        .collect()
}

/// `ln(v[t] / v[t-1])` with the same zero normalization as
/// [`calculate_returns`].
pub fn calculate_log_returns(values: &[f64]) -> Vec<f64> {
    let prev = lag(values);
    values
        .iter()
        .zip(&prev)
        .enumerate()
        .map(|(i, (v, p))| match i {
            0 => 0.0,
            _ => finite_or_zero((v / p).ln()),
        })
        .collect()
}

/// `cumprod(1 + r) - 1`.
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0, |growth, r| {
            *growth *= 1.0 + r;
            Some(*growth - 1.0)
        })
        .collect()
}

/// `cumsum(ln(1 + r))`. A return at or below -100% contributes 0.0.
pub fn cumulative_log_returns(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(0.0, |acc, r| {
            *acc += finite_or_zero((1.0 + r).ln());
            Some(*acc)
        })
        .collect()
}

/// Ratio of `mean` to a deviation. A zero deviation gives 0.0 for a zero
/// mean and an infinity carrying the mean's sign otherwise.
fn scaled_ratio(mean: f64, deviation: f64, annualization: f64) -> f64 {
    if deviation > 0.0 {
        mean / deviation * annualization.sqrt()
    } else if mean == 0.0 {
        0.0
    } else {
        mean.signum() * f64::INFINITY
    }
}

pub fn sharpe_ratio(returns: &[f64], annualization: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let stats = window_stats(returns);
    scaled_ratio(stats.mean, stats.stddev, annualization)
}

/// Mean return over the deviation of the negative returns only. With no
/// negative returns the ratio is `+∞`.
pub fn sortino_ratio(returns: &[f64], annualization: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    if downside.is_empty() {
        return f64::INFINITY;
    }
    let mean = window_stats(returns).mean;
    scaled_ratio(mean, window_stats(&downside).stddev, annualization)
}

/// Worst drawdown of a cumulative-return series and the longest run spent
/// below the high-water mark.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Drawdown {
    pub max_drawdown: f64,
    pub duration: usize,
    pub drawdown_index: usize,
    pub duration_end_index: usize,
    /// Last high-water mark at or before `drawdown_index`.
    pub highwatermark_index: usize,
}

/// Drawdown of linear cumulative returns: `(1 + cum) / (1 + hwm) - 1`.
pub fn max_drawdown(cumulative: &[f64]) -> Drawdown {
    drawdown_with(cumulative, |cum, hwm| (1.0 + cum) / (1.0 + hwm) - 1.0)
}

/// Drawdown of log cumulative returns: `cum - hwm`.
pub fn max_drawdown_log(cumulative: &[f64]) -> Drawdown {
    drawdown_with(cumulative, |cum, hwm| cum - hwm)
}

fn drawdown_with(cumulative: &[f64], measure: impl Fn(f64, f64) -> f64) -> Drawdown {
    let Some(&first) = cumulative.first() else {
        return Drawdown::default();
    };

    let mut hwm = Vec::with_capacity(cumulative.len());
    let mut result = Drawdown::default();
    let mut mark = first;
    let mut run = 0usize;

    for (i, &cum) in cumulative.iter().enumerate() {
        mark = mark.max(cum);
        hwm.push(mark);

        let dd = measure(cum, mark);
        if dd < result.max_drawdown {
            result.max_drawdown = dd;
            result.drawdown_index = i;
        }

        run = if dd != 0.0 { run + 1 } else { 0 };
        if run > result.duration {
            result.duration = run;
            result.duration_end_index = i;
        }
    }

    let peak = hwm[result.drawdown_index];
    result.highwatermark_index = (0..=result.drawdown_index)
        .rev()
        .find(|&i| cumulative[i] == peak)
        .unwrap_or(0);
    result
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceReport {
    pub sharpe: f64,
    pub sortino: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub drawdown_index: usize,
    pub duration_end_index: usize,
    pub highwatermark_index: usize,
}

impl PerformanceReport {
    /// Ratios on `returns`, drawdown on their log cumulative series.
    pub fn from_returns(returns: &[f64], annualization: f64) -> Self {
        let drawdown = max_drawdown_log(&cumulative_log_returns(returns));
        PerformanceReport {
            sharpe: sharpe_ratio(returns, annualization),
            sortino: sortino_ratio(returns, annualization),
            max_drawdown: drawdown.max_drawdown,
            max_drawdown_duration: drawdown.duration,
            drawdown_index: drawdown.drawdown_index,
            duration_end_index: drawdown.duration_end_index,
            highwatermark_index: drawdown.highwatermark_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const RETURNS: [f64; 11] = [0.1, 0.2, -0.1, -0.2, 0.1, -0.2, 0.1, 0.1, 0.1, 0.1, 0.3];
    const PATH: [f64; 10] = [0.0, 15.0, 15.0, 27.5, 27.5, 17.5, 32.5, 32.5, 10.0, -7.5];

    fn assert_series(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert_abs_diff_eq!(*a, *e, epsilon = 1e-7);
        }
    }

    #[test]
    fn returns_zero_normalized() {
        assert_series(
            &calculate_returns(&PATH),
            &[
                0.0, 0.0, 0.0, 0.83333333, 0.0, -0.36363636, 0.85714286, 0.0, -0.69230769, -1.75,
            ],
        );
    }

    #[test]
    fn sharpe_of_path_returns() {
        assert_abs_diff_eq!(
            sharpe_ratio(&calculate_returns(&PATH), DEFAULT_ANNUALIZATION),
            -2.5095619671562686,
            epsilon = 1e-9
        );
    }

    #[test]
    fn log_returns_zero_normalized() {
        assert_series(
            &calculate_log_returns(&PATH),
            &[
                0.0, 0.0, 0.0, 0.6061358, 0.0, -0.45198512, 0.61903921, 0.0, -1.178655, 0.0,
            ],
        );
    }

    #[test]
    fn returns_of_empty_and_single() {
        assert!(calculate_returns(&[]).is_empty());
        assert_eq!(calculate_returns(&[5.0]), vec![0.0]);
    }

    #[test]
    fn sharpe_reference_value() {
        assert_abs_diff_eq!(
            sharpe_ratio(&RETURNS, DEFAULT_ANNUALIZATION),
            5.775200531277732,
            epsilon = 1e-9
        );
    }

    #[test]
    fn sortino_reference_value() {
        assert_abs_diff_eq!(
            sortino_ratio(&RETURNS, DEFAULT_ANNUALIZATION),
            18.36813626234481,
            epsilon = 1e-9
        );
    }

    #[test]
    fn sortino_without_losses_is_infinite() {
        assert_eq!(sortino_ratio(&[0.1, 0.0, 0.2], 252.0), f64::INFINITY);
    }

    #[test]
    fn degenerate_sharpe() {
        assert_eq!(sharpe_ratio(&[0.0; 4], 252.0), 0.0);
        assert_eq!(sharpe_ratio(&[0.01; 4], 252.0), f64::INFINITY);
        assert_eq!(sharpe_ratio(&[0.1; 3], 252.0), f64::INFINITY);
        assert_eq!(sharpe_ratio(&[-0.1; 3], 252.0), f64::NEG_INFINITY);
        assert_eq!(sharpe_ratio(&[-0.01; 4], 252.0), f64::NEG_INFINITY);
        assert_eq!(sharpe_ratio(&[], 252.0), 0.0);
    }

    #[test]
    fn degenerate_sortino_downside() {
        // A single losing step has zero downside deviation.
        assert_eq!(sortino_ratio(&[0.2, -0.1], 252.0), f64::INFINITY);
        assert_eq!(sortino_ratio(&[0.1, -0.1], 252.0), 0.0);
        assert_eq!(sortino_ratio(&[0.5, -0.1, -0.1, -0.1], 252.0), f64::INFINITY);
    }

    #[test]
    fn log_drawdown_reference_values() {
        let dd = max_drawdown_log(&cumulative_log_returns(&RETURNS));
        assert_abs_diff_eq!(dd.max_drawdown, -0.45633743848192077, epsilon = 1e-9);
        assert_eq!(dd.duration, 8);
        assert_eq!(dd.drawdown_index, 5);
        assert_eq!(dd.duration_end_index, 9);
        assert_eq!(dd.highwatermark_index, 1);
    }

    #[test]
    fn linear_drawdown_reference_values() {
        let dd = max_drawdown(&cumulative_returns(&RETURNS));
        assert_abs_diff_eq!(dd.max_drawdown, -0.3664, epsilon = 1e-9);
        assert_eq!(dd.duration, 8);
        assert_eq!(dd.drawdown_index, 5);
        assert_eq!(dd.duration_end_index, 9);
        assert_eq!(dd.highwatermark_index, 1);
    }

    #[test]
    fn drawdown_of_rising_series_is_zero() {
        let dd = max_drawdown_log(&[0.0, 0.1, 0.2, 0.3]);
        assert_eq!(dd, Drawdown::default());
    }

    #[test]
    fn drawdown_ties_resolve_to_first_index() {
        let dd = max_drawdown_log(&[0.0, -0.5, 0.0, -0.5]);
        assert_eq!(dd.drawdown_index, 1);
        assert_eq!(dd.duration_end_index, 1);
        assert_eq!(dd.highwatermark_index, 0);
    }

    #[test]
    fn cumulative_log_skips_total_loss() {
        let cum = cumulative_log_returns(&[0.0, -1.75, 0.0]);
        assert_eq!(cum, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn report_collects_ratios_and_drawdown() {
        let report = PerformanceReport::from_returns(&RETURNS, DEFAULT_ANNUALIZATION);
        assert_abs_diff_eq!(report.sharpe, 5.775200531277732, epsilon = 1e-9);
        assert_eq!(report.max_drawdown_duration, 8);
        assert_eq!(report.highwatermark_index, 1);
    }
}
