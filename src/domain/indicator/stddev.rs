//! Rolling mean and standard deviation.
//!
//! Population standard deviation over n values.
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n-1) / n)
//! Warmup: first (n-1) values have no window.

/// Mean and population deviation of a single window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub stddev: f64,
}

/// A window whose values are all equal has its first value as mean and a
/// zero deviation. Deviations within rounding of the mean are clamped to zero.
pub fn window_stats(window: &[f64]) -> WindowStats {
    if let Some((&first, rest)) = window.split_first() {
        if rest.iter().all(|v| *v == first) {
            return WindowStats {
                mean: first,
                stddev: 0.0,
            };
        }
    }

    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    let stddev = variance.sqrt();
    WindowStats {
        mean,
        stddev: if stddev <= n * f64::EPSILON * mean.abs() {
            0.0
        } else {
            stddev
        },
    }
}

/// One entry per input value; `None` while the window is still filling.
pub fn rolling_stats(values: &[f64], period: usize) -> Vec<Option<WindowStats>> {
    let warmup = period.saturating_sub(1);
    (0..values.len())
        .map(|i| {
            if period == 0 || i < warmup {
                None
            } else {
                Some(window_stats(&values[i + 1 - period..=i]))
            }
        })
        .collect()
}
