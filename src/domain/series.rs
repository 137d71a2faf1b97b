//! Array helpers shared by the signal, ledger and analytics code.

/// Replaces each NaN with the previous value. A leading NaN stays NaN.
pub fn ffill(data: &[f64]) -> Vec<f64> {
    let mut out = data.to_vec();
    for i in 1..out.len() {
        if out[i].is_nan() {
            out[i] = out[i - 1];
        }
    }
    out
}

/// Replaces each NaN with the next value. A trailing NaN stays NaN.
pub fn bfill(data: &[f64]) -> Vec<f64> {
    let mut out = data.to_vec();
    for i in (0..out.len().saturating_sub(1)).rev() {
        if out[i].is_nan() {
            out[i] = out[i + 1];
        }
    }
    out
}

/// Shifts the series one step forward, filling index 0 with 0.0.
pub fn lag(data: &[f64]) -> Vec<f64> {
    lag_with(data, 0.0)
}

/// Shifts the series one step forward, filling index 0 with `empty_term`.
pub fn lag_with(data: &[f64], empty_term: f64) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(data.len());
    out.push(empty_term);
    out.extend_from_slice(&data[..data.len() - 1]);
    out
}

pub fn cumsum(data: &[f64]) -> Vec<f64> {
    data.iter()
        .scan(0.0, |acc, &x| {
            *acc += x;
            Some(*acc)
        })
        .collect()
}

/// The row holding the largest value in `column`, ignoring NaN.
pub fn max_vector(rows: &[Vec<f64>], column: usize) -> Option<&[f64]> {
    rows.iter()
        .filter(|row| row.get(column).is_some_and(|v| !v.is_nan()))
        .fold(None, |best: Option<&Vec<f64>>, row| match best {
            Some(b) if b[column] >= row[column] => Some(b),
            _ => Some(row),
        })
        .map(|row| row.as_slice())
}
