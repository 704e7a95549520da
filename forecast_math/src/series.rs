//! Small helpers shared by the classifier and the extrapolator

/// Consecutive differences `values[i] - values[i - 1]`.
pub fn differences(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

/// Arithmetic mean, or `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Round half away from zero to the given number of decimals.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Round to cents, the precision every predicted value is stored at.
pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}
