//! Simple moving average with an expanding warmup.
//!
//! SMA(n)[i] = mean(C[max(0, i-n+1)..=i])
//! The first n-1 values average every bar seen so far, so the series has
//! no leading gap.

/// Rolling arithmetic mean of `values` over `period` bars.
///
/// Each window is summed directly, not kept as a running total: equal
/// inputs must give bit-identical means.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return vec![];
    }

    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(period);
            let window = &values[start..=i];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}

/// Rolling mean over a series with gaps: averages the defined values in
/// each window and yields `None` only when the window holds none.
pub fn rolling_mean_defined(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(period);
            let (sum, count) = values[start..=i]
                .iter()
                .flatten()
                .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
            if count == 0 {
                None
            } else {
                Some(sum / count as f64)
            }
        })
        .collect()
}
