//! Simple returns.
//!
//! R[i] = (C[i] - C[i-1]) / C[i-1]
//! Undefined at the first bar and after a non-positive close.

pub fn pct_change(values: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    out.push(None);
    for w in values.windows(2) {
        let (prev, curr) = (w[0], w[1]);
        out.push(if prev > 0.0 {
            Some((curr - prev) / prev)
        } else {
            None
        });
    }
    out
}

/// The series shifted one step back: `out[i] = values[i + 1]`, with the
/// final slot undefined.
pub fn lead(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out: Vec<Option<f64>> = values.iter().skip(1).copied().collect();
    if !values.is_empty() {
        out.push(None);
    }
    out
}
