//! ROC (Rate of Change).
//!
//! ROC(k)[i] = (V[i] / V[i-k] - 1) * 100
//! Warmup: first k values undefined.
//! Undefined as well when V[i-k] == 0, when either operand is undefined or
//! non-finite, or when the quotient overflows.
//!
//! Works over any aligned value vector so it can be applied to another
//! indicator's output.

use crate::domain::indicator::IndicatorSeries;

pub fn calculate_roc(values: &[Option<f64>], lookback: usize) -> IndicatorSeries {
    let mut out = vec![None; values.len()];
    if lookback == 0 || values.len() <= lookback {
        return IndicatorSeries::from_values(out);
    }

    for i in lookback..values.len() {
        out[i] = rate_of_change(values[i], values[i - lookback]);
    }

    IndicatorSeries::from_values(out)
}

fn rate_of_change(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    let (curr, prev) = (current?, previous?);
    if prev == 0.0 || !prev.is_finite() || !curr.is_finite() {
        return None;
    }
    let roc = (curr / prev - 1.0) * 100.0;
    roc.is_finite().then_some(roc)
}
