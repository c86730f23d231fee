//! Simple Moving Average.
//!
//! SMA[n-1] = mean(V[0..n]), then a rolling window sum:
//! sum += V[i] - V[i-n], SMA[i] = sum / n.
//! Warmup: first (n-1) values undefined. n == 0 or fewer than n values
//! leaves every position undefined.

use crate::domain::indicator::IndicatorSeries;

pub fn calculate_sma(values: &[f64], period: usize) -> IndicatorSeries {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return IndicatorSeries::from_values(out);
    }

    let n = period as f64;
    let mut window_sum: f64 = values[..period].iter().sum();
    out[period - 1] = Some(window_sum / n);

    for i in period..values.len() {
        window_sum += values[i] - values[i - period];
        out[i] = Some(window_sum / n);
    }

    IndicatorSeries::from_values(out)
}
