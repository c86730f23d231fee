//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) values undefined.
//!
//! When fewer than n values exist there is no SMA seed; the series is then
//! seeded with the first value and the same recurrence runs from index 1.
//! Wide parameter sweeps over short test series rely on this.

use crate::domain::indicator::IndicatorSeries;

pub fn calculate_ema(values: &[f64], period: usize) -> IndicatorSeries {
    let mut out = vec![None; values.len()];
    if period == 0 || values.is_empty() {
        return IndicatorSeries::from_values(out);
    }

    let k = 2.0 / (period as f64 + 1.0);

    let (seed_index, seed) = if values.len() >= period {
        let sum: f64 = values[..period].iter().sum();
        (period - 1, sum / period as f64)
    } else {
        (0, values[0])
    };

    let mut ema = seed;
    out[seed_index] = Some(ema);
    for i in (seed_index + 1)..values.len() {
        ema = values[i] * k + ema * (1.0 - k);
        out[i] = Some(ema);
    }

    IndicatorSeries::from_values(out)
}
