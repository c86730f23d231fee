//! Threshold-crossing strategies.
//!
//! Both strategies here share one rule over two indicators A and B and a
//! threshold T, starting at the first bar where A and B are both defined:
//!
//! - flat and `A - B >= +T`: enter long at the close
//! - long and `A - B <= -T`: exit at the close
//!
//! A position still open on the last bar is closed at the last close. Bars
//! where either indicator is undefined take no action.

use crate::domain::backtest::{BacktestResult, Ledger};
use crate::domain::indicator::{Indicator, IndicatorSeries};
use crate::domain::series::PriceSeries;

/// Long when indicator A leads indicator B by at least the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffCross {
    pub a: Indicator,
    pub b: Indicator,
    pub threshold: f64,
}

impl DiffCross {
    pub fn new(a: Indicator, b: Indicator, threshold: f64) -> Self {
        Self { a, b, threshold }
    }

    pub fn run(&self, series: &PriceSeries) -> BacktestResult {
        if series.is_empty() {
            return BacktestResult::default();
        }
        let a = self.a.compute(series);
        let b = self.b.compute(series);
        run_threshold_cross(series, &a, &b, self.threshold)
    }
}

/// Crossing of ROC(roc) applied to a fast and a slow SMA.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RocSmaCrossover {
    pub fast: usize,
    pub slow: usize,
    pub roc: usize,
    pub threshold: f64,
}

impl RocSmaCrossover {
    pub fn new(fast: usize, slow: usize, roc: usize, threshold: f64) -> Self {
        Self {
            fast,
            slow,
            roc,
            threshold,
        }
    }

    pub fn fast_indicator(&self) -> Indicator {
        Indicator::Sma(self.fast).roc_of(self.roc)
    }

    pub fn slow_indicator(&self) -> Indicator {
        Indicator::Sma(self.slow).roc_of(self.roc)
    }

    pub fn run(&self, series: &PriceSeries) -> BacktestResult {
        if series.is_empty() || self.fast == 0 || self.slow == 0 || self.roc == 0 {
            return BacktestResult::default();
        }
        let fast = self.fast_indicator().compute(series);
        let slow = self.slow_indicator().compute(series);
        run_threshold_cross(series, &fast, &slow, self.threshold)
    }
}

pub(crate) fn run_threshold_cross(
    series: &PriceSeries,
    a: &IndicatorSeries,
    b: &IndicatorSeries,
    threshold: f64,
) -> BacktestResult {
    let n = a.len().min(b.len()).min(series.len());

    let Some(start) = (0..n).find(|&i| a.get(i).is_some() && b.get(i).is_some()) else {
        return BacktestResult::default();
    };

    let mut ledger = Ledger::default();
    for i in start..n {
        let (Some(av), Some(bv)) = (a.get(i), b.get(i)) else {
            continue;
        };
        let diff = av - bv;
        let bar = &series[i];

        if !ledger.is_long() && diff >= threshold {
            ledger.open(bar.date, bar.close);
        } else if ledger.is_long() && diff <= -threshold {
            ledger.close(bar.date, bar.close);
        }
    }

    let last = &series[n - 1];
    ledger.finish(Some((last.date, last.close)), Some(series[start].date))
}
