//! Backtest results, trade accounting, and the backtester façade.
//!
//! Returns are tracked in percent points: each round trip adds
//! `(exit / entry - 1) * 100` to cumulative equity (no compounding). Drawdown
//! is measured against the running equity peak, which starts at zero.

use log::debug;

use crate::domain::ohlcv::DateKey;
use crate::domain::series::PriceSeries;
use crate::domain::strategy::Strategy;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BacktestResult {
    /// Cumulative percent return across closed trades.
    pub pnl: f64,
    /// Completed round-trip trades.
    pub trades: usize,
    /// Largest peak-to-trough equity decline, in percent points.
    pub max_drawdown: f64,
    /// First bar at which the strategy had enough data to act.
    pub best_start_date: Option<DateKey>,
}

/// Single-position long-only ledger shared by every strategy.
#[derive(Debug, Clone, Default)]
pub(crate) struct Ledger {
    entry: Option<f64>,
    equity: f64,
    peak: f64,
    max_drawdown: f64,
    trades: usize,
}

impl Ledger {
    pub(crate) fn is_long(&self) -> bool {
        self.entry.is_some()
    }

    pub(crate) fn open(&mut self, date: DateKey, price: f64) {
        if self.entry.is_none() {
            debug!("enter long {} @ {:.4}", date, price);
            self.entry = Some(price);
        }
    }

    /// Close the open position, if any, and return the realized trade return.
    pub(crate) fn close(&mut self, date: DateKey, price: f64) -> Option<f64> {
        let entry = self.entry.take()?;
        let trade_return = (price / entry - 1.0) * 100.0;
        self.equity += trade_return;
        self.trades += 1;
        self.peak = self.peak.max(self.equity);
        self.max_drawdown = self.max_drawdown.max(self.peak - self.equity);
        debug!(
            "exit long {} @ {:.4}: {:+.4}% (equity {:.4}%)",
            date, price, trade_return, self.equity
        );
        Some(trade_return)
    }

    /// Force-close any open position at the final bar and build the result.
    pub(crate) fn finish(
        mut self,
        last: Option<(DateKey, f64)>,
        best_start_date: Option<DateKey>,
    ) -> BacktestResult {
        if let Some((date, price)) = last {
            self.close(date, price);
        }
        BacktestResult {
            pnl: self.equity,
            trades: self.trades,
            max_drawdown: self.max_drawdown,
            best_start_date,
        }
    }
}

/// Runs a strategy over a series. Callers depend on this rather than on
/// concrete strategy types.
#[derive(Debug, Clone, Copy, Default)]
pub struct Backtester;

impl Backtester {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self, strategy: &Strategy, series: &PriceSeries) -> BacktestResult {
        strategy.run(series)
    }
}
