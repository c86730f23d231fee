//! Strategies: turn indicator signals over a [`PriceSeries`] into trades.
//!
//! Strategies take all parameters at construction and keep no per-run state,
//! so one instance can be shared across threads and run any number of times
//! with identical results.

pub mod crossing;
pub mod swing_breakout;

use std::fmt;

use crate::domain::backtest::BacktestResult;
use crate::domain::series::PriceSeries;

pub use crossing::{DiffCross, RocSmaCrossover};
pub use swing_breakout::SwingBreakout;

#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    DiffCross(DiffCross),
    RocSmaCrossover(RocSmaCrossover),
    SwingBreakout(SwingBreakout),
}

impl Strategy {
    pub fn run(&self, series: &PriceSeries) -> BacktestResult {
        match self {
            Strategy::DiffCross(s) => s.run(series),
            Strategy::RocSmaCrossover(s) => s.run(series),
            Strategy::SwingBreakout(s) => s.run(series),
        }
    }
}

impl From<DiffCross> for Strategy {
    fn from(s: DiffCross) -> Self {
        Strategy::DiffCross(s)
    }
}

impl From<RocSmaCrossover> for Strategy {
    fn from(s: RocSmaCrossover) -> Self {
        Strategy::RocSmaCrossover(s)
    }
}

impl From<SwingBreakout> for Strategy {
    fn from(s: SwingBreakout) -> Self {
        Strategy::SwingBreakout(s)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::DiffCross(s) => write!(
                f,
                "DiffCross({} - {}, threshold={})",
                s.a, s.b, s.threshold
            ),
            Strategy::RocSmaCrossover(s) => write!(
                f,
                "RocSmaCrossover(fast={}, slow={}, roc={}, threshold={})",
                s.fast, s.slow, s.roc, s.threshold
            ),
            Strategy::SwingBreakout(s) => write!(
                f,
                "SwingBreakout(left={}, right={}, ema_stop={}, days_above_ema={}, gain={}% in {} bars, max_loss={}%)",
                s.left_bars,
                s.right_bars,
                s.use_ema_stop,
                s.days_above_ema_required,
                s.gain_threshold_pct,
                s.gain_window_bars,
                s.max_loss_pct
            ),
        }
    }
}
