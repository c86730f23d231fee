//! Swing breakout with post-breakout validation.
//!
//! State machine evaluated bar by bar:
//!
//! - A pivot high is a bar whose high is strictly above every other high in
//!   `[p - left, p + right]`; it is confirmed `right` bars later.
//! - Breakout: high trades above the last swing high and the bar closes at or
//!   above it. A long is opened at the close. Trading above but closing below
//!   is a false breakout and is not entered.
//! - Validation: after the breakout, price must close above the 10-period EMA
//!   for a number of consecutive bars and gain a given percent within a bar
//!   window. Once validated it is never re-checked.
//! - Swing failure closes the position: max-loss stop, EMA trailing stop, or
//!   (before validation only) a low under the breakout bar's low.
//!
//! Undefined EMA values (warm-up) never satisfy either side of a comparison.

use log::debug;

use crate::domain::backtest::{BacktestResult, Ledger};
use crate::domain::indicator::ema::calculate_ema;
use crate::domain::ohlcv::DateKey;
use crate::domain::series::PriceSeries;

pub const EMA_PERIOD: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingBreakout {
    pub left_bars: usize,
    pub right_bars: usize,
    pub use_ema_stop: bool,
    pub days_above_ema_required: usize,
    pub gain_threshold_pct: f64,
    pub gain_window_bars: usize,
    pub max_loss_pct: f64,
}

impl Default for SwingBreakout {
    fn default() -> Self {
        Self {
            left_bars: 5,
            right_bars: 5,
            use_ema_stop: true,
            days_above_ema_required: 5,
            gain_threshold_pct: 20.0,
            gain_window_bars: 25,
            max_loss_pct: 8.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SwingHigh {
    value: f64,
    bar: usize,
}

#[derive(Debug, Clone, Copy)]
struct Breakout {
    price: f64,
    low: f64,
    bar: usize,
}

/// Per-run state; lives only for the duration of one `run` call.
#[derive(Debug, Default)]
struct SwingState {
    trend_up: bool,
    breakout_flagged: bool,
    last_swing_high: Option<SwingHigh>,
    breakout: Option<Breakout>,
    days_above_ema: usize,
    validation_passed: bool,
    entry_price: Option<f64>,
    first_signal_date: Option<DateKey>,
}

impl SwingState {
    fn confirm_breakout(&mut self, bar: usize, date: DateKey, close: f64, low: f64, above_ema: bool) {
        self.trend_up = true;
        self.breakout_flagged = true;
        self.entry_price = Some(close);
        self.breakout = Some(Breakout {
            price: close,
            low,
            bar,
        });
        self.days_above_ema = usize::from(above_ema);
        self.validation_passed = false;
        self.first_signal_date.get_or_insert(date);
    }

    /// Back to flat. The last swing high is kept so a later bar can break it again.
    fn reset_breakout(&mut self) {
        self.trend_up = false;
        self.breakout_flagged = false;
        self.breakout = None;
        self.days_above_ema = 0;
        self.validation_passed = false;
        self.entry_price = None;
    }
}

impl SwingBreakout {
    /// Index of the pivot high confirmed at bar `i`, if any.
    fn confirmed_pivot(&self, highs: &[f64], i: usize) -> Option<usize> {
        let (left, right) = (self.left_bars, self.right_bars);
        if left == 0 || right == 0 || i < right {
            return None;
        }
        let p = i - right;
        if p < left || i >= highs.len() {
            return None;
        }

        let pivot = highs[p];
        let strictly_highest = (p - left..=i)
            .filter(|&j| j != p)
            .all(|j| highs[j] < pivot);
        strictly_highest.then_some(p)
    }

    pub fn run(&self, series: &PriceSeries) -> BacktestResult {
        if series.is_empty() {
            return BacktestResult::default();
        }

        let highs = series.highs();
        let ema = calculate_ema(&series.closes(), EMA_PERIOD);

        let mut state = SwingState::default();
        let mut ledger = Ledger::default();

        for (i, bar) in series.bars().iter().enumerate() {
            let close = bar.close;
            let above_ema = ema.get(i).is_some_and(|e| close > e);
            let below_ema = ema.get(i).is_some_and(|e| close < e);

            let mut is_breakout = false;
            let mut is_failure = false;

            if let Some(p) = self.confirmed_pivot(&highs, i) {
                state.last_swing_high = Some(SwingHigh {
                    value: highs[p],
                    bar: p,
                });
                if !state.trend_up {
                    state.breakout_flagged = false;
                }
            }

            if state.trend_up {
                if let Some(entry) = state.entry_price {
                    let loss_pct = (entry - close) / entry * 100.0;
                    if loss_pct >= self.max_loss_pct {
                        debug!("{}: max loss {:.2}% hit", bar.date, loss_pct);
                        is_failure = true;
                    }
                }

                if !state.validation_passed {
                    if let Some(breakout) = state.breakout {
                        if bar.low < breakout.low {
                            debug!("{}: breakout low {:.4} violated", bar.date, breakout.low);
                            is_failure = true;
                        }

                        if above_ema {
                            state.days_above_ema += 1;
                        } else {
                            state.days_above_ema = 0;
                        }

                        let bars_since = i - breakout.bar;
                        let gain_pct = (close - breakout.price) / breakout.price * 100.0;
                        if state.days_above_ema >= self.days_above_ema_required
                            && gain_pct >= self.gain_threshold_pct
                            && bars_since <= self.gain_window_bars
                        {
                            debug!("{}: breakout validated after {} bars", bar.date, bars_since);
                            state.validation_passed = true;
                        }
                    }
                }

                if self.use_ema_stop && below_ema {
                    debug!("{}: close below EMA({})", bar.date, EMA_PERIOD);
                    is_failure = true;
                }
            }

            if !state.trend_up && !state.breakout_flagged {
                if let Some(swing) = state.last_swing_high {
                    if bar.high > swing.value {
                        if close < swing.value {
                            is_failure = true;
                        } else {
                            debug!(
                                "{}: breakout over swing high {:.4} (bar {})",
                                bar.date, swing.value, swing.bar
                            );
                            state.confirm_breakout(i, bar.date, close, bar.low, above_ema);
                            is_breakout = true;
                        }
                    }
                }
            }

            if is_breakout {
                ledger.open(bar.date, close);
            }
            if is_failure && ledger.is_long() {
                ledger.close(bar.date, close);
                state.reset_breakout();
            }
        }

        let last = series.bars().last().map(|b| (b.date, b.close));
        ledger.finish(last, state.first_signal_date)
    }
}
