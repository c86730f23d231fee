//! Parameter sweep over the ROC-of-SMA crossover.
//!
//! Every `(fast, slow, roc, threshold)` combination with `fast < slow` is
//! backtested and scored as `pnl - 0.25 * max_drawdown`. The sweep keeps the
//! single best result and a bounded top-K leaderboard.
//!
//! Work fans out over a rayon pool; each worker folds a partial
//! [`Leaderboard`] and partials are merged with a total order on
//! `(score, grid index)`, so the outcome does not depend on thread count or
//! completion order.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};

use log::{info, warn};
use rayon::prelude::*;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::ParseError;
use crate::domain::series::PriceSeries;
use crate::domain::strategy::RocSmaCrossover;

pub const DRAWDOWN_PENALTY: f64 = 0.25;
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_PROGRESS_EVERY: usize = 100;
pub const DEFAULT_MAX_COMBINATIONS: usize = 1_000_000;

const FLOAT_RANGE_EPSILON: f64 = 1e-12;

pub fn score(result: &BacktestResult) -> f64 {
    result.pnl - DRAWDOWN_PENALTY * result.max_drawdown
}

/// Inclusive `start:stop:step` range of sweep values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange<T> {
    pub start: T,
    pub stop: T,
    pub step: T,
}

impl<T: Copy> ParamRange<T> {
    pub fn new(start: T, stop: T, step: T) -> Self {
        Self { start, stop, step }
    }
}

impl ParamRange<usize> {
    /// Empty when `step == 0` or `start > stop`.
    pub fn values(&self) -> Vec<usize> {
        if self.step == 0 || self.start > self.stop {
            return Vec::new();
        }
        (self.start..=self.stop).step_by(self.step).collect()
    }
}

impl ParamRange<f64> {
    /// Values are `start + i * step`, with `stop` included up to a 1e-12 tolerance.
    pub fn values(&self) -> Vec<f64> {
        let (start, stop, step) = (self.start, self.stop, self.step);
        if !(start.is_finite() && stop.is_finite() && step.is_finite())
            || step <= 0.0
            || start > stop
        {
            return Vec::new();
        }
        let count = ((stop - start) / step + FLOAT_RANGE_EPSILON).floor() as usize + 1;
        (0..count).map(|i| start + i as f64 * step).collect()
    }
}

fn split_range(input: &str) -> Result<[&str; 3], ParseError> {
    let parts: Vec<&str> = input.split(':').map(str::trim).collect();
    match parts.as_slice() {
        [single] => Ok([*single, *single, ""]),
        [start, stop, step] => Ok([*start, *stop, *step]),
        _ => Err(ParseError {
            message: format!("expected 'start:stop:step' or a single value, got '{}'", input),
            position: 0,
        }),
    }
}

fn parse_part<T: FromStr>(input: &str, part: &str) -> Result<T, ParseError> {
    part.parse().map_err(|_| ParseError {
        message: format!("invalid number '{}'", part),
        position: input.find(part).unwrap_or(0),
    })
}

impl FromStr for ParamRange<usize> {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [start, stop, step] = split_range(s)?;
        let start = parse_part(s, start)?;
        let stop = parse_part(s, stop)?;
        let step = if step.is_empty() { 1 } else { parse_part(s, step)? };
        Ok(Self::new(start, stop, step))
    }
}

impl FromStr for ParamRange<f64> {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [start, stop, step] = split_range(s)?;
        let start = parse_part(s, start)?;
        let stop = parse_part(s, stop)?;
        let step = if step.is_empty() { 1.0 } else { parse_part(s, step)? };
        Ok(Self::new(start, stop, step))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepParams {
    pub fast: usize,
    pub slow: usize,
    pub roc: usize,
    pub threshold: f64,
}

impl SweepParams {
    pub fn strategy(&self) -> RocSmaCrossover {
        RocSmaCrossover::new(self.fast, self.slow, self.roc, self.threshold)
    }
}

impl fmt::Display for SweepParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fast={} slow={} roc={} threshold={}",
            self.fast, self.slow, self.roc, self.threshold
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepResult {
    pub params: SweepParams,
    pub result: BacktestResult,
    pub score: f64,
}

/// Ordered value domains of the sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepGrid {
    pub fasts: Vec<usize>,
    pub slows: Vec<usize>,
    pub rocs: Vec<usize>,
    pub thresholds: Vec<f64>,
}

impl SweepGrid {
    pub fn new(fasts: Vec<usize>, slows: Vec<usize>, rocs: Vec<usize>, thresholds: Vec<f64>) -> Self {
        Self {
            fasts,
            slows,
            rocs,
            thresholds,
        }
    }

    /// Cartesian product size, before pruning `fast >= slow`.
    pub fn naive_size(&self) -> usize {
        self.fasts.len() * self.slows.len() * self.rocs.len() * self.thresholds.len()
    }

    pub fn valid_pairs(&self) -> usize {
        self.fasts
            .iter()
            .map(|f| self.slows.iter().filter(|&s| f < s).count())
            .sum()
    }

    pub fn skipped_pairs(&self) -> usize {
        self.fasts.len() * self.slows.len() - self.valid_pairs()
    }

    /// Number of combinations actually evaluated.
    pub fn effective_size(&self) -> usize {
        self.valid_pairs() * self.rocs.len() * self.thresholds.len()
    }

    /// Combinations in grid order: fast, then slow, then roc, then threshold.
    pub fn points(&self) -> Vec<SweepParams> {
        let mut points = Vec::with_capacity(self.effective_size());
        for &fast in &self.fasts {
            for &slow in &self.slows {
                if fast >= slow {
                    continue;
                }
                for &roc in &self.rocs {
                    for &threshold in &self.thresholds {
                        points.push(SweepParams {
                            fast,
                            slow,
                            roc,
                            threshold,
                        });
                    }
                }
            }
        }
        points
    }
}

/// A result tagged with its position in grid order.
#[derive(Debug, Clone, Copy)]
struct Ranked {
    index: usize,
    entry: SweepResult,
}

impl Ranked {
    fn rank_score(&self) -> f64 {
        if self.entry.score.is_nan() {
            f64::NEG_INFINITY
        } else {
            self.entry.score
        }
    }
}

// Greater is better: higher score, then earlier in grid order.
impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank_score()
            .total_cmp(&other.rank_score())
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// Best result plus the K highest-scoring results seen so far.
///
/// The top-K is a min-heap: each push is followed by evicting the minimum
/// while the heap holds more than K entries.
#[derive(Debug, Clone)]
pub struct Leaderboard {
    capacity: usize,
    best: Option<Ranked>,
    heap: BinaryHeap<Reverse<Ranked>>,
    evaluated: usize,
}

impl Leaderboard {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            best: None,
            heap: BinaryHeap::with_capacity(capacity + 1),
            evaluated: 0,
        }
    }

    /// Record the result found at grid position `index`.
    pub fn push(&mut self, index: usize, entry: SweepResult) {
        self.evaluated += 1;
        self.insert(Ranked { index, entry });
    }

    fn insert(&mut self, ranked: Ranked) {
        if self.best.is_none_or(|best| ranked > best) {
            self.best = Some(ranked);
        }
        self.heap.push(Reverse(ranked));
        while self.heap.len() > self.capacity {
            self.heap.pop();
        }
    }

    /// Combine two partial leaderboards. Associative and commutative.
    pub fn merge(mut self, other: Leaderboard) -> Leaderboard {
        if let Some(best) = other.best {
            if self.best.is_none_or(|mine| best > mine) {
                self.best = Some(best);
            }
        }
        for Reverse(ranked) in other.heap {
            self.heap.push(Reverse(ranked));
            while self.heap.len() > self.capacity {
                self.heap.pop();
            }
        }
        self.evaluated += other.evaluated;
        self
    }

    pub fn best(&self) -> Option<&SweepResult> {
        self.best.as_ref().map(|r| &r.entry)
    }

    pub fn evaluated(&self) -> usize {
        self.evaluated
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Top entries, highest score first.
    pub fn top(&self) -> Vec<SweepResult> {
        let mut ranked: Vec<Ranked> = self.heap.iter().map(|Reverse(r)| *r).collect();
        ranked.sort_by(|a, b| b.cmp(a));
        ranked.into_iter().map(|r| r.entry).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepOutcome {
    pub best: Option<SweepResult>,
    /// Highest score first.
    pub top: Vec<SweepResult>,
    pub evaluated: usize,
    pub skipped_pairs: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepProgress {
    pub evaluated: usize,
    pub total: usize,
}

pub type ProgressFn<'a> = &'a (dyn Fn(&SweepProgress) + Sync);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sweeper {
    pub top_k: usize,
    /// Progress is reported every N evaluated combinations; 0 disables it.
    pub progress_every: usize,
    /// 0 uses the global rayon pool, 1 runs sequentially.
    pub threads: usize,
}

impl Default for Sweeper {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            progress_every: DEFAULT_PROGRESS_EVERY,
            threads: 0,
        }
    }
}

impl Sweeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_progress_every(mut self, progress_every: usize) -> Self {
        self.progress_every = progress_every;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn evaluate(series: &PriceSeries, params: SweepParams) -> SweepResult {
        let result = params.strategy().run(series);
        SweepResult {
            params,
            result,
            score: score(&result),
        }
    }

    pub fn run(&self, series: &PriceSeries, grid: &SweepGrid) -> SweepOutcome {
        self.run_with(series, grid, None, None)
    }

    /// Run the sweep with an optional progress callback and abort switch.
    ///
    /// Once `cancel` is set no further combinations are evaluated; the
    /// outcome then covers what finished and is flagged `cancelled`.
    pub fn run_with(
        &self,
        series: &PriceSeries,
        grid: &SweepGrid,
        progress: Option<ProgressFn<'_>>,
        cancel: Option<&AtomicBool>,
    ) -> SweepOutcome {
        let points = grid.points();
        let total = points.len();
        let skipped_pairs = grid.skipped_pairs();
        info!(
            "sweep: {} combinations ({} naive, {} fast>=slow pairs skipped)",
            total,
            grid.naive_size(),
            skipped_pairs
        );

        let done = AtomicUsize::new(0);
        let step = |mut board: Leaderboard, (index, params): (usize, &SweepParams)| {
            if cancel.is_some_and(|c| c.load(AtomicOrdering::Relaxed)) {
                return board;
            }
            board.push(index, Self::evaluate(series, *params));
            let n = done.fetch_add(1, AtomicOrdering::Relaxed) + 1;
            self.report_progress(n, total, progress);
            board
        };

        let board = match self.threads {
            1 => points
                .iter()
                .enumerate()
                .fold(Leaderboard::new(self.top_k), &step),
            0 => self.fold_parallel(&points, &step),
            n => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
                Ok(pool) => pool.install(|| self.fold_parallel(&points, &step)),
                Err(e) => {
                    warn!("could not build {}-thread pool ({}); using global pool", n, e);
                    self.fold_parallel(&points, &step)
                }
            },
        };

        let evaluated = board.evaluated();
        let cancelled = evaluated < total;
        if cancelled {
            warn!("sweep cancelled after {}/{} combinations", evaluated, total);
        } else {
            info!("sweep finished: {} combinations evaluated", evaluated);
        }

        SweepOutcome {
            best: board.best().copied(),
            top: board.top(),
            evaluated,
            skipped_pairs,
            cancelled,
        }
    }

    fn fold_parallel<F>(&self, points: &[SweepParams], step: &F) -> Leaderboard
    where
        F: Fn(Leaderboard, (usize, &SweepParams)) -> Leaderboard + Sync + Send,
    {
        let top_k = self.top_k;
        points
            .par_iter()
            .enumerate()
            .fold(|| Leaderboard::new(top_k), step)
            .reduce(|| Leaderboard::new(top_k), Leaderboard::merge)
    }

    fn report_progress(&self, done: usize, total: usize, progress: Option<ProgressFn<'_>>) {
        if self.progress_every == 0 || done % self.progress_every != 0 {
            return;
        }
        info!("sweep progress: {}/{}", done, total);
        if let Some(callback) = progress {
            callback(&SweepProgress {
                evaluated: done,
                total,
            });
        }
    }
}
