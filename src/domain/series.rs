//! Immutable, chronologically ordered price series.
//!
//! Order is the caller's responsibility: bars are kept exactly as handed in
//! and never re-sorted.

use std::ops::Index;

use crate::domain::ohlcv::{Bar, DateKey};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    /// First and last dates, or `None` for an empty series.
    pub fn date_range(&self) -> Option<(DateKey, DateKey)> {
        match (self.bars.first(), self.bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date)),
            _ => None,
        }
    }
}

impl From<Vec<Bar>> for PriceSeries {
    fn from(bars: Vec<Bar>) -> Self {
        Self::new(bars)
    }
}

impl Index<usize> for PriceSeries {
    type Output = Bar;

    fn index(&self, index: usize) -> &Bar {
        &self.bars[index]
    }
}
