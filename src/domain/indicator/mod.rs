//! Technical indicators over a [`PriceSeries`].
//!
//! Every indicator produces an [`IndicatorSeries`] index-aligned with its
//! input. Positions inside an indicator's warm-up (or where the formula is
//! undefined) hold `None`; callers treat `None` as "no signal" and never do
//! arithmetic on it.
//!
//! - `IndicatorSeries`: the aligned output vector
//! - `Indicator`: closed set of indicator kinds, including `Map` which feeds
//!   one indicator's output through a [`Transform`]
//! - `Transform`: vector-to-vector functions used for composition

pub mod composite;
pub mod ema;
pub mod parser;
pub mod roc;
pub mod sma;

use std::fmt;
use std::str::FromStr;

use crate::domain::error::ParseError;
use crate::domain::series::PriceSeries;

pub use composite::Transform;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSeries {
    values: Vec<Option<f64>>,
}

impl IndicatorSeries {
    pub fn from_values(values: Vec<Option<f64>>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`; `None` when undefined or out of range.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

impl FromIterator<Option<f64>> for IndicatorSeries {
    fn from_iter<I: IntoIterator<Item = Option<f64>>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Indicator {
    Sma(usize),
    Ema(usize),
    Roc(usize),
    Map {
        base: Box<Indicator>,
        transform: Transform,
    },
}

impl Indicator {
    pub fn compute(&self, series: &PriceSeries) -> IndicatorSeries {
        match self {
            Indicator::Sma(period) => sma::calculate_sma(&series.closes(), *period),
            Indicator::Ema(period) => ema::calculate_ema(&series.closes(), *period),
            Indicator::Roc(lookback) => {
                let closes: Vec<Option<f64>> = series.closes().into_iter().map(Some).collect();
                roc::calculate_roc(&closes, *lookback)
            }
            Indicator::Map { base, transform } => transform.apply(&base.compute(series)),
        }
    }

    /// Feed this indicator's output through `transform`.
    pub fn map(self, transform: Transform) -> Self {
        Indicator::Map {
            base: Box::new(self),
            transform,
        }
    }

    /// Rate of change of this indicator's output.
    pub fn roc_of(self, lookback: usize) -> Self {
        self.map(Transform::Roc(lookback))
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Indicator::Sma(period) => write!(f, "SMA({})", period),
            Indicator::Ema(period) => write!(f, "EMA({})", period),
            Indicator::Roc(lookback) => write!(f, "ROC({})", lookback),
            Indicator::Map { base, transform } => match transform {
                Transform::Roc(lookback) => write!(f, "ROC({}, {})", lookback, base),
                Transform::Custom { label, .. } => write!(f, "{}({})", label, base),
            },
        }
    }
}

impl FromStr for Indicator {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parser::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::Bar;

    fn make_series(prices: &[f64]) -> PriceSeries {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: 20240101 + i as u32,
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn display_simple() {
        assert_eq!(Indicator::Sma(20).to_string(), "SMA(20)");
        assert_eq!(Indicator::Ema(10).to_string(), "EMA(10)");
        assert_eq!(Indicator::Roc(5).to_string(), "ROC(5)");
    }

    #[test]
    fn display_composed() {
        let ind = Indicator::Sma(10).roc_of(5);
        assert_eq!(ind.to_string(), "ROC(5, SMA(10))");
    }

    #[test]
    fn output_is_aligned_for_every_kind() {
        let series = make_series(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        for ind in [
            Indicator::Sma(3),
            Indicator::Ema(3),
            Indicator::Roc(2),
            Indicator::Sma(2).roc_of(2),
            Indicator::Sma(50),
        ] {
            assert_eq!(ind.compute(&series).len(), series.len(), "{}", ind);
        }
    }

    #[test]
    fn roc_of_sma_matches_manual_composition() {
        let series = make_series(&[10.0, 11.0, 12.0, 14.0, 13.0, 15.0, 16.0]);
        let composed = Indicator::Sma(2).roc_of(2).compute(&series);

        let sma = Indicator::Sma(2).compute(&series);
        let manual = roc::calculate_roc(sma.values(), 2);
        assert_eq!(composed, manual);

        // SMA(2) is defined from index 1, so ROC(2) of it from index 3.
        assert_eq!(composed.get(2), None);
        assert!(composed.get(3).is_some());
    }

    #[test]
    fn compute_is_pure() {
        let series = make_series(&[3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0]);
        let ind = Indicator::Ema(3).roc_of(1);
        assert_eq!(ind.compute(&series), ind.compute(&series));
    }

    #[test]
    fn series_accessors() {
        let s = IndicatorSeries::from_values(vec![None, Some(1.0), None, Some(2.0)]);
        assert_eq!(s.len(), 4);
        assert_eq!(s.get(0), None);
        assert_eq!(s.get(1), Some(1.0));
        assert_eq!(s.get(10), None);
        assert_eq!(s.defined_count(), 2);
    }

    #[test]
    fn parse_from_str() {
        let ind: Indicator = "ROC(3, EMA(12))".parse().unwrap();
        assert_eq!(ind, Indicator::Ema(12).roc_of(3));
    }
}
