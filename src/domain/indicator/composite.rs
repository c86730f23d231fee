//! Indicator composition.
//!
//! A [`Transform`] maps one aligned value vector to another. Wrapping an
//! indicator in `Indicator::Map { base, transform }` expresses combinations
//! such as "ROC of an SMA" as data instead of new indicator kinds.

use std::fmt;
use std::sync::Arc;

use crate::domain::indicator::{roc, IndicatorSeries};

pub type TransformFn = dyn Fn(&IndicatorSeries) -> IndicatorSeries + Send + Sync;

#[derive(Clone)]
pub enum Transform {
    /// Rate of change over the base output.
    Roc(usize),
    /// Caller-supplied function. Must return a series of the same length.
    Custom { label: String, f: Arc<TransformFn> },
}

impl Transform {
    pub fn custom<F>(label: impl Into<String>, f: F) -> Self
    where
        F: Fn(&IndicatorSeries) -> IndicatorSeries + Send + Sync + 'static,
    {
        Transform::Custom {
            label: label.into(),
            f: Arc::new(f),
        }
    }

    pub fn apply(&self, input: &IndicatorSeries) -> IndicatorSeries {
        match self {
            Transform::Roc(lookback) => roc::calculate_roc(input.values(), *lookback),
            Transform::Custom { f, .. } => {
                let out = f(input);
                debug_assert_eq!(out.len(), input.len(), "transform changed series length");
                out
            }
        }
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Roc(lookback) => f.debug_tuple("Roc").field(lookback).finish(),
            Transform::Custom { label, .. } => {
                f.debug_struct("Custom").field("label", label).finish_non_exhaustive()
            }
        }
    }
}

impl PartialEq for Transform {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Transform::Roc(a), Transform::Roc(b)) => a == b,
            (Transform::Custom { label: la, f: fa }, Transform::Custom { label: lb, f: fb }) => {
                la == lb && Arc::ptr_eq(fa, fb)
            }
            _ => false,
        }
    }
}
