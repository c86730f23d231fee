//! Core domain types and logic.

pub mod ohlcv;
pub mod series;
pub mod indicator;
pub mod backtest;
pub mod strategy;
pub mod sweep;
pub mod config_validation;
pub mod error;
