#![allow(dead_code)]

use chrono::{Datelike, NaiveDate};
pub use sweeptrader::domain::backtest::BacktestResult;
use sweeptrader::domain::error::TraderError;
pub use sweeptrader::domain::ohlcv::{date_key, Bar, DateKey};
pub use sweeptrader::domain::series::PriceSeries;
use sweeptrader::domain::strategy::Strategy;
use sweeptrader::domain::sweep::{SweepGrid, SweepOutcome};
use sweeptrader::ports::data_port::DataPort;
use sweeptrader::ports::report_port::ReportPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, TraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TraderError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, TraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

#[derive(Default)]
pub struct MockReportPort {
    pub backtests: Vec<(String, String, BacktestResult)>,
    pub sweeps: Vec<(String, usize, SweepOutcome)>,
}

impl ReportPort for MockReportPort {
    fn write_backtest(
        &mut self,
        symbol: &str,
        strategy: &Strategy,
        result: &BacktestResult,
    ) -> Result<(), TraderError> {
        self.backtests
            .push((symbol.to_string(), strategy.to_string(), *result));
        Ok(())
    }

    fn write_sweep(
        &mut self,
        symbol: &str,
        grid: &SweepGrid,
        outcome: &SweepOutcome,
    ) -> Result<(), TraderError> {
        self.sweeps
            .push((symbol.to_string(), grid.effective_size(), outcome.clone()));
        Ok(())
    }
}

pub fn day(offset: usize) -> DateKey {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let d = start + chrono::Duration::days(offset as i64);
    date_key(d.year() as u32, d.month(), d.day())
}

pub fn make_bar(offset: usize, close: f64) -> Bar {
    Bar {
        date: day(offset),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000.0,
    }
}

pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i, c))
        .collect()
}

pub fn series_from_closes(closes: &[f64]) -> PriceSeries {
    PriceSeries::new(bars_from_closes(closes))
}

/// Trending series with two superimposed cycles, enough to produce crossings
/// for a range of periods.
pub fn wave_closes(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| {
            let x = i as f64;
            100.0 + 12.0 * (x / 9.0).sin() + 5.0 * (x / 3.5).cos() + 0.1 * x
        })
        .collect()
}

pub fn wave_series(count: usize) -> PriceSeries {
    series_from_closes(&wave_closes(count))
}

pub fn write_csv(dir: &std::path::Path, symbol: &str, bars: &[Bar]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date, b.open, b.high, b.low, b.close, b.volume
        ));
    }
    std::fs::write(dir.join(format!("{}.csv", symbol)), content).unwrap();
}
