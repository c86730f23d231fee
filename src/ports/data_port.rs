//! Price data access port trait.

use crate::domain::error::TraderError;
use crate::domain::ohlcv::{Bar, DateKey};

pub trait DataPort {
    /// Bars for `symbol` in source order. Implementations do not re-sort.
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, TraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, TraderError>;

    /// First date, last date and bar count, or `None` when the symbol has no bars.
    fn get_data_range(&self, symbol: &str) -> Result<Option<(DateKey, DateKey, usize)>, TraderError> {
        let bars = self.fetch_bars(symbol)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}
