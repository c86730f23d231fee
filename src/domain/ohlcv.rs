//! OHLCV bar representation.

/// Calendar date packed as `YYYYMMDD`; integer order is chronological order.
pub type DateKey = u32;

/// Pack a calendar date into a [`DateKey`].
pub fn date_key(year: u32, month: u32, day: u32) -> DateKey {
    year * 10_000 + month * 100 + day
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub date: DateKey,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}
