//! CSV file data adapter.
//!
//! One file per symbol, `<base>/<SYMBOL>.csv`, columns by position:
//! date, open, high, low, close and an optional volume. A first row whose
//! date column mentions "date" or "time" is treated as a header. Rows that
//! cannot be parsed are skipped with a warning.

use crate::domain::error::TraderError;
use crate::domain::ohlcv::{date_key, Bar, DateKey};
use crate::ports::data_port::DataPort;
use chrono::{Datelike, NaiveDate};
use csv::StringRecord;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

const MIN_COLUMNS: usize = 5;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    /// Load bars from an arbitrary CSV file.
    pub fn load_file(path: &Path) -> Result<Vec<Bar>, TraderError> {
        let content = fs::read_to_string(path).map_err(|e| TraderError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        let bars = parse_bars(&content);
        debug!("loaded {} bars from {}", bars.len(), path.display());
        Ok(bars)
    }
}

fn looks_like_header(record: &StringRecord) -> bool {
    record.get(0).is_none_or(|first| {
        let first = first.to_lowercase();
        first.contains("date") || first.contains("time")
    })
}

/// Parse bar rows from CSV text, keeping source order.
pub fn parse_bars(content: &str) -> Vec<Bar> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut bars = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("row {}: unreadable CSV record: {}", row + 1, e);
                continue;
            }
        };
        if row == 0 && looks_like_header(&record) {
            continue;
        }
        if record.iter().all(str::is_empty) {
            continue;
        }
        match parse_record(&record) {
            Ok(bar) => bars.push(bar),
            Err(reason) => warn!("row {}: skipped, {}", row + 1, reason),
        }
    }
    bars
}

fn parse_record(record: &StringRecord) -> Result<Bar, String> {
    if record.len() < MIN_COLUMNS {
        return Err(format!(
            "expected at least {} columns, found {}",
            MIN_COLUMNS,
            record.len()
        ));
    }

    let date_str = &record[0];
    let date = parse_date_key(date_str).ok_or_else(|| format!("invalid date '{}'", date_str))?;

    let field = |idx: usize, name: &str| -> Result<f64, String> {
        let raw = &record[idx];
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("invalid {} value '{}'", name, raw))
    };

    let volume = match record.get(5) {
        Some(v) if !v.is_empty() => field(5, "volume")?,
        _ => 0.0,
    };

    Ok(Bar {
        date,
        open: field(1, "open")?,
        high: field(2, "high")?,
        low: field(3, "low")?,
        close: field(4, "close")?,
        volume,
    })
}

/// Parse `YYYYMMDD`, `YYYY-MM-DD`, `YYYY/MM/DD`, `MM/DD/YYYY` or an ISO-8601
/// date-time (only the date part is kept).
pub fn parse_date_key(s: &str) -> Option<DateKey> {
    let s = s.trim();
    let bytes = s.as_bytes();

    let date = if s.len() == 8 && bytes.iter().all(u8::is_ascii_digit) {
        NaiveDate::parse_from_str(s, "%Y%m%d").ok()?
    } else if s.len() == 10 && bytes[4] == b'-' && bytes[7] == b'-' {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?
    } else if s.len() == 10 && bytes[4] == b'/' && bytes[7] == b'/' {
        NaiveDate::parse_from_str(s, "%Y/%m/%d").ok()?
    } else if s.len() == 10 && bytes[2] == b'/' && bytes[5] == b'/' {
        NaiveDate::parse_from_str(s, "%m/%d/%Y").ok()?
    } else if s.len() >= 16 && bytes[4] == b'-' && bytes[7] == b'-' && bytes[10] == b'T' {
        NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok()?
    } else {
        return None;
    };

    Some(date_key(date.year().try_into().ok()?, date.month(), date.day()))
}

impl DataPort for CsvAdapter {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, TraderError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            return Err(TraderError::NoData {
                symbol: symbol.to_string(),
            });
        }
        Self::load_file(&path)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| TraderError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TraderError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,open,high,low,close,volume\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000\n";

        fs::write(path.join("BHP.csv"), csv_content).unwrap();
        fs::write(path.join("CBA.csv"), "date,open,high,low,close,volume\n").unwrap();
        fs::write(path.join("notes.txt"), "not price data").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_bars_returns_correct_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_bars("BHP").unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, 20240115);
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 50000.0);
    }

    #[test]
    fn fetch_bars_errors_for_missing_file() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let err = adapter.fetch_bars("XYZ").unwrap_err();
        assert!(matches!(err, TraderError::NoData { symbol } if symbol == "XYZ"));
    }

    #[test]
    fn list_symbols_returns_csv_stems() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert_eq!(adapter.list_symbols().unwrap(), vec!["BHP", "CBA"]);
    }

    #[test]
    fn data_range_reports_first_last_and_count() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert_eq!(
            adapter.get_data_range("BHP").unwrap(),
            Some((20240115, 20240117, 3))
        );
        assert_eq!(adapter.get_data_range("CBA").unwrap(), None);
    }

    #[test]
    fn parse_without_header_and_without_volume() {
        let bars = parse_bars("20240102,1,2,0.5,1.5\n20240103,1.5,2.5,1,2\n");
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, 20240102);
        assert_eq!(bars[0].volume, 0.0);
        assert_eq!(bars[1].close, 2.0);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let content = "Timestamp,Open,High,Low,Close,Volume\n\
            2024-01-02,1,2,0.5,1.5,10\n\
            2024-01-03,1,2\n\
            not-a-date,1,2,0.5,1.5,10\n\
            2024-01-05,1,two,0.5,1.5,10\n\
            \n\
            2024-01-08,1,2,0.5,1.75,10\n\
            2024-01-09,1,1,1,NaN\n\
            2024-01-10,1,inf,1,1\n\
            2024-01-11,1,1,1,1,-infinity\n\
            2024-01-12,1,2,0.5,1.8\n";
        let bars = parse_bars(content);
        let dates: Vec<DateKey> = bars.iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![20240102, 20240108, 20240112]);
        assert!(bars.iter().all(|b| b.close.is_finite() && b.volume.is_finite()));
    }

    #[test]
    fn quoted_fields_and_crlf_are_handled() {
        let content = "\"Date\",\"Open\",\"High\",\"Low\",\"Close\"\r\n\"2024/03/01\",\"10\",\"11\",\"9\",\"10.5\"\r\n";
        let bars = parse_bars(content);
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, 20240301);
        assert_eq!(bars[0].close, 10.5);
    }

    #[test]
    fn rows_are_not_resorted() {
        let bars = parse_bars("20240105,1,1,1,1\n20240101,2,2,2,2\n");
        assert_eq!(bars[0].date, 20240105);
        assert_eq!(bars[1].date, 20240101);
    }

    #[test]
    fn date_formats() {
        assert_eq!(parse_date_key("20240131"), Some(20240131));
        assert_eq!(parse_date_key("2024-01-31"), Some(20240131));
        assert_eq!(parse_date_key("2024/01/31"), Some(20240131));
        assert_eq!(parse_date_key("01/31/2024"), Some(20240131));
        assert_eq!(parse_date_key("2024-01-31T23:59:00Z"), Some(20240131));
        assert_eq!(parse_date_key("2024-01-31T09:30"), Some(20240131));
        assert_eq!(parse_date_key("2024-01-31T09:30:00+10:00"), Some(20240131));
    }

    #[test]
    fn invalid_dates_are_rejected() {
        assert_eq!(parse_date_key(""), None);
        assert_eq!(parse_date_key("2024-13-01"), None);
        assert_eq!(parse_date_key("2024-02-30"), None);
        assert_eq!(parse_date_key("31/01/2024"), None);
        assert_eq!(parse_date_key("2024-01-31 09:30"), None);
        assert_eq!(parse_date_key("yesterday"), None);
    }
}
