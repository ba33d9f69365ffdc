//! CSV-backed candle source and tick table for the runner.
//!
//! Candles live in `{data_dir}/{SYMBOL}_{interval}.csv` with a header row
//! containing at least `timestamp,open,high,low,close`. Extra columns
//! (volume, trades, ...) are ignored. Timestamps may be epoch milliseconds,
//! RFC 3339, or `YYYY-MM-DD HH:MM:SS` in UTC.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::warn;

use structlab_core::data::{CandleSource, DataError};
use structlab_core::domain::Bar;
use structlab_core::risk::TickSizeSource;

#[derive(Debug, Deserialize)]
struct CandleRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

/// Reads candle exports from a directory, one file per symbol and interval.
#[derive(Debug, Clone)]
pub struct CsvCandleSource {
    dir: PathBuf,
}

impl CsvCandleSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str, interval: &str) -> PathBuf {
        self.dir.join(format!("{symbol}_{interval}.csv"))
    }
}

impl CandleSource for CsvCandleSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, symbol: &str, interval: &str, count: usize) -> Result<Vec<Bar>, DataError> {
        let path = self.path_for(symbol, interval);
        if !path.exists() {
            return Err(DataError::NoData {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
            });
        }
        let mut bars = read_candles(&path)?;
        let start = bars.len().saturating_sub(count);
        Ok(bars.split_off(start))
    }
}

/// Parse a whole candle file. Rows that fail the OHLC sanity check are
/// dropped with a warning; rows that cannot be parsed are an error.
pub fn read_candles(path: &Path) -> Result<Vec<Bar>, DataError> {
    let display = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| csv_error(&display, 0, e))?;

    let mut bars = Vec::new();
    let mut dropped = 0usize;
    for (i, record) in reader.deserialize::<CandleRow>().enumerate() {
        let row = i + 1;
        let record = record.map_err(|e| csv_error(&display, row, e))?;
        let timestamp =
            parse_timestamp(&record.timestamp).ok_or_else(|| DataError::Malformed {
                path: display.clone(),
                row,
                reason: format!("unrecognised timestamp '{}'", record.timestamp),
            })?;
        let bar = Bar::new(timestamp, record.open, record.high, record.low, record.close);
        if bar.is_sane() {
            bars.push(bar);
        } else {
            dropped += 1;
        }
    }
    if dropped > 0 {
        warn!(path = %path.display(), dropped, "dropped bars failing OHLC sanity check");
    }
    Ok(bars)
}

fn csv_error(path: &str, row: usize, error: csv::Error) -> DataError {
    if error.is_io_error() {
        if let csv::ErrorKind::Io(source) = error.into_kind() {
            return DataError::Io {
                path: path.to_string(),
                source,
            };
        }
        return DataError::Other(format!("I/O error reading {path}"));
    }
    DataError::Malformed {
        path: path.to_string(),
        row,
        reason: error.to_string(),
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(millis) = raw.parse::<i64>() {
        return Utc.timestamp_millis_opt(millis).single();
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Deterministic BLAKE3 hash over every bar, in sorted symbol order.
pub fn dataset_hash<'a>(series: impl IntoIterator<Item = (&'a str, &'a [Bar])>) -> String {
    let mut sorted: Vec<(&str, &[Bar])> = series.into_iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut hasher = blake3::Hasher::new();
    for (symbol, bars) in sorted {
        hasher.update(symbol.as_bytes());
        for bar in bars {
            hasher.update(&bar.timestamp.timestamp_millis().to_le_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

/// Fixed tick sizes from a TOML table:
///
/// ```toml
/// [ticks]
/// BTCUSDT = 0.1
/// ETHUSDT = 0.01
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StaticTickTable {
    #[serde(default)]
    ticks: HashMap<String, f64>,
}

impl StaticTickTable {
    pub fn load(path: &Path) -> Result<Self, DataError> {
        let contents = std::fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents).map_err(|reason| DataError::Malformed {
            path: path.display().to_string(),
            row: 0,
            reason,
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| e.to_string())
    }

    pub fn insert(&mut self, symbol: &str, tick: f64) {
        self.ticks.insert(symbol.to_string(), tick);
    }
}

impl TickSizeSource for StaticTickTable {
    fn tick_size(&self, symbol: &str) -> Result<Option<f64>, DataError> {
        Ok(self.ticks.get(symbol).copied())
    }
}
