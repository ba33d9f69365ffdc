//! Bar: the fundamental market data unit.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// OHLC candle for a single instrument and interval.
///
/// `timestamp` is the bar's open time. Series handed to the structure
/// pipeline must be strictly ascending; use [`normalize_bars`] on anything
/// that comes from an external supplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
        }
    }

    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }

    /// Green candle: close above open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Red candle: close below open.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// The open of this bar as a standalone price event.
    pub fn open_event(&self) -> BarOpen {
        BarOpen {
            timestamp: self.timestamp,
            price: self.open,
        }
    }
}

/// The opening print of a bar that has not closed yet.
///
/// The incremental driver only ever sees the open of the live bar; the batch
/// driver builds the same value from the next bar in the series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarOpen {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

/// Sort by timestamp and collapse duplicate timestamps to their first occurrence.
///
/// The sort is stable, so "first" means first in the supplier's order.
pub fn normalize_bars(mut bars: Vec<Bar>) -> Vec<Bar> {
    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);
    bars
}

/// Index of the bar whose timestamp equals `ts`, if any.
pub fn index_of(bars: &[Bar], ts: DateTime<Utc>) -> Option<usize> {
    bars.binary_search_by_key(&ts, |b| b.timestamp).ok()
}

/// Index of the last bar with timestamp <= `ts`.
pub fn last_index_at_or_before(bars: &[Bar], ts: DateTime<Utc>) -> Option<usize> {
    let upper = bars.partition_point(|b| b.timestamp <= ts);
    upper.checked_sub(1)
}

/// Parse an exchange-style interval ("15m", "1h", "4h", "1d", "1w").
pub fn parse_interval(interval: &str) -> Option<Duration> {
    let interval = interval.trim();
    let split = interval.find(|c: char| !c.is_ascii_digit())?;
    let (count, unit) = interval.split_at(split);
    let count: i64 = count.parse().ok().filter(|n| *n > 0)?;
    match unit {
        "m" => Some(Duration::minutes(count)),
        "h" => Some(Duration::hours(count)),
        "d" => Some(Duration::days(count)),
        "w" => Some(Duration::weeks(count)),
        _ => None,
    }
}
