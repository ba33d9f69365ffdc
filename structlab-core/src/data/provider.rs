//! Candle source trait and structured error types.
//!
//! The CandleSource trait abstracts over market-data suppliers (exchange
//! REST, CSV export, in-memory fixtures) so the pipeline can be fed and
//! mocked without knowing where bars come from.

use thiserror::Error;

use crate::domain::{normalize_bars, Bar};

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no {interval} data for '{symbol}'")]
    NoData { symbol: String, interval: String },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed row {row} in {path}: {reason}")]
    Malformed { path: String, row: usize, reason: String },

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Supplier of OHLC bars for an instrument at a given interval.
///
/// Implementations return at most `count` of the most recent bars. Order and
/// uniqueness are not trusted; callers go through [`CandleSource::fetch_normalized`].
pub trait CandleSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    fn fetch(&self, symbol: &str, interval: &str, count: usize) -> Result<Vec<Bar>, DataError>;

    /// Fetch, then sort and drop duplicate timestamps.
    fn fetch_normalized(
        &self,
        symbol: &str,
        interval: &str,
        count: usize,
    ) -> Result<Vec<Bar>, DataError> {
        self.fetch(symbol, interval, count).map(normalize_bars)
    }
}

impl<T: CandleSource + ?Sized> CandleSource for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(&self, symbol: &str, interval: &str, count: usize) -> Result<Vec<Bar>, DataError> {
        (**self).fetch(symbol, interval, count)
    }
}
