//! In-memory candle source for fixtures and replay.

use std::collections::HashMap;

use super::provider::{CandleSource, DataError};
use crate::domain::Bar;

#[derive(Debug, Clone, Default)]
pub struct MemoryCandles {
    series: HashMap<(String, String), Vec<Bar>>,
}

impl MemoryCandles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: &str, interval: &str, bars: Vec<Bar>) {
        self.series
            .insert((symbol.to_string(), interval.to_string()), bars);
    }

    pub fn with(mut self, symbol: &str, interval: &str, bars: Vec<Bar>) -> Self {
        self.insert(symbol, interval, bars);
        self
    }
}

impl CandleSource for MemoryCandles {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch(&self, symbol: &str, interval: &str, count: usize) -> Result<Vec<Bar>, DataError> {
        let bars = self
            .series
            .get(&(symbol.to_string(), interval.to_string()))
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
        let start = bars.len().saturating_sub(count);
        Ok(bars[start..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::bar;

    #[test]
    fn returns_most_recent_bars() {
        let bars: Vec<Bar> = (0..10).map(|i| bar(i, 1.0, 2.0, 0.5, 1.5)).collect();
        let source = MemoryCandles::new().with("BTCUSDT", "1h", bars.clone());
        let got = source.fetch("BTCUSDT", "1h", 3).unwrap();
        assert_eq!(got, bars[7..].to_vec());
        assert_eq!(source.fetch("BTCUSDT", "1h", 100).unwrap().len(), 10);
    }

    #[test]
    fn unknown_symbol_is_an_error() {
        let source = MemoryCandles::new();
        assert!(matches!(
            source.fetch("NOPE", "1h", 10),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn fetch_normalized_sorts_and_dedups() {
        let bars = vec![
            bar(2, 1.0, 2.0, 0.5, 1.5),
            bar(0, 1.0, 2.0, 0.5, 1.5),
            bar(2, 9.0, 9.0, 9.0, 9.0),
        ];
        let source = MemoryCandles::new().with("X", "1h", bars);
        let got = source.fetch_normalized("X", "1h", 10).unwrap();
        assert_eq!(got.len(), 2);
        assert!(got[0].timestamp < got[1].timestamp);
        assert_eq!(got[1].open, 1.0);
    }
}
