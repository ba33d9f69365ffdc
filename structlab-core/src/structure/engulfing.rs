//! Body-based engulfing candles.
//!
//! Bullish: a red candle followed by a green one whose body fully covers it.
//! Bearish mirrors this. Wicks are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Engulfing {
    /// Timestamp of the engulfing (second) candle.
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    /// Buy for bullish engulfing, Sell for bearish.
    pub direction: Direction,
}

pub fn detect_engulfings(bars: &[Bar]) -> Vec<Engulfing> {
    bars.windows(2)
        .filter_map(|w| {
            let (first, second) = (&w[0], &w[1]);
            let direction = if first.is_bearish()
                && second.is_bullish()
                && second.open <= first.close
                && second.close >= first.open
            {
                Direction::Buy
            } else if first.is_bullish()
                && second.is_bearish()
                && second.open >= first.close
                && second.close <= first.open
            {
                Direction::Sell
            } else {
                return None;
            };
            Some(Engulfing {
                timestamp: second.timestamp,
                close: second.close,
                direction,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::bar;

    #[test]
    fn bullish_engulfing() {
        let bars = vec![bar(0, 10.0, 10.5, 8.5, 9.0), bar(1, 8.8, 10.8, 8.7, 10.4)];
        let found = detect_engulfings(&bars);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].direction, Direction::Buy);
        assert_eq!(found[0].timestamp, bars[1].timestamp);
    }

    #[test]
    fn bearish_engulfing() {
        let bars = vec![bar(0, 9.0, 10.2, 8.8, 10.0), bar(1, 10.1, 10.3, 8.5, 8.9)];
        let found = detect_engulfings(&bars);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].direction, Direction::Sell);
    }

    #[test]
    fn same_colour_is_not_engulfing() {
        let bars = vec![bar(0, 9.0, 10.2, 8.8, 10.0), bar(1, 8.5, 11.0, 8.4, 10.5)];
        assert!(detect_engulfings(&bars).is_empty());
    }

    #[test]
    fn partial_cover_is_not_engulfing() {
        // Second body opens below first close but does not reach first open.
        let bars = vec![bar(0, 10.0, 10.5, 8.5, 9.0), bar(1, 8.8, 9.9, 8.7, 9.8)];
        assert!(detect_engulfings(&bars).is_empty());
    }
}
