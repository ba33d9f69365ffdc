//! Swing point detection.
//!
//! A bar is a swing high when its high is strictly above the highs of the
//! `lookback` bars on each side; swing lows mirror this on the low field.
//! The first and last `lookback` bars can never qualify.

use crate::domain::{Bar, SwingKind, SwingPoint, SwingSeries};

#[derive(Debug, Clone, Copy)]
pub struct SwingDetector {
    lookback: usize,
}

impl SwingDetector {
    pub fn new(lookback: usize) -> Self {
        assert!(lookback >= 1, "swing lookback must be >= 1");
        Self { lookback }
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Bars needed before the first swing can be confirmed.
    pub fn warmup_bars(&self) -> usize {
        2 * self.lookback + 1
    }

    pub fn detect(&self, bars: &[Bar]) -> SwingSeries {
        let l = self.lookback;
        let mut series = SwingSeries::default();
        if bars.len() < self.warmup_bars() {
            return series;
        }

        for i in l..bars.len() - l {
            let window = &bars[i - l..=i + l];
            if is_swing_high(window, l) {
                series.highs.push(SwingPoint {
                    timestamp: bars[i].timestamp,
                    price: bars[i].high,
                    kind: SwingKind::High,
                });
            }
            if is_swing_low(window, l) {
                series.lows.push(SwingPoint {
                    timestamp: bars[i].timestamp,
                    price: bars[i].low,
                    kind: SwingKind::Low,
                });
            }
        }
        series
    }
}

/// `window` is 2L+1 bars centred on `centre`.
pub(crate) fn is_swing_high(window: &[Bar], centre: usize) -> bool {
    let pivot = window[centre].high;
    window
        .iter()
        .enumerate()
        .all(|(j, b)| j == centre || pivot > b.high)
}

pub(crate) fn is_swing_low(window: &[Bar], centre: usize) -> bool {
    let pivot = window[centre].low;
    window
        .iter()
        .enumerate()
        .all(|(j, b)| j == centre || pivot < b.low)
}

/// Convenience wrapper around [`SwingDetector::detect`].
pub fn detect_swings(bars: &[Bar], lookback: usize) -> SwingSeries {
    SwingDetector::new(lookback).detect(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::bars_from_hl;

    #[test]
    fn finds_simple_peak_and_trough() {
        // highs:  1 2 5 2 1 2 3
        // lows:   0 1 4 1 0 1 2
        let bars = bars_from_hl(&[
            (1.0, 0.0),
            (2.0, 1.0),
            (5.0, 4.0),
            (2.0, 1.0),
            (1.0, 0.0),
            (2.0, 1.0),
            (3.0, 2.0),
        ]);
        let swings = detect_swings(&bars, 2);
        assert_eq!(swings.highs.len(), 1);
        assert_eq!(swings.highs[0].price, 5.0);
        assert_eq!(swings.highs[0].timestamp, bars[2].timestamp);
        assert_eq!(swings.lows.len(), 1);
        assert_eq!(swings.lows[0].price, 0.0);
        assert_eq!(swings.lows[0].timestamp, bars[4].timestamp);
    }

    #[test]
    fn equal_neighbour_is_not_a_swing() {
        let bars = bars_from_hl(&[(1.0, 0.5), (5.0, 0.6), (5.0, 0.7), (1.0, 0.8), (1.0, 0.9)]);
        let swings = detect_swings(&bars, 1);
        assert!(swings.highs.is_empty());
    }

    #[test]
    fn edges_never_flagged() {
        // Highest high on the first bar, lowest low on the last.
        let bars = bars_from_hl(&[(9.0, 5.0), (3.0, 2.0), (4.0, 3.0), (3.0, 2.0), (2.0, 1.0)]);
        let swings = detect_swings(&bars, 1);
        assert!(swings.highs.iter().all(|p| p.timestamp != bars[0].timestamp));
        assert!(swings.lows.iter().all(|p| p.timestamp != bars[4].timestamp));
        assert_eq!(swings.highs.len(), 1);
        assert_eq!(swings.highs[0].price, 4.0);
    }

    #[test]
    fn too_short_series_is_empty() {
        let bars = bars_from_hl(&[(1.0, 0.0), (2.0, 1.0), (1.0, 0.0)]);
        assert!(detect_swings(&bars, 2).is_empty());
    }

    #[test]
    #[should_panic(expected = "lookback must be >= 1")]
    fn zero_lookback_panics() {
        SwingDetector::new(0);
    }
}
