//! Streaming swing + trend tracker.
//!
//! Holds the last 2L+1 bars and the two classifier scalars. Pushing a bar
//! confirms (or rejects) the swing candidate L bars back, so over a
//! normalized series it emits exactly the trend points that
//! [`detect_swings`](super::detect_swings) + [`classify_trend`](super::classify_trend)
//! produce, without re-scanning history on every new bar.

use std::collections::VecDeque;

use crate::domain::{Bar, SwingKind, SwingPoint, TrendPoint};

use super::swing::{is_swing_high, is_swing_low};
use super::trend::TrendClassifier;

#[derive(Debug, Clone)]
pub struct StructureTracker {
    lookback: usize,
    window: VecDeque<Bar>,
    classifier: TrendClassifier,
    last_high: Option<SwingPoint>,
    last_low: Option<SwingPoint>,
    last_point: Option<TrendPoint>,
}

impl StructureTracker {
    pub fn new(lookback: usize) -> Self {
        assert!(lookback >= 1, "swing lookback must be >= 1");
        Self {
            lookback,
            window: VecDeque::with_capacity(2 * lookback + 1),
            classifier: TrendClassifier::new(),
            last_high: None,
            last_low: None,
            last_point: None,
        }
    }

    /// Feed the next closed bar. Returns the trend points it confirmed
    /// (high before low when one bar is both).
    ///
    /// Bars at or before the previous timestamp are ignored.
    pub fn push(&mut self, bar: Bar) -> Vec<TrendPoint> {
        if let Some(prev) = self.window.back() {
            if bar.timestamp <= prev.timestamp {
                return Vec::new();
            }
        }

        let size = 2 * self.lookback + 1;
        self.window.push_back(bar);
        if self.window.len() > size {
            self.window.pop_front();
        }
        if self.window.len() < size {
            return Vec::new();
        }

        let window = self.window.make_contiguous();
        let centre = window[self.lookback];
        let mut confirmed = Vec::with_capacity(2);

        if is_swing_high(window, self.lookback) {
            let swing = SwingPoint {
                timestamp: centre.timestamp,
                price: centre.high,
                kind: SwingKind::High,
            };
            self.last_high = Some(swing);
            confirmed.push(self.classifier.push(&swing));
        }
        if is_swing_low(window, self.lookback) {
            let swing = SwingPoint {
                timestamp: centre.timestamp,
                price: centre.low,
                kind: SwingKind::Low,
            };
            self.last_low = Some(swing);
            confirmed.push(self.classifier.push(&swing));
        }

        if let Some(last) = confirmed.last() {
            self.last_point = Some(*last);
        }
        confirmed
    }

    /// Latest confirmed trend point.
    pub fn last_point(&self) -> Option<&TrendPoint> {
        self.last_point.as_ref()
    }

    pub fn last_swing(&self, kind: SwingKind) -> Option<&SwingPoint> {
        match kind {
            SwingKind::High => self.last_high.as_ref(),
            SwingKind::Low => self.last_low.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{classify_trend, detect_swings};
    use crate::test_support::zigzag_bars;

    #[test]
    fn matches_batch_pipeline() {
        let bars = zigzag_bars(200);
        let batch = classify_trend(&detect_swings(&bars, 3));

        let mut tracker = StructureTracker::new(3);
        let streamed: Vec<TrendPoint> = bars.iter().flat_map(|b| tracker.push(*b)).collect();

        assert!(!batch.is_empty());
        assert_eq!(batch, streamed);
        assert_eq!(tracker.last_point(), batch.last());
    }

    #[test]
    fn ignores_out_of_order_bars() {
        let bars = zigzag_bars(10);
        let mut tracker = StructureTracker::new(1);
        tracker.push(bars[5]);
        assert!(tracker.push(bars[2]).is_empty());
        assert_eq!(tracker.window.len(), 1);
    }
}
