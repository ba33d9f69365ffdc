//! Break of structure (BoS) and retest detection.
//!
//! A bullish break is a close crossing above the most recent prior swing
//! high (plus a small buffer); a bearish break mirrors this on the swing low.
//! A break only becomes a signal once price comes back to retest the broken
//! level within a short window and closes on the right side of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{dedup_by_timestamp, Bar, Direction, Signal, SwingPoint, SwingSeries};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BosParams {
    /// Close must clear the level by this fraction to count as a break.
    pub breach_buffer_pct: f64,
    /// How many bars after the break to look for a retest.
    pub retest_window_bars: usize,
    /// Width of the retest zone around the broken level, as a fraction.
    pub retest_zone_pct: f64,
}

impl Default for BosParams {
    fn default() -> Self {
        Self {
            breach_buffer_pct: 0.0005,
            retest_window_bars: 3,
            retest_zone_pct: 0.0015,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BosEvent {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub broken_level: f64,
    pub close: f64,
}

/// Most recent swing strictly before `ts`. `points` must be time-ordered.
fn last_prior(points: &[SwingPoint], ts: DateTime<Utc>) -> Option<f64> {
    let idx = points.partition_point(|p| p.timestamp < ts);
    idx.checked_sub(1).map(|i| points[i].price)
}

pub fn detect_bos_events(bars: &[Bar], swings: &SwingSeries, breach_buffer_pct: f64) -> Vec<BosEvent> {
    let mut events = Vec::new();

    for i in 1..bars.len() {
        let bar = &bars[i];
        let close_prev = bars[i - 1].close;

        if let Some(level) = last_prior(&swings.highs, bar.timestamp) {
            let threshold = level * (1.0 + breach_buffer_pct);
            if close_prev <= threshold && bar.close > threshold {
                events.push(BosEvent {
                    index: i,
                    timestamp: bar.timestamp,
                    direction: Direction::Buy,
                    broken_level: level,
                    close: bar.close,
                });
            }
        }

        if let Some(level) = last_prior(&swings.lows, bar.timestamp) {
            let threshold = level * (1.0 - breach_buffer_pct);
            if close_prev >= threshold && bar.close < threshold {
                events.push(BosEvent {
                    index: i,
                    timestamp: bar.timestamp,
                    direction: Direction::Sell,
                    broken_level: level,
                    close: bar.close,
                });
            }
        }
    }

    events
}

/// First bar within the retest window that tests the broken level and
/// closes back on the break side.
fn find_retest(bars: &[Bar], event: &BosEvent, params: &BosParams) -> Option<Signal> {
    let start = event.index + 1;
    let end = bars.len().min(start + params.retest_window_bars);
    let level = event.broken_level;

    bars.get(start..end)?.iter().find_map(|b| {
        let qualifies = match event.direction {
            Direction::Buy => b.low <= level * (1.0 + params.retest_zone_pct) && b.close >= level,
            Direction::Sell => b.high >= level * (1.0 - params.retest_zone_pct) && b.close <= level,
        };
        qualifies.then_some(Signal {
            timestamp: b.timestamp,
            reference_price: b.close,
            direction: event.direction,
        })
    })
}

pub fn bos_retest_signals(bars: &[Bar], swings: &SwingSeries, params: &BosParams) -> Vec<Signal> {
    let signals: Vec<Signal> = detect_bos_events(bars, swings, params.breach_buffer_pct)
        .iter()
        .filter_map(|ev| find_retest(bars, ev, params))
        .collect();

    let mut signals = dedup_by_timestamp(signals);
    signals.sort_by_key(|s| s.timestamp);
    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SwingKind;
    use crate::test_support::{bar, ts};

    fn swing_high(i: i64, price: f64) -> SwingPoint {
        SwingPoint { timestamp: ts(i), price, kind: SwingKind::High }
    }

    fn swing_low(i: i64, price: f64) -> SwingPoint {
        SwingPoint { timestamp: ts(i), price, kind: SwingKind::Low }
    }

    fn no_buffer() -> BosParams {
        BosParams {
            breach_buffer_pct: 0.0,
            retest_window_bars: 3,
            retest_zone_pct: 0.01,
        }
    }

    #[test]
    fn bullish_break_requires_cross() {
        let bars = vec![
            bar(0, 98.0, 99.0, 97.0, 98.0),
            bar(1, 98.0, 100.0, 97.0, 99.0),
            bar(2, 99.0, 102.0, 98.0, 101.0), // cross above 100
            bar(3, 101.0, 103.0, 100.5, 102.0), // already above, no new event
        ];
        let swings = SwingSeries { highs: vec![swing_high(0, 100.0)], lows: vec![] };
        let events = detect_bos_events(&bars, &swings, 0.0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].index, 2);
        assert_eq!(events[0].direction, Direction::Buy);
        assert_eq!(events[0].broken_level, 100.0);
    }

    #[test]
    fn swing_on_same_bar_is_not_prior() {
        let bars = vec![bar(0, 98.0, 99.0, 97.0, 98.0), bar(1, 99.0, 102.0, 98.0, 101.0)];
        let swings = SwingSeries { highs: vec![swing_high(1, 100.0)], lows: vec![] };
        assert!(detect_bos_events(&bars, &swings, 0.0).is_empty());
    }

    #[test]
    fn buy_retest_signal_at_retest_bar() {
        let bars = vec![
            bar(0, 98.0, 99.0, 97.0, 98.0),
            bar(1, 99.0, 102.0, 98.0, 101.0), // break
            bar(2, 101.0, 104.0, 102.0, 103.0), // low 102 > zone 101, no retest
            bar(3, 103.0, 103.5, 100.5, 100.8), // low in zone, close >= 100
        ];
        let swings = SwingSeries { highs: vec![swing_high(0, 100.0)], lows: vec![] };
        let signals = bos_retest_signals(&bars, &swings, &no_buffer());
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].timestamp, ts(3));
        assert_eq!(signals[0].reference_price, 100.8);
        assert_eq!(signals[0].direction, Direction::Buy);
    }

    #[test]
    fn sell_retest_mirrors() {
        let bars = vec![
            bar(0, 52.0, 53.0, 51.0, 52.0),
            bar(1, 51.0, 51.5, 48.0, 49.0), // close below 50
            bar(2, 49.0, 49.8, 48.5, 49.5), // high within zone (>= 49.5), close <= 50
        ];
        let swings = SwingSeries { highs: vec![], lows: vec![swing_low(0, 50.0)] };
        let signals = bos_retest_signals(&bars, &swings, &no_buffer());
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].direction, Direction::Sell);
        assert_eq!(signals[0].timestamp, ts(2));
    }

    #[test]
    fn no_retest_within_window_means_no_signal() {
        let mut bars = vec![
            bar(0, 98.0, 99.0, 97.0, 98.0),
            bar(1, 99.0, 102.0, 98.0, 101.0),
        ];
        // Price runs away for three bars, then retests on the fourth (too late).
        bars.push(bar(2, 102.0, 106.0, 102.0, 105.0));
        bars.push(bar(3, 105.0, 108.0, 104.0, 107.0));
        bars.push(bar(4, 107.0, 109.0, 106.0, 108.0));
        bars.push(bar(5, 108.0, 108.0, 100.2, 100.5));
        let swings = SwingSeries { highs: vec![swing_high(0, 100.0)], lows: vec![] };
        assert!(bos_retest_signals(&bars, &swings, &no_buffer()).is_empty());
    }
}
