//! Direct structure signals.
//!
//! Every higher low proposes a BUY and every lower high a SELL, anchored at
//! the label's timestamp and priced at the swing. With the engulfing gate
//! on, a label only counts when an engulfing candle in the same direction
//! closes within `window` after it (0 <= dt <= window), and the signal is
//! anchored at that candle and priced at its close, so entry waits for the
//! pattern to finish.

use chrono::Duration;

use super::SignalStrategy;
use crate::domain::{dedup_by_timestamp, Bar, Direction, Signal, TrendLabel};
use crate::structure::{detect_engulfings, Engulfing, MarketStructure};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructureSignals {
    engulfing_window: Option<Duration>,
}

impl StructureSignals {
    pub fn ungated() -> Self {
        Self {
            engulfing_window: None,
        }
    }

    pub fn with_engulfing(window: Duration) -> Self {
        Self {
            engulfing_window: Some(window),
        }
    }

    pub fn engulfing_window(&self) -> Option<Duration> {
        self.engulfing_window
    }
}

impl Default for StructureSignals {
    fn default() -> Self {
        Self::with_engulfing(Duration::hours(2))
    }
}

fn label_direction(label: TrendLabel) -> Option<Direction> {
    match label {
        TrendLabel::HigherLow => Some(Direction::Buy),
        TrendLabel::LowerHigh => Some(Direction::Sell),
        _ => None,
    }
}

impl SignalStrategy for StructureSignals {
    fn name(&self) -> &str {
        if self.engulfing_window.is_some() {
            "structure_engulfing"
        } else {
            "structure"
        }
    }

    fn generate(&self, bars: &[Bar], structure: &MarketStructure) -> Vec<Signal> {
        let points = structure
            .trend
            .iter()
            .filter_map(|point| Some((point, label_direction(point.label)?)));

        let mut signals: Vec<Signal> = match self.engulfing_window {
            None => points
                .map(|(point, direction)| Signal {
                    timestamp: point.timestamp,
                    reference_price: point.price,
                    direction,
                })
                .collect(),
            Some(window) => {
                let engulfings = detect_engulfings(bars);
                points
                    .flat_map(|(point, direction)| {
                        engulfings
                            .iter()
                            .filter(move |e| {
                                let dt = e.timestamp - point.timestamp;
                                e.direction == direction
                                    && dt >= Duration::zero()
                                    && dt <= window
                            })
                            .map(|e: &Engulfing| Signal {
                                timestamp: e.timestamp,
                                reference_price: e.close,
                                direction: e.direction,
                            })
                    })
                    .collect()
            }
        };

        signals.sort_by_key(|s| s.timestamp);
        dedup_by_timestamp(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TrendPoint;
    use crate::test_support::{bar, ts};

    fn structure_of(points: &[(i64, f64, TrendLabel)]) -> MarketStructure {
        MarketStructure {
            swings: Default::default(),
            trend: points
                .iter()
                .map(|&(i, price, label)| TrendPoint { timestamp: ts(i), price, label })
                .collect(),
        }
    }

    #[test]
    fn hl_buys_and_lh_sells() {
        let structure = structure_of(&[
            (1, 10.0, TrendLabel::UnresolvedHigh),
            (2, 8.0, TrendLabel::UnresolvedLow),
            (3, 11.0, TrendLabel::HigherHigh),
            (4, 9.0, TrendLabel::HigherLow),
            (5, 10.5, TrendLabel::LowerHigh),
            (6, 7.0, TrendLabel::LowerLow),
        ]);
        let signals = StructureSignals::ungated().generate(&[], &structure);
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].direction, Direction::Buy);
        assert_eq!(signals[0].timestamp, ts(4));
        assert_eq!(signals[0].reference_price, 9.0);
        assert_eq!(signals[1].direction, Direction::Sell);
        assert_eq!(signals[1].timestamp, ts(5));
    }

    #[test]
    fn engulfing_gate_requires_matching_candle_in_window() {
        let structure = structure_of(&[(1, 8.0, TrendLabel::HigherLow), (6, 12.0, TrendLabel::LowerHigh)]);
        // Bullish engulfing completes on bar 2, one hour after the HL label.
        let bars = vec![
            bar(0, 9.0, 9.5, 8.0, 9.0),
            bar(1, 10.0, 10.5, 8.5, 9.0),
            bar(2, 8.8, 10.8, 8.7, 10.4),
            bar(3, 10.4, 11.0, 10.0, 10.8),
        ];
        let signals = StructureSignals::default().generate(&bars, &structure);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].direction, Direction::Buy);
        assert_eq!(signals[0].timestamp, ts(2));
        assert_eq!(signals[0].reference_price, 10.4);
    }

    #[test]
    fn labels_sharing_an_engulfing_give_one_signal() {
        // Labels at 0 and 1 share the engulfing on bar 2: one signal.
        let structure = structure_of(&[(0, 8.0, TrendLabel::HigherLow), (1, 8.5, TrendLabel::HigherLow)]);
        let bars = vec![
            bar(0, 9.0, 9.5, 8.0, 9.2),
            bar(1, 10.0, 10.5, 8.5, 9.0),
            bar(2, 8.8, 10.8, 8.7, 10.4),
            bar(3, 10.4, 11.0, 10.0, 10.8),
        ];
        let signals = StructureSignals::default().generate(&bars, &structure);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].timestamp, ts(2));
        assert_eq!(signals[0].reference_price, 10.4);
    }

    #[test]
    fn engulfing_outside_window_is_ignored() {
        let structure = structure_of(&[(0, 8.0, TrendLabel::HigherLow)]);
        let bars = vec![
            bar(0, 9.0, 9.5, 8.0, 9.0),
            bar(1, 9.0, 9.2, 8.9, 9.1),
            bar(2, 9.1, 9.3, 9.0, 9.2),
            bar(3, 10.0, 10.5, 8.5, 9.0),
            bar(4, 8.8, 10.8, 8.7, 10.4), // engulfing 4h after label
        ];
        assert!(StructureSignals::default().generate(&bars, &structure).is_empty());
    }

    #[test]
    fn opposite_engulfing_does_not_confirm() {
        let structure = structure_of(&[(0, 8.0, TrendLabel::HigherLow)]);
        let bars = vec![bar(0, 9.0, 10.2, 8.8, 10.0), bar(1, 10.1, 10.3, 8.5, 8.9)];
        assert!(StructureSignals::default().generate(&bars, &structure).is_empty());
    }
}
