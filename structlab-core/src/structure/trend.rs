//! Trend structure classification (HH / HL / LH / LL).
//!
//! A streaming reduction over chronologically merged swings. Only the last
//! swing high and the last swing low carry state, so a label depends on
//! nothing but the previous point of the same kind.

use crate::domain::{SwingKind, SwingPoint, SwingSeries, TrendLabel, TrendPoint};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrendClassifier {
    prev_high: Option<f64>,
    prev_low: Option<f64>,
}

impl TrendClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label one swing and fold it into the classifier state.
    pub fn push(&mut self, point: &SwingPoint) -> TrendPoint {
        let label = match point.kind {
            SwingKind::High => {
                let label = match self.prev_high {
                    None => TrendLabel::UnresolvedHigh,
                    Some(prev) if point.price > prev => TrendLabel::HigherHigh,
                    Some(_) => TrendLabel::LowerHigh,
                };
                self.prev_high = Some(point.price);
                label
            }
            SwingKind::Low => {
                let label = match self.prev_low {
                    None => TrendLabel::UnresolvedLow,
                    Some(prev) if point.price > prev => TrendLabel::HigherLow,
                    Some(_) => TrendLabel::LowerLow,
                };
                self.prev_low = Some(point.price);
                label
            }
        };

        TrendPoint {
            timestamp: point.timestamp,
            price: point.price,
            label,
        }
    }
}

/// Merge highs and lows into one time-ordered list.
///
/// On equal timestamps (an outside bar that is both a swing high and a swing
/// low) the high comes first.
pub fn merge_chronological(swings: &SwingSeries) -> Vec<SwingPoint> {
    let mut all: Vec<SwingPoint> = swings
        .highs
        .iter()
        .chain(swings.lows.iter())
        .copied()
        .collect();
    // Stable sort keeps highs ahead of lows on ties.
    all.sort_by_key(|p| p.timestamp);
    all
}

pub fn classify_trend(swings: &SwingSeries) -> Vec<TrendPoint> {
    let mut classifier = TrendClassifier::new();
    merge_chronological(swings)
        .iter()
        .map(|p| classifier.push(p))
        .collect()
}
