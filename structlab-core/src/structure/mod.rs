//! Market structure detection: swings, trend labels, breaks of structure,
//! and the reversal-candle pattern used to gate structure signals.

pub mod bos;
pub mod engulfing;
pub mod swing;
pub mod tracker;
pub mod trend;

pub use bos::{bos_retest_signals, detect_bos_events, BosEvent, BosParams};
pub use engulfing::{detect_engulfings, Engulfing};
pub use swing::{detect_swings, SwingDetector};
pub use tracker::StructureTracker;
pub use trend::{classify_trend, merge_chronological, TrendClassifier};

use crate::domain::{Bar, SwingSeries, TrendPoint};

/// Swings and trend labels of one series, computed together.
///
/// Read-only once built; evaluations borrow it.
#[derive(Debug, Clone, Default)]
pub struct MarketStructure {
    pub swings: SwingSeries,
    pub trend: Vec<TrendPoint>,
}

impl MarketStructure {
    pub fn analyze(bars: &[Bar], lookback: usize) -> Self {
        let swings = detect_swings(bars, lookback);
        let trend = classify_trend(&swings);
        Self { swings, trend }
    }

    pub fn last_point(&self) -> Option<&TrendPoint> {
        self.trend.last()
    }
}
