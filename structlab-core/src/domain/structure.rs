//! Swing points and trend labels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwingKind {
    High,
    Low,
}

/// A confirmed local extremum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub kind: SwingKind,
}

/// Swing highs and lows of one series, each list in time order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwingSeries {
    pub highs: Vec<SwingPoint>,
    pub lows: Vec<SwingPoint>,
}

impl SwingSeries {
    /// Most recent swing of `kind` with timestamp <= `ts`.
    pub fn last_at_or_before(&self, kind: SwingKind, ts: DateTime<Utc>) -> Option<&SwingPoint> {
        self.of_kind(kind).iter().rev().find(|p| p.timestamp <= ts)
    }

    /// Most recent swing of `kind` with timestamp strictly before `ts`.
    pub fn last_before(&self, kind: SwingKind, ts: DateTime<Utc>) -> Option<&SwingPoint> {
        self.of_kind(kind).iter().rev().find(|p| p.timestamp < ts)
    }

    pub fn of_kind(&self, kind: SwingKind) -> &[SwingPoint] {
        match kind {
            SwingKind::High => &self.highs,
            SwingKind::Low => &self.lows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.highs.is_empty() && self.lows.is_empty()
    }
}

/// Structure label attached to a swing point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendLabel {
    #[serde(rename = "HH")]
    HigherHigh,
    #[serde(rename = "LH")]
    LowerHigh,
    #[serde(rename = "HL")]
    HigherLow,
    #[serde(rename = "LL")]
    LowerLow,
    /// First swing high of the series: nothing to compare against.
    #[serde(rename = "HH?")]
    UnresolvedHigh,
    /// First swing low of the series.
    #[serde(rename = "HL?")]
    UnresolvedLow,
}

impl TrendLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HigherHigh => "HH",
            Self::LowerHigh => "LH",
            Self::HigherLow => "HL",
            Self::LowerLow => "LL",
            Self::UnresolvedHigh => "HH?",
            Self::UnresolvedLow => "HL?",
        }
    }

    pub fn kind(self) -> SwingKind {
        match self {
            Self::HigherHigh | Self::LowerHigh | Self::UnresolvedHigh => SwingKind::High,
            Self::HigherLow | Self::LowerLow | Self::UnresolvedLow => SwingKind::Low,
        }
    }
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub label: TrendLabel,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(hour: u32, price: f64, kind: SwingKind) -> SwingPoint {
        SwingPoint {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, hour, 0, 0).unwrap(),
            price,
            kind,
        }
    }

    #[test]
    fn last_at_or_before_is_inclusive() {
        let series = SwingSeries {
            highs: vec![],
            lows: vec![point(2, 10.0, SwingKind::Low), point(5, 11.0, SwingKind::Low)],
        };
        let t5 = Utc.with_ymd_and_hms(2024, 1, 2, 5, 0, 0).unwrap();
        assert_eq!(series.last_at_or_before(SwingKind::Low, t5).unwrap().price, 11.0);
        assert_eq!(series.last_before(SwingKind::Low, t5).unwrap().price, 10.0);
        assert!(series.last_at_or_before(SwingKind::High, t5).is_none());
    }

    #[test]
    fn label_wire_names() {
        assert_eq!(serde_json::to_string(&TrendLabel::HigherLow).unwrap(), "\"HL\"");
        assert_eq!(serde_json::to_string(&TrendLabel::UnresolvedHigh).unwrap(), "\"HH?\"");
        assert_eq!(TrendLabel::LowerHigh.to_string(), "LH");
        assert_eq!(TrendLabel::UnresolvedLow.kind(), SwingKind::Low);
    }
}
