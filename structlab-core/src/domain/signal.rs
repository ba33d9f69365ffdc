//! Directional trade proposals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// +1.0 for Buy, -1.0 for Sell. Multiply a raw price move by this to get
    /// the move in the trade's favour.
    pub fn sign(self) -> f64 {
        match self {
            Self::Buy => 1.0,
            Self::Sell => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structure confirmation turned into a directional proposal.
///
/// `timestamp` is the signal bar. Entry always happens on the bar after it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub timestamp: DateTime<Utc>,
    pub reference_price: f64,
    pub direction: Direction,
}

/// Drop later signals that share a timestamp with an earlier one.
pub fn dedup_by_timestamp(signals: Vec<Signal>) -> Vec<Signal> {
    let mut seen = HashSet::new();
    signals
        .into_iter()
        .filter(|s| seen.insert(s.timestamp))
        .collect()
}
