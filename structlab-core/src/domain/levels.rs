//! Entry, stop and target for one proposal.

use super::signal::Direction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Levels computed once from a signal and never recomputed mid-life.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeLevels {
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Reward/risk actually achieved after the TP cap or floor.
    pub effective_rr: f64,
    /// True when the TP cap (or the min-TP floor) moved the raw target.
    pub tp_capped: bool,
}

impl TradeLevels {
    /// Distance between entry and stop, always positive for valid levels.
    pub fn risk(&self) -> f64 {
        (self.entry_price - self.stop_loss) * self.direction.sign()
    }

    pub fn risk_pct(&self) -> f64 {
        self.risk() / self.entry_price
    }
}

/// Tick-quantized copy of the levels for display and persistence only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportedLevels {
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub tick_size: Option<f64>,
}

impl From<&TradeLevels> for ReportedLevels {
    fn from(levels: &TradeLevels) -> Self {
        Self {
            entry_price: levels.entry_price,
            stop_loss: levels.stop_loss,
            take_profit: levels.take_profit,
            tick_size: None,
        }
    }
}
