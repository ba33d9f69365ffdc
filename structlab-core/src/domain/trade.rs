//! Trade: lifecycle record shared by the batch and incremental drivers.

use super::levels::TradeLevels;
use super::signal::Direction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp format used in persisted keys.
pub const KEY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeState {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    OpenGapTp,
    OpenGapSl,
    SlHit,
    TpHit,
    Timeout,
    MaxBars,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenGapTp => "OPEN_GAP_TP",
            Self::OpenGapSl => "OPEN_GAP_SL",
            Self::SlHit => "SL_HIT",
            Self::TpHit => "TP_HIT",
            Self::Timeout => "TIMEOUT",
            Self::MaxBars => "MAX_BARS",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeResult {
    Win,
    Loss,
    Flat,
}

impl TradeResult {
    pub fn from_pnl(pnl_percent: f64) -> Self {
        if pnl_percent > 0.0 {
            Self::Win
        } else if pnl_percent < 0.0 {
            Self::Loss
        } else {
            Self::Flat
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Win => "WIN",
            Self::Loss => "LOSS",
            Self::Flat => "FLAT",
        }
    }
}

/// Fields filled in when a trade closes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeExit {
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub reason: ExitReason,
    pub pnl_percent: f64,
    pub r_multiple: f64,
    pub result: TradeResult,
}

/// A trade from entry to (eventual) exit.
///
/// `bars_held == 0` on an open trade means the entry bar has not closed yet
/// (pending first bar).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub levels: TradeLevels,
    pub bars_held: usize,
    pub state: TradeState,
    /// Timestamp of the last closed bar this trade was stepped through.
    #[serde(default)]
    pub last_bar_time: Option<DateTime<Utc>>,
    pub exit: Option<TradeExit>,
}

impl Trade {
    pub fn open(symbol: impl Into<String>, levels: TradeLevels) -> Self {
        Self {
            symbol: symbol.into(),
            levels,
            bars_held: 0,
            state: TradeState::Open,
            last_bar_time: None,
            exit: None,
        }
    }

    /// Persistence key: instrument + entry timestamp.
    pub fn key(&self) -> String {
        trade_key(&self.symbol, self.levels.entry_time)
    }

    pub fn direction(&self) -> Direction {
        self.levels.direction
    }

    pub fn is_open(&self) -> bool {
        self.state == TradeState::Open
    }

    pub fn is_closed(&self) -> bool {
        self.state == TradeState::Closed
    }

    pub fn is_pending_first_bar(&self) -> bool {
        self.is_open() && self.bars_held == 0
    }

    pub fn result(&self) -> Option<TradeResult> {
        self.exit.map(|e| e.result)
    }

    pub fn r_multiple(&self) -> Option<f64> {
        self.exit.map(|e| e.r_multiple)
    }

    pub fn pnl_percent(&self) -> Option<f64> {
        self.exit.map(|e| e.pnl_percent)
    }
}

pub fn trade_key(symbol: &str, ts: DateTime<Utc>) -> String {
    format!("{symbol}-{}", ts.format(KEY_TIME_FORMAT))
}
