//! Live signal from a snapshot whose last bar is still forming.
//!
//! Structure is computed on closed bars only. The most recent trend point
//! decides: HL proposes a BUY, LH a SELL. The signal bar is the last closed
//! bar, so entry is the live bar's open. The higher-timeframe gate is asked
//! about the market as of the live bar's start. The signal carries the
//! label's timestamp, which keys it in the store: one confirmation, one
//! trade.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{Bar, Direction, Signal, TradeLevels, TrendLabel, TrendPoint};
use crate::risk::{HtfGate, LevelCalculator, Rejection};
use crate::structure::MarketStructure;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub lookback: usize,
    /// Minimum snapshot length, live bar included.
    pub min_bars: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            lookback: 3,
            min_bars: 30,
        }
    }
}

impl LiveConfig {
    /// Snapshot length needed: `min_bars`, and at least 2L+5 closed bars.
    pub fn required_bars(&self) -> usize {
        self.min_bars.max(2 * self.lookback + 6)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveProposal {
    pub signal: Signal,
    pub label: TrendPoint,
    pub levels: TradeLevels,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiveSkip {
    NotEnoughBars { have: usize, need: usize },
    NoTrendPoint,
    NotAConfirmation(TrendLabel),
    Rejected(Rejection),
}

impl fmt::Display for LiveSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotEnoughBars { have, need } => write!(f, "{have} bars, need {need}"),
            Self::NoTrendPoint => f.write_str("no trend point yet"),
            Self::NotAConfirmation(label) => write!(f, "latest label {label}"),
            Self::Rejected(rejection) => write!(f, "rejected: {rejection}"),
        }
    }
}

pub fn live_signal(
    snapshot: &[Bar],
    config: &LiveConfig,
    calculator: &LevelCalculator,
    htf: &HtfGate,
) -> Result<LiveProposal, LiveSkip> {
    let need = config.required_bars();
    if snapshot.len() < need {
        return Err(LiveSkip::NotEnoughBars {
            have: snapshot.len(),
            need,
        });
    }

    let signal_index = snapshot.len() - 2;
    let structure = MarketStructure::analyze(&snapshot[..=signal_index], config.lookback);
    let label = *structure.last_point().ok_or(LiveSkip::NoTrendPoint)?;
    let direction = match label.label {
        TrendLabel::HigherLow => Direction::Buy,
        TrendLabel::LowerHigh => Direction::Sell,
        other => return Err(LiveSkip::NotAConfirmation(other)),
    };

    let signal = Signal {
        timestamp: label.timestamp,
        reference_price: label.price,
        direction,
    };
    let levels = calculator
        .compute(snapshot, &structure.swings, signal_index, direction)
        .map_err(LiveSkip::Rejected)?;
    // Coarse bias as of the end of the last closed bar, not the label.
    htf.check(direction, snapshot[signal_index + 1].timestamp)
        .map_err(|r| LiveSkip::Rejected(Rejection::Htf(r)))?;

    Ok(LiveProposal {
        signal,
        label,
        levels,
    })
}
