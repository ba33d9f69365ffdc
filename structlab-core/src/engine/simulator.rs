//! Batch outcome simulator.
//!
//! Replays a series from the entry bar onward, feeding each closed bar and
//! the following bar's open through [`step`]. The final bar has no next
//! open, so no gap check runs on it.

use super::resolution::{step, ResolutionPolicy};
use crate::domain::{Bar, Trade};

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Resolved(Trade),
    /// Still open when the series ran out.
    Unresolved(Trade),
}

impl Outcome {
    pub fn trade(&self) -> &Trade {
        match self {
            Self::Resolved(t) | Self::Unresolved(t) => t,
        }
    }

    pub fn into_resolved(self) -> Option<Trade> {
        match self {
            Self::Resolved(t) => Some(t),
            Self::Unresolved(_) => None,
        }
    }
}

/// Resolve `trade` against `bars`, where `bars[entry_index]` is its entry bar.
pub fn simulate(bars: &[Bar], entry_index: usize, trade: Trade, policy: &ResolutionPolicy) -> Outcome {
    let mut trade = trade;
    for i in entry_index..bars.len() {
        let next_open = bars.get(i + 1).map(Bar::open_event);
        trade = step(trade, &bars[i], next_open, policy);
        if trade.is_closed() {
            return Outcome::Resolved(trade);
        }
    }
    Outcome::Unresolved(trade)
}
