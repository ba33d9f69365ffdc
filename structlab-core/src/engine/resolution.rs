//! Trade resolution: the single step function behind both drivers.
//!
//! `step` is pure. The batch simulator calls it over a whole series; the
//! incremental driver calls it once per new bar on persisted state. Both
//! therefore resolve a trade identically by construction.
//!
//! Per step, on an open trade:
//! 1. The entry bar only marks the trade as held (`bars_held = 1`).
//! 2. Afterwards the next bar's open is checked for a gap through TP or SL,
//!    then the closed bar's range for SL/TP hits (double hits go through the
//!    [`TieBreak`]), then `bars_held` advances and the timeout and bar
//!    budget are checked against the closed bar's close.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::path_policy::{FirstTouch, TieBreak};
use crate::domain::{Bar, BarOpen, Direction, ExitReason, Trade, TradeExit, TradeResult, TradeState};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionPolicy {
    /// Round-trip fee as a fraction; subtracted from pnl percent on close.
    pub fee_roundtrip: f64,
    pub tie_break: TieBreak,
    /// Close at market after this many held bars.
    pub timeout_bars: Option<usize>,
    /// Hard bar budget; reaching it closes with MAX_BARS.
    pub max_bars: usize,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            fee_roundtrip: 0.0006,
            tie_break: TieBreak::Conservative,
            timeout_bars: None,
            max_bars: 20,
        }
    }
}

/// Advance `trade` by one closed bar.
///
/// `next_open` is the open of the bar after `closed_bar`, when known. Closed
/// trades, bars before entry and bars already processed leave the trade
/// unchanged.
pub fn step(
    mut trade: Trade,
    closed_bar: &Bar,
    next_open: Option<BarOpen>,
    policy: &ResolutionPolicy,
) -> Trade {
    if trade.is_closed() || closed_bar.timestamp < trade.levels.entry_time {
        return trade;
    }
    if trade
        .last_bar_time
        .is_some_and(|last| closed_bar.timestamp <= last)
    {
        return trade;
    }
    trade.last_bar_time = Some(closed_bar.timestamp);

    if trade.bars_held == 0 {
        trade.bars_held = 1;
        return trade;
    }

    let levels = trade.levels;
    let (sl, tp) = (levels.stop_loss, levels.take_profit);

    if let Some(open) = next_open {
        let (gap_tp, gap_sl) = match levels.direction {
            Direction::Buy => (open.price >= tp, open.price <= sl),
            Direction::Sell => (open.price <= tp, open.price >= sl),
        };
        if gap_tp {
            return close_trade(trade, open.timestamp, tp, ExitReason::OpenGapTp, policy);
        }
        if gap_sl {
            return close_trade(trade, open.timestamp, sl, ExitReason::OpenGapSl, policy);
        }
    }

    let (hit_sl, hit_tp) = match levels.direction {
        Direction::Buy => (closed_bar.low <= sl, closed_bar.high >= tp),
        Direction::Sell => (closed_bar.high >= sl, closed_bar.low <= tp),
    };
    let touch = match (hit_sl, hit_tp) {
        (true, true) => Some(policy.tie_break.resolve(closed_bar, sl, tp)),
        (true, false) => Some(FirstTouch::StopLoss),
        (false, true) => Some(FirstTouch::TakeProfit),
        (false, false) => None,
    };
    match touch {
        Some(FirstTouch::StopLoss) => {
            return close_trade(trade, closed_bar.timestamp, sl, ExitReason::SlHit, policy);
        }
        Some(FirstTouch::TakeProfit) => {
            return close_trade(trade, closed_bar.timestamp, tp, ExitReason::TpHit, policy);
        }
        None => {}
    }

    trade.bars_held += 1;
    if policy.timeout_bars.is_some_and(|n| trade.bars_held >= n) {
        return close_trade(
            trade,
            closed_bar.timestamp,
            closed_bar.close,
            ExitReason::Timeout,
            policy,
        );
    }
    if trade.bars_held >= policy.max_bars {
        return close_trade(
            trade,
            closed_bar.timestamp,
            closed_bar.close,
            ExitReason::MaxBars,
            policy,
        );
    }
    trade
}

/// Close `trade` at `exit_price`, computing pnl percent (net of fees),
/// R-multiple and result.
pub fn close_trade(
    mut trade: Trade,
    exit_time: DateTime<Utc>,
    exit_price: f64,
    reason: ExitReason,
    policy: &ResolutionPolicy,
) -> Trade {
    let levels = &trade.levels;
    let movement = (exit_price - levels.entry_price) * levels.direction.sign();
    let pnl_percent = movement / levels.entry_price * 100.0 - policy.fee_roundtrip * 100.0;
    let risk = levels.risk();
    let r_multiple = if risk > 0.0 { movement / risk } else { 0.0 };

    trade.state = TradeState::Closed;
    trade.exit = Some(TradeExit {
        exit_time,
        exit_price,
        reason,
        pnl_percent,
        r_multiple,
        result: TradeResult::from_pnl(pnl_percent),
    });
    trade
}
