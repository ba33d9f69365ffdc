//! Shared fixtures for integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use structlab_core::domain::{Bar, Direction, Trade, TradeLevels};
use structlab_core::engine::{advance_with_snapshot, ResolutionPolicy};

pub fn ts(i: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::hours(i)
}

pub fn bar(i: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar::new(ts(i), open, high, low, close)
}

/// Random-walk bars from (close delta, upper wick, lower wick) triples.
pub fn walk(start: f64, steps: &[(f64, f64, f64)]) -> Vec<Bar> {
    let mut prev_close = start;
    steps
        .iter()
        .enumerate()
        .map(|(i, &(delta, up, down))| {
            let open = prev_close;
            let close = (open + delta).max(1.0);
            prev_close = close;
            bar(i as i64, open, open.max(close) + up, open.min(close) - down, close)
        })
        .collect()
}

pub fn levels_at(bars: &[Bar], entry_index: usize, direction: Direction, risk: f64, rr: f64) -> TradeLevels {
    let entry = bars[entry_index].open;
    let s = direction.sign();
    TradeLevels {
        direction,
        entry_price: entry,
        entry_time: bars[entry_index].timestamp,
        stop_loss: entry - s * risk,
        take_profit: entry + s * rr * risk,
        effective_rr: rr,
        tp_capped: false,
    }
}

/// Drive a trade the way the paper tick does: one snapshot per new bar,
/// the last bar of each snapshot still forming.
pub fn run_incremental(bars: &[Bar], trade: Trade, policy: &ResolutionPolicy) -> Trade {
    let mut trade = trade;
    for end in 2..=bars.len() {
        trade = advance_with_snapshot(trade, &bars[..end], policy);
        if trade.is_closed() {
            break;
        }
    }
    trade
}
