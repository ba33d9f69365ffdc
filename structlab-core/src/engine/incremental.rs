//! Incremental driver: one step per newly closed bar on persisted state.

use super::resolution::{step, ResolutionPolicy};
use crate::domain::{Bar, BarOpen, Trade};

/// Advance a persisted trade with the bar that just closed and the open of
/// the bar that just started.
pub fn advance(trade: Trade, closed_bar: &Bar, new_open: BarOpen, policy: &ResolutionPolicy) -> Trade {
    step(trade, closed_bar, Some(new_open), policy)
}

/// Advance using a fresh snapshot whose last bar is still forming.
///
/// Needs at least two bars; a shorter snapshot leaves the trade as is.
pub fn advance_with_snapshot(trade: Trade, snapshot: &[Bar], policy: &ResolutionPolicy) -> Trade {
    match snapshot {
        [.., closed, live] => advance(trade, closed, live.open_event(), policy),
        _ => trade,
    }
}

/// Step every closed bar of `snapshot` the trade has not seen yet, oldest
/// first, each with the following bar's open.
///
/// With one new closed bar this is `advance_with_snapshot`; after missed
/// ticks it replays the gap exactly as the batch simulator would.
pub fn catch_up(mut trade: Trade, snapshot: &[Bar], policy: &ResolutionPolicy) -> Trade {
    for pair in snapshot.windows(2) {
        if trade.is_closed() {
            break;
        }
        trade = step(trade, &pair[0], Some(pair[1].open_event()), policy);
    }
    trade
}
