//! Performance metrics: pure functions over closed trades.
//!
//! Open trades are ignored everywhere. Returns are summed pnl percent per
//! trade (no compounding, no position sizing): the equity index is
//! `100 + Σ pnl_percent`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use structlab_core::domain::{Trade, TradeResult};

/// Profit factor reported when there are winners and no losses.
pub const PROFIT_FACTOR_SENTINEL: f64 = 9999.0;

/// Starting value of the equity index.
pub const EQUITY_BASE: f64 = 100.0;

/// Aggregate metrics for a set of closed trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub trades_closed: usize,
    pub wins: usize,
    pub losses: usize,
    /// Percent of closed trades that won.
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_r: f64,
    pub pnl_percent_cum: f64,
    pub equity_index: f64,
    /// Deepest drop of the equity index from its running peak, as a negative
    /// fraction.
    pub max_drawdown: f64,
    pub max_consecutive_losses: usize,
}

impl PerformanceMetrics {
    pub fn compute(trades: &[Trade]) -> Self {
        let closed = closed_in_exit_order(trades);
        let curve = equity_curve(&closed);
        Self {
            trades_closed: closed.len(),
            wins: count_result(&closed, TradeResult::Win),
            losses: count_result(&closed, TradeResult::Loss),
            win_rate: win_rate(&closed),
            profit_factor: profit_factor(&closed),
            avg_r: avg_r(&closed),
            pnl_percent_cum: pnl_percent_cum(&closed),
            equity_index: equity_index(&closed),
            max_drawdown: max_drawdown(&curve),
            max_consecutive_losses: max_consecutive_losses(&closed),
        }
    }
}

/// One row of the equity log, appended once per paper tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquitySnapshot {
    pub timestamp_utc: DateTime<Utc>,
    pub equity_index: f64,
    pub trades_closed: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub pnl_percent_cum: f64,
}

impl EquitySnapshot {
    pub fn compute(timestamp: DateTime<Utc>, trades: &[Trade]) -> Self {
        let closed = closed_in_exit_order(trades);
        Self {
            timestamp_utc: timestamp,
            equity_index: equity_index(&closed),
            trades_closed: closed.len(),
            win_rate: win_rate(&closed),
            profit_factor: profit_factor(&closed),
            pnl_percent_cum: pnl_percent_cum(&closed),
        }
    }
}

/// Closed trades sorted by exit time (ties keep input order).
pub fn closed_in_exit_order(trades: &[Trade]) -> Vec<Trade> {
    let mut closed: Vec<Trade> = trades
        .iter()
        .filter(|t| t.is_closed() && t.exit.is_some())
        .cloned()
        .collect();
    closed.sort_by_key(|t| t.exit.map(|e| e.exit_time));
    closed
}

fn count_result(trades: &[Trade], result: TradeResult) -> usize {
    trades
        .iter()
        .filter(|t| t.result() == Some(result))
        .count()
}

/// Percent of closed trades with result WIN; 0 when none are closed.
pub fn win_rate(trades: &[Trade]) -> f64 {
    let closed = trades.iter().filter(|t| t.result().is_some()).count();
    if closed == 0 {
        return 0.0;
    }
    count_result(trades, TradeResult::Win) as f64 / closed as f64 * 100.0
}

/// Sum of winning R over the absolute sum of losing R.
///
/// 0 with no closed trades; [`PROFIT_FACTOR_SENTINEL`] when nothing lost.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let mut closed = 0usize;
    let mut win_r = 0.0;
    let mut loss_r = 0.0;
    for trade in trades {
        let (Some(result), Some(r)) = (trade.result(), trade.r_multiple()) else {
            continue;
        };
        closed += 1;
        match result {
            TradeResult::Win => win_r += r,
            TradeResult::Loss => loss_r += r,
            TradeResult::Flat => {}
        }
    }
    if closed == 0 {
        return 0.0;
    }
    let gross_loss = -loss_r;
    if gross_loss <= 0.0 {
        return PROFIT_FACTOR_SENTINEL;
    }
    win_r / gross_loss
}

pub fn avg_r(trades: &[Trade]) -> f64 {
    let rs: Vec<f64> = trades.iter().filter_map(Trade::r_multiple).collect();
    if rs.is_empty() {
        return 0.0;
    }
    rs.iter().sum::<f64>() / rs.len() as f64
}

pub fn pnl_percent_cum(trades: &[Trade]) -> f64 {
    trades.iter().filter_map(Trade::pnl_percent).sum()
}

pub fn equity_index(trades: &[Trade]) -> f64 {
    EQUITY_BASE + pnl_percent_cum(trades)
}

/// Equity index after each closed trade, starting at the base.
pub fn equity_curve(trades: &[Trade]) -> Vec<f64> {
    let mut curve = Vec::with_capacity(trades.len() + 1);
    let mut equity = EQUITY_BASE;
    curve.push(equity);
    for pnl in trades.iter().filter_map(Trade::pnl_percent) {
        equity += pnl;
        curve.push(equity);
    }
    curve
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if equity is constant or monotonically increasing.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let mut peak = equity_curve[0];
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (eq - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

pub fn max_consecutive_losses(trades: &[Trade]) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for trade in trades {
        match trade.result() {
            Some(TradeResult::Loss) => {
                current += 1;
                max_streak = max_streak.max(current);
            }
            Some(_) => current = 0,
            None => {}
        }
    }
    max_streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use structlab_core::domain::{Direction, ExitReason, TradeExit, TradeLevels, TradeState};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    fn closed(i: i64, pnl_percent: f64, r_multiple: f64) -> Trade {
        let mut trade = Trade::open(
            "BTCUSDT",
            TradeLevels {
                direction: Direction::Buy,
                entry_price: 100.0,
                entry_time: t0() + Duration::hours(i),
                stop_loss: 98.0,
                take_profit: 103.0,
                effective_rr: 1.5,
                tp_capped: false,
            },
        );
        trade.state = TradeState::Closed;
        trade.bars_held = 2;
        trade.exit = Some(TradeExit {
            exit_time: t0() + Duration::hours(i + 2),
            exit_price: 100.0 + pnl_percent,
            reason: ExitReason::TpHit,
            pnl_percent,
            r_multiple,
            result: TradeResult::from_pnl(pnl_percent),
        });
        trade
    }

    fn open(i: i64) -> Trade {
        let mut trade = closed(i, 0.0, 0.0);
        trade.state = TradeState::Open;
        trade.exit = None;
        trade
    }

    #[test]
    fn empty_is_neutral() {
        let m = PerformanceMetrics::compute(&[]);
        assert_eq!(m.trades_closed, 0);
        assert_eq!(m.win_rate, 0.0);
        assert_eq!(m.profit_factor, 0.0);
        assert_eq!(m.equity_index, 100.0);
        assert_eq!(m.max_drawdown, 0.0);
    }

    #[test]
    fn mixed_trades() {
        let trades = vec![
            closed(0, 2.94, 1.5),
            closed(1, -2.06, -1.0),
            closed(2, 2.94, 1.5),
            open(3),
        ];
        let m = PerformanceMetrics::compute(&trades);
        assert_eq!(m.trades_closed, 3);
        assert_eq!(m.wins, 2);
        assert_eq!(m.losses, 1);
        assert!((m.win_rate - 200.0 / 3.0).abs() < 1e-9);
        assert!((m.profit_factor - 3.0).abs() < 1e-12);
        assert!((m.equity_index - 103.82).abs() < 1e-9);
        assert!((m.pnl_percent_cum - 3.82).abs() < 1e-9);
        assert!(m.max_drawdown < 0.0);
        assert_eq!(m.max_consecutive_losses, 1);
    }

    #[test]
    fn profit_factor_without_losses_is_sentinel() {
        let trades = vec![closed(0, 1.0, 1.5), closed(1, 2.0, 1.5)];
        assert_eq!(profit_factor(&trades), PROFIT_FACTOR_SENTINEL);
    }

    #[test]
    fn profit_factor_only_flat_is_sentinel() {
        assert_eq!(profit_factor(&[closed(0, 0.0, 0.0)]), PROFIT_FACTOR_SENTINEL);
    }

    #[test]
    fn profit_factor_all_losers_is_zero() {
        let trades = vec![closed(0, -1.0, -1.0), closed(1, -2.0, -1.0)];
        assert_eq!(profit_factor(&trades), 0.0);
        assert_eq!(max_consecutive_losses(&trades), 2);
    }

    #[test]
    fn open_trades_are_ignored() {
        let trades = vec![open(0), open(1)];
        let snap = EquitySnapshot::compute(t0(), &trades);
        assert_eq!(snap.trades_closed, 0);
        assert_eq!(snap.equity_index, 100.0);
        assert_eq!(snap.profit_factor, 0.0);
    }

    #[test]
    fn curve_follows_exit_order() {
        let trades = vec![closed(5, -1.0, -1.0), closed(0, 2.0, 1.0)];
        let ordered = closed_in_exit_order(&trades);
        assert_eq!(equity_curve(&ordered), vec![100.0, 102.0, 101.0]);
    }

    #[test]
    fn max_drawdown_known() {
        let curve = [100.0, 110.0, 99.0, 105.0];
        assert!((max_drawdown(&curve) - (-0.1)).abs() < 1e-12);
        assert_eq!(max_drawdown(&[100.0, 101.0, 102.0]), 0.0);
    }
}
