//! Entry, stop-loss and take-profit from a signal and the swing history.
//!
//! Entry is always the open of the bar after the signal bar. The stop sits
//! beyond the most recent opposing swing at or before the signal bar, pushed
//! out by a percentage buffer (plus an optional ATR multiple). The target is
//! `rr_ratio` times the risk, capped at `max_tp_percent` from entry.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::htf::HtfRejection;
use crate::domain::{last_index_at_or_before, Bar, Direction, SwingKind, SwingSeries, TradeLevels};
use crate::indicators::Atr;

/// Two target prices closer than this are the same target.
const TP_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub rr_ratio: f64,
    /// Stop buffer as a fraction of entry.
    pub sl_buffer_pct: f64,
    /// Extra stop buffer in ATR units; 0 disables.
    pub atr_mult: f64,
    pub atr_period: usize,
    /// Cap on the target's distance from entry, as a fraction. 0 disables.
    pub max_tp_percent: f64,
    /// Risk ceiling as a fraction of entry. 0 disables.
    pub max_risk_pct: f64,
    /// Risk floor as a fraction of entry. 0 disables.
    pub min_risk_pct: f64,
    /// Minimum target distance as a fraction of entry. 0 disables.
    pub min_tp_percent: f64,
    /// Oldest anchoring swing allowed, in bars before the signal bar.
    pub max_bars_since_swing: usize,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            rr_ratio: 1.5,
            sl_buffer_pct: 0.005,
            atr_mult: 0.0,
            atr_period: 14,
            max_tp_percent: 0.05,
            max_risk_pct: 0.02,
            min_risk_pct: 0.0,
            min_tp_percent: 0.0,
            max_bars_since_swing: 50,
        }
    }
}

/// Why a signal did not become a trade.
///
/// These are expected outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    /// Signal bar is the last bar of the series.
    NoEntryBar,
    /// Signal timestamp precedes every bar.
    SignalOutOfRange,
    NoSwing,
    StaleSwing { bars: usize, limit: usize },
    AtrWarmup,
    NonPositiveRisk,
    RiskAboveCeiling { risk_pct: f64, ceiling: f64 },
    RiskBelowFloor { risk_pct: f64, floor: f64 },
    TpFloorBeyondCap,
    Htf(HtfRejection),
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoEntryBar => "no_entry_bar",
            Self::SignalOutOfRange => "signal_out_of_range",
            Self::NoSwing => "no_swing",
            Self::StaleSwing { .. } => "stale_swing",
            Self::AtrWarmup => "atr_warmup",
            Self::NonPositiveRisk => "non_positive_risk",
            Self::RiskAboveCeiling { .. } => "risk_above_ceiling",
            Self::RiskBelowFloor { .. } => "risk_below_floor",
            Self::TpFloorBeyondCap => "tp_floor_beyond_cap",
            Self::Htf(_) => "htf",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleSwing { bars, limit } => write!(f, "swing {bars} bars old (limit {limit})"),
            Self::RiskAboveCeiling { risk_pct, ceiling } => {
                write!(f, "risk {:.4}% above ceiling {:.4}%", risk_pct * 100.0, ceiling * 100.0)
            }
            Self::RiskBelowFloor { risk_pct, floor } => {
                write!(f, "risk {:.4}% below floor {:.4}%", risk_pct * 100.0, floor * 100.0)
            }
            Self::Htf(inner) => write!(f, "htf: {inner}"),
            other => f.write_str(other.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelCalculator {
    config: LevelConfig,
    atr: Option<Atr>,
}

impl LevelCalculator {
    pub fn new(config: LevelConfig) -> Self {
        let atr = (config.atr_mult > 0.0).then(|| Atr::new(config.atr_period.max(1)));
        Self { config, atr }
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    /// Levels for a signal at `signal_index`, entering at the next bar's open.
    pub fn compute(
        &self,
        bars: &[Bar],
        swings: &SwingSeries,
        signal_index: usize,
        direction: Direction,
    ) -> Result<TradeLevels, Rejection> {
        let entry_bar = bars.get(signal_index + 1).ok_or(Rejection::NoEntryBar)?;
        let signal_bar = &bars[signal_index];

        let kind = match direction {
            Direction::Buy => SwingKind::Low,
            Direction::Sell => SwingKind::High,
        };
        let swing = swings
            .last_at_or_before(kind, signal_bar.timestamp)
            .ok_or(Rejection::NoSwing)?;
        let swing_index =
            last_index_at_or_before(bars, swing.timestamp).ok_or(Rejection::NoSwing)?;
        let age = signal_index - swing_index;
        if age > self.config.max_bars_since_swing {
            return Err(Rejection::StaleSwing {
                bars: age,
                limit: self.config.max_bars_since_swing,
            });
        }

        let entry = entry_bar.open;
        let mut buffer = entry * self.config.sl_buffer_pct;
        if let Some(atr) = &self.atr {
            let value = atr
                .latest(&bars[..=signal_index])
                .ok_or(Rejection::AtrWarmup)?;
            buffer += self.config.atr_mult * value;
        }

        let s = direction.sign();
        let stop_loss = swing.price - s * buffer;
        let risk = (entry - stop_loss) * s;
        if risk.is_nan() || risk <= 0.0 {
            return Err(Rejection::NonPositiveRisk);
        }

        let risk_pct = risk / entry;
        if self.config.max_risk_pct > 0.0 && risk_pct > self.config.max_risk_pct {
            return Err(Rejection::RiskAboveCeiling {
                risk_pct,
                ceiling: self.config.max_risk_pct,
            });
        }
        if self.config.min_risk_pct > 0.0 && risk_pct < self.config.min_risk_pct {
            return Err(Rejection::RiskBelowFloor {
                risk_pct,
                floor: self.config.min_risk_pct,
            });
        }

        let raw_tp = entry + s * self.config.rr_ratio * risk;
        let mut take_profit = raw_tp;
        let cap = (self.config.max_tp_percent > 0.0)
            .then(|| entry * (1.0 + s * self.config.max_tp_percent));
        if let Some(cap) = cap {
            if (take_profit - cap) * s > 0.0 {
                take_profit = cap;
            }
        }
        if self.config.min_tp_percent > 0.0 {
            let floor = entry * (1.0 + s * self.config.min_tp_percent);
            if (floor - take_profit) * s > 0.0 {
                if cap.is_some_and(|cap| (floor - cap) * s > 0.0) {
                    return Err(Rejection::TpFloorBeyondCap);
                }
                take_profit = floor;
            }
        }

        Ok(TradeLevels {
            direction,
            entry_price: entry,
            entry_time: entry_bar.timestamp,
            stop_loss,
            take_profit,
            effective_rr: (take_profit - entry) * s / risk,
            tp_capped: (take_profit - raw_tp).abs() > TP_EPSILON,
        })
    }
}
