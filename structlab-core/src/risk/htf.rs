//! Higher-timeframe bias gate.
//!
//! A BUY needs the coarser series' latest confirmed label to be HL, a SELL
//! needs LH. Missing, short or stale coarse data rejects the signal. A
//! supplier error while preparing the gate either disables it for the run
//! (fail-open, the default) or rejects every signal (fail-closed).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::data::{CandleSource, DataError};
use crate::domain::{index_of, parse_interval, Bar, Direction, TrendLabel};
use crate::structure::MarketStructure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HtfFailurePolicy {
    #[default]
    FailOpen,
    FailClosed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtfConfig {
    pub enabled: bool,
    pub interval: String,
    pub bar_count: usize,
    pub lookback: usize,
    pub max_bars_since_swing: usize,
    /// Fewer raw bars than this and the series counts as unavailable.
    pub min_bars: usize,
    /// Fewer closed bars at the cutoff than this and the series counts as unavailable.
    pub min_closed_bars: usize,
    pub failure_policy: HtfFailurePolicy,
}

impl Default for HtfConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: "4h".to_string(),
            bar_count: 500,
            lookback: 3,
            max_bars_since_swing: 300,
            min_bars: 20,
            min_closed_bars: 10,
            failure_policy: HtfFailurePolicy::FailOpen,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HtfRejection {
    /// Coarse series empty or too short.
    Unavailable,
    /// No confirmed label on the coarse series yet.
    NoLabel,
    Stale { bars: usize, limit: usize },
    BiasMismatch { required: TrendLabel, found: TrendLabel },
}

impl fmt::Display for HtfRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => f.write_str("coarse data unavailable"),
            Self::NoLabel => f.write_str("no confirmed coarse label"),
            Self::Stale { bars, limit } => write!(f, "coarse label {bars} bars old (limit {limit})"),
            Self::BiasMismatch { required, found } => write!(f, "needs {required}, found {found}"),
        }
    }
}

#[derive(Debug, Clone)]
enum GateState {
    Disabled,
    Unavailable,
    Ready { bars: Vec<Bar>, bar_duration: Duration },
}

/// Gate prepared once per run and instrument, then queried per signal.
#[derive(Debug, Clone)]
pub struct HtfGate {
    state: GateState,
    lookback: usize,
    max_bars_since_swing: usize,
    min_closed_bars: usize,
}

impl HtfGate {
    pub fn disabled() -> Self {
        Self {
            state: GateState::Disabled,
            lookback: 1,
            max_bars_since_swing: 0,
            min_closed_bars: 0,
        }
    }

    /// Fetch the coarse series for `symbol` and build the gate.
    pub fn prepare(config: &HtfConfig, source: &dyn CandleSource, symbol: &str) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        let fetched = match parse_interval(&config.interval) {
            Some(bar_duration) => {
                match source.fetch_normalized(symbol, &config.interval, config.bar_count) {
                    Ok(bars) => Ok((bars, bar_duration)),
                    // A supplier with nothing for this instrument is empty data, not a failure.
                    Err(DataError::NoData { .. }) => Ok((Vec::new(), bar_duration)),
                    Err(e) => Err(e.to_string()),
                }
            }
            None => Err(format!("unrecognised interval '{}'", config.interval)),
        };

        match fetched {
            Ok((bars, bar_duration)) => {
                let state = if bars.len() < config.min_bars {
                    debug!(symbol = %symbol, bars = bars.len(), "htf series too short");
                    GateState::Unavailable
                } else {
                    GateState::Ready { bars, bar_duration }
                };
                Self::with_state(config, state)
            }
            Err(error) => match config.failure_policy {
                HtfFailurePolicy::FailOpen => {
                    warn!(symbol = %symbol, %error, "htf gate disabled for this run");
                    Self::disabled()
                }
                HtfFailurePolicy::FailClosed => {
                    warn!(symbol = %symbol, %error, "htf data failed; rejecting signals");
                    Self::with_state(config, GateState::Unavailable)
                }
            },
        }
    }

    /// Build a ready gate from an already-fetched coarse series.
    pub fn from_bars(config: &HtfConfig, bars: Vec<Bar>, bar_duration: Duration) -> Self {
        let state = if bars.len() < config.min_bars {
            GateState::Unavailable
        } else {
            GateState::Ready { bars, bar_duration }
        };
        Self::with_state(config, state)
    }

    fn with_state(config: &HtfConfig, state: GateState) -> Self {
        Self {
            state,
            lookback: config.lookback.max(1),
            max_bars_since_swing: config.max_bars_since_swing,
            min_closed_bars: config.min_closed_bars,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, GateState::Disabled)
    }

    /// Check `direction` against coarse structure built from bars fully
    /// closed at `cutoff`.
    pub fn check(&self, direction: Direction, cutoff: DateTime<Utc>) -> Result<(), HtfRejection> {
        let (bars, bar_duration) = match &self.state {
            GateState::Disabled => return Ok(()),
            GateState::Unavailable => return Err(HtfRejection::Unavailable),
            GateState::Ready { bars, bar_duration } => (bars, *bar_duration),
        };

        let closed_len = bars.partition_point(|b| b.timestamp + bar_duration <= cutoff);
        if closed_len < self.min_closed_bars.max(1) {
            return Err(HtfRejection::Unavailable);
        }
        let closed = &bars[..closed_len];

        let structure = MarketStructure::analyze(closed, self.lookback);
        let point = structure.last_point().ok_or(HtfRejection::NoLabel)?;
        let label_index = index_of(closed, point.timestamp).ok_or(HtfRejection::NoLabel)?;
        let age = closed_len - 1 - label_index;
        if age > self.max_bars_since_swing {
            return Err(HtfRejection::Stale {
                bars: age,
                limit: self.max_bars_since_swing,
            });
        }

        let required = match direction {
            Direction::Buy => TrendLabel::HigherLow,
            Direction::Sell => TrendLabel::LowerHigh,
        };
        if point.label != required {
            return Err(HtfRejection::BiasMismatch {
                required,
                found: point.label,
            });
        }
        Ok(())
    }
}
