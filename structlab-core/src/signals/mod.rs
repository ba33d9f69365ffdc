//! Signal generation: structure confirmations to directional proposals.
//!
//! Strategies see only bars and the precomputed structure of the same
//! series. They never see open trades or persisted state.

pub mod bos_retest;
pub mod structure;

pub use bos_retest::BosRetestSignals;
pub use structure::StructureSignals;

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Signal};
use crate::structure::{BosParams, MarketStructure};

/// Interchangeable source of signals over one series.
///
/// Output is time-ordered and unique by timestamp.
pub trait SignalStrategy: Send + Sync {
    /// Human-readable name (e.g., "structure").
    fn name(&self) -> &str;

    fn generate(&self, bars: &[Bar], structure: &MarketStructure) -> Vec<Signal>;
}

/// Serializable strategy selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalConfig {
    /// HL → BUY, LH → SELL, optionally gated by an engulfing candle.
    Structure {
        /// Engulfing must follow the label within this many minutes.
        /// `None` disables the gate.
        #[serde(default)]
        engulfing_window_minutes: Option<i64>,
    },
    BosRetest {
        #[serde(flatten)]
        params: BosParams,
    },
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self::Structure {
            engulfing_window_minutes: None,
        }
    }
}

impl SignalConfig {
    pub fn build(&self) -> Box<dyn SignalStrategy> {
        match self {
            Self::Structure {
                engulfing_window_minutes: None,
            } => Box::new(StructureSignals::ungated()),
            Self::Structure {
                engulfing_window_minutes: Some(minutes),
            } => Box::new(StructureSignals::with_engulfing(chrono::Duration::minutes(*minutes))),
            Self::BosRetest { params } => Box::new(BosRetestSignals::new(*params)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_wire_shapes() {
        let structure: SignalConfig =
            parse(r#"{"type":"STRUCTURE","engulfing_window_minutes":120}"#);
        assert_eq!(
            structure,
            SignalConfig::Structure {
                engulfing_window_minutes: Some(120)
            }
        );
        assert_eq!(structure.build().name(), "structure_engulfing");

        let bos: SignalConfig = parse(r#"{"type":"BOS_RETEST","retest_window_bars":5}"#);
        match &bos {
            SignalConfig::BosRetest { params } => {
                assert_eq!(params.retest_window_bars, 5);
                assert_eq!(params.breach_buffer_pct, 0.0005);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(bos.build().name(), "bos_retest");
    }

    fn parse(s: &str) -> SignalConfig {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn default_is_ungated_structure() {
        assert_eq!(SignalConfig::default().build().name(), "structure");
    }
}
