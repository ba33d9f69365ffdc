//! Break-of-structure + retest as a signal strategy.

use super::SignalStrategy;
use crate::domain::{Bar, Signal};
use crate::structure::{bos_retest_signals, BosParams, MarketStructure};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BosRetestSignals {
    params: BosParams,
}

impl BosRetestSignals {
    pub fn new(params: BosParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BosParams {
        &self.params
    }
}

impl SignalStrategy for BosRetestSignals {
    fn name(&self) -> &str {
        "bos_retest"
    }

    fn generate(&self, bars: &[Bar], structure: &MarketStructure) -> Vec<Signal> {
        bos_retest_signals(bars, &structure.swings, &self.params)
    }
}
