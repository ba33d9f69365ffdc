//! Batch evaluation of one instrument: structure → signals → levels →
//! outcomes.
//!
//! Every signal is evaluated independently against the same immutable
//! snapshot; trades do not block each other.

use tracing::debug;

use super::resolution::ResolutionPolicy;
use super::simulator::{simulate, Outcome};
use crate::domain::{index_of, last_index_at_or_before, Bar, Signal, Trade};
use crate::risk::{HtfGate, LevelCalculator, Rejection};
use crate::signals::SignalStrategy;
use crate::structure::MarketStructure;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RejectedSignal {
    pub signal: Signal,
    pub reason: Rejection,
}

/// Everything one instrument's batch run produced.
#[derive(Debug, Clone, Default)]
pub struct SeriesEvaluation {
    pub symbol: String,
    pub signals: Vec<Signal>,
    /// Resolved trades in signal order.
    pub trades: Vec<Trade>,
    /// Trades still open when the series ended; excluded from metrics.
    pub unresolved: Vec<Trade>,
    pub rejected: Vec<RejectedSignal>,
}

pub struct Pipeline<'a> {
    pub lookback: usize,
    pub strategy: &'a dyn SignalStrategy,
    pub calculator: &'a LevelCalculator,
    pub policy: &'a ResolutionPolicy,
}

impl Pipeline<'_> {
    pub fn evaluate(&self, symbol: &str, bars: &[Bar], htf: &HtfGate) -> SeriesEvaluation {
        let structure = MarketStructure::analyze(bars, self.lookback);
        let signals = self.strategy.generate(bars, &structure);

        let mut eval = SeriesEvaluation {
            symbol: symbol.to_string(),
            ..SeriesEvaluation::default()
        };

        for signal in &signals {
            match self.open_trade(symbol, bars, &structure, signal, htf) {
                Ok((entry_index, trade)) => match simulate(bars, entry_index, trade, self.policy) {
                    Outcome::Resolved(trade) => eval.trades.push(trade),
                    Outcome::Unresolved(trade) => eval.unresolved.push(trade),
                },
                Err(reason) => {
                    debug!(
                        symbol = %symbol,
                        signal_time = %signal.timestamp,
                        direction = %signal.direction,
                        reason = %reason,
                        "signal rejected"
                    );
                    eval.rejected.push(RejectedSignal {
                        signal: *signal,
                        reason,
                    });
                }
            }
        }

        eval.signals = signals;
        eval
    }

    fn open_trade(
        &self,
        symbol: &str,
        bars: &[Bar],
        structure: &MarketStructure,
        signal: &Signal,
        htf: &HtfGate,
    ) -> Result<(usize, Trade), Rejection> {
        let signal_index = index_of(bars, signal.timestamp)
            .or_else(|| last_index_at_or_before(bars, signal.timestamp))
            .ok_or(Rejection::SignalOutOfRange)?;
        let levels =
            self.calculator
                .compute(bars, &structure.swings, signal_index, signal.direction)?;
        htf.check(signal.direction, signal.timestamp)
            .map_err(Rejection::Htf)?;
        Ok((signal_index + 1, Trade::open(symbol, levels)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::LevelConfig;
    use crate::signals::StructureSignals;
    use crate::test_support::zigzag_bars;

    #[test]
    fn every_signal_is_accounted_for() {
        let bars = zigzag_bars(300);
        let strategy = StructureSignals::ungated();
        let calculator = LevelCalculator::new(LevelConfig {
            max_risk_pct: 0.0,
            ..LevelConfig::default()
        });
        let policy = ResolutionPolicy::default();
        let pipeline = Pipeline {
            lookback: 2,
            strategy: &strategy,
            calculator: &calculator,
            policy: &policy,
        };

        let eval = pipeline.evaluate("TEST", &bars, &HtfGate::disabled());
        assert!(!eval.signals.is_empty());
        assert_eq!(
            eval.signals.len(),
            eval.trades.len() + eval.unresolved.len() + eval.rejected.len()
        );
        for trade in &eval.trades {
            assert!(trade.is_closed());
            let entry = index_of(&bars, trade.levels.entry_time).unwrap();
            assert_eq!(trade.levels.entry_price, bars[entry].open);
        }
    }
}
