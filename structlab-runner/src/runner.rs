//! Backtest runner: wires config, candle source, pipeline and metrics.
//!
//! Instruments are independent, so they are evaluated in parallel. A symbol
//! whose candles cannot be fetched is reported as failed; the rest of the
//! run continues.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, info_span, warn};

use structlab_core::data::{CandleSource, DataError};
use structlab_core::domain::{Bar, Signal, Trade};
use structlab_core::engine::{Pipeline, SeriesEvaluation};
use structlab_core::risk::{HtfGate, LevelCalculator};
use structlab_core::signals::SignalStrategy;

use crate::config::{ConfigError, StructLabConfig};
use crate::data_loader::dataset_hash;
use crate::metrics::PerformanceMetrics;
use crate::store::StoreError;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("no candles for any of {0} symbols")]
    NoData(usize),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Result of one instrument's batch evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolReport {
    pub symbol: String,
    pub bar_count: usize,
    pub signals: Vec<Signal>,
    pub trades: Vec<Trade>,
    /// Trades still open at the end of the series; not in the metrics.
    pub unresolved: Vec<Trade>,
    /// Rejected signal count per reason.
    pub rejections: BTreeMap<String, usize>,
    pub htf_active: bool,
    pub metrics: PerformanceMetrics,
}

impl SymbolReport {
    fn from_evaluation(eval: SeriesEvaluation, bar_count: usize, htf_active: bool) -> Self {
        let mut rejections = BTreeMap::new();
        for rejected in &eval.rejected {
            *rejections
                .entry(rejected.reason.as_str().to_string())
                .or_insert(0) += 1;
        }
        let metrics = PerformanceMetrics::compute(&eval.trades);
        Self {
            symbol: eval.symbol,
            bar_count,
            signals: eval.signals,
            trades: eval.trades,
            unresolved: eval.unresolved,
            rejections,
            htf_active,
            metrics,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolFailure {
    pub symbol: String,
    pub error: String,
}

/// Complete result of a multi-symbol backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub strategy: String,
    pub interval: String,
    pub dataset_hash: String,
    pub config: StructLabConfig,
    /// Per-symbol results in configured order.
    pub symbols: Vec<SymbolReport>,
    pub failed: Vec<SymbolFailure>,
    /// Metrics over every resolved trade of every symbol.
    pub metrics: PerformanceMetrics,
}

impl BacktestReport {
    pub fn all_trades(&self) -> Vec<Trade> {
        self.symbols
            .iter()
            .flat_map(|s| s.trades.iter().cloned())
            .collect()
    }
}

/// Run a batch backtest over every configured symbol.
pub fn run_backtest(
    config: &StructLabConfig,
    source: &dyn CandleSource,
) -> Result<BacktestReport, RunError> {
    config.validate()?;
    let run_id = config.run_id();
    let short_id = &run_id[..12];
    let run_span = info_span!("backtest", run_id = %short_id);
    let _entered = run_span.enter();
    // Rayon workers do not inherit the caller's subscriber or span.
    let dispatch = tracing::dispatcher::get_default(|d| d.clone());

    let strategy = config.signals.build();
    let calculator = LevelCalculator::new(config.levels);

    let outcomes: Vec<Result<(SymbolReport, Vec<Bar>), SymbolFailure>> = config
        .universe
        .symbols
        .par_iter()
        .map(|symbol| {
            tracing::dispatcher::with_default(&dispatch, || {
                let _span = info_span!(parent: &run_span, "symbol", run_id = %short_id, symbol = %symbol)
                    .entered();
                backtest_symbol(config, source, strategy.as_ref(), &calculator, symbol).map_err(
                    |e| {
                        warn!(error = %e, "symbol skipped");
                        SymbolFailure {
                            symbol: symbol.clone(),
                            error: e.to_string(),
                        }
                    },
                )
            })
        })
        .collect();

    let mut symbols = Vec::new();
    let mut series = Vec::new();
    let mut failed = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok((report, bars)) => {
                series.push((report.symbol.clone(), bars));
                symbols.push(report);
            }
            Err(failure) => failed.push(failure),
        }
    }
    if symbols.is_empty() {
        return Err(RunError::NoData(config.universe.symbols.len()));
    }

    let hash = dataset_hash(series.iter().map(|(s, b)| (s.as_str(), b.as_slice())));
    let all_trades: Vec<Trade> = symbols
        .iter()
        .flat_map(|s| s.trades.iter().cloned())
        .collect();
    let metrics = PerformanceMetrics::compute(&all_trades);
    info!(
        symbols = symbols.len(),
        failed = failed.len(),
        trades = metrics.trades_closed,
        win_rate = metrics.win_rate,
        profit_factor = metrics.profit_factor,
        equity_index = metrics.equity_index,
        "backtest complete"
    );

    Ok(BacktestReport {
        schema_version: SCHEMA_VERSION,
        run_id,
        strategy: strategy.name().to_string(),
        interval: config.universe.interval.clone(),
        dataset_hash: hash,
        config: config.clone(),
        symbols,
        failed,
        metrics,
    })
}

fn backtest_symbol(
    config: &StructLabConfig,
    source: &dyn CandleSource,
    strategy: &dyn SignalStrategy,
    calculator: &LevelCalculator,
    symbol: &str,
) -> Result<(SymbolReport, Vec<Bar>), DataError> {
    let bars = source.fetch_normalized(symbol, &config.universe.interval, config.universe.bar_count)?;
    let htf = HtfGate::prepare(&config.htf, source, symbol);

    let pipeline = Pipeline {
        lookback: config.structure.lookback,
        strategy,
        calculator,
        policy: &config.resolution,
    };
    let eval = pipeline.evaluate(symbol, &bars, &htf);
    info!(
        bars = bars.len(),
        signals = eval.signals.len(),
        trades = eval.trades.len(),
        unresolved = eval.unresolved.len(),
        rejected = eval.rejected.len(),
        "symbol evaluated"
    );
    Ok((SymbolReport::from_evaluation(eval, bars.len(), htf.is_active()), bars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use chrono::{Duration, TimeZone, Utc};
    use structlab_core::data::MemoryCandles;
    use tracing_subscriber::fmt::MakeWriter;

    fn zigzag(n: usize) -> Vec<Bar> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let x = i as f64;
                let mid = 100.0 + 6.0 * (x / 7.0).sin() + 2.0 * (x / 2.3).sin() + x * 0.01;
                let open = mid - 0.2 * (x / 3.0).cos();
                let close = mid + 0.2 * (x / 3.0).cos();
                Bar::new(
                    t0 + Duration::hours(i as i64),
                    open,
                    open.max(close) + 0.4,
                    open.min(close) - 0.4,
                    close,
                )
            })
            .collect()
    }

    fn config(symbols: &[&str]) -> StructLabConfig {
        let mut config = StructLabConfig::default();
        config.universe.symbols = symbols.iter().map(|s| s.to_string()).collect();
        config.structure.lookback = 2;
        config.levels.max_risk_pct = 0.0;
        config
    }

    #[test]
    fn missing_symbol_is_reported_not_fatal() {
        let source = MemoryCandles::new().with("AAA", "1h", zigzag(300));
        let report = run_backtest(&config(&["AAA", "ZZZ"]), &source).unwrap();
        assert_eq!(report.symbols.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].symbol, "ZZZ");
        assert!(report.symbols[0].metrics.trades_closed > 0);
        assert_eq!(report.metrics.trades_closed, report.all_trades().len());
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn worker_events_carry_run_and_symbol() {
        let source = MemoryCandles::new()
            .with("AAA", "1h", zigzag(300))
            .with("BBB", "1h", zigzag(250));
        let cfg = config(&["AAA", "BBB", "ZZZ"]);
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();

        let report = tracing::subscriber::with_default(subscriber, || run_backtest(&cfg, &source))
            .unwrap();
        let short_id = &report.run_id[..12];

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let per_symbol: Vec<&str> = output
            .lines()
            .filter(|l| l.contains("symbol evaluated") || l.contains("symbol skipped"))
            .collect();
        assert_eq!(per_symbol.len(), 3);
        for line in &per_symbol {
            assert!(line.contains(&format!("run_id={short_id}")), "{line}");
        }
        for symbol in ["AAA", "BBB", "ZZZ"] {
            assert!(
                per_symbol.iter().any(|l| l.contains(&format!("symbol={symbol}"))),
                "{symbol} missing"
            );
        }
    }

    #[test]
    fn no_data_at_all_is_an_error() {
        let source = MemoryCandles::new();
        assert!(matches!(
            run_backtest(&config(&["AAA"]), &source),
            Err(RunError::NoData(1))
        ));
    }

    #[test]
    fn deterministic_across_runs() {
        let source = MemoryCandles::new()
            .with("AAA", "1h", zigzag(300))
            .with("BBB", "1h", zigzag(250));
        let cfg = config(&["AAA", "BBB"]);
        let a = run_backtest(&cfg, &source).unwrap();
        let b = run_backtest(&cfg, &source).unwrap();
        assert_eq!(a.dataset_hash, b.dataset_hash);
        assert_eq!(a.all_trades(), b.all_trades());
        assert_eq!(a.symbols[0].symbol, "AAA");
        assert_eq!(a.symbols[1].symbol, "BBB");
    }
}
