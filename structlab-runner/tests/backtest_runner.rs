//! End-to-end backtests: TOML config on disk, CSV candles, artifacts.

mod common;

use std::collections::HashSet;

use common::{base_config, write_candles, zigzag};
use structlab_core::domain::Bar;
use structlab_core::engine::Pipeline;
use structlab_core::risk::{HtfGate, LevelCalculator};
use structlab_runner::export::{load_artifacts, save_artifacts};
use structlab_runner::{run_backtest, CsvCandleSource, StructLabConfig};

fn resample(bars: &[Bar], factor: usize) -> Vec<Bar> {
    bars.chunks(factor)
        .filter(|c| c.len() == factor)
        .map(|c| {
            let high = c.iter().map(|b| b.high).fold(f64::MIN, f64::max);
            let low = c.iter().map(|b| b.low).fold(f64::MAX, f64::min);
            Bar::new(c[0].timestamp, c[0].open, high, low, c[c.len() - 1].close)
        })
        .collect()
}

#[test]
fn toml_config_and_csv_candles_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let candles = dir.path().join("candles");
    std::fs::create_dir_all(&candles).unwrap();
    write_candles(&candles, "BTCUSDT", "1h", &zigzag(600));
    write_candles(&candles, "ETHUSDT", "1h", &zigzag(450));

    let config_path = dir.path().join("structlab.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[universe]
symbols = ["BTCUSDT", "ETHUSDT", "SOLUSDT"]
interval = "1h"
data_dir = "{}"

[structure]
lookback = 2

[levels]
max_risk_pct = 0.0
"#,
            candles.display()
        ),
    )
    .unwrap();

    let config = StructLabConfig::load(&config_path).unwrap();
    let source = CsvCandleSource::new(&config.universe.data_dir);
    let report = run_backtest(&config, &source).unwrap();

    assert_eq!(report.symbols.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].symbol, "SOLUSDT");
    assert_eq!(report.strategy, "structure");
    assert_eq!(report.run_id, config.run_id());

    for symbol in &report.symbols {
        let rejected: usize = symbol.rejections.values().sum();
        assert_eq!(
            symbol.signals.len(),
            symbol.trades.len() + symbol.unresolved.len() + rejected
        );
        assert!(symbol.trades.iter().all(|t| t.is_closed()));
        assert!(symbol.unresolved.iter().all(|t| t.is_open()));
    }
    assert!(report.metrics.trades_closed > 0);
    assert_eq!(
        report.metrics.trades_closed,
        report.symbols.iter().map(|s| s.metrics.trades_closed).sum::<usize>()
    );

    let run_dir = save_artifacts(&report, dir.path()).unwrap();
    let loaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(loaded.symbols.len(), 2);
    assert_eq!(loaded.dataset_hash, report.dataset_hash);
}

#[test]
fn runner_matches_direct_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let bars = zigzag(500);
    write_candles(dir.path(), "BTCUSDT", "1h", &bars);

    let config = base_config(&["BTCUSDT"]);
    let report = run_backtest(&config, &CsvCandleSource::new(dir.path())).unwrap();

    let strategy = config.signals.build();
    let calculator = LevelCalculator::new(config.levels);
    let pipeline = Pipeline {
        lookback: config.structure.lookback,
        strategy: strategy.as_ref(),
        calculator: &calculator,
        policy: &config.resolution,
    };
    let direct = pipeline.evaluate("BTCUSDT", &bars, &HtfGate::disabled());
    assert_eq!(report.symbols[0].trades, direct.trades);
    assert_eq!(report.symbols[0].signals, direct.signals);
}

#[test]
fn missing_htf_series_rejects_every_signal() {
    let dir = tempfile::tempdir().unwrap();
    write_candles(dir.path(), "BTCUSDT", "1h", &zigzag(400));

    let mut config = base_config(&["BTCUSDT"]);
    config.htf.enabled = true;
    let report = run_backtest(&config, &CsvCandleSource::new(dir.path())).unwrap();
    let symbol = &report.symbols[0];
    assert!(symbol.htf_active);
    assert!(symbol.trades.is_empty());
    assert!(symbol.unresolved.is_empty());
    assert!(symbol.rejections.get("htf").copied().unwrap_or(0) > 0);
}

#[test]
fn htf_gate_only_filters() {
    let dir = tempfile::tempdir().unwrap();
    let hourly = zigzag(800);
    write_candles(dir.path(), "BTCUSDT", "1h", &hourly);
    write_candles(dir.path(), "BTCUSDT", "4h", &resample(&hourly, 4));
    let source = CsvCandleSource::new(dir.path());

    let ungated = run_backtest(&base_config(&["BTCUSDT"]), &source).unwrap();
    let mut config = base_config(&["BTCUSDT"]);
    config.htf.enabled = true;
    config.htf.lookback = 2;
    let gated = run_backtest(&config, &source).unwrap();

    let ungated_keys: HashSet<String> = ungated.all_trades().iter().map(|t| t.key()).collect();
    let gated_trades = gated.all_trades();
    assert!(gated_trades.len() <= ungated_keys.len());
    for trade in &gated_trades {
        assert!(ungated_keys.contains(&trade.key()));
    }
    assert_ne!(gated.run_id, ungated.run_id);
}
