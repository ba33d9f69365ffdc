#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use structlab_core::domain::Bar;
use structlab_runner::StructLabConfig;

pub fn ts(i: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(i)
}

/// Two overlaid sine waves with a slight drift: regular swings in both
/// directions, distinct highs and lows, no flat stretches.
pub fn zigzag(n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let x = i as f64;
            let mid = 100.0 + 6.0 * (x / 7.0).sin() + 2.0 * (x / 2.3).sin() + x * 0.01;
            let open = mid - 0.2 * (x / 3.0).cos();
            let close = mid + 0.2 * (x / 3.0).cos();
            Bar::new(
                ts(i as i64),
                open,
                open.max(close) + 0.4,
                open.min(close) - 0.4,
                close,
            )
        })
        .collect()
}

pub fn write_candles(dir: &Path, symbol: &str, interval: &str, bars: &[Bar]) {
    let path = dir.join(format!("{symbol}_{interval}.csv"));
    let mut f = std::fs::File::create(path).unwrap();
    writeln!(f, "timestamp,open,high,low,close,volume").unwrap();
    for b in bars {
        writeln!(
            f,
            "{},{},{},{},{},1000",
            b.timestamp.timestamp_millis(),
            b.open,
            b.high,
            b.low,
            b.close
        )
        .unwrap();
    }
}

/// Permissive levels so the synthetic series produces plenty of trades.
pub fn base_config(symbols: &[&str]) -> StructLabConfig {
    let mut config = StructLabConfig::default();
    config.universe.symbols = symbols.iter().map(|s| s.to_string()).collect();
    config.universe.bar_count = 10_000;
    config.structure.lookback = 2;
    config.levels.max_risk_pct = 0.0;
    config.paper.bar_count = 10_000;
    config.paper.min_bars = 30;
    config
}
