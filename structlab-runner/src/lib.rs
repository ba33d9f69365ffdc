//! StructLab Runner: configuration, data loading, backtests and paper
//! trading on top of `structlab-core`.
//!
//! - TOML configuration with a content-addressed run id
//! - CSV candle source and TOML tick-size table
//! - Multi-symbol batch backtests, evaluated in parallel
//! - Paper-trading ticks over a CSV signal/trade/equity store
//! - Metrics and JSON/CSV/Markdown export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod paper;
pub mod runner;
pub mod store;

pub use config::{ConfigError, StructLabConfig};
pub use data_loader::{CsvCandleSource, StaticTickTable};
pub use metrics::{EquitySnapshot, PerformanceMetrics};
pub use paper::{PaperTrader, SymbolTick, TickReport};
pub use runner::{run_backtest, BacktestReport, RunError, SymbolReport};
pub use store::{PaperStore, SignalRow, StoreError, TradeRow};
