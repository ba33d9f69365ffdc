//! StructLab CLI: backtest, paper tick and metrics commands.
//!
//! Commands:
//! - `backtest`: run a multi-symbol batch backtest and save artifacts
//! - `tick`: run one paper-trading tick against the CSV store
//! - `metrics`: summarize the paper store's closed trades
//! - `config`: print the resolved configuration and its run id

mod obs;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use structlab_core::domain::TradeState;
use structlab_runner::export::save_artifacts;
use structlab_runner::{
    run_backtest, BacktestReport, CsvCandleSource, PaperStore, PaperTrader, PerformanceMetrics,
    StaticTickTable, StructLabConfig, TickReport,
};

#[derive(Parser)]
#[command(
    name = "structlab",
    about = "StructLab CLI: market-structure signals, backtests and paper trading"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = "structlab.toml")]
    config: PathBuf,

    /// Log level or filter directive; `STRUCTLAB_LOG` takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a batch backtest over the configured universe.
    Backtest {
        /// Override the configured symbols (e.g., BTCUSDT ETHUSDT).
        #[arg(long, num_args = 1..)]
        symbols: Vec<String>,

        /// Output directory for report.json, trades.csv, equity.csv, report.md.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the full report as JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run one paper-trading tick: advance open trades, open new ones.
    Tick,
    /// Summarize closed paper trades.
    Metrics,
    /// Print the resolved configuration and its run id.
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    obs::init_tracing(&cli.log_level, cli.log_format.as_str())?;

    let mut config = StructLabConfig::load(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;

    match cli.command {
        Commands::Backtest {
            symbols,
            output_dir,
            json,
        } => {
            if !symbols.is_empty() {
                config.universe.symbols = symbols;
                config.validate()?;
            }
            run_backtest_cmd(&config, &output_dir, json)
        }
        Commands::Tick => run_tick_cmd(&config),
        Commands::Metrics => run_metrics_cmd(&config),
        Commands::Config => {
            println!("# run_id = {}", config.run_id());
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn run_backtest_cmd(config: &StructLabConfig, output_dir: &Path, json: bool) -> Result<()> {
    let source = CsvCandleSource::new(&config.universe.data_dir);
    let report = run_backtest(config, &source)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_backtest_summary(&report);
    }

    let run_dir = save_artifacts(&report, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn print_backtest_summary(report: &BacktestReport) {
    println!();
    println!("=== Backtest Results ===");
    println!("Run:           {}", report.run_id);
    println!("Strategy:      {}", report.strategy);
    println!("Interval:      {}", report.interval);
    println!();
    println!(
        "{:<12} {:>6} {:>8} {:>7} {:>5} {:>9} {:>8} {:>9}",
        "Symbol", "Bars", "Signals", "Closed", "Open", "WinRate", "PF", "Equity"
    );
    for s in &report.symbols {
        let m = &s.metrics;
        println!(
            "{:<12} {:>6} {:>8} {:>7} {:>5} {:>8.1}% {:>8.2} {:>9.2}",
            s.symbol,
            s.bar_count,
            s.signals.len(),
            m.trades_closed,
            s.unresolved.len(),
            m.win_rate,
            m.profit_factor,
            m.equity_index
        );
    }
    for f in &report.failed {
        println!("{:<12} failed: {}", f.symbol, f.error);
    }
    println!();
    print_metrics(&report.metrics);
}

fn print_metrics(m: &PerformanceMetrics) {
    println!("Closed trades: {}", m.trades_closed);
    println!("Win rate:      {:.2}%", m.win_rate);
    println!("Profit factor: {:.2}", m.profit_factor);
    println!("Avg R:         {:.3}", m.avg_r);
    println!("PnL cum:       {:.2}%", m.pnl_percent_cum);
    println!("Equity index:  {:.2}", m.equity_index);
    println!("Max drawdown:  {:.2}%", m.max_drawdown * 100.0);
}

fn run_tick_cmd(config: &StructLabConfig) -> Result<()> {
    let candles = CsvCandleSource::new(&config.universe.data_dir);
    let ticks = match &config.paper.tick_file {
        Some(path) => StaticTickTable::load(path)
            .with_context(|| format!("failed to load tick table {}", path.display()))?,
        None => StaticTickTable::default(),
    };
    let store = PaperStore::open(&config.paper.data_dir)?;
    let trader = PaperTrader::new(config, &candles, ticks, store);

    let report = trader.run_tick(Utc::now())?;
    print_tick_summary(&report);
    Ok(())
}

fn print_tick_summary(report: &TickReport) {
    for s in &report.symbols {
        let mut parts = Vec::new();
        if !s.closed.is_empty() {
            parts.push(format!("closed {}", s.closed.join(", ")));
        }
        if let Some(id) = &s.opened {
            parts.push(format!("opened {id}"));
        }
        if let Some(reason) = &s.skipped {
            parts.push(format!("no entry ({reason})"));
        }
        if let Some(error) = &s.error {
            parts.push(format!("error: {error}"));
        }
        println!("{:<12} {}", s.symbol, parts.join("; "));
    }
    let e = &report.equity;
    println!(
        "[{} UTC] EquityIndex:{:.2}  Closed:{}  WinRate:{:.2}%  PF:{:.2}  PnLcum:{:.2}%",
        e.timestamp_utc.format("%Y-%m-%d %H:%M:%S"),
        e.equity_index,
        e.trades_closed,
        e.win_rate,
        e.profit_factor,
        e.pnl_percent_cum
    );
}

fn run_metrics_cmd(config: &StructLabConfig) -> Result<()> {
    let store = PaperStore::open(&config.paper.data_dir)?;
    let trades = store.trades()?;
    let open = trades
        .iter()
        .filter(|t| t.state == TradeState::Open)
        .count();
    print_metrics(&PerformanceMetrics::compute(&trades));
    println!("Open trades:   {open}");
    if let Some(last) = store.equity()?.last() {
        println!(
            "Last tick:     {}",
            last.timestamp_utc.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}
