//! Backtest artifacts: JSON report, CSV trade tape and equity curve, and a
//! Markdown summary.
//!
//! The JSON report carries a `schema_version`; newer versions are rejected
//! on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use structlab_core::domain::Trade;

use crate::metrics::{closed_in_exit_order, equity_curve};
use crate::runner::{BacktestReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(report: &BacktestReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BacktestReport to JSON")
}

/// Deserialize a `BacktestReport`, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestReport> {
    let report: BacktestReport =
        serde_json::from_str(json).context("failed to deserialize BacktestReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Trade tape, one row per resolved trade, in exit order.
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "trade_id",
        "symbol",
        "side",
        "entry_time",
        "entry_price",
        "stop_loss",
        "take_profit",
        "effective_rr",
        "tp_capped",
        "exit_time",
        "exit_price",
        "exit_reason",
        "bars_held",
        "pnl_percent",
        "r_multiple",
        "result",
    ])?;

    for t in closed_in_exit_order(trades) {
        let Some(exit) = t.exit else { continue };
        let levels = &t.levels;
        wtr.write_record([
            t.key(),
            t.symbol.clone(),
            levels.direction.to_string(),
            levels.entry_time.to_rfc3339(),
            levels.entry_price.to_string(),
            levels.stop_loss.to_string(),
            levels.take_profit.to_string(),
            format!("{:.4}", levels.effective_rr),
            levels.tp_capped.to_string(),
            exit.exit_time.to_rfc3339(),
            exit.exit_price.to_string(),
            exit.reason.to_string(),
            t.bars_held.to_string(),
            format!("{:.4}", exit.pnl_percent),
            format!("{:.4}", exit.r_multiple),
            exit.result.as_str().to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Equity index after each closed trade, starting at 100.
pub fn export_equity_csv(trades: &[Trade]) -> Result<String> {
    let curve = equity_curve(&closed_in_exit_order(trades));
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["trade_index", "equity_index"])?;
    for (i, eq) in curve.iter().enumerate() {
        wtr.write_record([&i.to_string(), &format!("{:.4}", eq)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set under `output_dir/backtest_{run_id prefix}/`:
/// - `report.json`: the full `BacktestReport`
/// - `trades.csv`: trade tape across all symbols
/// - `equity.csv`: equity index per closed trade
/// - `report.md`: Markdown summary
///
/// Returns the path to the created directory.
pub fn save_artifacts(report: &BacktestReport, output_dir: &Path) -> Result<PathBuf> {
    let prefix = report.run_id.get(..12).unwrap_or(&report.run_id);
    let run_dir = output_dir.join(format!("backtest_{prefix}"));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let trades = report.all_trades();
    let files = [
        ("report.json", export_json(report)?),
        ("trades.csv", export_trades_csv(&trades)?),
        ("equity.csv", export_equity_csv(&trades)?),
        ("report.md", generate_report(report)),
    ];
    for (name, contents) in files {
        let path = run_dir.join(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(run_dir)
}

pub fn load_artifacts(dir: &Path) -> Result<BacktestReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

pub fn generate_report(report: &BacktestReport) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str("# Backtest Report\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Run | {} |\n", report.run_id));
    md.push_str(&format!("| Strategy | {} |\n", report.strategy));
    md.push_str(&format!("| Interval | {} |\n", report.interval));
    md.push_str(&format!("| Dataset Hash | {} |\n", report.dataset_hash));
    md.push('\n');

    let m = &report.metrics;
    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Closed Trades | {} |\n", m.trades_closed));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", m.win_rate));
    md.push_str(&format!("| Profit Factor | {:.2} |\n", m.profit_factor));
    md.push_str(&format!("| Avg R | {:.3} |\n", m.avg_r));
    md.push_str(&format!("| Equity Index | {:.2} |\n", m.equity_index));
    md.push_str(&format!("| Max Drawdown | {:.2}% |\n", m.max_drawdown * 100.0));
    md.push_str(&format!(
        "| Max Consecutive Losses | {} |\n",
        m.max_consecutive_losses
    ));
    md.push('\n');

    md.push_str("## Per Symbol\n\n");
    md.push_str("| Symbol | Bars | Signals | Closed | Open | Win Rate | PF | Equity |\n");
    md.push_str("| --- | --- | --- | --- | --- | --- | --- | --- |\n");
    for s in &report.symbols {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {:.1}% | {:.2} | {:.2} |\n",
            s.symbol,
            s.bar_count,
            s.signals.len(),
            s.metrics.trades_closed,
            s.unresolved.len(),
            s.metrics.win_rate,
            s.metrics.profit_factor,
            s.metrics.equity_index,
        ));
    }

    if !report.failed.is_empty() {
        md.push_str("\n## Failed Symbols\n\n");
        for f in &report.failed {
            md.push_str(&format!("- {}: {}\n", f.symbol, f.error));
        }
    }
    md
}
