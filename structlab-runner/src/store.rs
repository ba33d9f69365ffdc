//! CSV persistence for paper trading.
//!
//! Three files under one directory, each created with its header on first
//! use:
//! - `signals_live.csv`: one row per logged signal, upserted by `signal_id`
//! - `trades_live.csv`: one row per trade, upserted by `trade_id`
//! - `equity_live.csv`: append-only, one row per tick
//!
//! Upserts rewrite the whole file through a temporary sibling and a rename,
//! so a crash leaves either the old or the new table on disk.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use structlab_core::domain::{
    trade_key, Direction, ExitReason, ReportedLevels, Signal, Trade, TradeExit, TradeLevels,
    TradeResult, TradeState,
};

use crate::metrics::EquitySnapshot;

pub const SIGNALS_FILE: &str = "signals_live.csv";
pub const TRADES_FILE: &str = "trades_live.csv";
pub const EQUITY_FILE: &str = "equity_live.csv";

pub const SIGNALS_COLUMNS: &[&str] = &[
    "signal_id",
    "timestamp_utc",
    "symbol",
    "interval",
    "side",
    "entry_price",
    "sl",
    "tp",
    "rr_ratio",
    "sl_buffer_pct",
    "status",
    "note",
];

pub const TRADES_COLUMNS: &[&str] = &[
    "trade_id",
    "open_time_utc",
    "close_time_utc",
    "symbol",
    "interval",
    "side",
    "entry_price",
    "sl",
    "tp",
    "exit_price",
    "exit_reason",
    "bars_held",
    "fee_roundtrip",
    "risk_abs",
    "r_multiple",
    "pnl_percent",
    "result",
    "state",
    "effective_rr",
    "tp_capped",
    "last_bar_time_utc",
];

pub const EQUITY_COLUMNS: &[&str] = &[
    "timestamp_utc",
    "equity_index",
    "trades_closed",
    "win_rate",
    "profit_factor",
    "pnl_percent_cum",
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("corrupt row '{key}' in {path}: {reason}")]
    Corrupt {
        path: PathBuf,
        key: String,
        reason: String,
    },
}

/// A logged signal, carrying the tick-quantized levels shown to users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    pub signal_id: String,
    pub timestamp_utc: DateTime<Utc>,
    pub symbol: String,
    pub interval: String,
    pub side: Direction,
    pub entry_price: f64,
    pub sl: f64,
    pub tp: f64,
    pub rr_ratio: f64,
    pub sl_buffer_pct: f64,
    pub status: String,
    pub note: String,
}

impl SignalRow {
    pub fn new(
        symbol: &str,
        interval: &str,
        signal: &Signal,
        reported: &ReportedLevels,
        rr_ratio: f64,
        sl_buffer_pct: f64,
    ) -> Self {
        Self {
            signal_id: trade_key(symbol, signal.timestamp),
            timestamp_utc: signal.timestamp,
            symbol: symbol.to_string(),
            interval: interval.to_string(),
            side: signal.direction,
            entry_price: reported.entry_price,
            sl: reported.stop_loss,
            tp: reported.take_profit,
            rr_ratio,
            sl_buffer_pct,
            status: "opened".to_string(),
            note: String::new(),
        }
    }
}

/// Persisted trade state. Levels are the unquantized ones the engine
/// resolves against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRow {
    pub trade_id: String,
    pub open_time_utc: DateTime<Utc>,
    pub close_time_utc: Option<DateTime<Utc>>,
    pub symbol: String,
    pub interval: String,
    pub side: Direction,
    pub entry_price: f64,
    pub sl: f64,
    pub tp: f64,
    pub exit_price: Option<f64>,
    pub exit_reason: Option<ExitReason>,
    pub bars_held: usize,
    pub fee_roundtrip: f64,
    pub risk_abs: f64,
    pub r_multiple: Option<f64>,
    pub pnl_percent: Option<f64>,
    pub result: Option<TradeResult>,
    pub state: TradeState,
    pub effective_rr: f64,
    pub tp_capped: bool,
    pub last_bar_time_utc: Option<DateTime<Utc>>,
}

impl TradeRow {
    pub fn from_trade(trade: &Trade, interval: &str, fee_roundtrip: f64) -> Self {
        let levels = &trade.levels;
        Self {
            trade_id: trade.key(),
            open_time_utc: levels.entry_time,
            close_time_utc: trade.exit.map(|e| e.exit_time),
            symbol: trade.symbol.clone(),
            interval: interval.to_string(),
            side: levels.direction,
            entry_price: levels.entry_price,
            sl: levels.stop_loss,
            tp: levels.take_profit,
            exit_price: trade.exit.map(|e| e.exit_price),
            exit_reason: trade.exit.map(|e| e.reason),
            bars_held: trade.bars_held,
            fee_roundtrip,
            risk_abs: levels.risk().max(0.0),
            r_multiple: trade.r_multiple(),
            pnl_percent: trade.pnl_percent(),
            result: trade.result(),
            state: trade.state,
            effective_rr: levels.effective_rr,
            tp_capped: levels.tp_capped,
            last_bar_time_utc: trade.last_bar_time,
        }
    }

    /// Rebuild engine state. A CLOSED row must carry every exit field.
    pub fn to_trade(&self) -> Result<Trade, String> {
        let exit = match self.state {
            TradeState::Open => None,
            TradeState::Closed => Some(TradeExit {
                exit_time: self.close_time_utc.ok_or("closed without close_time_utc")?,
                exit_price: self.exit_price.ok_or("closed without exit_price")?,
                reason: self.exit_reason.ok_or("closed without exit_reason")?,
                pnl_percent: self.pnl_percent.ok_or("closed without pnl_percent")?,
                r_multiple: self.r_multiple.ok_or("closed without r_multiple")?,
                result: self.result.ok_or("closed without result")?,
            }),
        };
        Ok(Trade {
            symbol: self.symbol.clone(),
            levels: TradeLevels {
                direction: self.side,
                entry_price: self.entry_price,
                entry_time: self.open_time_utc,
                stop_loss: self.sl,
                take_profit: self.tp,
                effective_rr: self.effective_rr,
                tp_capped: self.tp_capped,
            },
            bars_held: self.bars_held,
            state: self.state,
            last_bar_time: self.last_bar_time_utc,
            exit,
        })
    }
}

/// Directory-backed signal, trade and equity tables.
#[derive(Debug, Clone)]
pub struct PaperStore {
    dir: PathBuf,
}

impl PaperStore {
    /// Open (or create) the store, writing headers to any missing file.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        let store = Self { dir };
        for (file, columns) in [
            (SIGNALS_FILE, SIGNALS_COLUMNS),
            (TRADES_FILE, TRADES_COLUMNS),
            (EQUITY_FILE, EQUITY_COLUMNS),
        ] {
            let path = store.dir.join(file);
            if !path.exists() {
                write_rows::<SignalRow>(&path, columns, &[])?;
            }
        }
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    pub fn signals(&self) -> Result<Vec<SignalRow>, StoreError> {
        read_rows(&self.path(SIGNALS_FILE))
    }

    pub fn has_signal(&self, signal_id: &str) -> Result<bool, StoreError> {
        Ok(self.signals()?.iter().any(|s| s.signal_id == signal_id))
    }

    pub fn upsert_signal(&self, row: SignalRow) -> Result<(), StoreError> {
        let path = self.path(SIGNALS_FILE);
        let mut rows: Vec<SignalRow> = read_rows(&path)?;
        upsert_by(&mut rows, row, |r| r.signal_id.clone());
        write_rows(&path, SIGNALS_COLUMNS, &rows)
    }

    pub fn trade_rows(&self) -> Result<Vec<TradeRow>, StoreError> {
        read_rows(&self.path(TRADES_FILE))
    }

    pub fn trades(&self) -> Result<Vec<Trade>, StoreError> {
        let path = self.path(TRADES_FILE);
        self.trade_rows()?
            .iter()
            .map(|row| {
                row.to_trade().map_err(|reason| StoreError::Corrupt {
                    path: path.clone(),
                    key: row.trade_id.clone(),
                    reason,
                })
            })
            .collect()
    }

    pub fn upsert_trade(&self, row: TradeRow) -> Result<(), StoreError> {
        self.upsert_trades(vec![row])
    }

    /// Upsert several rows with a single rewrite.
    pub fn upsert_trades(&self, new_rows: Vec<TradeRow>) -> Result<(), StoreError> {
        if new_rows.is_empty() {
            return Ok(());
        }
        let path = self.path(TRADES_FILE);
        let mut rows: Vec<TradeRow> = read_rows(&path)?;
        for row in new_rows {
            upsert_by(&mut rows, row, |r| r.trade_id.clone());
        }
        write_rows(&path, TRADES_COLUMNS, &rows)
    }

    pub fn equity(&self) -> Result<Vec<EquitySnapshot>, StoreError> {
        read_rows(&self.path(EQUITY_FILE))
    }

    pub fn append_equity(&self, snapshot: &EquitySnapshot) -> Result<(), StoreError> {
        let path = self.path(EQUITY_FILE);
        if !path.exists() {
            write_rows::<EquitySnapshot>(&path, EQUITY_COLUMNS, &[])?;
        }
        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        wtr.serialize(snapshot).map_err(|source| StoreError::Csv {
            path: path.clone(),
            source,
        })?;
        wtr.flush().map_err(|source| StoreError::Io { path, source })
    }
}

fn upsert_by<T>(rows: &mut Vec<T>, row: T, key: impl Fn(&T) -> String) {
    let id = key(&row);
    match rows.iter_mut().find(|existing| key(&**existing) == id) {
        Some(existing) => *existing = row,
        None => rows.push(row),
    }
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut rdr = csv::Reader::from_path(path).map_err(|source| StoreError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    rdr.deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|source| StoreError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

fn write_rows<T: Serialize>(path: &Path, columns: &[&str], rows: &[T]) -> Result<(), StoreError> {
    let csv_err = |source| StoreError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(vec![]);
    wtr.write_record(columns).map_err(csv_err)?;
    for row in rows {
        wtr.serialize(row).map_err(csv_err)?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| StoreError::Io {
            path: path.to_path_buf(),
            source: e.into_error(),
        })?;

    let tmp = path.with_extension("csv.tmp");
    fs::write(&tmp, bytes).map_err(|source| StoreError::Io {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}
