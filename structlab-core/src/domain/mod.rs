//! Domain types for StructLab

pub mod bar;
pub mod levels;
pub mod signal;
pub mod structure;
pub mod trade;

pub use bar::{index_of, last_index_at_or_before, normalize_bars, parse_interval, Bar, BarOpen};
pub use levels::{ReportedLevels, TradeLevels};
pub use signal::{dedup_by_timestamp, Direction, Signal};
pub use structure::{SwingKind, SwingPoint, SwingSeries, TrendLabel, TrendPoint};
pub use trade::{trade_key, ExitReason, Trade, TradeExit, TradeResult, TradeState};

/// Symbol type alias
pub type Symbol = String;
