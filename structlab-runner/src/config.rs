//! Serializable run configuration, loaded from a single TOML file.
//!
//! Every section is optional and falls back to its defaults:
//!
//! ```toml
//! [universe]
//! symbols = ["BTCUSDT", "ETHUSDT"]
//! interval = "1h"
//! bar_count = 1000
//! data_dir = "candles"
//!
//! [structure]
//! lookback = 3
//!
//! [signals]
//! type = "STRUCTURE"
//! engulfing_window_minutes = 120
//!
//! [levels]
//! rr_ratio = 1.5
//!
//! [resolution]
//! tie_break = "conservative"
//!
//! [htf]
//! enabled = true
//! interval = "4h"
//!
//! [paper]
//! data_dir = "paper"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use structlab_core::domain::parse_interval;
use structlab_core::engine::{LiveConfig, ResolutionPolicy};
use structlab_core::risk::{HtfConfig, LevelConfig};
use structlab_core::signals::SignalConfig;

/// Unique identifier for a run configuration (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    pub symbols: Vec<String>,
    pub interval: String,
    /// Most recent bars requested per instrument.
    pub bar_count: usize,
    /// Directory holding `{SYMBOL}_{interval}.csv` candle files.
    pub data_dir: PathBuf,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["BTCUSDT".to_string()],
            interval: "1h".to_string(),
            bar_count: 1000,
            data_dir: PathBuf::from("candles"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    pub lookback: usize,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self { lookback: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperConfig {
    /// Directory for the signal, trade and equity CSV files.
    pub data_dir: PathBuf,
    /// Optional TOML table of tick sizes (`[ticks] BTCUSDT = 0.1`).
    pub tick_file: Option<PathBuf>,
    pub tick_ttl_secs: u64,
    /// Snapshot length fetched per tick.
    pub bar_count: usize,
    /// Minimum snapshot length before a live signal is considered.
    pub min_bars: usize,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("paper"),
            tick_file: None,
            tick_ttl_secs: 3600,
            bar_count: 300,
            min_bars: 30,
        }
    }
}

/// Complete configuration for backtests and paper ticks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StructLabConfig {
    pub universe: UniverseConfig,
    pub structure: StructureConfig,
    pub signals: SignalConfig,
    pub levels: LevelConfig,
    pub resolution: ResolutionPolicy,
    pub htf: HtfConfig,
    pub paper: PaperConfig,
}

impl StructLabConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.universe.symbols.is_empty() {
            return invalid("universe.symbols must not be empty".into());
        }
        if parse_interval(&self.universe.interval).is_none() {
            return invalid(format!("unrecognised universe.interval '{}'", self.universe.interval));
        }
        if self.structure.lookback == 0 {
            return invalid("structure.lookback must be >= 1".into());
        }
        let levels = &self.levels;
        if !(levels.rr_ratio > 0.0) {
            return invalid(format!("levels.rr_ratio must be > 0, got {}", levels.rr_ratio));
        }
        for (name, value) in [
            ("levels.sl_buffer_pct", levels.sl_buffer_pct),
            ("levels.atr_mult", levels.atr_mult),
            ("levels.max_tp_percent", levels.max_tp_percent),
            ("levels.max_risk_pct", levels.max_risk_pct),
            ("levels.min_risk_pct", levels.min_risk_pct),
            ("levels.min_tp_percent", levels.min_tp_percent),
            ("resolution.fee_roundtrip", self.resolution.fee_roundtrip),
        ] {
            if !(value >= 0.0) {
                return invalid(format!("{name} must be >= 0, got {value}"));
            }
        }
        if self.resolution.max_bars == 0 {
            return invalid("resolution.max_bars must be >= 1".into());
        }
        if self.resolution.timeout_bars == Some(0) {
            return invalid("resolution.timeout_bars must be >= 1 when set".into());
        }
        if self.htf.enabled {
            if parse_interval(&self.htf.interval).is_none() {
                return invalid(format!("unrecognised htf.interval '{}'", self.htf.interval));
            }
            if self.htf.lookback == 0 {
                return invalid("htf.lookback must be >= 1".into());
            }
        }
        Ok(())
    }

    /// Live-signal settings derived from the structure and paper sections.
    pub fn live(&self) -> LiveConfig {
        LiveConfig {
            lookback: self.structure.lookback,
            min_bars: self.paper.min_bars,
        }
    }

    /// Deterministic hash of this configuration.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("StructLabConfig serialization failed");
        let hash = blake3::hash(json.as_bytes());
        format!("{}", hash.to_hex())
    }
}
