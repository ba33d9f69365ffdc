//! Tick-size lookup and quantization of reported levels.
//!
//! Quantization happens strictly after level computation and only feeds
//! display and persistence. Stops round away from entry and targets round
//! away from entry too, so a reported level is never tighter than the
//! simulated one.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::data::DataError;
use crate::domain::{Direction, ReportedLevels, TradeLevels};

/// Nudge applied before floor/ceil so 0.3 / 0.1 does not floor to 2.
const TICK_EPSILON: f64 = 1e-9;

/// Instrument metadata lookup.
pub trait TickSizeSource: Send + Sync {
    /// `Ok(None)` when the instrument has no known tick size.
    fn tick_size(&self, symbol: &str) -> Result<Option<f64>, DataError>;
}

/// Injected cache in front of a [`TickSizeSource`] with a bounded lifetime.
///
/// Lookup failures are logged and not cached.
#[derive(Debug)]
pub struct TickSizeCache<S> {
    source: S,
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, Option<f64>)>>,
}

impl<S: TickSizeSource> TickSizeCache<S> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<f64> {
        let now = Instant::now();
        if let Ok(entries) = self.entries.lock() {
            if let Some((at, tick)) = entries.get(symbol) {
                if now.duration_since(*at) < self.ttl {
                    return *tick;
                }
            }
        }

        match self.source.tick_size(symbol) {
            Ok(tick) => {
                if let Ok(mut entries) = self.entries.lock() {
                    entries.insert(symbol.to_string(), (now, tick));
                }
                tick
            }
            Err(error) => {
                warn!(symbol = %symbol, %error, "tick size lookup failed");
                None
            }
        }
    }

    /// Quantized copy of `levels` for `symbol`; unchanged when no tick is known.
    pub fn report(&self, symbol: &str, levels: &TradeLevels) -> ReportedLevels {
        quantize(levels, self.get(symbol))
    }
}

fn decimals(tick: f64) -> i32 {
    (-tick.log10().floor()).max(0.0) as i32
}

fn snap(value: f64, tick: f64) -> f64 {
    let scale = 10f64.powi(decimals(tick));
    (value * scale).round() / scale
}

pub fn round_to_tick(price: f64, tick: f64) -> f64 {
    snap((price / tick).round() * tick, tick)
}

pub fn floor_to_tick(price: f64, tick: f64) -> f64 {
    snap((price / tick + TICK_EPSILON).floor() * tick, tick)
}

pub fn ceil_to_tick(price: f64, tick: f64) -> f64 {
    snap((price / tick - TICK_EPSILON).ceil() * tick, tick)
}

pub fn quantize(levels: &TradeLevels, tick: Option<f64>) -> ReportedLevels {
    let Some(tick) = tick.filter(|t| t.is_finite() && *t > 0.0) else {
        return ReportedLevels::from(levels);
    };
    let (stop_loss, take_profit) = match levels.direction {
        Direction::Buy => (
            floor_to_tick(levels.stop_loss, tick),
            ceil_to_tick(levels.take_profit, tick),
        ),
        Direction::Sell => (
            ceil_to_tick(levels.stop_loss, tick),
            floor_to_tick(levels.take_profit, tick),
        ),
    };
    ReportedLevels {
        entry_price: round_to_tick(levels.entry_price, tick),
        stop_loss,
        take_profit,
        tick_size: Some(tick),
    }
}
