//! Paper trading: one incremental tick across the configured universe.
//!
//! Each tick fetches a fresh snapshot per symbol (last bar still forming),
//! replays newly closed bars into that symbol's OPEN trades, then looks for
//! a live signal and opens at most one new trade. The equity row is
//! appended once every symbol has been handled. Running the same tick twice
//! on the same snapshot changes nothing but the equity log.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use structlab_core::data::CandleSource;
use structlab_core::domain::{trade_key, Direction, Trade};
use structlab_core::engine::{catch_up, live_signal, LiveSkip};
use structlab_core::risk::{HtfGate, LevelCalculator, TickSizeCache, TickSizeSource};

use crate::config::StructLabConfig;
use crate::metrics::EquitySnapshot;
use crate::runner::RunError;
use crate::store::{PaperStore, SignalRow, TradeRow};

/// What one tick did for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolTick {
    pub symbol: String,
    /// Trade ids closed during this tick.
    pub closed: Vec<String>,
    /// Trade id opened during this tick.
    pub opened: Option<String>,
    /// Why no trade was opened, when none was.
    pub skipped: Option<String>,
    /// Candle fetch failure; the symbol was left untouched.
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub symbols: Vec<SymbolTick>,
    pub equity: EquitySnapshot,
}

pub struct PaperTrader<'a, T> {
    config: &'a StructLabConfig,
    candles: &'a dyn CandleSource,
    ticks: TickSizeCache<T>,
    store: PaperStore,
    calculator: LevelCalculator,
}

impl<'a, T: TickSizeSource> PaperTrader<'a, T> {
    pub fn new(
        config: &'a StructLabConfig,
        candles: &'a dyn CandleSource,
        tick_source: T,
        store: PaperStore,
    ) -> Self {
        Self {
            config,
            candles,
            ticks: TickSizeCache::new(tick_source, Duration::from_secs(config.paper.tick_ttl_secs)),
            store,
            calculator: LevelCalculator::new(config.levels),
        }
    }

    pub fn store(&self) -> &PaperStore {
        &self.store
    }

    /// Process every symbol once and append an equity row stamped `now`.
    pub fn run_tick(&self, now: DateTime<Utc>) -> Result<TickReport, RunError> {
        let _span = info_span!("tick", at = %now).entered();
        let mut symbols = Vec::with_capacity(self.config.universe.symbols.len());
        for symbol in &self.config.universe.symbols {
            symbols.push(self.tick_symbol(symbol)?);
        }

        let trades = self.store.trades()?;
        let equity = EquitySnapshot::compute(now, &trades);
        self.store.append_equity(&equity)?;
        info!(
            equity_index = equity.equity_index,
            trades_closed = equity.trades_closed,
            win_rate = equity.win_rate,
            profit_factor = equity.profit_factor,
            pnl_percent_cum = equity.pnl_percent_cum,
            "tick complete"
        );
        Ok(TickReport { symbols, equity })
    }

    fn tick_symbol(&self, symbol: &str) -> Result<SymbolTick, RunError> {
        let _span = info_span!("symbol", symbol = %symbol).entered();
        let mut out = SymbolTick {
            symbol: symbol.to_string(),
            ..SymbolTick::default()
        };
        let interval = &self.config.universe.interval;
        let policy = &self.config.resolution;

        let snapshot = match self
            .candles
            .fetch_normalized(symbol, interval, self.config.paper.bar_count)
        {
            Ok(bars) => bars,
            Err(error) => {
                warn!(%error, "snapshot fetch failed; symbol skipped this tick");
                out.error = Some(error.to_string());
                return Ok(out);
            }
        };

        // Advance open trades.
        let mut open_directions: HashSet<Direction> = HashSet::new();
        let mut known_trades: HashSet<String> = HashSet::new();
        let mut updates = Vec::new();
        for trade in self.store.trades()? {
            known_trades.insert(trade.key());
            if trade.symbol != symbol || !trade.is_open() {
                continue;
            }
            let advanced = catch_up(trade.clone(), &snapshot, policy);
            if advanced.is_open() {
                open_directions.insert(advanced.direction());
            } else if let Some(exit) = advanced.exit {
                info!(
                    trade_id = %advanced.key(),
                    reason = %exit.reason,
                    exit_price = exit.exit_price,
                    pnl_percent = exit.pnl_percent,
                    r_multiple = exit.r_multiple,
                    "trade closed"
                );
                out.closed.push(advanced.key());
            }
            if advanced != trade {
                updates.push(TradeRow::from_trade(&advanced, interval, policy.fee_roundtrip));
            }
        }
        self.store.upsert_trades(updates)?;

        // Look for a new entry.
        let htf = HtfGate::prepare(&self.config.htf, self.candles, symbol);
        let proposal = match live_signal(&snapshot, &self.config.live(), &self.calculator, &htf) {
            Ok(proposal) => proposal,
            Err(skip) => {
                log_skip(&skip);
                out.skipped = Some(skip.to_string());
                return Ok(out);
            }
        };

        let direction = proposal.signal.direction;
        if open_directions.contains(&direction) {
            debug!(%direction, "open trade in same direction; signal skipped");
            out.skipped = Some(format!("{direction} trade already open"));
            return Ok(out);
        }
        let signal_id = trade_key(symbol, proposal.signal.timestamp);
        if self.store.has_signal(&signal_id)? {
            debug!(%signal_id, "signal already logged");
            out.skipped = Some(format!("signal {signal_id} already logged"));
            return Ok(out);
        }

        let reported = self.ticks.report(symbol, &proposal.levels);
        self.store.upsert_signal(SignalRow::new(
            symbol,
            interval,
            &proposal.signal,
            &reported,
            self.config.levels.rr_ratio,
            self.config.levels.sl_buffer_pct,
        ))?;

        let trade = Trade::open(symbol, proposal.levels);
        let trade_id = trade.key();
        if known_trades.contains(&trade_id) {
            debug!(%trade_id, "trade already exists");
            out.skipped = Some(format!("trade {trade_id} already exists"));
            return Ok(out);
        }
        self.store
            .upsert_trade(TradeRow::from_trade(&trade, interval, policy.fee_roundtrip))?;
        info!(
            %trade_id,
            %direction,
            entry = reported.entry_price,
            stop_loss = reported.stop_loss,
            take_profit = reported.take_profit,
            label = %proposal.label.label,
            "trade opened"
        );
        out.opened = Some(trade_id);
        Ok(out)
    }
}

fn log_skip(skip: &LiveSkip) {
    match skip {
        LiveSkip::Rejected(reason) => debug!(%reason, "live signal rejected"),
        other => debug!(reason = %other, "no live signal"),
    }
}
