//! Outcome engine: one resolution step, two drivers.
//!
//! - [`resolution`]: the pure step function and close arithmetic
//! - [`simulator`]: batch replay over a full series
//! - [`incremental`]: one step per newly closed bar on persisted trades
//! - [`live`]: signal from a snapshot with a still-forming last bar
//! - [`pipeline`]: per-instrument batch evaluation

pub mod incremental;
pub mod live;
pub mod path_policy;
pub mod pipeline;
pub mod resolution;
pub mod simulator;

pub use incremental::{advance, advance_with_snapshot, catch_up};
pub use live::{live_signal, LiveConfig, LiveProposal, LiveSkip};
pub use path_policy::{FirstTouch, TieBreak};
pub use pipeline::{Pipeline, RejectedSignal, SeriesEvaluation};
pub use resolution::{close_trade, step, ResolutionPolicy};
pub use simulator::{simulate, Outcome};
