//! Risk layer: trade levels, the higher-timeframe gate, tick quantization.

pub mod htf;
pub mod levels;
pub mod tick;

pub use htf::{HtfConfig, HtfFailurePolicy, HtfGate, HtfRejection};
pub use levels::{LevelCalculator, LevelConfig, Rejection};
pub use tick::{quantize, TickSizeCache, TickSizeSource};
