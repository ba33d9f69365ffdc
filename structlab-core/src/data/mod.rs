//! Market data seam: where bars come from.

pub mod memory;
pub mod provider;

pub use memory::MemoryCandles;
pub use provider::{CandleSource, DataError};
