//! StructLab Core: market structure, trade levels, outcome resolution.
//!
//! This crate contains the pure part of the system:
//! - Domain types (bars, swings, trend labels, signals, levels, trades)
//! - Swing detection, trend classification, break-of-structure + retest
//! - Signal strategies behind one trait
//! - Level calculator with buffers, RR target, caps, freshness, HTF gate
//! - One resolution step shared by the batch and incremental drivers

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod risk;
pub mod signals;
pub mod structure;
