//! Analysis modules.
//!
//! Reshaping of wide chunk tables and per-position trajectory statistics.

pub mod aggregator;

pub use aggregator::*;
