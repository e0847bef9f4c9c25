//! Mathematical utilities: summary statistics.

pub mod stats;

pub use stats::*;
