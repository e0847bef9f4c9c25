//! Reporting utilities: formatted terminal output for samples and batches.

pub mod format;

pub use format::*;
