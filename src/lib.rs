//! `afm-hertz` library crate.
//!
//! The binary (`afm`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the stages can be driven from other tools (notebooks, batch jobs)
//!
//! Stages: `convert` -> `segment` -> `fit` -> `aggregate`.

pub mod aggregate;
pub mod app;
pub mod cli;
pub mod convert;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod segment;
