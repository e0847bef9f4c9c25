//! Retract segment extraction (stage 2).

pub mod retract;

pub use retract::*;
