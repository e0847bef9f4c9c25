//! Baseline & force conversion (stage 1).

pub mod baseline;
pub mod force;

pub use baseline::*;
pub use force::*;
