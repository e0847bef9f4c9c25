//! Synthetic input generation for demos and tests.

pub mod synth;

pub use synth::*;
