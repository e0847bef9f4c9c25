//! Contact-mechanics models.
//!
//! Models are implemented as small, pure functions so that the fitter and the
//! synthetic data generator share one definition.

pub mod hertz;

pub use hertz::*;
