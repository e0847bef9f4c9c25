//! Hertz model fitting (stage 3).
//!
//! Responsibilities:
//!
//! - convert a retract segment to SI
//! - solve for the effective modulus with bounded Levenberg–Marquardt
//! - score the fit (R²) and classify failures (degenerate data vs. solver)

pub mod hertz;

pub use hertz::*;
