//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - per-sample value types (`RawSample`, `ForceDistanceCurve`, `RetractSegment`)
//! - fit outputs (`HertzFitResult`, `MaterialGroup`, `RejectedFit`)
//! - configuration (`PipelineConfig` and its stage parts)

pub mod types;

pub use types::*;
