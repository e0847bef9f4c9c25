//! Input/output helpers.
//!
//! - raw CSV / contact point / report ingest (`ingest`)
//! - batch folder discovery + output naming (`layout`)
//! - tables, reports and JSON summary (`export`)

pub mod export;
pub mod ingest;
pub mod layout;

pub use export::*;
pub use ingest::*;
pub use layout::*;
