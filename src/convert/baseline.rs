//! Zero-force baseline estimation.
//!
//! The baseline is the arithmetic mean of the sensor values inside a fixed index
//! window at the start of the (time-sorted) series, i.e. before the tip touches
//! the sample. It is a plain running mean: an outlier or a window that already
//! reaches into contact shifts it, and that is not corrected here.

use crate::domain::{BaselineWindow, RawPoint};
use crate::error::ProcessError;

/// Mean sensor value over `window`, clipped to the available points.
pub fn estimate_baseline(points: &[RawPoint], window: BaselineWindow) -> Result<f64, ProcessError> {
    if window.end <= window.start {
        return Err(ProcessError::InvalidConfig(format!(
            "baseline window {}..{} is empty",
            window.start, window.end
        )));
    }

    let end = window.end.min(points.len());
    if window.start >= end {
        return Err(ProcessError::EmptyData(format!(
            "baseline window starts at index {} but the series has {} point(s)",
            window.start,
            points.len()
        )));
    }

    let slice = &points[window.start..end];
    let sum: f64 = slice.iter().map(|p| p.value).sum();
    let baseline = sum / slice.len() as f64;

    if !baseline.is_finite() {
        return Err(ProcessError::EmptyData(
            "baseline window contains non-finite sensor values".to_string(),
        ));
    }

    Ok(baseline)
}
