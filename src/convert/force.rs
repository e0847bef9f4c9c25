//! Raw sensor series -> calibrated force–distance curve.
//!
//! Steps:
//! 1. stable sort by time and re-zero time to the first reading
//! 2. subtract the early-window baseline
//! 3. affine force calibration
//! 4. distance from constant stage speed (`distance = time * speed`)

use log::debug;

use crate::convert::baseline::estimate_baseline;
use crate::domain::{
    BaselineWindow, ConvertConfig, ForceDistanceCurve, ForcePoint, RawPoint, RawSample,
};
use crate::error::ProcessError;

/// Time-sorted readings with time re-zeroed to the first sample.
pub fn sorted_rezeroed(raw: &RawSample) -> Result<Vec<RawPoint>, ProcessError> {
    if raw.is_empty() {
        return Err(ProcessError::EmptyData("raw sample has no points".to_string()));
    }

    let mut points = raw.points.clone();
    points.sort_by(|a, b| a.time_s.total_cmp(&b.time_s));

    let t0 = points[0].time_s;
    for p in &mut points {
        p.time_s -= t0;
    }
    Ok(points)
}

/// Baseline and baseline-corrected sensor values of time-sorted readings.
pub fn baseline_correct(
    points: &[RawPoint],
    window: BaselineWindow,
) -> Result<(f64, Vec<f64>), ProcessError> {
    let baseline = estimate_baseline(points, window)?;
    let corrected = points.iter().map(|p| p.value - baseline).collect();
    Ok((baseline, corrected))
}

/// Convert a raw sample into a force–distance curve.
pub fn convert(raw: &RawSample, config: &ConvertConfig) -> Result<ForceDistanceCurve, ProcessError> {
    validate_config(config)?;

    let points = sorted_rezeroed(raw)?;
    let (baseline, corrected) = baseline_correct(&points, config.baseline)?;
    debug!("baseline over {} points: {baseline}", points.len());

    let cal = config.calibration;
    let points = points
        .iter()
        .zip(corrected)
        .map(|(p, c)| ForcePoint {
            distance: p.time_s * config.pull_speed * config.length_scale,
            force: (cal.slope * c + cal.offset) * cal.unit_scale,
        })
        .collect();

    Ok(ForceDistanceCurve {
        points,
        units: config.units(),
        baseline,
    })
}

fn validate_config(config: &ConvertConfig) -> Result<(), ProcessError> {
    if !(config.pull_speed.is_finite() && config.pull_speed > 0.0) {
        return Err(ProcessError::InvalidConfig(format!(
            "pull speed must be finite and > 0 (got {})",
            config.pull_speed
        )));
    }
    if !(config.length_scale.is_finite() && config.length_scale > 0.0) {
        return Err(ProcessError::InvalidConfig(format!(
            "length scale must be finite and > 0 (got {})",
            config.length_scale
        )));
    }
    let cal = config.calibration;
    if !(cal.slope.is_finite() && cal.offset.is_finite() && cal.unit_scale.is_finite()) {
        return Err(ProcessError::InvalidConfig(
            "calibration constants must be finite".to_string(),
        ));
    }
    if !(config.force_to_n.is_finite() && config.force_to_n > 0.0) {
        return Err(ProcessError::InvalidConfig(format!(
            "force unit must be finite and > 0 N (got {})",
            config.force_to_n
        )));
    }
    Ok(())
}
