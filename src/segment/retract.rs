//! Retract (unloading) branch extraction.
//!
//! Given a force–distance curve and an externally determined contact point:
//!
//! - the force maximum marks the turnaround between loading and unloading
//! - the curve point nearest to the contact point closes the branch
//!
//! Points strictly between the two are re-expressed relative to the contact
//! point. Indentation is zeroed at the supplied contact distance while force is
//! zeroed at the curve's force at `contact_index`; the two reference points are
//! kept separate on purpose.

use log::debug;

use crate::domain::{ForceDistanceCurve, IndentationPoint, RetractSegment};
use crate::error::ProcessError;

/// Minimum number of points for a usable segment.
pub const MIN_SEGMENT_POINTS: usize = 3;

/// Index of the global force maximum (first one on ties).
pub fn max_force_index(curve: &ForceDistanceCurve) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, p) in curve.points.iter().enumerate() {
        if !p.force.is_finite() {
            continue;
        }
        match best {
            Some((_, f)) if p.force <= f => {}
            _ => best = Some((i, p.force)),
        }
    }
    best.map(|(i, _)| i)
}

/// Index of the point whose distance is closest to `contact_point` (first one on ties).
pub fn contact_index(curve: &ForceDistanceCurve, contact_point: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, p) in curve.points.iter().enumerate() {
        let d = (p.distance - contact_point).abs();
        if !d.is_finite() {
            continue;
        }
        match best {
            Some((_, bd)) if d >= bd => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}

/// Extract the unloading branch approaching the contact point.
pub fn extract_retract(curve: &ForceDistanceCurve, contact_point: f64) -> Result<RetractSegment, ProcessError> {
    if curve.is_empty() {
        return Err(ProcessError::EmptyData("force–distance curve has no points".to_string()));
    }
    if !contact_point.is_finite() {
        return Err(ProcessError::InvalidSegment(format!(
            "contact point is not finite ({contact_point})"
        )));
    }

    let max_idx = max_force_index(curve)
        .ok_or_else(|| ProcessError::EmptyData("curve has no finite force values".to_string()))?;
    let cp_idx = contact_index(curve, contact_point)
        .ok_or_else(|| ProcessError::EmptyData("curve has no finite distance values".to_string()))?;

    debug!("retract: max_force_index={max_idx}, contact_index={cp_idx}");

    if max_idx >= cp_idx {
        return Err(ProcessError::InvalidSegment(format!(
            "force maximum (index {max_idx}) is at or after the contact point (index {cp_idx})"
        )));
    }

    let force_ref = curve.points[cp_idx].force;
    let points: Vec<IndentationPoint> = curve.points[max_idx + 1..cp_idx]
        .iter()
        .map(|p| IndentationPoint {
            indentation: -(p.distance - contact_point),
            force: p.force - force_ref,
        })
        .collect();

    if points.len() < MIN_SEGMENT_POINTS {
        return Err(ProcessError::InvalidSegment(format!(
            "only {} point(s) between force maximum and contact point (need >= {MIN_SEGMENT_POINTS})",
            points.len()
        )));
    }

    Ok(RetractSegment {
        points,
        units: curve.units,
        contact_point,
        contact_index: cp_idx,
        max_force_index: max_idx,
    })
}
