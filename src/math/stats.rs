//! Small summary statistics shared by the fitter and the aggregator.

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Coefficient of determination `1 - SS_res / SS_tot`.
///
/// Returns `None` when `SS_tot` is zero (constant observations), where R² is
/// undefined, or when the inputs are empty or of different lengths.
pub fn r_squared(observed: &[f64], predicted: &[f64]) -> Option<f64> {
    if observed.len() != predicted.len() {
        return None;
    }
    let mean_obs = mean(observed)?;

    let ss_tot: f64 = observed.iter().map(|y| (y - mean_obs) * (y - mean_obs)).sum();
    if !(ss_tot > 0.0) {
        return None;
    }
    let ss_res: f64 = observed
        .iter()
        .zip(predicted.iter())
        .map(|(y, f)| (y - f) * (y - f))
        .sum();

    Some(1.0 - ss_res / ss_tot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
    }

    #[test]
    fn perfect_prediction_has_unit_r_squared() {
        let y = [1.0, 2.0, 4.0];
        assert_eq!(r_squared(&y, &y), Some(1.0));
    }

    #[test]
    fn mean_prediction_has_zero_r_squared() {
        let y = [1.0, 2.0, 3.0];
        let r2 = r_squared(&y, &[2.0, 2.0, 2.0]).unwrap();
        assert!(r2.abs() < 1e-15);
    }

    #[test]
    fn worse_than_mean_is_negative() {
        let y = [1.0, 2.0, 3.0];
        let r2 = r_squared(&y, &[3.0, 2.0, 1.0]).unwrap();
        assert!((r2 + 3.0).abs() < 1e-12);
    }

    #[test]
    fn constant_observations_are_undefined() {
        assert_eq!(r_squared(&[5.0, 5.0, 5.0], &[4.0, 5.0, 6.0]), None);
    }
}
