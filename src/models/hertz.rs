//! Hertz sphere-on-flat contact model.
//!
//! `F(δ) = 4/3 · E · sqrt(R) · δ^{3/2}`
//!
//! with indentation `δ` and tip radius `R` in meters, effective modulus `E` in
//! pascals and force `F` in newtons. The model is linear in `E`; everything
//! that does not depend on `E` is the *basis* value.

/// Hertz basis `4/3 · sqrt(R) · δ^{3/2}`.
///
/// Non-positive indentation means the tip is not in contact and contributes no
/// force.
pub fn hertz_basis(indentation_m: f64, tip_radius_m: f64) -> f64 {
    if indentation_m <= 0.0 {
        return 0.0;
    }
    (4.0 / 3.0) * tip_radius_m.sqrt() * indentation_m.powf(1.5)
}

/// Predicted force (N) for modulus `e_pa`.
pub fn hertz_force(indentation_m: f64, e_pa: f64, tip_radius_m: f64) -> f64 {
    e_pa * hertz_basis(indentation_m, tip_radius_m)
}
