//! SU(2) spin rotations associated with spatial symmetry operations.

use anyhow::{self, format_err};
use lazy_static::lazy_static;
use nalgebra::{Matrix2, Matrix3, Rotation3, Vector3};
use num_complex::Complex;

#[cfg(test)]
#[path = "spinor_rotation_tests.rs"]
mod spinor_rotation_tests;

lazy_static! {
    /// The time-reversal spin factor $`-\mathrm{i}\sigma_y`$.
    pub(crate) static ref MINUS_I_SIGMA_Y: Matrix2<Complex<f64>> = Matrix2::new(
        Complex::new(0.0, 0.0),
        Complex::new(-1.0, 0.0),
        Complex::new(1.0, 0.0),
        Complex::new(0.0, 0.0),
    );
}

/// Returns the SU(2) matrix of the rotation by `angle` about the unit vector
/// `axis`:
///
/// ```math
///     \mathbf{S}(\phi, \hat{\mathbf{n}})
///     = \cos\tfrac{\phi}{2}\, \mathbf{I}
///     - \mathrm{i} \sin\tfrac{\phi}{2}\, \hat{\mathbf{n}} \cdot
///       \boldsymbol{\sigma}.
/// ```
///
/// A positive `angle` is an anticlockwise rotation when looking down `axis`.
pub fn su2_from_angle_axis(angle: f64, axis: &Vector3<f64>) -> Matrix2<Complex<f64>> {
    let n = axis.normalize();
    let c = (angle / 2.0).cos();
    let s = (angle / 2.0).sin();
    Matrix2::new(
        Complex::new(c, -s * n.z),
        Complex::new(-s * n.y, -s * n.x),
        Complex::new(s * n.y, -s * n.x),
        Complex::new(c, s * n.z),
    )
}

/// Returns the SU(2) spin rotation induced by a Cartesian point-group
/// operation. Improper operations act on spin through their proper part
/// only, since spatial inversion leaves spin invariant.
///
/// The result carries the usual double-valuedness of SU(2): `spin_rotation`
/// fixes one of the two signs by taking the rotation angle in $`[0, \pi]`$.
/// Reference character tables for double groups must follow the same
/// convention, or explicit spin matrices must be supplied with the symmetry
/// operations.
pub fn spin_rotation(cartesian_rotation: &Matrix3<f64>) -> Result<Matrix2<Complex<f64>>, anyhow::Error> {
    let det = cartesian_rotation.determinant();
    if !(0.5..2.0).contains(&det.abs()) {
        return Err(format_err!(
            "The Cartesian rotation has determinant {det:.6}, which is not ±1."
        ));
    }
    let proper = cartesian_rotation * det.signum();
    let rotation = Rotation3::from_matrix(&proper);
    match rotation.axis_angle() {
        Some((axis, angle)) => Ok(su2_from_angle_axis(angle, &axis.into_inner())),
        None => Ok(Matrix2::identity()),
    }
}
