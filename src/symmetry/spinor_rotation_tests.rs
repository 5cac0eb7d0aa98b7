use approx::assert_relative_eq;
use nalgebra::{Matrix2, Matrix3, Vector3};
use num_complex::Complex;

use crate::symmetry::spinor_rotation::{spin_rotation, su2_from_angle_axis};

type C64 = Complex<f64>;

#[test]
fn test_spinor_rotation_su2_identity_and_double_cover() {
    let z = Vector3::new(0.0, 0.0, 1.0);
    assert_relative_eq!(
        su2_from_angle_axis(0.0, &z),
        Matrix2::identity(),
        epsilon = 1e-14
    );
    // A full 2π rotation is −1 in SU(2).
    assert_relative_eq!(
        su2_from_angle_axis(2.0 * std::f64::consts::PI, &z),
        -Matrix2::identity(),
        epsilon = 1e-12
    );
}

#[test]
fn test_spinor_rotation_su2_c2z() {
    let z = Vector3::new(0.0, 0.0, 1.0);
    let s = su2_from_angle_axis(std::f64::consts::PI, &z);
    let expected = Matrix2::new(
        C64::new(0.0, -1.0),
        C64::new(0.0, 0.0),
        C64::new(0.0, 0.0),
        C64::new(0.0, 1.0),
    );
    assert_relative_eq!(s, expected, epsilon = 1e-12);
}

#[test]
fn test_spinor_rotation_su2_composition() {
    let axis = Vector3::new(1.0, -2.0, 0.5);
    let a = 0.7;
    let b = 1.9;
    let product = su2_from_angle_axis(a, &axis) * su2_from_angle_axis(b, &axis);
    assert_relative_eq!(
        product,
        su2_from_angle_axis(a + b, &axis),
        epsilon = 1e-12
    );
}

#[test]
fn test_spinor_rotation_from_cartesian() {
    assert_relative_eq!(
        spin_rotation(&Matrix3::identity()).unwrap(),
        Matrix2::identity(),
        epsilon = 1e-12
    );

    // Spatial inversion leaves spin invariant.
    assert_relative_eq!(
        spin_rotation(&(-Matrix3::<f64>::identity())).unwrap(),
        Matrix2::identity(),
        epsilon = 1e-12
    );

    // A stretched matrix is not a point-group operation.
    assert!(spin_rotation(&(Matrix3::identity() * 2.0)).is_err());
}
