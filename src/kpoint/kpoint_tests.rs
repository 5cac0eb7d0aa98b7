use approx::assert_relative_eq;
use nalgebra::Matrix2;
use ndarray::{Array1, Array2};
use num_complex::Complex;

use crate::auxiliary::template_systems::{
    gamma_basis_7, scalar_parity_kpoint, spinor_inversion_kpoint, wannier_band_kpoint,
};
use crate::kpoint::Kpoint;
use crate::symmetry::SymmetryOperation;

type C64 = Complex<f64>;

fn c(re: f64) -> C64 {
    C64::new(re, 0.0)
}

#[test]
fn test_kpoint_builder_validates_shapes() {
    // Zero bands.
    assert!(Kpoint::builder()
        .ik(0)
        .basis(gamma_basis_7())
        .coefficients(Array2::<C64>::zeros((0, 7)))
        .energies(Array1::zeros(0))
        .build()
        .is_err());

    // Column count inconsistent with the basis.
    assert!(Kpoint::builder()
        .ik(0)
        .basis(gamma_basis_7())
        .coefficients(Array2::from_elem((1, 6), c(1.0)))
        .energies(Array1::zeros(1))
        .build()
        .is_err());

    // Spinor flag doubles the expected column count.
    assert!(Kpoint::builder()
        .ik(0)
        .spinor(true)
        .basis(gamma_basis_7())
        .coefficients(Array2::from_elem((1, 7), c(1.0)))
        .energies(Array1::zeros(1))
        .build()
        .is_err());
}

#[test]
fn test_kpoint_normalise() {
    let mut wf = Array2::from_elem((1, 7), c(0.0));
    wf[[0, 0]] = c(0.3);
    wf[[0, 1]] = c(0.4);
    let mut kp = Kpoint::builder()
        .ik(0)
        .basis(gamma_basis_7())
        .coefficients(wf)
        .energies(Array1::zeros(1))
        .build()
        .unwrap();
    kp.normalise();
    let norm: f64 = kp
        .coefficients()
        .row(0)
        .iter()
        .map(|z| z.norm_sqr())
        .sum();
    assert_relative_eq!(norm, 1.0, epsilon = 1e-14);
}

#[test]
fn test_kpoint_self_overlap_of_orthonormal_bands() {
    let kp = scalar_parity_kpoint();
    let m = kp.overlap(&kp).unwrap();
    for i in 0..3 {
        for j in 0..3 {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert_relative_eq!(m[[i, j]].re, expected, epsilon = 1e-12);
            assert_relative_eq!(m[[i, j]].im, 0.0, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_kpoint_overlap_neighbouring_kpoints() {
    // The analytic Wannier band: ⟨u_k|u_k'⟩ = e^{2πi(k−k')x₀} for
    // neighbouring points sharing both G-vectors.
    let x0 = 0.25;
    let a = wannier_band_kpoint(0, 8, x0);
    let b = wannier_band_kpoint(1, 8, x0);
    let m = a.overlap(&b).unwrap();
    let expected = C64::from_polar(1.0, -2.0 * std::f64::consts::PI * (1.0 / 8.0) * x0);
    assert_relative_eq!(m[[0, 0]].re, expected.re, epsilon = 1e-12);
    assert_relative_eq!(m[[0, 0]].im, expected.im, epsilon = 1e-12);
}

#[test]
fn test_kpoint_overlap_winding_edge() {
    // Closing the loop: only one G-vector survives the reciprocal-lattice
    // shift, so the overlap magnitude drops to ½ while the phase follows
    // the same analytic form.
    let x0 = 0.25;
    let last = wannier_band_kpoint(7, 8, x0);
    let first = wannier_band_kpoint(0, 8, x0);
    let m = last.overlap(&first).unwrap();
    assert_relative_eq!(m[[0, 0]].norm(), 0.5, epsilon = 1e-12);
}

#[test]
fn test_kpoint_separate_by_parity() {
    let kp = scalar_parity_kpoint();
    let separated = kp
        .separate(
            &SymmetryOperation::inversion(),
            None,
            1e-8,
            0.01,
            false,
            1e-5,
            1e-3,
            1e-5,
        )
        .unwrap();
    assert_eq!(separated.len(), 2);
    // Phase ordering puts the +1 eigenvalue (angle 0) before −1 (angle π).
    let (even_val, even_kp) = &separated[0];
    let (odd_val, odd_kp) = &separated[1];
    assert_relative_eq!(even_val.re, 1.0, epsilon = 1e-10);
    assert_relative_eq!(odd_val.re, -1.0, epsilon = 1e-10);
    assert_eq!(even_kp.num_bands(), 2);
    assert_eq!(odd_kp.num_bands(), 1);
    assert_relative_eq!(even_kp.energies()[0], -1.0, epsilon = 1e-12);
    assert_relative_eq!(even_kp.energies()[1], 2.0, epsilon = 1e-12);
    assert_relative_eq!(odd_kp.energies()[0], 0.5, epsilon = 1e-12);
}

#[test]
fn test_kpoint_separate_kramers_pairs() {
    let kp = spinor_inversion_kpoint();
    let spin = Matrix2::identity();
    let separated = kp
        .separate(
            &SymmetryOperation::inversion(),
            Some(&spin),
            1e-8,
            0.01,
            true,
            1e-5,
            1e-3,
            1e-5,
        )
        .unwrap();
    assert_eq!(separated.len(), 2);
    // Kramers grouping sorts by the real part: the odd pair first.
    assert_relative_eq!(separated[0].0.re, -1.0, epsilon = 1e-10);
    assert_relative_eq!(separated[1].0.re, 1.0, epsilon = 1e-10);
    assert_eq!(separated[0].1.num_bands(), 2);
    assert_eq!(separated[1].1.num_bands(), 2);
}
