use approx::assert_relative_eq;
use nalgebra::Vector3;
use ndarray::{Array1, Array2};
use num_complex::Complex;

use crate::analysis::AnalysisThresholds;
use crate::auxiliary::constants::KINETIC_PREFACTOR;
use crate::auxiliary::template_systems::{
    cubic_rec, gamma_basis_7, inversion_space_group, scalar_parity_kpoint,
    spinor_inversion_kpoint, wannier_band_kpoint,
};
use crate::bandstructure::BandStructure;
use crate::basis::KBasis;
use crate::kpoint::Kpoint;

type C64 = Complex<f64>;

/// A single-band k-point with only G = 0 in its basis, for path-geometry
/// tests.
fn trivial_kpoint(ik: usize, kpt: Vector3<f64>) -> Kpoint {
    let ecut = 0.2 * KINETIC_PREFACTOR * (2.0 * std::f64::consts::PI).powi(2);
    let basis = KBasis::from_native(ik, kpt, &cubic_rec(), &[Vector3::new(0, 0, 0)], ecut, ecut)
        .expect("Only G = 0 fits under the reduced cutoff.");
    Kpoint::builder()
        .ik(ik)
        .basis(basis)
        .coefficients(Array2::from_elem((1, 1), C64::new(1.0, 0.0)))
        .energies(Array1::zeros(1))
        .build()
        .unwrap()
}

/// A copy of the scalar parity k-point with adjusted energies and upper
/// band.
fn scalar_kpoint_with(ik: usize, energies: Vec<f64>, upper: Option<f64>) -> Kpoint {
    let template = scalar_parity_kpoint();
    Kpoint::builder()
        .ik(ik)
        .basis(template.basis().clone())
        .coefficients(template.coefficients().clone())
        .energies(Array1::from_vec(energies))
        .upper(upper)
        .build()
        .unwrap()
}

#[test]
fn test_bandstructure_gaps() {
    let bs = BandStructure::builder()
        .space_group(inversion_space_group(false))
        .kpoints(vec![
            scalar_kpoint_with(0, vec![-1.0, 0.5, 2.0], Some(3.0)),
            scalar_kpoint_with(1, vec![-1.0, 0.5, 2.5], Some(4.0)),
        ])
        .build()
        .unwrap();
    // Direct: min(3.0 − 2.0, 4.0 − 2.5) = 1.0.
    assert_relative_eq!(bs.gap_direct().unwrap(), 1.0, epsilon = 1e-12);
    // Indirect: min(3.0, 4.0) − max(2.0, 2.5) = 0.5.
    assert_relative_eq!(bs.gap_indirect().unwrap(), 0.5, epsilon = 1e-12);
}

#[test]
fn test_bandstructure_gaps_with_unknown_upper_band() {
    let bs = BandStructure::builder()
        .space_group(inversion_space_group(false))
        .kpoints(vec![
            scalar_kpoint_with(0, vec![-1.0, 0.5, 2.0], Some(3.0)),
            scalar_kpoint_with(1, vec![-1.0, 0.5, 2.5], None),
        ])
        .build()
        .unwrap();
    // The k-point without a known upper band drops out of the minima.
    assert_relative_eq!(bs.gap_direct().unwrap(), 1.0, epsilon = 1e-12);
    assert_relative_eq!(bs.gap_indirect().unwrap(), 0.5, epsilon = 1e-12);

    let bs_none = BandStructure::builder()
        .space_group(inversion_space_group(false))
        .kpoints(vec![scalar_kpoint_with(0, vec![-1.0, 0.5, 2.0], None)])
        .build()
        .unwrap();
    assert!(bs_none.gap_direct().is_none());
    assert!(bs_none.gap_indirect().is_none());
}

#[test]
fn test_bandstructure_kpoints_line_with_break() {
    let bs = BandStructure::builder()
        .space_group(inversion_space_group(false))
        .kpoints(vec![
            trivial_kpoint(0, Vector3::zeros()),
            trivial_kpoint(1, Vector3::new(0.01, 0.0, 0.0)),
            trivial_kpoint(2, Vector3::new(0.02, 0.0, 0.0)),
            trivial_kpoint(3, Vector3::new(0.4, 0.0, 0.0)),
        ])
        .build()
        .unwrap();
    let line = bs.kpoints_line(0.1).unwrap();
    let step = 0.01 * 2.0 * std::f64::consts::PI;
    assert_relative_eq!(line[0], 0.0, epsilon = 1e-12);
    assert_relative_eq!(line[1], step, epsilon = 1e-12);
    assert_relative_eq!(line[2], 2.0 * step, epsilon = 1e-12);
    // The jump to 0.4 exceeds the break threshold and adds no length.
    assert_relative_eq!(line[3], 2.0 * step, epsilon = 1e-12);
}

#[test]
fn test_bandstructure_end_to_end_spinor_invariants() {
    let _ = env_logger::builder().is_test(true).try_init();
    // One inversion-odd Kramers pair below one even pair: Z2 = 1, Z4 = 1.
    let bs = BandStructure::builder()
        .space_group(inversion_space_group(true))
        .kpoints(vec![spinor_inversion_kpoint()])
        .build()
        .unwrap();
    let analysis = bs
        .analyse(Some(&["GM".to_string()]), &AnalysisThresholds::default())
        .unwrap();

    assert_eq!(analysis.num_bandinvs, Some(2));
    assert_eq!(analysis.num_kramers_pairs, Some(1));
    assert_eq!(analysis.z2, Some(1));
    assert_eq!(analysis.z4, Some(1));
    assert_relative_eq!(analysis.gap_direct.unwrap(), 2.0, epsilon = 1e-12);

    let report = analysis.to_string();
    assert!(report.contains("Z2 invariant: 1"));
    assert!(report.contains("Z4 invariant: 1"));
}

#[test]
fn test_bandstructure_odd_kramers_total_is_fatal() {
    // A window that splits a Kramers pair leaves an odd inversion-odd total.
    let h = 1.0 / 2.0_f64.sqrt();
    let mut wf = Array2::from_elem((2, 14), C64::new(0.0, 0.0));
    wf[[0, 1]] = C64::new(h, 0.0);
    wf[[0, 2]] = C64::new(-h, 0.0);
    wf[[1, 0]] = C64::new(1.0, 0.0);
    let kp = Kpoint::builder()
        .ik(0)
        .spinor(true)
        .basis(gamma_basis_7())
        .coefficients(wf)
        .energies(Array1::from_vec(vec![-1.0, 1.0]))
        .build()
        .unwrap();
    let bs = BandStructure::builder()
        .space_group(inversion_space_group(true))
        .kpoints(vec![kp])
        .build()
        .unwrap();
    let err = bs
        .analyse(None, &AnalysisThresholds::default())
        .err()
        .expect("An odd inversion-odd total must abort the analysis.");
    assert!(err.to_string().contains("odd"));
}

#[test]
fn test_bandstructure_zak_phase_of_shifted_wannier_band() {
    let x0 = 0.25;
    let n = 8;
    let bs = BandStructure::builder()
        .space_group(inversion_space_group(false))
        .kpoints((0..n).map(|i| wannier_band_kpoint(i, n, x0)).collect())
        .build()
        .unwrap();
    let zak = bs.zak_phase().unwrap();
    assert_eq!(zak.len(), 1);
    // Under the ⟨uᵢ|uᵢ₊₁⟩ product ordering fixed here, a Wannier centre at
    // +x₀ accumulates the phase −2πx₀, reported mod 2π.
    assert_relative_eq!(
        zak[0],
        2.0 * std::f64::consts::PI * (1.0 - x0),
        epsilon = 1e-10
    );
}

#[test]
fn test_bandstructure_wilson_loop_of_shifted_wannier_band() {
    let x0 = 0.25;
    let n = 8;
    let bs = BandStructure::builder()
        .space_group(inversion_space_group(false))
        .kpoints((0..n).map(|i| wannier_band_kpoint(i, n, x0)).collect())
        .build()
        .unwrap();
    let centres = bs.wilson_loop().unwrap();
    assert_eq!(centres.len(), 1);
    assert_relative_eq!(centres[0], 1.0 - x0, epsilon = 1e-10);
}

#[test]
fn test_bandstructure_separate_by_parity() {
    let bs = BandStructure::builder()
        .space_group(inversion_space_group(false))
        .kpoints(vec![scalar_parity_kpoint()])
        .build()
        .unwrap();
    let thresholds = AnalysisThresholds::default();
    let separated = bs.separate(1, false, 0.01, &thresholds).unwrap();
    assert_eq!(separated.len(), 2);
    assert_relative_eq!(separated[0].0.re, 1.0, epsilon = 1e-10);
    assert_relative_eq!(separated[1].0.re, -1.0, epsilon = 1e-10);
    assert_eq!(separated[0].1.kpoints()[0].num_bands(), 2);
    assert_eq!(separated[1].1.kpoints()[0].num_bands(), 1);

    // Separating by the identity returns the whole band structure.
    let trivial = bs.separate(0, false, 0.01, &thresholds).unwrap();
    assert_eq!(trivial.len(), 1);
    assert_eq!(trivial[0].1.kpoints()[0].num_bands(), 3);
}
