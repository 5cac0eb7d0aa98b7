//! Analytic toy band structures for tests.

use nalgebra::{Matrix3, Vector3};
use ndarray::{Array1, Array2};
use num_complex::Complex;

use crate::auxiliary::constants::KINETIC_PREFACTOR;
use crate::basis::{reciprocal_lattice, KBasis};
use crate::chartab::IrrepTable;
use crate::kpoint::Kpoint;
use crate::symmetry::{SpaceGroup, SymmetryOperation};

type C64 = Complex<f64>;

/// A simple-cubic lattice with a = 1 Å.
pub(crate) fn cubic_lattice() -> Matrix3<f64> {
    Matrix3::identity()
}

pub(crate) fn cubic_rec() -> Matrix3<f64> {
    reciprocal_lattice(&cubic_lattice()).expect("The cubic lattice is regular.")
}

/// Cutoff admitting exactly Γ and the six nearest reciprocal-lattice
/// neighbours at k = 0 in the cubic lattice.
pub(crate) fn seven_g_cutoff() -> f64 {
    1.05 * KINETIC_PREFACTOR * (2.0 * std::f64::consts::PI).powi(2)
}

/// The reconciled 7-vector basis at Γ: G ∈ {0, ±x̂, ±ŷ, ±ẑ} in canonical
/// order.
pub(crate) fn gamma_basis_7() -> KBasis {
    let ecut = seven_g_cutoff();
    KBasis::from_count(0, Vector3::zeros(), &cubic_rec(), ecut, 7, ecut, false)
        .expect("The 7-vector Γ basis should reconcile.")
}

fn c(re: f64) -> C64 {
    C64::new(re, 0.0)
}

/// A scalar three-band k-point at Γ with definite parities: an even
/// s-like state, an odd combination of ±x̂ and an even combination of ±x̂,
/// at energies −1.0, 0.5 and 2.0 eV.
pub(crate) fn scalar_parity_kpoint() -> Kpoint {
    let h = 1.0 / 2.0_f64.sqrt();
    let wf = Array2::from_shape_vec(
        (3, 7),
        vec![
            c(1.0), c(0.0), c(0.0), c(0.0), c(0.0), c(0.0), c(0.0),
            c(0.0), c(h), c(-h), c(0.0), c(0.0), c(0.0), c(0.0),
            c(0.0), c(h), c(h), c(0.0), c(0.0), c(0.0), c(0.0),
        ],
    )
    .expect("The coefficient shape is consistent.");
    Kpoint::builder()
        .ik(0)
        .basis(gamma_basis_7())
        .coefficients(wf)
        .energies(Array1::from_vec(vec![-1.0, 0.5, 2.0]))
        .upper(Some(3.0))
        .build()
        .expect("The toy k-point should build.")
}

/// A spinor four-band k-point at Γ: an inversion-odd Kramers pair at
/// −1.0 eV below an inversion-even Kramers pair at 1.0 eV.
pub(crate) fn spinor_inversion_kpoint() -> Kpoint {
    let h = 1.0 / 2.0_f64.sqrt();
    let mut wf = Array2::from_elem((4, 14), c(0.0));
    // Odd orbital (|x̂⟩ − |−x̂⟩)/√2 with spin up, then spin down.
    wf[[0, 1]] = c(h);
    wf[[0, 2]] = c(-h);
    wf[[1, 8]] = c(h);
    wf[[1, 9]] = c(-h);
    // Even s-like orbital with spin up, then spin down.
    wf[[2, 0]] = c(1.0);
    wf[[3, 7]] = c(1.0);
    Kpoint::builder()
        .ik(0)
        .spinor(true)
        .basis(gamma_basis_7())
        .coefficients(wf)
        .energies(Array1::from_vec(vec![-1.0, -1.0, 1.0, 1.0]))
        .upper(Some(3.0))
        .build()
        .expect("The toy k-point should build.")
}

/// The space group {E, P} of the cubic lattice, with the parity table of Γ
/// registered under the label "GM".
pub(crate) fn inversion_space_group(spinor: bool) -> SpaceGroup {
    let table = IrrepTable::builder()
        .operations(vec![0, 1])
        .irreps(&[
            ("GM1+", vec![c(1.0), c(1.0)]),
            ("GM1-", vec![c(1.0), c(-1.0)]),
        ])
        .build()
        .expect("The parity table should build.");
    let mut tables = indexmap::IndexMap::new();
    tables.insert("GM".to_string(), table);
    SpaceGroup::builder()
        .lattice(cubic_lattice())
        .operations(&[SymmetryOperation::identity(), SymmetryOperation::inversion()])
        .spinor(spinor)
        .irrep_tables(tables)
        .build()
        .expect("The space group should build.")
}

/// The two-fold screw rotation {C₂z | (0, 0, ½)}.
pub(crate) fn screw_c2z() -> SymmetryOperation {
    SymmetryOperation::builder()
        .rotation(Matrix3::from_diagonal(&Vector3::new(-1, -1, 1)))
        .translation(Vector3::new(0.0, 0.0, 0.5))
        .build()
        .expect("The screw operation should build.")
}

/// One k-point of an analytic one-band model whose Wannier centre sits at
/// fractional position `x0` along the first lattice vector: the band
/// coefficients over G ∈ {0, −x̂} are
/// c_G(k) = e^{−2πi (k+G)·x₀} / √2, a smooth periodic-gauge band.
///
/// The k-points k = (2i+1)/(2n) for i = 0..n stay away from 0 and ½ so
/// that exactly these two G-vectors fall inside the cutoff.
pub(crate) fn wannier_band_kpoint(i: usize, n: usize, x0: f64) -> Kpoint {
    let k = (2 * i + 1) as f64 / (2 * n) as f64;
    let kpt = Vector3::new(k, 0.0, 0.0);
    let ecut = KINETIC_PREFACTOR * (2.0 * std::f64::consts::PI).powi(2);
    let basis = KBasis::from_count(i, kpt, &cubic_rec(), ecut, 2, ecut, false)
        .expect("The two-vector basis should reconcile.");
    assert_eq!(
        basis.gvectors(),
        &[Vector3::new(0, 0, 0), Vector3::new(-1, 0, 0)],
        "The toy cutoff must select exactly G = 0 and G = -x̂."
    );
    let h = 1.0 / 2.0_f64.sqrt();
    let tau = 2.0 * std::f64::consts::PI;
    let wf = Array2::from_shape_vec(
        (1, 2),
        vec![
            C64::from_polar(h, -tau * k * x0),
            C64::from_polar(h, -tau * (k - 1.0) * x0),
        ],
    )
    .expect("The coefficient shape is consistent.");
    Kpoint::builder()
        .ik(i)
        .basis(basis)
        .coefficients(wf)
        .energies(Array1::from_vec(vec![0.0]))
        .build()
        .expect("The toy k-point should build.")
}
