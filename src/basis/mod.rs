//! Plane-wave bases and G-vector reconciliation.
//!
//! A wavefunction at a k-point is expanded over plane waves
//! $`\mathrm{e}^{2\pi\mathrm{i}(\mathbf{k}+\mathbf{G})\cdot\mathbf{r}}`$ for
//! all reciprocal-lattice vectors $`\mathbf{G}`$ with kinetic energy below a
//! cutoff. Different DFT codes store the expansion coefficients in different
//! orders: some imply the order from the cutoff, others write their own
//! G-vector list. The reconciler in this module rebuilds the cutoff sphere in
//! a single canonical order and maps the code's native column order onto it,
//! so that all downstream symmetry analysis can assume one ordering
//! convention.

use std::collections::HashMap;
use std::f64::consts::PI;

use anyhow::{self, format_err};
use nalgebra::{Matrix3, Vector3};

use crate::auxiliary::constants::KINETIC_PREFACTOR;


/// Returns the reciprocal lattice of a real-space lattice. Both are given as
/// matrices whose *rows* are the Cartesian basis vectors; the result
/// satisfies $`\mathbf{A}\mathbf{B}^{\mathrm{T}} = 2\pi\mathbf{I}`$.
pub fn reciprocal_lattice(lattice: &Matrix3<f64>) -> Result<Matrix3<f64>, anyhow::Error> {
    let det = lattice.determinant();
    if det.abs() < f64::EPSILON {
        return Err(format_err!("The lattice is singular."));
    }
    let rows: Vec<Vector3<f64>> = (0..3)
        .map(|i| {
            let a1: Vector3<f64> = lattice.row((i + 1) % 3).transpose();
            let a2: Vector3<f64> = lattice.row((i + 2) % 3).transpose();
            a1.cross(&a2) * (2.0 * PI / det)
        })
        .collect();
    Ok(Matrix3::from_rows(&[
        rows[0].transpose(),
        rows[1].transpose(),
        rows[2].transpose(),
    ]))
}

/// Returns the free-electron kinetic energy in eV of the plane wave with
/// direct (fractional) reciprocal coordinates `q` = k + G.
pub fn plane_wave_energy(q: &Vector3<f64>, rec_lattice: &Matrix3<f64>) -> f64 {
    let q_cart = rec_lattice.transpose() * q;
    KINETIC_PREFACTOR * q_cart.norm_squared()
}

/// Iterates over one axis of the G-vector grid in FFT frequency order:
/// `0, 1, ..., n, -n, ..., -1`.
fn frequency_order(n: i32) -> impl Iterator<Item = i32> {
    (0..=n).chain(-n..=-1)
}

/// Per-axis half-extents of a box guaranteed to contain every integer vector
/// `G` with `plane_wave_energy(k + G) ≤ ecut`.
///
/// The fractional coordinate of a Cartesian vector `q` along reciprocal axis
/// `i` is `q·aᵢ/2π`, with `aᵢ` the corresponding real-space basis vector, so
/// `|gᵢ + kᵢ| ≤ |q| ‖aᵢ‖ / 2π` bounds each component of every in-sphere
/// vector.
fn bounding_extents(
    kpt: &Vector3<f64>,
    rec_lattice: &Matrix3<f64>,
    ecut: f64,
) -> Result<[i32; 3], anyhow::Error> {
    let qmax = (ecut / KINETIC_PREFACTOR).sqrt();
    let dual = rec_lattice
        .transpose()
        .try_inverse()
        .ok_or_else(|| format_err!("The reciprocal lattice is singular."))?;
    // Rows of `dual` are the real-space basis vectors divided by 2π.
    let mut extents = [0_i32; 3];
    for i in 0..3 {
        let a_norm_over_2pi: f64 = dual.row(i).transpose().norm();
        extents[i] = (qmax * a_norm_over_2pi + kpt[i].abs()).floor() as i32 + 1;
    }
    Ok(extents)
}

/// Enumerates, in the canonical generation order, every integer G-vector for
/// which the plane wave k + G lies within the cutoff sphere.
///
/// The canonical generation order fixes the ordering convention of the whole
/// crate: the slowest axis is `g₃`, then `g₂`, then `g₁`, each axis running
/// in FFT frequency order (`0, 1, ..., n, -n, ..., -1`). Count-implied
/// wavefunction sources must store their coefficients in this order;
/// explicit-list sources are permuted onto it by [`KBasis::from_native`].
pub fn generate_gvectors(
    kpt: &Vector3<f64>,
    rec_lattice: &Matrix3<f64>,
    ecut: f64,
) -> Result<Vec<(Vector3<i32>, f64)>, anyhow::Error> {
    let [n1, n2, n3] = bounding_extents(kpt, rec_lattice, ecut)?;
    let mut gvectors = Vec::new();
    for g3 in frequency_order(n3) {
        for g2 in frequency_order(n2) {
            for g1 in frequency_order(n1) {
                let g = Vector3::new(g1, g2, g3);
                let q = kpt + g.map(f64::from);
                let energy = plane_wave_energy(&q, rec_lattice);
                if energy <= ecut {
                    gvectors.push((g, energy));
                }
            }
        }
    }
    Ok(gvectors)
}

/// The reconciled plane-wave basis of one k-point: the G-vectors of the
/// expansion in canonical order, their plane-wave energies, and the map back
/// into the DFT code's native column order.
#[derive(Clone, Debug, PartialEq)]
pub struct KBasis {
    /// The k-point in direct (fractional) coordinates.
    kpt: Vector3<f64>,

    /// The G-vectors of the expansion, in canonical order.
    gvectors: Vec<Vector3<i32>>,

    /// The plane-wave energies ε(k+G) in eV, aligned with [`Self::gvectors`].
    energies: Vec<f64>,

    /// For each canonical slot, the index of the corresponding coefficient
    /// column in the code's native storage order.
    selection: Vec<usize>,

    /// The number of plane waves per spinor component in the code's native
    /// storage, before any user-cutoff truncation.
    native_len: usize,
}

impl KBasis {
    /// The k-point in direct coordinates.
    pub fn kpt(&self) -> &Vector3<f64> {
        &self.kpt
    }

    /// The G-vectors of the expansion, in canonical order.
    pub fn gvectors(&self) -> &[Vector3<i32>] {
        &self.gvectors
    }

    /// The plane-wave energies in eV, in canonical order.
    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    /// The native coefficient column backing each canonical slot.
    pub fn selection(&self) -> &[usize] {
        &self.selection
    }

    /// The number of G-vectors in the reconciled basis.
    pub fn len(&self) -> usize {
        self.gvectors.len()
    }

    /// Whether the reconciled basis is empty.
    pub fn is_empty(&self) -> bool {
        self.gvectors.is_empty()
    }

    /// The full set of native coefficient columns backing the reconciled
    /// basis, covering both spinor components when `spinor` is set: the
    /// second spinor block repeats the per-G selection offset by the native
    /// per-component plane-wave count.
    pub fn column_selection(&self, spinor: bool) -> Vec<usize> {
        if spinor {
            self.selection
                .iter()
                .copied()
                .chain(self.selection.iter().map(|&c| c + self.native_len))
                .collect()
        } else {
            self.selection.clone()
        }
    }

    /// Reconciles a count-implied plane-wave basis (VASP- and Wannier90-style
    /// sources): the code stores no G-vector list, so the set and order are
    /// implied by the cutoff `ecut_code` and the canonical generation order.
    ///
    /// The number of generated vectors is cross-checked against the
    /// code-declared plane-wave count `npw` (which counts both spinor
    /// components when `spinor` is set); a mismatch is a fatal cutoff or
    /// precision inconsistency. A user cutoff `ecut` below `ecut_code`
    /// truncates the basis to the smaller sphere.
    pub fn from_count(
        ik: usize,
        kpt: Vector3<f64>,
        rec_lattice: &Matrix3<f64>,
        ecut_code: f64,
        npw: usize,
        ecut: f64,
        spinor: bool,
    ) -> Result<Self, anyhow::Error> {
        let generated = generate_gvectors(&kpt, rec_lattice, ecut_code)?;
        let expected = if spinor {
            if npw % 2 != 0 {
                return Err(format_err!(
                    "K-point {ik}: odd plane-wave count {npw} for a spinor wavefunction."
                ));
            }
            npw / 2
        } else {
            npw
        };
        if generated.len() != expected {
            return Err(format_err!(
                "K-point {ik}: computed {} plane waves within the cutoff {ecut_code} eV, \
                 but the wavefunction file declares {expected}. This indicates a cutoff or \
                 precision inconsistency between the file header and its data.",
                generated.len(),
            ));
        }
        let mut gvectors = Vec::new();
        let mut energies = Vec::new();
        let mut selection = Vec::new();
        for (native, (g, energy)) in generated.iter().enumerate() {
            if *energy <= ecut {
                gvectors.push(*g);
                energies.push(*energy);
                selection.push(native);
            }
        }
        Ok(Self {
            kpt,
            gvectors,
            energies,
            selection,
            native_len: expected,
        })
    }

    /// Reconciles an explicit-list plane-wave basis (Abinit- and Quantum
    /// Espresso-style sources): the code stores its own G-vector list in its
    /// own order. The theoretical cutoff sphere is regenerated in canonical
    /// order and the native list is permuted onto it.
    ///
    /// A native vector absent from the sphere, a sphere vector absent from
    /// the native list, or a duplicated native vector is a fatal
    /// inconsistency identifying the k-point. A user cutoff `ecut` below
    /// `ecut_code` truncates the result to the smaller sphere.
    pub fn from_native(
        ik: usize,
        kpt: Vector3<f64>,
        rec_lattice: &Matrix3<f64>,
        native: &[Vector3<i32>],
        ecut_code: f64,
        ecut: f64,
    ) -> Result<Self, anyhow::Error> {
        let generated = generate_gvectors(&kpt, rec_lattice, ecut_code)?;
        if generated.len() != native.len() {
            return Err(format_err!(
                "K-point {ik}: the wavefunction file stores {} plane waves but the cutoff \
                 {ecut_code} eV implies {}. This indicates a cutoff or precision \
                 inconsistency between the file header and its data.",
                native.len(),
                generated.len(),
            ));
        }
        let mut native_index = HashMap::with_capacity(native.len());
        for (i, g) in native.iter().enumerate() {
            if native_index.insert([g.x, g.y, g.z], i).is_some() {
                return Err(format_err!(
                    "K-point {ik}: duplicated G-vector ({}, {}, {}) in the native list.",
                    g.x,
                    g.y,
                    g.z
                ));
            }
        }
        let mut gvectors = Vec::new();
        let mut energies = Vec::new();
        let mut selection = Vec::new();
        for (g, energy) in &generated {
            let native_col = *native_index.get(&[g.x, g.y, g.z]).ok_or_else(|| {
                format_err!(
                    "K-point {ik}: the G-vector ({}, {}, {}) lies within the cutoff \
                     {ecut_code} eV but is absent from the native list.",
                    g.x,
                    g.y,
                    g.z
                )
            })?;
            if *energy <= ecut {
                gvectors.push(*g);
                energies.push(*energy);
                selection.push(native_col);
            }
        }
        Ok(Self {
            kpt,
            gvectors,
            energies,
            selection,
            native_len: native.len(),
        })
    }
}
