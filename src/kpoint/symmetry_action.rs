//! Action of space-group operations on plane-wave expansion coefficients.
//!
//! The sign conventions applied here are fixed once for the whole crate and
//! documented in [`crate::symmetry`]: an operation sends the plane wave at
//! k + G to the one at k + G′ with
//! G′ = ±W⁻ᵀG + Δk, attaching the non-symmorphic phase
//! exp(−2πi (k+G′)·t) to the *transformed* coefficient, conjugating the
//! coefficients (and flipping the sign of W⁻ᵀG) for time-reversal
//! operations.

use std::collections::HashMap;
use std::f64::consts::PI;

use anyhow::{self, format_err};
use nalgebra::Matrix2;
use ndarray::{Array2, ArrayView2};
use num_complex::Complex;

use crate::basis::KBasis;
use crate::symmetry::SymmetryOperation;

#[cfg(test)]
#[path = "symmetry_action_tests.rs"]
mod symmetry_action_tests;

type C64 = Complex<f64>;

/// The action of one little-group operation on the plane-wave columns of a
/// reconciled basis: a permutation of the columns together with the
/// non-symmorphic phase each transformed column acquires.
pub(crate) struct GPermutation {
    /// Column `c` of the original expansion maps to column `perm[c]` of the
    /// transformed expansion.
    pub(crate) perm: Vec<usize>,

    /// The phase acquired by the coefficient landing in column `perm[c]`.
    pub(crate) phases: Vec<C64>,
}

/// Builds the permutation of the reconciled G-vectors under a little-group
/// operation, together with the non-symmorphic phases.
///
/// The operation must map every G-vector of the basis onto another member of
/// the basis (after absorbing the reciprocal-lattice shift of k itself);
/// failure to do so indicates a broken symmetry operation or a mismatched
/// lattice convention and is a fatal error, as is an operation outside the
/// little group of the k-point.
pub(crate) fn g_permutation(
    op: &SymmetryOperation,
    ik: usize,
    basis: &KBasis,
    thresh: f64,
) -> Result<GPermutation, anyhow::Error> {
    let kpt = basis.kpt();
    let shift = op.reciprocal_shift(kpt, thresh)?.ok_or_else(|| {
        format_err!(
            "K-point {ik}: the symmetry operation does not map ({:.4}, {:.4}, {:.4}) onto a \
             lattice-equivalent k-point and is not in its little group.",
            kpt.x,
            kpt.y,
            kpt.z
        )
    })?;
    let winv_t = op.rotation_inverse()?.transpose();
    let sign = if op.time_reversal() { -1 } else { 1 };

    let mut index = HashMap::with_capacity(basis.len());
    for (c, g) in basis.gvectors().iter().enumerate() {
        index.insert([g.x, g.y, g.z], c);
    }

    let mut perm = Vec::with_capacity(basis.len());
    let mut phases = Vec::with_capacity(basis.len());
    for g in basis.gvectors() {
        let g_new = winv_t * g * sign + shift;
        let target = *index.get(&[g_new.x, g_new.y, g_new.z]).ok_or_else(|| {
            format_err!(
                "K-point {ik}: the symmetry operation maps G = ({}, {}, {}) onto \
                 ({}, {}, {}), which is absent from the reconciled G-set. The operation is \
                 inconsistent with the parsed lattice.",
                g.x,
                g.y,
                g.z,
                g_new.x,
                g_new.y,
                g_new.z
            )
        })?;
        let kg_new = kpt + g_new.map(f64::from);
        let phase_arg = -2.0 * PI * kg_new.dot(op.translation());
        perm.push(target);
        phases.push(C64::from_polar(1.0, phase_arg));
    }
    Ok(GPermutation { perm, phases })
}

/// Applies a little-group operation to a block of wavefunction coefficient
/// rows: permutes and phases the plane-wave columns, conjugates them for
/// time-reversal operations, and mixes the two spinor blocks with the full
/// spin-space matrix.
///
/// `wf` has one band per row and `basis.len() × (2 if spinor else 1)`
/// columns, the two spinor blocks concatenated in the same G order. `spin`
/// must be supplied exactly when `spinor` is set.
pub(crate) fn transform_coefficients(
    op: &SymmetryOperation,
    ik: usize,
    basis: &KBasis,
    spinor: bool,
    wf: ArrayView2<C64>,
    spin: Option<&Matrix2<C64>>,
    thresh: f64,
) -> Result<Array2<C64>, anyhow::Error> {
    let ng = basis.len();
    let ncoeffs = if spinor { 2 * ng } else { ng };
    if wf.ncols() != ncoeffs {
        return Err(format_err!(
            "K-point {ik}: the coefficient matrix has {} columns but the reconciled basis \
             implies {ncoeffs}.",
            wf.ncols()
        ));
    }
    if spinor != spin.is_some() {
        return Err(format_err!(
            "K-point {ik}: a spin-space matrix must be supplied exactly for spinor \
             wavefunctions."
        ));
    }

    let GPermutation { perm, phases } = g_permutation(op, ik, basis, thresh)?;
    let conjugate = op.time_reversal();

    let mut out = Array2::<C64>::zeros(wf.raw_dim());
    for i in 0..wf.nrows() {
        for c in 0..ng {
            let mut val = wf[[i, c]];
            if conjugate {
                val = val.conj();
            }
            out[[i, perm[c]]] = phases[c] * val;
            if spinor {
                let mut val_dn = wf[[i, ng + c]];
                if conjugate {
                    val_dn = val_dn.conj();
                }
                out[[i, ng + perm[c]]] = phases[c] * val_dn;
            }
        }
    }

    if let Some(s) = spin {
        for i in 0..out.nrows() {
            for c in 0..ng {
                let up = out[[i, c]];
                let dn = out[[i, ng + c]];
                out[[i, c]] = s[(0, 0)] * up + s[(0, 1)] * dn;
                out[[i, ng + c]] = s[(1, 0)] * up + s[(1, 1)] * dn;
            }
        }
    }
    Ok(out)
}
