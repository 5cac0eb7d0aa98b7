//! Wavefunction data at one k-point and its behaviour under symmetry.

use std::collections::HashMap;

use anyhow::{self, format_err};
use derive_builder::Builder;
use nalgebra::Matrix2;
use ndarray::{s, Array1, Array2};
use ndarray_linalg::Eig;
use num_complex::Complex;
use num_traits::Zero;

use crate::analysis::degenerate_subspaces;
use crate::auxiliary::comparator::{cluster_by_gap, cluster_mean, cluster_phases};
use crate::auxiliary::linalg::orthogonalise;
use crate::basis::KBasis;
use crate::symmetry::SymmetryOperation;

pub mod symmetry_action;

use symmetry_action::transform_coefficients;

#[cfg(test)]
#[path = "kpoint_tests.rs"]
mod kpoint_tests;

type C64 = Complex<f64>;

// ==================
// Struct definitions
// ==================

/// A structure to manage the wavefunctions of one k-point: the reconciled
/// plane-wave basis, the expansion coefficients of the bands in the selected
/// window, and their energies.
#[derive(Builder, Clone)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct Kpoint {
    /// The index of this k-point in the input k-point list.
    ik: usize,

    /// Whether the wavefunctions are spinors.
    #[builder(default = "false")]
    spinor: bool,

    /// The reconciled plane-wave basis.
    basis: KBasis,

    /// The coefficient matrix, one band per row. Row `i` corresponds to
    /// `energies[i]`; the column ordering matches the G-vector sequence of
    /// the basis, with the two spinor blocks concatenated in the same G
    /// order.
    #[builder(setter(custom))]
    coefficients: Array2<C64>,

    /// The band energies in eV, relative to the Fermi level.
    #[builder(setter(custom))]
    energies: Array1<f64>,

    /// The energy of the first band above the selected window, if known.
    /// Used for gap computations.
    #[builder(default = "None")]
    upper: Option<f64>,
}

impl KpointBuilder {
    pub fn coefficients(&mut self, wf: Array2<C64>) -> &mut Self {
        self.coefficients = Some(wf);
        self
    }

    pub fn energies(&mut self, energies: Array1<f64>) -> &mut Self {
        self.energies = Some(energies);
        self
    }

    fn validate(&self) -> Result<(), String> {
        let basis = self.basis.as_ref().ok_or("No basis found.".to_string())?;
        let wf = self
            .coefficients
            .as_ref()
            .ok_or("No coefficients found.".to_string())?;
        let energies = self
            .energies
            .as_ref()
            .ok_or("No energies found.".to_string())?;
        if wf.nrows() == 0 {
            return Err("No bands to analyse.".to_string());
        }
        if wf.nrows() != energies.len() {
            return Err(format!(
                "{} coefficient rows for {} energies.",
                wf.nrows(),
                energies.len()
            ));
        }
        let spinor = self.spinor.unwrap_or(false);
        let ncoeffs = basis.len() * if spinor { 2 } else { 1 };
        if wf.ncols() != ncoeffs {
            return Err(format!(
                "{} coefficient columns for a basis of {} plane waves.",
                wf.ncols(),
                ncoeffs
            ));
        }
        Ok(())
    }
}

impl Kpoint {
    /// Returns a builder to construct a new k-point.
    pub fn builder() -> KpointBuilder {
        KpointBuilder::default()
    }

    /// The index of this k-point in the input k-point list.
    pub fn ik(&self) -> usize {
        self.ik
    }

    /// The k-point in direct coordinates.
    pub fn kpt(&self) -> &nalgebra::Vector3<f64> {
        self.basis.kpt()
    }

    /// The reconciled plane-wave basis.
    pub fn basis(&self) -> &KBasis {
        &self.basis
    }

    /// Whether the wavefunctions are spinors.
    pub fn spinor(&self) -> bool {
        self.spinor
    }

    /// The number of bands in the window.
    pub fn num_bands(&self) -> usize {
        self.coefficients.nrows()
    }

    /// The band energies in eV, relative to the Fermi level.
    pub fn energies(&self) -> &Array1<f64> {
        &self.energies
    }

    /// The coefficient matrix, one band per row.
    pub fn coefficients(&self) -> &Array2<C64> {
        &self.coefficients
    }

    /// The energy of the first band above the window, if known.
    pub fn upper(&self) -> Option<f64> {
        self.upper
    }

    /// Normalises every band to unit norm over the reconciled basis. A user
    /// cutoff below the code cutoff truncates the expansion, so the stored
    /// coefficients are renormalised before any symmetry analysis.
    pub fn normalise(&mut self) {
        for mut row in self.coefficients.rows_mut() {
            let norm = row.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt();
            if norm > 0.0 {
                row.mapv_inplace(|z| z / norm);
            }
        }
    }

    /// Computes the matrix of a little-group operation in the band window:
    /// element (i, j) is ⟨ψᵢ|R̂|ψⱼ⟩.
    ///
    /// `spin` must carry the full spin-space matrix of the operation exactly
    /// when the wavefunctions are spinors.
    pub fn symmetry_matrix(
        &self,
        op: &SymmetryOperation,
        spin: Option<&Matrix2<C64>>,
        thresh: f64,
    ) -> Result<Array2<C64>, anyhow::Error> {
        let transformed = transform_coefficients(
            op,
            self.ik,
            &self.basis,
            self.spinor,
            self.coefficients.view(),
            spin,
            thresh,
        )?;
        let bra = self.coefficients.mapv(|z| z.conj());
        Ok(bra.dot(&transformed.t()))
    }

    /// Computes the overlap matrix ⟨ψᵢ(this)|ψⱼ(other)⟩ between the bands of
    /// two k-points over the intersection of their G-vector sets.
    ///
    /// Plane waves are matched in the periodic gauge: column G of `other` is
    /// paired with column G − Δ of this k-point, where
    /// Δ = round(k_this − k_other). Along a dense path Δ vanishes; on the
    /// closing edge of a loop it restores the winding reciprocal-lattice
    /// vector.
    pub fn overlap(&self, other: &Kpoint) -> Result<Array2<C64>, anyhow::Error> {
        if self.spinor != other.spinor {
            return Err(format_err!(
                "Cannot overlap spinor and scalar wavefunctions (k-points {} and {}).",
                self.ik,
                other.ik
            ));
        }
        let shift = (self.kpt() - other.kpt()).map(f64::round).map(|x| x as i32);
        let ng_a = self.basis.len();
        let ng_b = other.basis.len();

        let mut index_a = HashMap::with_capacity(ng_a);
        for (c, g) in self.basis.gvectors().iter().enumerate() {
            index_a.insert([g.x, g.y, g.z], c);
        }

        let mut m = Array2::<C64>::zeros((self.num_bands(), other.num_bands()));
        for (cb, g) in other.basis.gvectors().iter().enumerate() {
            let g_shifted = g - shift;
            let Some(&ca) = index_a.get(&[g_shifted.x, g_shifted.y, g_shifted.z]) else {
                continue;
            };
            for i in 0..self.num_bands() {
                for j in 0..other.num_bands() {
                    let mut term =
                        self.coefficients[[i, ca]].conj() * other.coefficients[[j, cb]];
                    if self.spinor {
                        term += self.coefficients[[i, ng_a + ca]].conj()
                            * other.coefficients[[j, ng_b + cb]];
                    }
                    m[[i, j]] += term;
                }
            }
        }
        Ok(m)
    }

    /// Separates the bands of this k-point according to the eigenvalues of a
    /// symmetry operation.
    ///
    /// The operation matrix is computed over the whole band window, cleaned
    /// to an exact unitary within the given thresholds, and diagonalised
    /// block-wise on the degenerate subspaces. The resulting eigenvalues are
    /// clustered with the comparator of
    /// [`crate::auxiliary::comparator`]: by real part when `group_kramers` is
    /// set (time-reversal partners carry conjugate eigenvalues), by phase
    /// otherwise. One sub-k-point per eigenvalue cluster is returned together
    /// with the cluster mean, ordered by the comparator.
    #[allow(clippy::too_many_arguments)]
    pub fn separate(
        &self,
        op: &SymmetryOperation,
        spin: Option<&Matrix2<C64>>,
        degen_thresh: f64,
        cluster_thresh: f64,
        group_kramers: bool,
        unitarity_warn_thresh: f64,
        unitarity_error_thresh: f64,
        integer_thresh: f64,
    ) -> Result<Vec<(C64, Kpoint)>, anyhow::Error> {
        let m = self.symmetry_matrix(op, spin, integer_thresh)?;
        let groups = degenerate_subspaces(&self.energies, degen_thresh)?;

        // The operation commutes with the Hamiltonian, so its matrix must be
        // block-diagonal over the degenerate subspaces up to numerical noise.
        let mut off_block: f64 = 0.0;
        for (a, ga) in groups.iter().enumerate() {
            for (b, gb) in groups.iter().enumerate() {
                if a == b {
                    continue;
                }
                for i in ga.clone() {
                    for j in gb.clone() {
                        off_block = off_block.max(m[[i, j]].norm());
                    }
                }
            }
        }
        if off_block > unitarity_warn_thresh {
            log::warn!(
                "K-point {}: the symmetry matrix couples distinct degenerate subspaces \
                 (max off-block element {off_block:.3e}).",
                self.ik
            );
        }

        let mut eigenvalues = vec![C64::zero(); self.num_bands()];
        let mut rotated = self.coefficients.clone();
        for group in &groups {
            let block = m.slice(s![group.clone(), group.clone()]).to_owned();
            let block = orthogonalise(&block, unitarity_warn_thresh, unitarity_error_thresh)
                .map_err(|err| {
                    format_err!(
                        "K-point {}: bands {}..{}: {err}",
                        self.ik,
                        group.start + 1,
                        group.end
                    )
                })?;
            let (w, v) = block
                .eig()
                .map_err(|err| format_err!("K-point {}: eigensolver failed: {err}.", self.ik))?;
            let wf_block = self.coefficients.slice(s![group.clone(), ..]);
            let new_block = v.t().dot(&wf_block);
            rotated.slice_mut(s![group.clone(), ..]).assign(&new_block);
            for (a, wa) in w.iter().enumerate() {
                eigenvalues[group.start + a] = *wa;
            }
        }

        let clusters = if group_kramers {
            let re = eigenvalues.iter().map(|w| w.re).collect::<Vec<_>>();
            cluster_by_gap(&re, cluster_thresh)
        } else {
            cluster_phases(&eigenvalues, cluster_thresh)
        };

        let mut separated = Vec::with_capacity(clusters.len());
        for cluster in &clusters {
            let mut bands = cluster.clone();
            bands.sort();
            let value = cluster_mean(&eigenvalues, &bands);
            let wf = ndarray::stack(
                ndarray::Axis(0),
                &bands
                    .iter()
                    .map(|&b| rotated.slice(s![b, ..]))
                    .collect::<Vec<_>>(),
            )
            .map_err(|err| format_err!("K-point {}: {err}", self.ik))?;
            let energies = Array1::from_iter(bands.iter().map(|&b| self.energies[b]));
            let kp = Kpoint::builder()
                .ik(self.ik)
                .spinor(self.spinor)
                .basis(self.basis.clone())
                .coefficients(wf)
                .energies(energies)
                .upper(self.upper)
                .build()
                .map_err(|err| format_err!("K-point {}: {err}", self.ik))?;
            separated.push((value, kp));
        }
        Ok(separated)
    }
}
