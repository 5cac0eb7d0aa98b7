//! Whole-band-structure orchestration: invariants, gaps and k-path topology.

use std::fmt;

use anyhow::{self, format_err};
use derive_builder::Builder;
use itertools::Itertools;
use ndarray::{s, Array2};
use ndarray_linalg::{Determinant, Eig, SVD};
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::analysis::{analyse_kpoint, AnalysisThresholds, KpointAnalysis};
use crate::auxiliary::comparator::{cluster_by_gap, cluster_mean, cluster_phases};
use crate::auxiliary::constants::DEFAULT_KPATH_BREAK_THRESH;
use crate::basis::reciprocal_lattice;
use crate::io::format::{short_complex, write_subtitle, write_title};
use crate::kpoint::Kpoint;
use crate::symmetry::SpaceGroup;

#[cfg(test)]
#[path = "bandstructure_tests.rs"]
mod bandstructure_tests;

type C64 = Complex<f64>;

// ==================
// Struct definitions
// ==================

/// A structure to manage a whole band structure: the space group of the
/// crystal and the analysed k-points, in input order.
#[derive(Builder, Clone)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct BandStructure {
    /// The space group of the crystal.
    space_group: SpaceGroup,

    /// The k-points of the band structure, in input order.
    #[builder(setter(custom))]
    kpoints: Vec<Kpoint>,

    /// The Fermi energy in eV that was subtracted from all band energies.
    #[builder(default = "0.0")]
    efermi: f64,
}

impl BandStructureBuilder {
    pub fn kpoints(&mut self, kpoints: Vec<Kpoint>) -> &mut Self {
        self.kpoints = Some(kpoints);
        self
    }

    fn validate(&self) -> Result<(), String> {
        let space_group = self
            .space_group
            .as_ref()
            .ok_or("No space group found.".to_string())?;
        let kpoints = self.kpoints.as_ref().ok_or("No k-points found.".to_string())?;
        if kpoints.is_empty() {
            return Err("The k-point list is empty.".to_string());
        }
        if kpoints.iter().any(|kp| kp.spinor() != space_group.spinor()) {
            return Err(
                "The k-point spinor flags disagree with the space group.".to_string()
            );
        }
        Ok(())
    }
}

/// The aggregate symmetry analysis of a band structure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BandStructureAnalysis {
    /// The per-k-point analyses, in input order.
    pub kpoints: Vec<KpointAnalysis>,

    /// The cumulative k-path coordinate of every k-point in Å⁻¹.
    pub kpoints_line: Vec<f64>,

    /// The total number of inversion-odd states over the k-points whose
    /// little groups contain the inversion.
    pub num_bandinvs: Option<usize>,

    /// The number of inversion-odd Kramers pairs (spinor band structures
    /// only).
    pub num_kramers_pairs: Option<usize>,

    /// The Z₂ symmetry indicator (spinor band structures only).
    pub z2: Option<u8>,

    /// The Z₄ symmetry indicator (spinor band structures only).
    pub z4: Option<u8>,

    /// The smallest direct gap over the analysed k-points.
    pub gap_direct: Option<f64>,

    /// The indirect gap over the analysed k-points.
    pub gap_indirect: Option<f64>,
}

impl BandStructure {
    /// Returns a builder to construct a new band structure.
    pub fn builder() -> BandStructureBuilder {
        BandStructureBuilder::default()
    }

    /// The space group of the crystal.
    pub fn space_group(&self) -> &SpaceGroup {
        &self.space_group
    }

    /// The k-points, in input order.
    pub fn kpoints(&self) -> &[Kpoint] {
        &self.kpoints
    }

    /// The Fermi energy in eV subtracted from all band energies.
    pub fn efermi(&self) -> f64 {
        self.efermi
    }

    /// The smallest direct gap: the minimum over the k-points of the
    /// distance between the top of the window and the first band above it.
    /// K-points without a known upper band drop out of the minimum.
    pub fn gap_direct(&self) -> Option<f64> {
        self.kpoints
            .iter()
            .filter_map(|kp| {
                let top = kp.energies()[kp.energies().len() - 1];
                kp.upper().map(|u| u - top)
            })
            .min_by(|a, b| a.total_cmp(b))
    }

    /// The indirect gap: the minimum over the k-points of the first band
    /// above the window minus the maximum over the k-points of the top of
    /// the window.
    pub fn gap_indirect(&self) -> Option<f64> {
        let min_upper = self
            .kpoints
            .iter()
            .filter_map(Kpoint::upper)
            .min_by(|a, b| a.total_cmp(b))?;
        let max_top = self
            .kpoints
            .iter()
            .map(|kp| kp.energies()[kp.energies().len() - 1])
            .max_by(|a, b| a.total_cmp(b))?;
        Some(min_upper - max_top)
    }

    /// The cumulative length along the k-point path in Å⁻¹. Jumps larger
    /// than `break_thresh` are treated as path breaks and contribute zero
    /// length.
    pub fn kpoints_line(&self, break_thresh: f64) -> Result<Vec<f64>, anyhow::Error> {
        let rec = reciprocal_lattice(self.space_group.lattice())?;
        let cart = self
            .kpoints
            .iter()
            .map(|kp| rec.transpose() * kp.kpt())
            .collect::<Vec<_>>();
        let mut line = vec![0.0; cart.len()];
        for i in 1..cart.len() {
            let step = (cart[i] - cart[i - 1]).norm();
            let step = if step > break_thresh { 0.0 } else { step };
            line[i] = line[i - 1] + step;
        }
        Ok(line)
    }

    /// Runs the symmetry analysis of every k-point and aggregates the
    /// inversion counts, symmetry indicators and gaps.
    ///
    /// `kpnames`, when given, must supply one high-symmetry label per
    /// k-point; irreps are identified at the k-points whose labels have
    /// reference tables registered in the space group.
    pub fn analyse(
        &self,
        kpnames: Option<&[String]>,
        thresholds: &AnalysisThresholds,
    ) -> Result<BandStructureAnalysis, anyhow::Error> {
        if let Some(names) = kpnames {
            if names.len() != self.kpoints.len() {
                return Err(format_err!(
                    "{} k-point labels supplied for {} k-points.",
                    names.len(),
                    self.kpoints.len()
                ));
            }
        }

        let mut kpoint_analyses = Vec::with_capacity(self.kpoints.len());
        for (i, kp) in self.kpoints.iter().enumerate() {
            let label = kpnames.map(|names| names[i].as_str());
            kpoint_analyses.push(analyse_kpoint(kp, &self.space_group, label, thresholds)?);
        }

        let num_bandinvs = kpoint_analyses
            .iter()
            .filter_map(|ka| ka.num_bandinvs)
            .fold(None, |acc: Option<usize>, n| Some(acc.unwrap_or(0) + n));

        // Under time reversal, spinor states at inversion-symmetric k-points
        // come in Kramers pairs of equal parity, so the odd total halves into
        // an exact integer number of pairs.
        let (num_kramers_pairs, z2, z4) = match (self.space_group.spinor(), num_bandinvs) {
            (true, Some(total)) => {
                if total % 2 != 0 {
                    return Err(format_err!(
                        "The total number of inversion-odd states ({total}) is odd, which \
                         is impossible for Kramers-paired spinor bands. The band window \
                         likely splits a Kramers pair."
                    ));
                }
                let pairs = total / 2;
                (Some(pairs), Some((pairs % 2) as u8), Some((pairs % 4) as u8))
            }
            _ => (None, None, None),
        };

        Ok(BandStructureAnalysis {
            kpoints: kpoint_analyses,
            kpoints_line: self.kpoints_line(DEFAULT_KPATH_BREAK_THRESH)?,
            num_bandinvs,
            num_kramers_pairs,
            z2,
            z4,
            gap_direct: self.gap_direct(),
            gap_indirect: self.gap_indirect(),
        })
    }

    /// Computes the overlap matrices along the closed loop through the
    /// k-points in input order.
    fn loop_overlaps(&self) -> Result<Vec<Array2<C64>>, anyhow::Error> {
        let n = self.kpoints.len();
        (0..n)
            .map(|i| self.kpoints[i].overlap(&self.kpoints[(i + 1) % n]))
            .collect()
    }

    /// Computes the Zak phase of the leading subspace of every size: element
    /// `n − 1` is the phase (mod 2π) of the product of the determinants of
    /// the leading n×n blocks of the loop overlaps.
    pub fn zak_phase(&self) -> Result<Vec<f64>, anyhow::Error> {
        let overlaps = self.loop_overlaps()?;
        let nmax = overlaps
            .iter()
            .map(|o| o.nrows().min(o.ncols()))
            .min()
            .ok_or_else(|| format_err!("No k-points to compute a Zak phase over."))?;
        let tau = 2.0 * std::f64::consts::PI;
        (1..=nmax)
            .map(|n| {
                let mut phase = 0.0;
                for o in &overlaps {
                    let det = o
                        .slice(s![..n, ..n])
                        .to_owned()
                        .det()
                        .map_err(|err| format_err!("Zak-phase determinant failed: {err}."))?;
                    phase += det.arg();
                }
                Ok(phase.rem_euclid(tau))
            })
            .collect()
    }

    /// Computes the Wilson-loop charge centres: the eigenphases of the
    /// ordered product of the partial-isometry factors of the loop overlaps,
    /// divided by 2π, folded into [0, 1) and sorted.
    pub fn wilson_loop(&self) -> Result<Vec<f64>, anyhow::Error> {
        let overlaps = self.loop_overlaps()?;
        let mut wilson: Option<Array2<C64>> = None;
        for o in &overlaps {
            let (u_opt, _s, vh_opt) = o
                .svd(true, true)
                .map_err(|err| format_err!("Wilson-loop SVD failed: {err}."))?;
            let u = u_opt.ok_or_else(|| format_err!("Missing U factor from SVD."))?;
            let vh = vh_opt.ok_or_else(|| format_err!("Missing V† factor from SVD."))?;
            let factor = u.dot(&vh);
            wilson = Some(match wilson {
                Some(w) => w.dot(&factor),
                None => factor,
            });
        }
        let wilson =
            wilson.ok_or_else(|| format_err!("No k-points to compute a Wilson loop over."))?;
        let (eigenvalues, _) = wilson
            .eig()
            .map_err(|err| format_err!("Wilson-loop eigensolver failed: {err}."))?;
        let tau = 2.0 * std::f64::consts::PI;
        let mut centres = eigenvalues
            .iter()
            .map(|w| (w.arg() / tau).rem_euclid(1.0))
            .collect::<Vec<_>>();
        centres.sort_by(f64::total_cmp);
        Ok(centres)
    }

    /// Separates the band structure according to the eigenvalues of one
    /// symmetry operation: every k-point is split into eigenvalue clusters
    /// and the clusters are matched across k-points by their eigenvalues.
    ///
    /// With `group_kramers`, time-reversal partner eigenvalues (complex
    /// conjugates) are kept together by clustering on real parts.
    pub fn separate(
        &self,
        op_index: usize,
        group_kramers: bool,
        cluster_thresh: f64,
        thresholds: &AnalysisThresholds,
    ) -> Result<Vec<(C64, BandStructure)>, anyhow::Error> {
        let op = self
            .space_group
            .operations()
            .get(op_index)
            .ok_or_else(|| format_err!("No symmetry operation with index {op_index}."))?;
        if op.is_identity() {
            return Ok(vec![(C64::new(1.0, 0.0), self.clone())]);
        }
        let spin = if self.space_group.spinor() {
            Some(op.full_spin_rotation(self.space_group.lattice())?)
        } else {
            None
        };

        let separated_kpoints = self
            .kpoints
            .iter()
            .map(|kp| {
                kp.separate(
                    op,
                    spin.as_ref(),
                    thresholds.degen,
                    cluster_thresh,
                    group_kramers,
                    thresholds.unitarity_warn,
                    thresholds.unitarity_error,
                    thresholds.integer,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let all_values = separated_kpoints
            .iter()
            .flat_map(|entries| entries.iter().map(|(v, _)| *v))
            .collect::<Vec<_>>();
        let clusters = if group_kramers {
            let re = all_values.iter().map(|v| v.re).collect::<Vec<_>>();
            cluster_by_gap(&re, cluster_thresh)
        } else {
            cluster_phases(&all_values, cluster_thresh)
        };
        let centres = clusters
            .iter()
            .map(|cluster| cluster_mean(&all_values, cluster))
            .collect::<Vec<_>>();

        // Eigenvalue clusters further than this from a k-point's own
        // eigenvalue mean do not receive that k-point.
        let match_thresh = 5.0 * cluster_thresh;
        let mut subspaces = Vec::with_capacity(centres.len());
        for &centre in &centres {
            let mut kpoints = Vec::new();
            for entries in &separated_kpoints {
                let nearest = entries.iter().min_by(|(a, _), (b, _)| {
                    (a - centre).norm().total_cmp(&(b - centre).norm())
                });
                if let Some((value, kp)) = nearest {
                    if (value - centre).norm() < match_thresh {
                        kpoints.push(kp.clone());
                    }
                }
            }
            if kpoints.is_empty() {
                continue;
            }
            let sub = BandStructure::builder()
                .space_group(self.space_group.clone())
                .kpoints(kpoints)
                .efermi(self.efermi)
                .build()
                .map_err(|err| format_err!("{err}"))?;
            subspaces.push((centre, sub));
        }
        Ok(subspaces)
    }
}

impl fmt::Display for BandStructureAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_title(f, "Band Structure Symmetry Analysis")?;
        writeln!(f)?;
        for ka in &self.kpoints {
            write_subtitle(
                f,
                &format!(
                    "k-point {} = ({:+.4}, {:+.4}, {:+.4}){}",
                    ka.ik + 1,
                    ka.kpt[0],
                    ka.kpt[1],
                    ka.kpt[2],
                    ka.label
                        .as_ref()
                        .map(|l| format!("  [{l}]"))
                        .unwrap_or_default()
                ),
            )?;
            writeln!(
                f,
                "Little-group operations: {}",
                ka.little_group.iter().map(|i| (i + 1).to_string()).join(" ")
            )?;
            for sub in &ka.subspaces {
                write!(
                    f,
                    "bands {:>4}..{:<4} E = {:+10.6} eV  dim = {}",
                    sub.bands.0 + 1,
                    sub.bands.1,
                    sub.energy,
                    sub.dim()
                )?;
                if let Some(irrep) = &sub.irrep {
                    write!(f, "  {irrep}")?;
                }
                writeln!(f)?;
                writeln!(
                    f,
                    "    traces: {}",
                    sub.traces.iter().map(|t| short_complex(*t, 3)).join("  ")
                )?;
            }
            writeln!(f, "Bands below the Fermi level: {}", ka.num_bands_below_ef)?;
            match ka.num_bandinvs {
                Some(n) => writeln!(f, "Inversion-odd states: {n}")?,
                None => writeln!(f, "Invariant under inversion: no")?,
            }
            if let Some(gap) = ka.gap_to_upper {
                writeln!(f, "Gap with upper bands: {gap:.6} eV")?;
            }
            writeln!(f)?;
        }

        if let Some(n) = self.num_bandinvs {
            writeln!(f, "TOTAL inversion-odd states: {n}")?;
        }
        if let Some(pairs) = self.num_kramers_pairs {
            writeln!(f, "TOTAL inversion-odd Kramers pairs: {pairs}")?;
        }
        if let (Some(z2), Some(z4)) = (self.z2, self.z4) {
            writeln!(f, "Z2 invariant: {z2}")?;
            writeln!(f, "Z4 invariant: {z4}")?;
        }
        if let Some(gap) = self.gap_direct {
            writeln!(f, "Smallest direct gap: {gap:.6} eV")?;
        }
        if let Some(gap) = self.gap_indirect {
            writeln!(f, "Indirect gap: {gap:.6} eV")?;
        }
        Ok(())
    }
}
