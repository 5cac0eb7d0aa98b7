//! Band-degeneracy partitioning and symmetry trace analysis.
//!
//! Individual near-degenerate bands mix arbitrarily under a generic numerical
//! diagonalisation, so symmetry analysis is only meaningful on whole
//! degenerate subspaces. This module partitions the ordered band list of a
//! k-point into such subspaces, computes the trace of every little-group
//! operation on each of them, assigns irreps from reference tables, and
//! counts inversion-odd states.

use std::ops::Range;

use anyhow::{self, format_err};
use ndarray::{s, Array1};
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::auxiliary::constants::{
    DEFAULT_DEGEN_THRESH, DEFAULT_INTEGER_THRESH, DEFAULT_MULTIPLICITY_THRESH,
    DEFAULT_UNITARITY_ERROR_THRESH, DEFAULT_UNITARITY_WARN_THRESH,
};
use crate::auxiliary::linalg::unitarity_defect;
use crate::chartab::{IrrepMatch, IrrepTable};
use crate::kpoint::Kpoint;
use crate::symmetry::SpaceGroup;


type C64 = Complex<f64>;

// ==================
// Struct definitions
// ==================

/// Numeric thresholds steering the symmetry analysis. All fields default to
/// the named constants in [`crate::auxiliary::constants`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisThresholds {
    /// Energy difference in eV below which two bands belong to the same
    /// degenerate subspace.
    pub degen: f64,

    /// Unitarity deviation above which a warning is emitted.
    pub unitarity_warn: f64,

    /// Unitarity deviation above which the analysis of the offending k-point
    /// is aborted.
    pub unitarity_error: f64,

    /// Tolerance on irrep multiplicities and parity traces.
    pub multiplicity: f64,

    /// Tolerance when checking that a fractional vector is integer.
    pub integer: f64,
}

impl Default for AnalysisThresholds {
    fn default() -> Self {
        Self {
            degen: DEFAULT_DEGEN_THRESH,
            unitarity_warn: DEFAULT_UNITARITY_WARN_THRESH,
            unitarity_error: DEFAULT_UNITARITY_ERROR_THRESH,
            multiplicity: DEFAULT_MULTIPLICITY_THRESH,
            integer: DEFAULT_INTEGER_THRESH,
        }
    }
}

/// The symmetry analysis of one degenerate subspace.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubspaceAnalysis {
    /// The half-open band range of the subspace, relative to the selected
    /// window.
    pub bands: (usize, usize),

    /// The mean energy of the subspace in eV, relative to the Fermi level.
    pub energy: f64,

    /// The trace of every retained little-group operation on the subspace,
    /// aligned with [`KpointAnalysis::little_group`].
    pub traces: Vec<C64>,

    /// The irrep assignment, when a reference table is available for the
    /// k-point.
    pub irrep: Option<IrrepMatch>,

    /// The number of inversion-odd states in the subspace, when the little
    /// group contains the spatial inversion.
    pub inversion_odd: Option<usize>,
}

impl SubspaceAnalysis {
    /// The dimension of the subspace.
    pub fn dim(&self) -> usize {
        self.bands.1 - self.bands.0
    }
}

/// The symmetry analysis of one k-point.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KpointAnalysis {
    /// The index of the k-point in the input k-point list.
    pub ik: usize,

    /// The k-point in direct coordinates.
    pub kpt: [f64; 3],

    /// The high-symmetry label of the k-point, when supplied.
    pub label: Option<String>,

    /// The indices of the retained (unitary) little-group operations, into
    /// the space-group operation list.
    pub little_group: Vec<usize>,

    /// The number of window bands below the Fermi level at this k-point.
    pub num_bands_below_ef: usize,

    /// The degenerate subspaces of the band window, in ascending energy
    /// order.
    pub subspaces: Vec<SubspaceAnalysis>,

    /// The total number of inversion-odd states in the window, when the
    /// little group contains the spatial inversion.
    pub num_bandinvs: Option<usize>,

    /// The gap between the top of the window and the first band above it,
    /// when the latter is known.
    pub gap_to_upper: Option<f64>,
}

// =========
// Functions
// =========

/// Partitions an ordered band list into contiguous degenerate subspaces.
///
/// A single pass extends the current group while the energy step to the next
/// band stays below `degen_thresh` and closes it otherwise. An empty band
/// list is a fatal error.
pub fn degenerate_subspaces(
    energies: &Array1<f64>,
    degen_thresh: f64,
) -> Result<Vec<Range<usize>>, anyhow::Error> {
    if energies.is_empty() {
        return Err(format_err!("No bands to analyse."));
    }
    let mut groups = Vec::new();
    let mut start = 0;
    for i in 1..energies.len() {
        if energies[i] - energies[i - 1] >= degen_thresh {
            groups.push(start..i);
            start = i;
        }
    }
    groups.push(start..energies.len());
    Ok(groups)
}

/// Analyses the symmetry of the bands at one k-point: computes the matrix of
/// every retained little-group operation, checks its unitarity on each
/// degenerate subspace, records the subspace traces, assigns irreps from the
/// reference table (when given) and counts inversion-odd states.
///
/// Antiunitary little-group operations are excluded from trace computation:
/// their "characters" are not basis-invariant and reference tables list
/// unitary operations only.
pub fn analyse_kpoint(
    kp: &Kpoint,
    space_group: &SpaceGroup,
    label: Option<&str>,
    thresholds: &AnalysisThresholds,
) -> Result<KpointAnalysis, anyhow::Error> {
    let little_group = space_group
        .little_group(kp.kpt(), thresholds.integer)?
        .into_iter()
        .filter(|&i| !space_group.operations()[i].time_reversal())
        .collect::<Vec<_>>();
    if little_group.is_empty() {
        return Err(format_err!(
            "K-point {}: the little group contains no unitary operation; the identity is \
             missing from the space-group operations.",
            kp.ik()
        ));
    }

    let groups = degenerate_subspaces(kp.energies(), thresholds.degen)?;

    // One matrix per retained operation over the whole window.
    let mut matrices = Vec::with_capacity(little_group.len());
    for &iop in &little_group {
        let op = &space_group.operations()[iop];
        let spin = if space_group.spinor() {
            Some(op.full_spin_rotation(space_group.lattice())?)
        } else {
            None
        };
        let m = kp.symmetry_matrix(op, spin.as_ref(), thresholds.integer)?;
        matrices.push(m);
    }

    let table = label.and_then(|l| space_group.irrep_table(l));
    if let (Some(l), None) = (label, table) {
        log::warn!(
            "K-point {}: no reference irrep table registered for label `{l}`; only traces \
             will be reported.",
            kp.ik()
        );
    }
    let inversion = space_group
        .inversion_index()
        .filter(|i| little_group.contains(i));

    let mut subspaces = Vec::with_capacity(groups.len());
    let mut num_bandinvs = inversion.map(|_| 0_usize);
    for group in &groups {
        let dim = group.len();
        let mut traces = Vec::with_capacity(little_group.len());
        for (pos, m) in matrices.iter().enumerate() {
            let block = m.slice(s![group.clone(), group.clone()]);
            let defect = unitarity_defect(block);
            if defect > thresholds.unitarity_error {
                return Err(format_err!(
                    "K-point {}: operation {} is not unitary on bands {}..{} \
                     (deviation {defect:.3e}). The G-vector alignment or the symmetry \
                     operation is wrong.",
                    kp.ik(),
                    little_group[pos] + 1,
                    group.start + 1,
                    group.end
                ));
            }
            if defect > thresholds.unitarity_warn {
                log::warn!(
                    "K-point {}: operation {} deviates from unitarity by {defect:.3e} on \
                     bands {}..{}.",
                    kp.ik(),
                    little_group[pos] + 1,
                    group.start + 1,
                    group.end
                );
            }
            let trace = (0..dim).map(|a| block[[a, a]]).sum::<C64>();
            traces.push(trace);
        }

        let irrep = table.map(|t| match_subspace(t, &little_group, &traces, thresholds, kp.ik()))
            .transpose()?;
        if let Some(IrrepMatch::Unidentified { residual }) = &irrep {
            log::warn!(
                "K-point {}: bands {}..{} could not be assigned to irreps \
                 (residual {residual:.3e}).",
                kp.ik(),
                group.start + 1,
                group.end
            );
        }

        let inversion_odd = match inversion {
            Some(iop) => {
                let pos = little_group
                    .iter()
                    .position(|&i| i == iop)
                    .expect("The inversion index was checked against the little group.");
                Some(inversion_odd_count(
                    traces[pos],
                    dim,
                    thresholds.multiplicity,
                    kp.ik(),
                    group,
                )?)
            }
            None => None,
        };
        if let (Some(total), Some(odd)) = (num_bandinvs.as_mut(), inversion_odd) {
            *total += odd;
        }

        let energy =
            group.clone().map(|b| kp.energies()[b]).sum::<f64>() / (dim as f64);
        subspaces.push(SubspaceAnalysis {
            bands: (group.start, group.end),
            energy,
            traces,
            irrep,
            inversion_odd,
        });
    }

    let gap_to_upper = kp
        .upper()
        .map(|u| u - kp.energies()[kp.energies().len() - 1]);

    Ok(KpointAnalysis {
        ik: kp.ik(),
        kpt: [kp.kpt().x, kp.kpt().y, kp.kpt().z],
        label: label.map(str::to_string),
        little_group,
        num_bands_below_ef: kp.energies().iter().filter(|&&e| e < 0.0).count(),
        subspaces,
        num_bandinvs,
        gap_to_upper,
    })
}

/// Matches the traces of one subspace against a reference table, reordering
/// them from the retained little-group order into the table's operation
/// order.
fn match_subspace(
    table: &IrrepTable,
    little_group: &[usize],
    traces: &[C64],
    thresholds: &AnalysisThresholds,
    ik: usize,
) -> Result<IrrepMatch, anyhow::Error> {
    let mut table_traces = Vec::with_capacity(table.operations().len());
    for &iop in table.operations() {
        let pos = little_group.iter().position(|&i| i == iop).ok_or_else(|| {
            format_err!(
                "K-point {ik}: the reference table refers to operation {}, which is not in \
                 the little group of this k-point.",
                iop + 1
            )
        })?;
        table_traces.push(traces[pos]);
    }
    Ok(table.match_traces(&table_traces, thresholds.multiplicity))
}

/// Converts the trace of the spatial inversion on a subspace into the number
/// of inversion-odd states it contains. The trace must be close to an
/// integer of the same parity as the dimension; anything else is a physical
/// inconsistency.
fn inversion_odd_count(
    trace: C64,
    dim: usize,
    thresh: f64,
    ik: usize,
    group: &Range<usize>,
) -> Result<usize, anyhow::Error> {
    let tr_int = trace.re.round();
    if (trace.re - tr_int).abs() > thresh || trace.im.abs() > thresh {
        return Err(format_err!(
            "K-point {ik}: the inversion trace {:.6}{:+.6}i on bands {}..{} is not an \
             integer.",
            trace.re,
            trace.im,
            group.start + 1,
            group.end
        ));
    }
    let tr_int = tr_int as i64;
    let dim = dim as i64;
    if (dim - tr_int) % 2 != 0 || tr_int.abs() > dim {
        return Err(format_err!(
            "K-point {ik}: the inversion trace {tr_int} is impossible for a \
             {dim}-dimensional subspace (bands {}..{}).",
            group.start + 1,
            group.end
        ));
    }
    Ok(((dim - tr_int) / 2) as usize)
}
