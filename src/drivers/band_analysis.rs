//! Driver for the symmetry analysis of a whole band structure.

use std::fmt;

use anyhow::{self, format_err};
use derive_builder::Builder;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisThresholds;
use crate::bandstructure::{BandStructure, BandStructureAnalysis};
use crate::basis::{reciprocal_lattice, KBasis};
use crate::drivers::BandSymDriver;
use crate::interfaces::{GvectorRecord, WavefunctionSource};
use crate::io::format::{bandsym_error, bandsym_output, bandsym_warn, log_title, nice_bool};
use crate::kpoint::Kpoint;
use crate::symmetry::SpaceGroup;

#[cfg(test)]
#[path = "band_analysis_tests.rs"]
mod band_analysis_tests;

// ==================
// Struct definitions
// ==================

// ----------
// Parameters
// ----------

/// A structure containing control parameters for band-structure symmetry
/// analysis.
#[derive(Clone, Builder, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BandAnalysisParams {
    /// The plane-wave cutoff in eV to consider in the expansion of the
    /// wavefunctions. `None` or values outside (0, code cutoff] fall back to
    /// the code cutoff.
    #[builder(default = "None")]
    pub ecut: Option<f64>,

    /// The first band (1-based) of the analysed window. `None` starts from
    /// the first stored band.
    #[builder(default = "None")]
    pub ib_start: Option<usize>,

    /// The last band (1-based, inclusive) of the analysed window. `None`
    /// extends to the last stored band.
    #[builder(default = "None")]
    pub ib_end: Option<usize>,

    /// The indices (1-based) of the k-points to analyse, in the desired
    /// order. `None` analyses all k-points in file order.
    #[builder(default = "None")]
    pub kpoints: Option<Vec<usize>>,

    /// High-symmetry labels, one per analysed k-point, keying the reference
    /// irrep tables of the space group. `None` reports traces only.
    #[builder(default = "None")]
    pub kpnames: Option<Vec<String>>,

    /// The Fermi energy in eV. `None` takes the value recorded by the DFT
    /// code, defaulting to zero with a warning when absent.
    #[builder(default = "None")]
    pub efermi: Option<f64>,

    /// The numeric thresholds of the analysis.
    #[builder(default = "AnalysisThresholds::default()")]
    pub thresholds: AnalysisThresholds,
}

impl BandAnalysisParams {
    /// Returns a builder to construct a [`BandAnalysisParams`] structure.
    pub fn builder() -> BandAnalysisParamsBuilder {
        BandAnalysisParamsBuilder::default()
    }
}

impl Default for BandAnalysisParams {
    fn default() -> Self {
        Self::builder()
            .build()
            .expect("All parameters have defaults.")
    }
}

impl fmt::Display for BandAnalysisParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ecut {
            Some(e) => writeln!(f, "Plane-wave cutoff: {e:.3} eV")?,
            None => writeln!(f, "Plane-wave cutoff: from the wavefunction file")?,
        }
        match (self.ib_start, self.ib_end) {
            (None, None) => writeln!(f, "Band window: all stored bands")?,
            (s, e) => writeln!(
                f,
                "Band window: {} to {}",
                s.map_or("first".to_string(), |b| b.to_string()),
                e.map_or("last".to_string(), |b| b.to_string())
            )?,
        }
        match self.efermi {
            Some(e) => writeln!(f, "Fermi energy: {e:.4} eV")?,
            None => writeln!(f, "Fermi energy: from the wavefunction file")?,
        }
        writeln!(
            f,
            "Irrep identification: {}",
            nice_bool(self.kpnames.is_some())
        )?;
        writeln!(f, "Degeneracy threshold: {:.3e} eV", self.thresholds.degen)?;
        writeln!(f)?;
        Ok(())
    }
}

// ------
// Result
// ------

/// A structure to contain band-structure symmetry analysis results.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BandAnalysisResult {
    /// The control parameters used to obtain this set of results.
    parameters: BandAnalysisParams,

    /// The aggregate analysis of the band structure.
    analysis: BandStructureAnalysis,
}

impl BandAnalysisResult {
    /// The control parameters used to obtain this set of results.
    pub fn parameters(&self) -> &BandAnalysisParams {
        &self.parameters
    }

    /// The aggregate analysis of the band structure.
    pub fn analysis(&self) -> &BandStructureAnalysis {
        &self.analysis
    }
}

// ------
// Driver
// ------

/// Driver for the symmetry analysis of a band structure read from a
/// wavefunction source.
#[derive(Builder)]
#[builder(pattern = "owned")]
pub struct BandAnalysisDriver<S: WavefunctionSource> {
    /// The control parameters of the analysis.
    parameters: BandAnalysisParams,

    /// The wavefunction source.
    source: S,

    /// The space group of the crystal, with its reference irrep tables.
    space_group: SpaceGroup,

    /// The band structure assembled by the driver.
    #[builder(setter(skip), default = "None")]
    band_structure: Option<BandStructure>,

    /// The result of the analysis.
    #[builder(setter(skip), default = "None")]
    result: Option<BandAnalysisResult>,
}

impl<S: WavefunctionSource> BandAnalysisDriver<S> {
    /// Returns a builder to construct a [`BandAnalysisDriver`] structure.
    pub fn builder() -> BandAnalysisDriverBuilder<S> {
        BandAnalysisDriverBuilder::default()
    }

    /// The band structure assembled by the driver, available after
    /// [`BandSymDriver::run`].
    pub fn band_structure(&self) -> Result<&BandStructure, anyhow::Error> {
        self.band_structure
            .as_ref()
            .ok_or_else(|| format_err!("No band structure found. Has the driver been run?"))
    }

    fn assemble(&mut self) -> Result<(BandStructure, Option<Vec<String>>), anyhow::Error> {
        let params = self.parameters.clone();
        let header = self.source.read_header()?;

        if header.spinor != self.space_group.spinor() {
            return Err(format_err!(
                "The wavefunction source and the space group disagree on the spinor \
                 character of the wavefunctions."
            ));
        }
        let lattice_dev = (header.lattice - self.space_group.lattice())
            .iter()
            .fold(0.0_f64, |acc, x| acc.max(x.abs()));
        if lattice_dev > 1e-5 {
            return Err(format_err!(
                "The wavefunction source and the space group carry different lattices \
                 (max deviation {lattice_dev:.3e} Å)."
            ));
        }

        let efermi = match params.efermi.or(header.efermi) {
            Some(e) => e,
            None => {
                bandsym_warn!("Fermi energy not found. Setting it to zero.");
                0.0
            }
        };

        let ecut = match params.ecut {
            Some(e) if e > 0.0 && e <= header.ecut => e,
            Some(e) => {
                bandsym_warn!(
                    "Requested cutoff {e:.3} eV is outside (0, {:.3}]; using the code \
                     cutoff.",
                    header.ecut
                );
                header.ecut
            }
            None => header.ecut,
        };

        let ib_start = params.ib_start.unwrap_or(1);
        let ib_end = params.ib_end.unwrap_or(header.nbands);
        if ib_start < 1 || ib_end > header.nbands || ib_start > ib_end {
            return Err(format_err!(
                "Invalid band window {ib_start}..{ib_end} for {} stored bands.",
                header.nbands
            ));
        }

        let kplist = match &params.kpoints {
            Some(list) => {
                let mut indices = Vec::with_capacity(list.len());
                for &k in list {
                    if k < 1 || k > header.nkpoints {
                        return Err(format_err!(
                            "K-point index {k} is outside 1..{}.",
                            header.nkpoints
                        ));
                    }
                    indices.push(k - 1);
                }
                indices
            }
            None => (0..header.nkpoints).collect(),
        };
        if let Some(names) = &params.kpnames {
            if names.len() != kplist.len() {
                return Err(format_err!(
                    "{} k-point labels supplied for {} analysed k-points.",
                    names.len(),
                    kplist.len()
                ));
            }
        }

        let rec_lattice = reciprocal_lattice(self.space_group.lattice())?;
        let spinor = header.spinor;

        let mut kpoints = Vec::with_capacity(kplist.len());
        for &ik in &kplist {
            let raw = self.source.read_kpoint(ik)?;
            if raw.energies.len() != header.nbands
                || raw.coefficients.nrows() != header.nbands
            {
                return Err(format_err!(
                    "K-point {ik}: the dataset stores {} bands but the header declares {}.",
                    raw.energies.len().min(raw.coefficients.nrows()),
                    header.nbands
                ));
            }
            let basis = match &raw.gvectors {
                GvectorRecord::Count(npw) => KBasis::from_count(
                    ik,
                    raw.kpt,
                    &rec_lattice,
                    header.ecut,
                    *npw,
                    ecut,
                    spinor,
                )?,
                GvectorRecord::Explicit(native) => KBasis::from_native(
                    ik,
                    raw.kpt,
                    &rec_lattice,
                    native,
                    header.ecut,
                    ecut,
                )?,
            };
            let columns = basis.column_selection(spinor);
            let native_cols = raw.coefficients.ncols();
            if columns.iter().any(|&c| c >= native_cols) {
                return Err(format_err!(
                    "K-point {ik}: the coefficient matrix has {native_cols} columns, fewer \
                     than the reconciled basis requires."
                ));
            }

            let window = (ib_start - 1)..ib_end;
            let wf = Array2::from_shape_fn((window.len(), columns.len()), |(i, j)| {
                raw.coefficients[[window.start + i, columns[j]]]
            });
            let energies =
                Array1::from_iter(window.clone().map(|b| raw.energies[b] - efermi));
            let upper = raw.energies.get(ib_end).map(|e| e - efermi);

            let mut kp = Kpoint::builder()
                .ik(ik)
                .spinor(spinor)
                .basis(basis)
                .coefficients(wf)
                .energies(energies)
                .upper(upper)
                .build()
                .map_err(|err| format_err!("K-point {ik}: {err}"))?;
            kp.normalise();
            kpoints.push(kp);
        }

        let band_structure = BandStructure::builder()
            .space_group(self.space_group.clone())
            .kpoints(kpoints)
            .efermi(efermi)
            .build()
            .map_err(|err| format_err!("{err}"))?;
        Ok((band_structure, params.kpnames.clone()))
    }
}

impl<S: WavefunctionSource> BandSymDriver for BandAnalysisDriver<S> {
    type Params = BandAnalysisParams;

    type Outcome = BandAnalysisResult;

    fn run(&mut self) -> Result<(), anyhow::Error> {
        log_title("Band-Structure Symmetry Analysis");
        bandsym_output!("");
        for line in self.parameters.to_string().lines() {
            bandsym_output!("{line}");
        }

        let (band_structure, kpnames) = self.assemble().map_err(|err| {
            bandsym_error!("{err}");
            err
        })?;
        let analysis = band_structure
            .analyse(kpnames.as_deref(), &self.parameters.thresholds)
            .map_err(|err| {
                bandsym_error!("{err}");
                err
            })?;

        for line in analysis.to_string().lines() {
            bandsym_output!("{line}");
        }

        self.band_structure = Some(band_structure);
        self.result = Some(BandAnalysisResult {
            parameters: self.parameters.clone(),
            analysis,
        });
        Ok(())
    }

    fn result(&self) -> Result<&Self::Outcome, anyhow::Error> {
        self.result
            .as_ref()
            .ok_or_else(|| format_err!("No band-analysis results found. Has the driver been run?"))
    }
}
