//! Interfaces between BandSym and DFT wavefunction data.
//!
//! Every DFT code presents its wavefunctions differently; BandSym consumes
//! them through the [`WavefunctionSource`] capability, which yields one
//! canonical in-memory dataset per k-point regardless of the on-disk layout.
//! Sources backed by stream-like files (Abinit-style) are not randomly
//! seekable; the [`SequentialCursor`] makes that contract explicit instead of
//! relying on call-order discipline.

use anyhow::{self, format_err};
use nalgebra::{Matrix3, Vector3};
use ndarray::{Array1, Array2};
use num_complex::Complex;

pub mod binaries;
pub mod cli;
pub mod input;


// =================
// Trait definitions
// =================

/// The header of a wavefunction dataset: everything that is known before any
/// k-point block is read.
#[derive(Clone, Debug)]
pub struct WavefunctionHeader {
    /// The number of k-points in the dataset.
    pub nkpoints: usize,

    /// The number of bands stored per k-point.
    pub nbands: usize,

    /// The plane-wave cutoff in eV used by the DFT code.
    pub ecut: f64,

    /// Whether the wavefunctions are spinors.
    pub spinor: bool,

    /// The Fermi energy in eV, when the code records it.
    pub efermi: Option<f64>,

    /// The real-space lattice (rows = Cartesian basis vectors in Å).
    pub lattice: Matrix3<f64>,
}

/// The G-vector record of one k-point: either the code implies the basis
/// from the cutoff and declares only a count, or it stores its own explicit
/// list in native order.
#[derive(Clone, Debug)]
pub enum GvectorRecord {
    /// The declared plane-wave count, covering both spinor components for
    /// spinor wavefunctions.
    Count(usize),

    /// The explicit G-vector list in the code's native storage order.
    Explicit(Vec<Vector3<i32>>),
}

/// The canonical in-memory dataset of one k-point, with coefficients still
/// in the code's native column order.
#[derive(Clone, Debug)]
pub struct RawKpoint {
    /// The k-point in direct coordinates.
    pub kpt: Vector3<f64>,

    /// The energies of all stored bands in eV (absolute, no Fermi shift).
    pub energies: Array1<f64>,

    /// The coefficient matrix, one stored band per row, columns in the
    /// code's native order.
    pub coefficients: Array2<Complex<f64>>,

    /// The G-vector record of this k-point.
    pub gvectors: GvectorRecord,
}

/// Capability trait for DFT wavefunction sources: one implementation per
/// supported code family, all presenting the same canonical dataset.
pub trait WavefunctionSource {
    /// Reads the dataset header.
    fn read_header(&mut self) -> Result<WavefunctionHeader, anyhow::Error>;

    /// Reads the dataset of the k-point with index `ik` (0-based, in the
    /// code's k-point order).
    fn read_kpoint(&mut self, ik: usize) -> Result<RawKpoint, anyhow::Error>;

    /// Reads the real-space lattice.
    fn read_lattice(&mut self) -> Result<Matrix3<f64>, anyhow::Error> {
        Ok(self.read_header()?.lattice)
    }
}

// ==================
// Struct definitions
// ==================

/// A wavefunction source already materialised in memory, used as the
/// reference implementation of the canonical dataset and as the test
/// vehicle.
#[derive(Clone, Debug)]
pub struct InMemorySource {
    header: WavefunctionHeader,
    kpoints: Vec<RawKpoint>,
}

impl InMemorySource {
    /// Wraps a header and its k-point datasets. The number of k-points must
    /// match the header.
    pub fn new(
        header: WavefunctionHeader,
        kpoints: Vec<RawKpoint>,
    ) -> Result<Self, anyhow::Error> {
        if header.nkpoints != kpoints.len() {
            return Err(format_err!(
                "The header declares {} k-points but {} were supplied.",
                header.nkpoints,
                kpoints.len()
            ));
        }
        Ok(Self { header, kpoints })
    }
}

impl WavefunctionSource for InMemorySource {
    fn read_header(&mut self) -> Result<WavefunctionHeader, anyhow::Error> {
        Ok(self.header.clone())
    }

    fn read_kpoint(&mut self, ik: usize) -> Result<RawKpoint, anyhow::Error> {
        self.kpoints
            .get(ik)
            .cloned()
            .ok_or_else(|| format_err!("No k-point with index {ik} in the dataset."))
    }
}

/// An explicit forward-only cursor over a wavefunction source.
///
/// Stream-backed sources can only be read k-point-by-k-point in increasing
/// order, skipping unwanted blocks by reading past them. [`Self::seek_to`]
/// documents that contract: seeking forward costs one block read per skipped
/// k-point (O(k)), and seeking backwards is an error.
pub struct SequentialCursor<S: WavefunctionSource> {
    source: S,
    next: usize,
}

impl<S: WavefunctionSource> SequentialCursor<S> {
    /// Wraps a source in a forward-only cursor positioned before the first
    /// k-point.
    pub fn new(source: S) -> Self {
        Self { source, next: 0 }
    }

    /// The index of the next k-point to be read.
    pub fn position(&self) -> usize {
        self.next
    }

    /// Advances the cursor to k-point `ik`, reading and discarding every
    /// block in between. Seeking backwards is an error.
    pub fn seek_to(&mut self, ik: usize) -> Result<(), anyhow::Error> {
        if ik < self.next {
            return Err(format_err!(
                "Cannot seek backwards from k-point {} to {ik}: the source is \
                 forward-only.",
                self.next
            ));
        }
        while self.next < ik {
            self.source.read_kpoint(self.next)?;
            self.next += 1;
        }
        Ok(())
    }

    /// Reads the k-point under the cursor and advances past it.
    pub fn read_next(&mut self) -> Result<(usize, RawKpoint), anyhow::Error> {
        let ik = self.next;
        let raw = self.source.read_kpoint(ik)?;
        self.next += 1;
        Ok((ik, raw))
    }

    /// Releases the underlying source.
    pub fn into_inner(self) -> S {
        self.source
    }
}
