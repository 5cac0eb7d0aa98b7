//! BandSym interface with flat binary wavefunction dumps.
//!
//! Many workflows extract wavefunction data from a DFT calculation into
//! plain binary arrays. This source reads such dumps: one energy file and
//! one coefficient file per k-point, plus an optional native-order G-vector
//! file for codes that store their own list.

use std::path::PathBuf;

use anyhow::{self, format_err};
use byteorder::{BigEndian, LittleEndian};
use derive_builder::Builder;
use nalgebra::{Matrix3, Vector3};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::interfaces::{GvectorRecord, RawKpoint, WavefunctionHeader, WavefunctionSource};
use crate::io::numeric::{read_complexes, read_reals, read_triples};

#[cfg(test)]
#[path = "binaries_tests.rs"]
mod binaries_tests;

/// Specification of the byte order numerical values are stored in binary
/// files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteOrderKind {
    /// Variant for little-endian storage.
    #[default]
    LittleEndian,

    /// Variant for big-endian storage.
    BigEndian,
}

/// Serialisable/deserialisable structure describing the binary dumps of one
/// k-point.
#[derive(Clone, Debug, Builder, Serialize, Deserialize)]
pub struct BinaryKpointSource {
    /// The k-point in direct coordinates.
    pub kpt: Vector3<f64>,

    /// The number of native coefficient columns, covering both spinor
    /// components for spinor wavefunctions.
    pub num_plane_waves: usize,

    /// Path to a binary file of band energies in eV.
    pub energies: PathBuf,

    /// Path to a binary file of interleaved (re, im) coefficient pairs, one
    /// band after another in the native column order.
    pub coefficients: PathBuf,

    /// Optional path to a binary file of native-order G-vector triples
    /// (`i32`). Absent for codes whose basis is implied by the cutoff.
    #[builder(default = "None")]
    #[serde(default)]
    pub gvectors: Option<PathBuf>,
}

/// Serialisable/deserialisable structure containing control parameters for
/// acquiring wavefunctions from flat binary dumps.
#[derive(Clone, Debug, Builder, Serialize, Deserialize)]
pub struct BinariesWavefunctionSource {
    /// The real-space lattice (rows = Cartesian basis vectors in Å).
    pub lattice: Matrix3<f64>,

    /// The plane-wave cutoff in eV used by the DFT code.
    pub ecut: f64,

    /// Whether the wavefunctions are spinors.
    pub spinor: bool,

    /// The number of bands stored per k-point.
    pub nbands: usize,

    /// The Fermi energy in eV, when known.
    #[builder(default = "None")]
    #[serde(default)]
    pub efermi: Option<f64>,

    /// The byte order of all binary files.
    #[builder(default = "ByteOrderKind::default()")]
    #[serde(default)]
    pub byte_order: ByteOrderKind,

    /// The k-point dumps, in k-point order.
    pub kpoints: Vec<BinaryKpointSource>,
}

impl BinariesWavefunctionSource {
    /// Returns a builder to construct a [`BinariesWavefunctionSource`]
    /// structure.
    pub fn builder() -> BinariesWavefunctionSourceBuilder {
        BinariesWavefunctionSourceBuilder::default()
    }
}

impl WavefunctionSource for BinariesWavefunctionSource {
    fn read_header(&mut self) -> Result<WavefunctionHeader, anyhow::Error> {
        Ok(WavefunctionHeader {
            nkpoints: self.kpoints.len(),
            nbands: self.nbands,
            ecut: self.ecut,
            spinor: self.spinor,
            efermi: self.efermi,
            lattice: self.lattice,
        })
    }

    fn read_kpoint(&mut self, ik: usize) -> Result<RawKpoint, anyhow::Error> {
        let spec = self
            .kpoints
            .get(ik)
            .ok_or_else(|| format_err!("No k-point with index {ik} in the dataset."))?;
        let ncoeffs = self.nbands * spec.num_plane_waves;
        let (energies, flat, triples) = match self.byte_order {
            ByteOrderKind::LittleEndian => (
                read_reals::<LittleEndian, _>(&spec.energies, self.nbands)?,
                read_complexes::<LittleEndian, _>(&spec.coefficients, ncoeffs)?,
                spec.gvectors
                    .as_ref()
                    .map(read_triples::<LittleEndian, _>)
                    .transpose()?,
            ),
            ByteOrderKind::BigEndian => (
                read_reals::<BigEndian, _>(&spec.energies, self.nbands)?,
                read_complexes::<BigEndian, _>(&spec.coefficients, ncoeffs)?,
                spec.gvectors
                    .as_ref()
                    .map(read_triples::<BigEndian, _>)
                    .transpose()?,
            ),
        };
        let coefficients =
            Array2::from_shape_vec((self.nbands, spec.num_plane_waves), flat)
                .map_err(|err| format_err!("K-point {ik}: {err}."))?;
        let gvectors = match triples {
            Some(list) => GvectorRecord::Explicit(
                list.into_iter()
                    .map(|[x, y, z]| Vector3::new(x, y, z))
                    .collect(),
            ),
            None => GvectorRecord::Count(spec.num_plane_waves),
        };
        Ok(RawKpoint {
            kpt: spec.kpt,
            energies,
            coefficients,
            gvectors,
        })
    }
}
