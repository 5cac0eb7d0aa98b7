//! YAML input of the `bandsym` binary.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{self, format_err};
use serde::{Deserialize, Serialize};

use crate::drivers::band_analysis::BandAnalysisParams;
use crate::interfaces::binaries::BinariesWavefunctionSource;
use crate::symmetry::SpaceGroup;

/// An enumerated type representing possible wavefunction sources specified
/// in a YAML input file.
#[derive(Clone, Serialize, Deserialize)]
pub enum WavefunctionSourceKind {
    /// Variant for wavefunctions stored as flat binary dumps.
    Binaries(BinariesWavefunctionSource),
}

/// An enumerated type representing possible space-group specifications in a
/// YAML input file.
#[derive(Clone, Serialize, Deserialize)]
pub enum SpaceGroupInputKind {
    /// Variant for an inline space-group specification.
    Parameters(SpaceGroup),

    /// Variant for a space group read from a separate YAML file.
    FromFile(PathBuf),
}

/// A structure containing BandSym input parameters which can be serialised
/// into and deserialised from a YAML input file.
#[derive(Clone, Serialize, Deserialize)]
pub struct Input {
    /// Specification of the wavefunction source.
    pub source: WavefunctionSourceKind,

    /// Specification of the space group and its reference irrep tables.
    pub space_group: SpaceGroupInputKind,

    /// Control parameters for the band-structure analysis.
    ///
    /// # Default
    ///
    /// If not specified, all parameters take their default values.
    #[serde(default)]
    pub analysis: BandAnalysisParams,
}

impl Input {
    /// Resolves the space-group specification, reading the referenced file
    /// if necessary.
    pub fn resolve_space_group(&self) -> Result<SpaceGroup, anyhow::Error> {
        match &self.space_group {
            SpaceGroupInputKind::Parameters(group) => Ok(group.clone()),
            SpaceGroupInputKind::FromFile(path) => {
                let reader =
                    BufReader::new(File::open(path).map_err(|err| {
                        format_err!("Cannot open `{}`: {err}.", path.display())
                    })?);
                serde_yaml::from_reader(reader)
                    .map_err(|err| format_err!("Cannot parse `{}`: {err}.", path.display()))
            }
        }
    }
}
