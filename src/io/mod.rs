use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{self, format_err};
use serde::{de::DeserializeOwned, Serialize};

pub(crate) mod format;
pub(crate) mod numeric;

/// An enumerated type for BandSym file types.
pub enum BandsymFileType {
    /// Variant for YAML files containing band-structure analysis results.
    Res,

    /// Variant for YAML files containing reference irrep character tables.
    Tab,
}

impl BandsymFileType {
    /// Returns the extension of the file type.
    pub fn ext(&self) -> String {
        match self {
            BandsymFileType::Res => "bandsym.res".to_string(),
            BandsymFileType::Tab => "bandsym.tab".to_string(),
        }
    }
}

/// Reads a BandSym YAML file and deserialises it into an appropriate
/// structure.
///
/// # Arguments
///
/// * `name` - The name of the file to be read in (without BandSym-specific
/// extensions).
/// * `file_type` - The type of the BandSym file to be read in.
///
/// # Returns
///
/// A `Result` containing the structure deserialised from the read-in file.
pub fn read_bandsym_yaml<T, P: AsRef<Path>>(
    name: P,
    file_type: BandsymFileType,
) -> Result<T, anyhow::Error>
where
    T: DeserializeOwned,
{
    let mut path = name.as_ref().to_path_buf();
    path.set_extension(file_type.ext());
    let reader = BufReader::new(File::open(path).map_err(|err| format_err!(err))?);
    serde_yaml::from_reader(reader).map_err(|err| format_err!(err))
}

/// Serialises a structure into a BandSym YAML file.
///
/// # Arguments
///
/// * `value` - The structure to be serialised.
/// * `name` - The name of the file to be written (without BandSym-specific
/// extensions).
/// * `file_type` - The type of the BandSym file to be written.
pub fn write_bandsym_yaml<T, P: AsRef<Path>>(
    value: &T,
    name: P,
    file_type: BandsymFileType,
) -> Result<(), anyhow::Error>
where
    T: Serialize,
{
    let mut path = name.as_ref().to_path_buf();
    path.set_extension(file_type.ext());
    let writer = BufWriter::new(File::create(path).map_err(|err| format_err!(err))?);
    serde_yaml::to_writer(writer, value).map_err(|err| format_err!(err))
}
