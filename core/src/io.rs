//! Format detection and path helpers.

use std::{fs::File, io, path::Path};

use crate::{array::npy, error::Error};

/// Leading bytes of a zip local file header.
const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";

/// Supported container formats.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Format {
    /// A single array in npy format.
    Npy,
    /// An archive of arrays in npz format.
    Npz,
}

impl Format {
    /// Detects the format from the leading bytes of a file.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        Self::detect_npy(bytes).or_else(|| Self::detect_npz(bytes))
    }

    fn detect_npy(bytes: &[u8]) -> Option<Self> {
        bytes
            .starts_with(&npy::MAGIC)
            .then_some(Self::Npy)
    }

    fn detect_npz(bytes: &[u8]) -> Option<Self> {
        bytes.starts_with(&ZIP_MAGIC).then_some(Self::Npz)
    }
}

/// Opens `path` for reading.
///
/// The failure message names the path that could not be opened.
pub fn open<P>(path: P) -> Result<File, Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();

    File::open(path).map_err(|e| {
        Error::Io(io::Error::new(
            e.kind(),
            format!("unable to open file {}: {e}", path.display()),
        ))
    })
}

/// Creates or truncates `path` for writing.
///
/// The failure message names the path that could not be created.
pub fn create<P>(path: P) -> Result<File, Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();

    File::create(path).map_err(|e| {
        Error::Io(io::Error::new(
            e.kind(),
            format!("unable to create file {}: {e}", path.display()),
        ))
    })
}
