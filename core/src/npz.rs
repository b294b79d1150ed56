//! The npz archive container.
//!
//! An npz file is a zip archive whose members are individually encoded npy
//! blobs, named `<key>.npy`. The zip transport itself is delegated to the
//! [`zip`] crate; this module only multiplexes the npy codec over the
//! archive members.

use std::{
    io::{Read, Seek, Write},
    path::Path,
};

use indexmap::IndexMap;

use zip::{write::SimpleFileOptions, CompressionMethod, ZipArchive, ZipWriter};

use crate::{array::Array, error::Error, io as fileio, shape::Shape};

/// Conventional member suffix inside an npz archive.
const SUFFIX: &str = ".npy";

/// A named collection of arrays stored in a zip container.
///
/// Member shapes are unrelated unless checked with [`Npz::uniform_shape`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Npz {
    arrays: IndexMap<String, Array>,
}

impl Npz {
    /// An empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of member arrays.
    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    /// Whether the archive has no members.
    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// Inserts an array under the given name, returning the previous member
    /// of that name, if any.
    pub fn insert<S>(&mut self, name: S, array: Array) -> Option<Array>
    where
        S: Into<String>,
    {
        self.arrays.insert(name.into(), array)
    }

    /// The member array of the given name, if present.
    pub fn get(&self, name: &str) -> Option<&Array> {
        self.arrays.get(name)
    }

    /// The member array of the given name, if present, with write access.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Array> {
        self.arrays.get_mut(name)
    }

    /// Iterates the member names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.arrays.keys().map(String::as_str)
    }

    /// Iterates the members in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Array)> {
        self.arrays.iter().map(|(name, array)| (name.as_str(), array))
    }

    /// The shape shared by every member, if all members agree on one.
    pub fn uniform_shape(&self) -> Option<&Shape> {
        let mut members = self.arrays.values();
        let first = members.next()?.shape();

        members
            .all(|array| array.shape() == first)
            .then_some(first)
    }

    /// Reads an archive from a zip-compatible byte source.
    ///
    /// Member decode failures are annotated with the member's name.
    pub fn read<R>(reader: R) -> Result<Self, Error>
    where
        R: Read + Seek,
    {
        let mut zip = ZipArchive::new(reader).map_err(|e| Error::Io(e.into()))?;

        let mut npz = Self::new();

        for index in 0..zip.len() {
            let mut member = zip.by_index(index).map_err(|e| Error::Io(e.into()))?;
            let name = member.name().to_string();

            let mut blob = Vec::new();
            member
                .read_to_end(&mut blob)
                .map_err(|e| Error::Io(e).annotate(&name))?;

            let array = Array::read_npy(&blob[..]).map_err(|e| e.annotate(&name))?;

            let key = name.strip_suffix(SUFFIX).unwrap_or(&name).to_string();
            npz.arrays.insert(key, array);
        }

        Ok(npz)
    }

    /// Writes the archive to a zip-compatible byte sink.
    ///
    /// Members are stored uncompressed under `<name>.npy`; member encode
    /// failures are annotated with the member's name.
    pub fn write<W>(&self, writer: W) -> Result<(), Error>
    where
        W: Write + Seek,
    {
        let mut zip = ZipWriter::new(writer);
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        for (name, array) in &self.arrays {
            let mut blob = Vec::new();
            array.write_npy(&mut blob).map_err(|e| e.annotate(name))?;

            zip.start_file(format!("{name}{SUFFIX}"), options)
                .map_err(|e| Error::Io(e.into()).annotate(name))?;
            zip.write_all(&blob)
                .map_err(|e| Error::Io(e).annotate(name))?;
        }

        zip.finish().map_err(|e| Error::Io(e.into()))?;

        Ok(())
    }

    /// Reads an archive from the given path.
    pub fn read_path<P>(path: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        Self::read(fileio::open(path)?)
    }

    /// Writes the archive to the given path.
    pub fn write_path<P>(&self, path: P) -> Result<(), Error>
    where
        P: AsRef<Path>,
    {
        self.write(fileio::create(path)?)
    }
}

impl<'a> IntoIterator for &'a Npz {
    type Item = (&'a String, &'a Array);
    type IntoIter = indexmap::map::Iter<'a, String, Array>;

    fn into_iter(self) -> Self::IntoIter {
        self.arrays.iter()
    }
}
