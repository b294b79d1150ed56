#![deny(unsafe_code)]
#![warn(missing_docs)]

//! A codec for the numpy npy and npz binary array formats.
//!
//! This serves as the core library implementation for the `npio` CLI, but
//! can also be used as a free-standing library for reading and writing
//! self-describing binary arrays.
//!
//! # Overview
//!
//! The central struct is an [`Array`]: a flat byte buffer of fixed-size
//! records, described by a [`Shape`], a record layout [`Descr`], and a
//! memory [`Order`]. Typed access to record fields is gated by the layout's
//! declared [`Dtype`]s. An [`Npz`] bundles many named arrays into a zip
//! archive.
//!
//! This is a layout and codec layer only: there is no arithmetic over array
//! contents, no broadcasting, and no reductions.
//!
//! # Example
//!
//! Build a small structured array, encode it, and decode it back:
//!
//! ```
//! use npio_core::{Array, Descr, Dtype, Endian, Order};
//!
//! let mut descr = Descr::new();
//! descr.push(Dtype::of::<i64>(Endian::NATIVE), "id")?;
//! descr.push(Dtype::of::<f32>(Endian::NATIVE), "value")?;
//!
//! let mut array = Array::new(descr, vec![2], Order::RowMajor);
//!
//! for (i, mut record) in array.records_mut().enumerate() {
//!     record.set_field("id", i as i64)?;
//!     record.set_field("value", 0.5f32)?;
//! }
//!
//! let mut blob = Vec::new();
//! array.write_npy(&mut blob)?;
//!
//! let decoded = Array::read_npy(&blob[..])?;
//! assert_eq!(decoded, array);
//! # Ok::<(), npio_core::Error>(())
//! ```

pub mod array;
pub use array::Array;

pub mod bytes;
pub use bytes::Endian;

pub mod descr;
pub use descr::Descr;

pub mod dtype;
pub use dtype::{Dtype, Kind, Scalar};

pub mod error;
pub use error::Error;

pub mod io;
pub use crate::io::Format;

pub mod npz;
pub use npz::Npz;

pub mod shape;
pub use shape::{Order, Shape};
