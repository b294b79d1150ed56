//! Reading and writing the npy binary framing.
//!
//! The npy format is described [here][spec]: a fixed magic number, a
//! two-byte version, a little-endian header length, a Python-dict-shaped
//! header text naming the element layout, memory order, and shape, then the
//! raw record buffer. The header is padded so everything before the buffer
//! is a multiple of 64 bytes, for the convenience of memory-mapped readers.
//!
//! [spec]: https://numpy.org/neps/nep-0001-npy-format.html

use std::{io, sync::OnceLock};

use regex::Regex;

use super::Array;

use crate::{
    bytes::{self, Endian},
    descr::Descr,
    error::Error,
    shape::{Order, Shape},
};

/// The npy magic number.
pub(crate) const MAGIC: [u8; 6] = *b"\x93NUMPY";

/// The version marker written by the encoder; readers also accept 1.0 and
/// 3.0.
const WRITE_VERSION: [u8; 2] = [2, 0];

/// Reads an array in npy format from a reader.
///
/// The stream is assumed to be positioned at the start; everything after the
/// header is taken as the record buffer and must match its expected size
/// exactly.
pub(crate) fn read_array<R>(reader: &mut R) -> Result<Array, Error>
where
    R: io::Read,
{
    let mut magic = [0; 6];
    reader.read_exact(&mut magic)?;

    if magic != MAGIC {
        return Err(Error::Framing("not a numpy file".to_string()));
    }

    let mut version = [0; 2];
    reader.read_exact(&mut version)?;

    let header_len = match version {
        [1, 0] => {
            let mut buf = [0; 2];
            reader.read_exact(&mut buf)?;
            usize::from(bytes::convert16(
                u16::from_ne_bytes(buf),
                Endian::Little,
                Endian::NATIVE,
            ))
        }
        [2, 0] | [3, 0] => {
            let mut buf = [0; 4];
            reader.read_exact(&mut buf)?;
            bytes::convert32(u32::from_ne_bytes(buf), Endian::Little, Endian::NATIVE) as usize
        }
        [major, minor] => {
            return Err(Error::Framing(format!(
                "unsupported npy version {major}.{minor}"
            )));
        }
    };

    let mut header = vec![0; header_len];
    reader.read_exact(&mut header)?;

    // Sub-failures of the header extraction are deliberately collapsed into
    // one uniform error.
    let (descr, shape, order) = String::from_utf8(header)
        .ok()
        .and_then(|header| parse_header(&header))
        .ok_or_else(|| Error::Framing("unable to parse header".to_string()))?;

    let mut array = Array::new(descr, shape, order);

    let mut payload = Vec::new();
    reader.read_to_end(&mut payload)?;

    if payload.len() != array.data_size() {
        return Err(Error::Framing(format!(
            "payload of {} bytes does not match expected data size of {} bytes",
            payload.len(),
            array.data_size()
        )));
    }

    array.set_data(payload);

    Ok(array)
}

/// Writes the array in npy format to a writer.
pub(crate) fn write_array<W>(writer: &mut W, array: &Array) -> Result<(), Error>
where
    W: io::Write,
{
    let mut header = array.header();

    // Space-pad the header so magic, version, length field, and header text
    // total a multiple of 64 bytes.
    let prefix = MAGIC.len() + WRITE_VERSION.len() + 4;
    let pad = (64 - (prefix + header.len()) % 64) % 64;
    header.extend(std::iter::repeat(' ').take(pad));

    let header_len = bytes::convert32(header.len() as u32, Endian::NATIVE, Endian::Little);

    writer.write_all(&MAGIC)?;
    writer.write_all(&WRITE_VERSION)?;
    writer.write_all(&header_len.to_ne_bytes())?;
    writer.write_all(header.as_bytes())?;
    writer.write_all(array.data())?;

    Ok(())
}

fn dict_regex() -> &'static Regex {
    static DICT: OnceLock<Regex> = OnceLock::new();
    DICT.get_or_init(|| {
        // Values are a quoted type token, a bracketed field list, a boolean
        // literal, or a parenthesized tuple. The list alternative is greedy
        // (field suffixes may contain `]`); the tuple alternative is lazy
        // (the shape tuple may follow a tuple-shaped descr).
        Regex::new(
            r"'([a-zA-Z0-9_-]+)':\s*('[|=<>][a-zA-Z][0-9](\[[a-zA-Z]+\])?'|\[.*\]|True|False|\(.*?\))",
        )
        .expect("invalid header dict regex")
    })
}

fn integer_regex() -> &'static Regex {
    static INTEGER: OnceLock<Regex> = OnceLock::new();
    INTEGER.get_or_init(|| Regex::new(r"\d+").expect("invalid integer regex"))
}

/// Extracts the `descr`, `shape`, and `fortran_order` values from the header
/// text with a permissive key/value scan. Any failure is reported as `None`.
fn parse_header(header: &str) -> Option<(Descr, Shape, Order)> {
    let mut descr = None;
    let mut shape = None;
    let mut order = None;

    for captures in dict_regex().captures_iter(header) {
        let key = captures.get(1)?.as_str();
        let value = captures.get(2)?.as_str();

        match key {
            "descr" => descr = Some(value.parse::<Descr>().ok()?),
            "fortran_order" => {
                order = Some(if value == "True" {
                    Order::ColumnMajor
                } else {
                    Order::RowMajor
                });
            }
            "shape" => {
                let extents = integer_regex()
                    .find_iter(value)
                    .map(|m| m.as_str().parse::<usize>().ok())
                    .collect::<Option<Vec<usize>>>()?;
                shape = Some(Shape(extents));
            }
            _ => (),
        }
    }

    Some((descr?, shape?, order?))
}
