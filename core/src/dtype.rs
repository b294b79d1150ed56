//! Scalar element types and their textual codes.
//!
//! A [`Dtype`] describes one scalar field of a record: its [`Kind`], byte
//! width, byte offset within the record, byte order, and an optional
//! modifier suffix. The textual form is the numpy type code, e.g. `'<i4'`
//! for a little-endian 4-byte signed integer or `'<M8[ns]'` for a
//! little-endian datetime with nanosecond units.

use std::{fmt, str::FromStr, sync::OnceLock};

use num_complex::Complex32;
use regex::Regex;

use crate::{bytes::Endian, error::Error};

/// The kind of one scalar field.
///
/// This is a closed set: the numpy kinds without a fixed-width scalar
/// representation (objects, strings, raw void blobs) are rejected at parse
/// time and never represented.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Kind {
    /// Single-byte boolean (`b`).
    Bool,
    /// Signed integer (`i`).
    Int,
    /// Unsigned integer (`u`).
    UInt,
    /// IEEE 754 floating point (`f`).
    Float,
    /// Interleaved real/imaginary pair (`c`).
    Complex,
    /// numpy datetime (`M`); stored and sized as a 64-bit signed integer.
    Datetime,
    /// numpy timedelta (`m`); stored and sized as a 64-bit signed integer.
    Timedelta,
}

impl Kind {
    /// The type code character rendered for this kind.
    fn code(self) -> char {
        match self {
            Kind::Bool => 'b',
            Kind::Int => 'i',
            Kind::UInt => 'u',
            Kind::Float => 'f',
            Kind::Complex => 'c',
            Kind::Datetime => 'M',
            Kind::Timedelta => 'm',
        }
    }

    /// The widths this kind can be stored with.
    fn supports_size(self, size: usize) -> bool {
        match self {
            Kind::Bool => size == 1,
            Kind::Int | Kind::UInt => matches!(size, 1 | 2 | 4 | 8),
            Kind::Float | Kind::Complex => matches!(size, 4 | 8),
            Kind::Datetime | Kind::Timedelta => size == 8,
        }
    }

    /// The kind used for typed access; temporal kinds read and write as
    /// signed integers.
    fn storage(self) -> Kind {
        match self {
            Kind::Datetime | Kind::Timedelta => Kind::Int,
            kind => kind,
        }
    }
}

/// One scalar field of a record.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Dtype {
    kind: Kind,
    size: usize,
    offset: usize,
    endian: Endian,
    suffix: String,
}

impl Dtype {
    /// Creates a dtype with offset 0 and no suffix.
    ///
    /// Fails with a grammar error if `size` is not an allowed width for
    /// `kind`, so a kind/width mismatch can never be represented.
    pub fn new(kind: Kind, size: usize, endian: Endian) -> Result<Self, Error> {
        if !kind.supports_size(size) {
            return Err(Error::Grammar(format!(
                "unsupported width {size} for type code '{}'",
                kind.code()
            )));
        }

        Ok(Self {
            kind,
            size,
            offset: 0,
            endian,
            suffix: String::new(),
        })
    }

    /// The dtype of the Rust scalar type `T`.
    pub fn of<T>(endian: Endian) -> Self
    where
        T: Scalar,
    {
        Self {
            kind: T::KIND,
            size: T::SIZE,
            offset: 0,
            endian,
            suffix: String::new(),
        }
    }

    /// The kind of this field.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// The byte width of this field.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The byte offset of this field within one record.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The byte order of this field.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// The verbatim modifier suffix, e.g. a bracketed time unit.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Whether typed access as `T` is valid for this field.
    pub fn matches<T>(&self) -> bool
    where
        T: Scalar,
    {
        self.kind.storage() == T::KIND && self.size == T::SIZE
    }

    pub(crate) fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    pub(crate) fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }
}

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| {
        Regex::new(r"^[<>|=][a-zA-Z][0-9](\[[a-zA-Z]+\])?$").expect("invalid type token regex")
    })
}

/// Strips one layer of matching single or double quotes, if present.
fn unquote(token: &str) -> &str {
    let quoted = token.len() >= 2
        && ((token.starts_with('\'') && token.ends_with('\''))
            || (token.starts_with('"') && token.ends_with('"')));

    if quoted {
        &token[1..token.len() - 1]
    } else {
        token
    }
}

impl FromStr for Dtype {
    type Err = Error;

    /// Parses a type token such as `<i4`, optionally wrapped in matching
    /// single or double quotes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::Grammar("empty type".to_string()));
        }

        let t = unquote(s);

        let captures = token_regex()
            .captures(t)
            .ok_or_else(|| Error::Grammar(format!("unsupported type {t}")))?;

        let marker = t.as_bytes()[0];
        let endian = match marker {
            b'|' | b'=' => Endian::NATIVE,
            b'<' => Endian::Little,
            b'>' => Endian::Big,
            _ => return Err(Error::Grammar(format!("unknown type {t}"))),
        };

        let code = t.as_bytes()[1];
        let kind = match code {
            b'b' => {
                // Booleans are single-byte and endianness-free.
                if !matches!(marker, b'|' | b'=') {
                    return Err(Error::Grammar(format!("unsupported type {t}")));
                }
                Kind::Bool
            }
            b'i' => Kind::Int,
            b'u' => Kind::UInt,
            b'f' => Kind::Float,
            b'c' => Kind::Complex,
            b'm' => Kind::Timedelta,
            b'M' => Kind::Datetime,
            _ => return Err(Error::Grammar(format!("unsupported type {t}"))),
        };

        let size = usize::from(t.as_bytes()[2] - b'0');

        let mut dtype = Dtype::new(kind, size, endian)
            .map_err(|_| Error::Grammar(format!("unsupported type {t}")))?;

        if let Some(suffix) = captures.get(1) {
            dtype.suffix = suffix.as_str().to_string();
        }

        Ok(dtype)
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Single-byte fields have no byte order and always render `|`.
        let marker = if self.size == 1 {
            '|'
        } else if self.endian == Endian::Little {
            '<'
        } else {
            '>'
        };

        write!(
            f,
            "'{marker}{}{}{}'",
            self.kind.code(),
            self.size,
            self.suffix
        )
    }
}

/// A Rust scalar type which can be stored in an array field.
///
/// The associated constants form the static descriptor checked by typed
/// record access; the conversion methods move values through their
/// native-endian byte representation.
pub trait Scalar: Copy {
    /// The kind tag matching this type.
    const KIND: Kind;
    /// The byte width of this type.
    const SIZE: usize;

    /// Reads a value from its native-endian byte representation.
    ///
    /// `bytes` must be exactly [`Scalar::SIZE`] long.
    fn from_bytes(bytes: &[u8]) -> Self;

    /// Writes the native-endian byte representation into `bytes`.
    ///
    /// `bytes` must be exactly [`Scalar::SIZE`] long.
    fn to_bytes(self, bytes: &mut [u8]);
}

macro_rules! impl_scalar {
    ($ty:ty, $kind:expr) => {
        impl Scalar for $ty {
            const KIND: Kind = $kind;
            const SIZE: usize = std::mem::size_of::<$ty>();

            fn from_bytes(bytes: &[u8]) -> Self {
                Self::from_ne_bytes(bytes.try_into().expect("field width mismatch"))
            }

            fn to_bytes(self, bytes: &mut [u8]) {
                bytes.copy_from_slice(&self.to_ne_bytes());
            }
        }
    };
}

impl_scalar!(i8, Kind::Int);
impl_scalar!(i16, Kind::Int);
impl_scalar!(i32, Kind::Int);
impl_scalar!(i64, Kind::Int);
impl_scalar!(u8, Kind::UInt);
impl_scalar!(u16, Kind::UInt);
impl_scalar!(u32, Kind::UInt);
impl_scalar!(u64, Kind::UInt);
impl_scalar!(f32, Kind::Float);
impl_scalar!(f64, Kind::Float);

impl Scalar for bool {
    const KIND: Kind = Kind::Bool;
    const SIZE: usize = 1;

    fn from_bytes(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn to_bytes(self, bytes: &mut [u8]) {
        bytes[0] = u8::from(self);
    }
}

impl Scalar for Complex32 {
    const KIND: Kind = Kind::Complex;
    const SIZE: usize = 8;

    fn from_bytes(bytes: &[u8]) -> Self {
        let re = f32::from_bytes(&bytes[..4]);
        let im = f32::from_bytes(&bytes[4..]);
        Complex32::new(re, im)
    }

    fn to_bytes(self, bytes: &mut [u8]) {
        self.re.to_bytes(&mut bytes[..4]);
        self.im.to_bytes(&mut bytes[4..]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let t: Dtype = "'<M8[ns]'".parse().unwrap();

        assert_eq!(t.kind(), Kind::Datetime);
        assert_eq!(t.size(), 8);
        assert_eq!(t.offset(), 0);
        assert_eq!(t.endian(), Endian::Little);
        assert_eq!(t.suffix(), "[ns]");

        let t: Dtype = "\"<u2\"".parse().unwrap();

        assert_eq!(t.kind(), Kind::UInt);
        assert_eq!(t.size(), 2);
        assert_eq!(t.endian(), Endian::Little);
        assert_eq!(t.suffix(), "");

        assert_eq!(t, "'<u2'".parse().unwrap());
    }

    #[test]
    fn test_parse_failures() {
        for token in ["", "''", "\"\"", "test", "'test'", "\"test\""] {
            assert!(token.parse::<Dtype>().is_err(), "{token:?} should fail");
        }

        for token in ["=O2", "<i16", "<i6", "=u3", "=f2", "<c2"] {
            assert!(token.parse::<Dtype>().is_err(), "{token:?} should fail");
        }

        // Strings, unicode, and void blobs are never represented.
        for token in ["<S8", "<U4", "|V8"] {
            assert!(token.parse::<Dtype>().is_err(), "{token:?} should fail");
        }

        // Booleans are width 1, endianness-free.
        assert!("<b1".parse::<Dtype>().is_err());
        assert!("|b2".parse::<Dtype>().is_err());
        assert!("|b1".parse::<Dtype>().is_ok());
        assert!("=b1".parse::<Dtype>().is_ok());
    }

    #[test]
    fn test_render_round_trip() {
        for token in [
            "'|b1'", "'<i4'", "'>i8'", "'<u2'", "'<f4'", "'>f8'", "'<c8'", "'<M8[ns]'",
        ] {
            let dtype: Dtype = token.parse().unwrap();
            assert_eq!(dtype.to_string(), token);
        }
    }

    #[test]
    fn test_render_width_one_is_order_free() {
        let t = Dtype::of::<i8>(Endian::Big);
        assert_eq!(t.to_string(), "'|i1'");

        let t = Dtype::of::<u8>(Endian::Little);
        assert_eq!(t.to_string(), "'|u1'");
    }

    #[test]
    fn test_of() {
        let t = Dtype::of::<i32>(Endian::Big);

        assert_eq!(t.kind(), Kind::Int);
        assert_eq!(t.size(), 4);
        assert_eq!(t.offset(), 0);
        assert_eq!(t.endian(), Endian::Big);
        assert_eq!(t.to_string(), "'>i4'");
    }

    #[test]
    fn test_new_rejects_bad_widths() {
        assert!(Dtype::new(Kind::Bool, 2, Endian::NATIVE).is_err());
        assert!(Dtype::new(Kind::Float, 2, Endian::NATIVE).is_err());
        assert!(Dtype::new(Kind::Complex, 2, Endian::NATIVE).is_err());
        assert!(Dtype::new(Kind::Datetime, 4, Endian::NATIVE).is_err());
        assert!(Dtype::new(Kind::Int, 3, Endian::NATIVE).is_err());
    }

    #[test]
    fn test_matches() {
        let t: Dtype = "'<i4'".parse().unwrap();
        assert!(t.matches::<i32>());
        assert!(!t.matches::<u32>());
        assert!(!t.matches::<i64>());
        assert!(!t.matches::<f32>());

        // Temporal fields read and write as 64-bit signed integers.
        let t: Dtype = "'<M8[ns]'".parse().unwrap();
        assert!(t.matches::<i64>());
        assert!(!t.matches::<u64>());

        let t: Dtype = "'<c8'".parse().unwrap();
        assert!(t.matches::<Complex32>());
        assert!(!t.matches::<f64>());
    }

    #[test]
    fn test_scalar_bytes() {
        let mut buf = [0u8; 8];
        0x0123_4567_89ab_cdefu64.to_bytes(&mut buf);
        assert_eq!(u64::from_bytes(&buf), 0x0123_4567_89ab_cdef);

        let mut buf = [0u8; 1];
        true.to_bytes(&mut buf);
        assert_eq!(buf[0], 1);
        assert!(bool::from_bytes(&buf));
        assert!(!bool::from_bytes(&[0]));

        let mut buf = [0u8; 8];
        Complex32::new(1.5, -2.5).to_bytes(&mut buf);
        assert_eq!(Complex32::from_bytes(&buf), Complex32::new(1.5, -2.5));
    }
}
