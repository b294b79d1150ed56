//! Record layout descriptors and the header descriptor grammar.
//!
//! A [`Descr`] is the ordered, name-addressable collection of fields
//! describing one record of an array, together with the total record size
//! (the stride). It parses from and renders to the `descr` value of the npy
//! header dict.

use std::{fmt, str::FromStr, sync::OnceLock};

use indexmap::IndexMap;
use regex::Regex;

use crate::{dtype::Dtype, error::Error};

/// The record layout descriptor: ordered named fields plus the stride of one
/// record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Descr {
    fields: IndexMap<String, Dtype>,
    stride: usize,
}

impl Descr {
    /// An empty descriptor with no fields and stride 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field to the descriptor.
    ///
    /// An empty name is replaced by the synthetic `f{index}`. The field is
    /// assigned the current stride as its offset, and the stride grows by
    /// the field width. Duplicate names are rejected.
    pub fn push(&mut self, mut dtype: Dtype, name: &str) -> Result<(), Error> {
        let name = if name.is_empty() {
            format!("f{}", self.fields.len())
        } else {
            name.to_string()
        };

        if self.fields.contains_key(&name) {
            return Err(Error::Grammar(format!("duplicate field name '{name}'")));
        }

        dtype.set_offset(self.stride);
        self.stride += dtype.size();
        self.fields.insert(name, dtype);

        Ok(())
    }

    /// The byte size of one record.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the descriptor has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether a field with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// The dtype of the named field, if present.
    pub fn get(&self, name: &str) -> Option<&Dtype> {
        self.fields.get(name)
    }

    /// The dtype of the named field.
    pub fn dtype(&self, name: &str) -> Result<&Dtype, Error> {
        self.get(name)
            .ok_or_else(|| Error::Bounds(format!("no field named '{name}'")))
    }

    /// The field at the given positional index.
    pub fn field(&self, index: usize) -> Result<(&str, &Dtype), Error> {
        self.fields
            .get_index(index)
            .map(|(name, dtype)| (name.as_str(), dtype))
            .ok_or_else(|| {
                Error::Bounds(format!(
                    "field index {index} out of range for {} fields",
                    self.fields.len()
                ))
            })
    }

    /// Iterates the fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Dtype)> {
        self.fields.iter().map(|(name, dtype)| (name.as_str(), dtype))
    }

    pub(crate) fn dtypes_mut(&mut self) -> impl Iterator<Item = &mut Dtype> {
        self.fields.values_mut()
    }
}

/// Whether a field name matches the auto-generated `f{index}` pattern.
///
/// Synthetic names exist for lookup but are not considered real for display.
fn is_synthetic(name: &str) -> bool {
    static SYNTHETIC: OnceLock<Regex> = OnceLock::new();
    SYNTHETIC
        .get_or_init(|| Regex::new(r"^f\d+$").expect("invalid synthetic name regex"))
        .is_match(name)
}

/// Extracts a delimited substring.
///
/// `pos` must point at the opening delimiter within `s`; the returned
/// substring includes both delimiters, tracking nesting depth for distinct
/// delimiter pairs, and `pos` is advanced past the closing one.
fn extract(s: &str, pos: &mut usize, open: char, close: char) -> Result<String, Error> {
    let bytes = s.as_bytes();

    if bytes.get(*pos) != Some(&(open as u8)) {
        return Err(Error::Grammar(format!("bad extract call on {s}")));
    }

    let start = *pos;
    *pos += 1;

    let mut depth = 0usize;

    while let Some(&b) = bytes.get(*pos) {
        if b == close as u8 && depth == 0 {
            *pos += 1;
            return Ok(s[start..*pos].to_string());
        }

        if b == open as u8 {
            depth += 1;
        } else if b == close as u8 {
            depth -= 1;
        }

        *pos += 1;
    }

    Err(Error::Grammar(format!("unbalanced '{open}' in {s}")))
}

/// Parses a 2-tuple `('name', 'type')`, with an optional trailing comma.
///
/// Tuples with additional elements (sub-array shapes, fixed-length string
/// lengths) are outside the supported grammar.
fn parse_tuple(s: &str) -> Result<(String, Dtype), Error> {
    let body = s
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| Error::Grammar(format!("wrong tuple {s}")))?;

    let comma = body
        .find(',')
        .ok_or_else(|| Error::Grammar(format!("wrong tuple {s}")))?;

    let mut name = &body[..comma];
    let quoted = name.len() >= 2
        && ((name.starts_with('\'') && name.ends_with('\''))
            || (name.starts_with('"') && name.ends_with('"')));
    if quoted {
        name = &name[1..name.len() - 1];
    }

    let mut token = body[comma + 1..].trim_start_matches(' ');

    if let Some(second) = token.find(',') {
        if second != token.len() - 1 {
            return Err(Error::Grammar(
                "does not handle sub arrays or fixed length strings".to_string(),
            ));
        }
        token = &token[..second];
    }

    let dtype: Dtype = token.parse()?;

    Ok((name.to_string(), dtype))
}

impl FromStr for Descr {
    type Err = Error;

    /// Parses a descriptor as given in the npy header: a bare quoted type
    /// token, a single `(name, type)` tuple, or a bracketed list of tuples
    /// and tokens.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let mut descr = Descr::new();

        let first = s.chars().next();
        let last = s.chars().last();

        match (first, last) {
            (Some('\''), Some('\'')) | (Some('"'), Some('"')) if s.len() >= 2 => {
                let dtype: Dtype = s.parse()?;
                descr.push(dtype, "")?;
            }
            (Some('('), Some(')')) => {
                let (name, dtype) = parse_tuple(s)?;
                descr.push(dtype, &name)?;
            }
            (Some('['), Some(']')) => {
                let body = &s[1..s.len() - 1];
                let mut pos = 0;

                while pos < body.len() {
                    match body.as_bytes()[pos] {
                        b'(' => {
                            let tuple = extract(body, &mut pos, '(', ')')?;
                            let (name, dtype) = parse_tuple(&tuple)?;
                            descr.push(dtype, &name)?;
                        }
                        b'\'' => {
                            let token = extract(body, &mut pos, '\'', '\'')?;
                            let dtype: Dtype = token.parse()?;
                            descr.push(dtype, "")?;
                        }
                        b',' | b' ' => pos += 1,
                        _ => {
                            return Err(Error::Grammar(format!("can't parse dtype {s}")));
                        }
                    }
                }
            }
            _ => {
                return Err(Error::Grammar(format!("can't parse dtype {s}")));
            }
        }

        Ok(descr)
    }
}

impl fmt::Display for Descr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            return Ok(());
        }

        if self.fields.len() == 1 {
            let (name, dtype) = self.fields.get_index(0).expect("descriptor is not empty");

            return if is_synthetic(name) {
                write!(f, "{dtype}")
            } else {
                write!(f, "('{name}',{dtype})")
            };
        }

        write!(f, "[")?;

        for (name, dtype) in &self.fields {
            if is_synthetic(name) {
                write!(f, "('',{dtype}),")?;
            } else {
                write!(f, "('{name}',{dtype}),")?;
            }
        }

        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::bytes::Endian;

    #[test]
    fn test_empty() {
        let d = Descr::new();

        assert!(d.is_empty());
        assert_eq!(d.stride(), 0);
        assert_eq!(d.to_string(), "");
    }

    #[test]
    fn test_from_bare_token() {
        let d: Descr = "'>i4'".parse().unwrap();

        assert_eq!(d.len(), 1);
        assert_eq!(d.field(0).unwrap().0, "f0");
        assert_eq!(d.field(0).unwrap().1, &"'>i4'".parse::<Dtype>().unwrap());
        assert_eq!(d.stride(), 4);

        assert_eq!(d.to_string(), "'>i4'");
    }

    #[test]
    fn test_from_tuple() {
        let d: Descr = "('name', '>i4',)".parse().unwrap();

        assert_eq!(d.len(), 1);
        assert_eq!(d.field(0).unwrap().0, "name");
        assert_eq!(d.stride(), 4);

        assert_eq!(d.to_string(), "('name','>i4')");
    }

    #[test]
    fn test_sub_arrays_unsupported() {
        assert!("('name', '>i4', (2,3,))".parse::<Descr>().is_err());
    }

    #[test]
    fn test_from_list() {
        let d: Descr = "[('index', '<i8'), ('timestamp', '<M8[ns]'), ('swh', '<f4'), \
                        ('mwd', '<f4'), ('mwp', '<f4'), ('dwi', '<f4'), ('wind', '<f4'), \
                        ('pp1d', '<f4')]"
            .parse()
            .unwrap();

        assert_eq!(d.len(), 8);
        assert_eq!(d.stride(), 40);
        assert_eq!(d.dtype("index").unwrap().offset(), 0);
        assert_eq!(d.dtype("timestamp").unwrap().offset(), 8);
        assert_eq!(d.dtype("swh").unwrap().offset(), 16);
        assert_eq!(d.dtype("mwd").unwrap().offset(), 20);
        assert_eq!(d.dtype("mwp").unwrap().offset(), 24);
        assert_eq!(d.dtype("dwi").unwrap().offset(), 28);
        assert_eq!(d.dtype("wind").unwrap().offset(), 32);
        assert_eq!(d.dtype("pp1d").unwrap().offset(), 36);
    }

    #[test]
    fn test_push_accumulates_stride() {
        let mut d: Descr = "[('index', '<i8'), ('timestamp', '<M8[ns]'), ('swh', '<f4'), \
                            ('mwd', '<f4'), ('mwp', '<f4'), ('dwi', '<f4'), ('wind', '<f4'), \
                            ('pp1d', '<f4')]"
            .parse()
            .unwrap();

        d.push(Dtype::of::<f64>(Endian::Little), "TEST").unwrap();

        assert_eq!(d.len(), 9);
        assert_eq!(d.stride(), 40 + 8);
        assert_eq!(d.dtype("TEST").unwrap().offset(), 40);

        assert_eq!(
            d.to_string(),
            "[('index','<i8'),('timestamp','<M8[ns]'),('swh','<f4'),('mwd','<f4'),\
             ('mwp','<f4'),('dwi','<f4'),('wind','<f4'),('pp1d','<f4'),('TEST','<f8'),]"
        );
    }

    #[test]
    fn test_offsets_are_prefix_sums() {
        let mut d = Descr::new();
        let widths = [1usize, 2, 8, 4, 1, 8];

        d.push(Dtype::of::<u8>(Endian::NATIVE), "").unwrap();
        d.push(Dtype::of::<i16>(Endian::NATIVE), "").unwrap();
        d.push(Dtype::of::<f64>(Endian::NATIVE), "").unwrap();
        d.push(Dtype::of::<u32>(Endian::NATIVE), "").unwrap();
        d.push(Dtype::of::<bool>(Endian::NATIVE), "").unwrap();
        d.push(Dtype::of::<i64>(Endian::NATIVE), "").unwrap();

        let mut sum = 0;
        for (i, (name, dtype)) in d.iter().enumerate() {
            assert_eq!(name, format!("f{i}"));
            assert_eq!(dtype.offset(), sum);
            sum += widths[i];
        }

        assert_eq!(d.stride(), sum);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut d = Descr::new();

        d.push(Dtype::of::<i32>(Endian::NATIVE), "x").unwrap();
        assert!(d.push(Dtype::of::<i32>(Endian::NATIVE), "x").is_err());

        // Rejection leaves the descriptor untouched.
        assert_eq!(d.len(), 1);
        assert_eq!(d.stride(), 4);
    }

    #[test]
    fn test_unnamed_fields_in_list() {
        let d: Descr = "['<i4', '<f8']".parse().unwrap();

        assert_eq!(d.len(), 2);
        assert_eq!(d.field(0).unwrap().0, "f0");
        assert_eq!(d.field(1).unwrap().0, "f1");
        assert_eq!(d.stride(), 12);

        // Synthetic names render as empty in lists.
        assert_eq!(d.to_string(), "[('','<i4'),('','<f8'),]");
    }

    #[test]
    fn test_lookup_failures() {
        let d: Descr = "('name', '<i4')".parse().unwrap();

        assert!(d.dtype("name").is_ok());
        assert!(d.dtype("other").is_err());
        assert!(d.field(0).is_ok());
        assert!(d.field(1).is_err());
        assert!(d.contains("name"));
        assert!(!d.contains("other"));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!("".parse::<Descr>().is_err());
        assert!("foo".parse::<Descr>().is_err());
        assert!("[('a', '<i4'); ('b', '<f8')]".parse::<Descr>().is_err());
    }

    #[test]
    fn test_extract() {
        let s = "('a',('b'),'c')rest";
        let mut pos = 0;
        let extracted = extract(s, &mut pos, '(', ')').unwrap();

        assert_eq!(extracted, "('a',('b'),'c')");
        assert_eq!(&s[pos..], "rest");

        let s = "'quoted'tail";
        let mut pos = 0;
        let extracted = extract(s, &mut pos, '\'', '\'').unwrap();

        assert_eq!(extracted, "'quoted'");
        assert_eq!(&s[pos..], "tail");

        // Wrong opening character.
        let mut pos = 0;
        assert!(extract("x()", &mut pos, '(', ')').is_err());

        // Unbalanced input.
        let mut pos = 0;
        assert!(extract("((a)", &mut pos, '(', ')').is_err());
    }
}
