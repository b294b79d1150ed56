//! The crate error type.

use std::{error, fmt, io};

/// The error type for every fallible operation in this crate.
///
/// Each variant records the origin of a failure and carries a human-readable
/// message with the relevant context (byte counts, field names, offending
/// tokens). Callers are not expected to branch on message content outside of
/// tests.
#[derive(Debug)]
pub enum Error {
    /// The byte stream does not frame a valid npy file.
    Framing(String),
    /// A type token or descriptor does not match the supported grammar.
    Grammar(String),
    /// An index, coordinate, or field lookup is out of range.
    Bounds(String),
    /// A typed access does not match the stored element type.
    Type(String),
    /// An underlying transport failure.
    Io(io::Error),
}

impl Error {
    /// Prefixes the message with an archive member name, so failures across
    /// a multi-member load remain attributable.
    pub(crate) fn annotate(self, name: &str) -> Self {
        match self {
            Error::Framing(msg) => Error::Framing(format!("{name} - {msg}")),
            Error::Grammar(msg) => Error::Grammar(format!("{name} - {msg}")),
            Error::Bounds(msg) => Error::Bounds(format!("{name} - {msg}")),
            Error::Type(msg) => Error::Type(format!("{name} - {msg}")),
            Error::Io(e) => Error::Io(io::Error::new(e.kind(), format!("{name} - {e}"))),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Framing(msg)
            | Error::Grammar(msg)
            | Error::Bounds(msg)
            | Error::Type(msg) => f.write_str(msg),
            Error::Io(e) => write!(f, "{e}"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotate() {
        let e = Error::Framing("not a numpy file".to_string()).annotate("weights");
        assert_eq!(e.to_string(), "weights - not a numpy file");

        let e = Error::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "early eof"));
        assert_eq!(e.annotate("bias").to_string(), "bias - early eof");
    }
}
