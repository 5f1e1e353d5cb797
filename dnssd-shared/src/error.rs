#![allow(dead_code)]

use std::io;
use std::net;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    // wire codec errors
    #[error("unexpected EOF")]
    ErrUnexpectedEof,
    #[error("segment length too long")]
    ErrSegTooLong,
    #[error("segment prefix is reserved")]
    ErrReserved,
    #[error("too many compression pointers")]
    ErrTooManyPtr,
    #[error("character string exceeds maximum length (255)")]
    ErrStringTooLong,
    #[error("TXT string is empty")]
    ErrEmptyTxtString,
    #[error("resource length too long")]
    ErrResTooLong,
    #[error("too many questions to pack (>65535)")]
    ErrTooManyQuestions,
    #[error("too many answers to pack (>65535)")]
    ErrTooManyAnswers,
    #[error("too many authorities to pack (>65535)")]
    ErrTooManyAuthorities,
    #[error("too many additionals to pack (>65535)")]
    ErrTooManyAdditionals,
    #[error("invalid attribute: {0:?}")]
    ErrInvalidAttribute(String),
    #[error("invalid name pattern: {0}")]
    ErrInvalidPattern(String),
    #[error("parsing {section} #{index}: {source}")]
    ErrSectionParse {
        section: &'static str,
        index: usize,
        source: Box<Error>,
    },

    // transport and session errors
    #[error("no available interface")]
    ErrNoInterface,
    #[error("read buffer too small")]
    ErrBufferShort,
    #[error("session is not running")]
    ErrNotRunning,
    #[error("connection closed")]
    ErrConnectionClosed,
    #[error("mutex poison: {0}")]
    PoisonError(String),

    //Third Party Error
    #[error("parse ip: {0}")]
    ParseIp(#[from] net::AddrParseError),
    #[error("{0}")]
    Io(#[source] IoError),
}

impl Error {
    /// Returns true for errors raised while decoding a single packet.
    ///
    /// These are the only errors the receive loop recovers from locally.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Error::ErrUnexpectedEof
                | Error::ErrSegTooLong
                | Error::ErrReserved
                | Error::ErrTooManyPtr
                | Error::ErrInvalidAttribute(_)
                | Error::ErrSectionParse { .. }
        )
    }
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

// Workaround for wanting PartialEq for io::Error.
impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Error::PoisonError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_eq_by_kind() {
        let a: Error = io::Error::new(io::ErrorKind::AddrInUse, "first").into();
        let b: Error = io::Error::new(io::ErrorKind::AddrInUse, "second").into();
        let c: Error = io::Error::new(io::ErrorKind::PermissionDenied, "third").into();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_section_parse_display() {
        let err = Error::ErrSectionParse {
            section: "answer",
            index: 2,
            source: Box::new(Error::ErrUnexpectedEof),
        };
        assert_eq!(err.to_string(), "parsing answer #2: unexpected EOF");
        assert!(err.is_malformed_input());
        assert!(!Error::ErrNoInterface.is_malformed_input());
    }
}
