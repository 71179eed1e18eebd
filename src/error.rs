//! Error types for imprint.

use crate::dom::NodeKey;
use std::fmt;
use std::io;

/// Result type alias for imprint operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for imprint operations.
///
/// Invariant violations are fatal: they abort the current commit and are
/// surfaced to the caller. Bad style values are *not* errors; the style
/// dimension silently keeps its previous value.
#[derive(Debug)]
pub enum Error {
    /// I/O error while writing to the output stream.
    Io(io::Error),
    /// A text leaf was created outside a `Text`/`VirtualText` ancestor.
    TextOutsideText,
    /// A reserved key (`style`, `children`) was used as an attribute.
    ReservedAttribute(String),
    /// An operation referenced a node slot that has been freed.
    NodeGone(NodeKey),
    /// A structural operation was applied to an incompatible node kind.
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// The flexbox solver rejected an operation.
    Layout(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::TextOutsideText => {
                write!(f, "text leaf created outside a Text or VirtualText ancestor")
            }
            Self::ReservedAttribute(key) => {
                write!(f, "reserved attribute key: {key:?}")
            }
            Self::NodeGone(key) => write!(f, "node {key:?} has been freed"),
            Self::KindMismatch { expected, found } => {
                write!(f, "expected {expected} node, found {found}")
            }
            Self::Layout(msg) => write!(f, "layout engine error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<taffy::TaffyError> for Error {
    fn from(e: taffy::TaffyError) -> Self {
        Self::Layout(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::TextOutsideText;
        assert!(err.to_string().contains("text leaf"));

        let err = Error::ReservedAttribute("children".to_string());
        assert!(err.to_string().contains("children"));

        let err = Error::KindMismatch {
            expected: "Text",
            found: "Box",
        };
        assert!(err.to_string().contains("expected Text"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
