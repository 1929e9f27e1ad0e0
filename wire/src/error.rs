//! Error types for framing operations.

use std::fmt;

use bytestream::ByteError;
use thiserror::Error;

use crate::header::Magic;

/// Result type for framing operations.
pub type WireResult<T> = Result<T, WireError>;

/// Errors raised while decoding on-disk framing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum WireError {
    /// The data does not start with the expected signature.
    #[error("magic mismatch at {offset:#x}: expected {expected}, found {found}")]
    MagicMismatch {
        expected: Magic,
        found: Magic,
        offset: usize,
    },

    /// A table target carries a type tag no reader is registered for.
    #[error("unknown type tag {tag} at {offset:#x}")]
    UnknownTag { tag: Magic, offset: usize },

    /// A configured limit was exceeded.
    #[error("{kind} limit exceeded: {actual} > {limit}")]
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    /// Cursor error.
    #[error(transparent)]
    Bytes(#[from] ByteError),
}

/// Specific limits that can be exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    FileBytes,
    TableEntries,
    StringUnits,
    FrameDepth,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FileBytes => "file bytes",
            Self::TableEntries => "table entries",
            Self::StringUnits => "string units",
            Self::FrameDepth => "frame depth",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_mismatch_display() {
        let err = WireError::MagicMismatch {
            expected: Magic::new(*b"GMSG"),
            found: Magic::new([0xDE, 0xAD, 0xBE, 0xEF]),
            offset: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("GMSG"));
        assert!(msg.contains("DEADBEEF"));
        assert!(msg.contains("0x4"));
    }

    #[test]
    fn limits_exceeded_display() {
        let err = WireError::LimitsExceeded {
            kind: LimitKind::TableEntries,
            limit: 4,
            actual: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("table entries"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn byte_errors_convert() {
        let err: WireError = ByteError::InvalidAlignment { align: 0 }.into();
        assert!(matches!(err, WireError::Bytes(_)));
    }
}
