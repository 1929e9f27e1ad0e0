//! Error types for codec operations.

use std::io;
use std::path::PathBuf;

use bytestream::ByteError;
use schema::{EncodingKind, SchemaError};
use thiserror::Error;
use wire::{LimitKind, Magic, WireError};

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while reading or writing a file.
///
/// Data errors (bad signature, truncated input, disagreeing counts) abort the
/// current operation. Patch and pool bookkeeping errors mean a format module
/// misused the codec; see [`CodecError::is_programming_error`].
#[derive(Debug, Error)]
pub enum CodecError {
    /// The data does not begin with the signature its format requires.
    #[error("magic mismatch at {offset:#x}: expected {expected}, found {found}")]
    MagicMismatch {
        expected: Magic,
        found: Magic,
        offset: usize,
    },

    /// A seek or read went past the end of the available data.
    #[error("out of bounds at {offset:#x}: requested {requested} bytes, {available} available")]
    OutOfBounds {
        offset: usize,
        requested: usize,
        available: usize,
    },

    /// A write session ended with placeholders that were never patched.
    #[error("{count} patch site(s) never resolved, first at {first:#x}")]
    UnresolvedPatch { count: usize, first: usize },

    /// A version lies below every known revision of its format.
    #[error("{format}: version {raw} is older than the oldest known revision {lowest}")]
    UnknownVersionField {
        format: &'static str,
        raw: u32,
        lowest: u32,
    },

    /// Two counts that must agree do not.
    #[error("{what}: count mismatch, expected {expected}, found {found}")]
    CountMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// A patch site was resolved a second time.
    #[error("patch site at {site:#x} already resolved")]
    DoublePatch { site: usize },

    /// A patch site was resolved that this session never allocated.
    #[error("patch site at {site:#x} was never allocated")]
    UnknownPatchSite { site: usize },

    /// Pool references were patched, or the session finished, before the pool was flushed.
    #[error("{pool} pool has {pending} unflushed string(s)")]
    PoolNotFlushed { pool: &'static str, pending: usize },

    /// A checkpoint was taken but never rewritten.
    #[error("checkpoint at {at:#x} was never rewritten")]
    OpenCheckpoint { at: usize },

    /// A layout field was not supplied for writing.
    #[error("{layout}: missing value for field {field}")]
    MissingField {
        layout: &'static str,
        field: &'static str,
    },

    /// A field value does not match its layout encoding.
    #[error("{layout}: field {field} expects a {expected:?} value that fits its encoding")]
    FieldTypeMismatch {
        layout: &'static str,
        field: &'static str,
        expected: EncodingKind,
    },

    /// A table target carries a type tag no reader handles.
    #[error("unknown type tag {tag} at {offset:#x}")]
    UnknownTag { tag: Magic, offset: usize },

    /// A configured limit was exceeded.
    #[error("{kind} limit exceeded: {actual} > {limit}")]
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    /// Malformed primitive data (strings, discriminants, alignment).
    #[error(transparent)]
    Bytes(ByteError),

    /// Other framing errors.
    #[error(transparent)]
    Wire(WireError),

    /// An invalid ladder or layout descriptor.
    #[error(transparent)]
    Schema(SchemaError),

    /// File I/O failed at the path boundary.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CodecError {
    /// Returns `true` for errors that indicate a format module misused the
    /// codec rather than a problem with the data.
    #[must_use]
    pub const fn is_programming_error(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedPatch { .. }
                | Self::DoublePatch { .. }
                | Self::UnknownPatchSite { .. }
                | Self::PoolNotFlushed { .. }
                | Self::OpenCheckpoint { .. }
                | Self::MissingField { .. }
                | Self::FieldTypeMismatch { .. }
                | Self::Schema(_)
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<ByteError> for CodecError {
    fn from(err: ByteError) -> Self {
        match err {
            ByteError::OutOfBounds {
                offset,
                requested,
                available,
            } => Self::OutOfBounds {
                offset,
                requested,
                available,
            },
            // Decoding stops one unit past the limit, so that is all that is known.
            ByteError::StringTooLong { limit, .. } => Self::LimitsExceeded {
                kind: LimitKind::StringUnits,
                limit,
                actual: limit.saturating_add(1),
            },
            other => Self::Bytes(other),
        }
    }
}

impl From<WireError> for CodecError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::MagicMismatch {
                expected,
                found,
                offset,
            } => Self::MagicMismatch {
                expected,
                found,
                offset,
            },
            WireError::UnknownTag { tag, offset } => Self::UnknownTag { tag, offset },
            WireError::LimitsExceeded {
                kind,
                limit,
                actual,
            } => Self::LimitsExceeded {
                kind,
                limit,
                actual,
            },
            WireError::Bytes(err) => err.into(),
            other => Self::Wire(other),
        }
    }
}

impl From<SchemaError> for CodecError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::UnknownVersion {
                format,
                raw,
                lowest,
            } => Self::UnknownVersionField {
                format,
                raw,
                lowest,
            },
            other => Self::Schema(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_is_lifted() {
        let err: CodecError = ByteError::OutOfBounds {
            offset: 16,
            requested: 8,
            available: 2,
        }
        .into();
        assert!(matches!(
            err,
            CodecError::OutOfBounds {
                offset: 16,
                requested: 8,
                available: 2
            }
        ));

        let nested: CodecError = WireError::Bytes(ByteError::OutOfBounds {
            offset: 0,
            requested: 4,
            available: 0,
        })
        .into();
        assert!(matches!(nested, CodecError::OutOfBounds { .. }));
    }

    #[test]
    fn magic_mismatch_is_lifted() {
        let err: CodecError = WireError::MagicMismatch {
            expected: Magic::new(*b"GMSG"),
            found: Magic::new(*b"XXXX"),
            offset: 4,
        }
        .into();
        assert!(matches!(err, CodecError::MagicMismatch { offset: 4, .. }));
        assert!(err.to_string().contains("GMSG"));
        assert!(!err.is_programming_error());
    }

    #[test]
    fn unknown_version_is_lifted() {
        let err: CodecError = SchemaError::UnknownVersion {
            format: "msg",
            raw: 1,
            lowest: 12,
        }
        .into();
        assert!(matches!(err, CodecError::UnknownVersionField { raw: 1, .. }));
        assert!(!err.is_programming_error());
    }

    #[test]
    fn other_byte_errors_stay_wrapped() {
        let err: CodecError = ByteError::UnterminatedString { offset: 3 }.into();
        assert!(matches!(err, CodecError::Bytes(_)));
    }

    #[test]
    fn bookkeeping_errors_are_programming_errors() {
        assert!(CodecError::DoublePatch { site: 0 }.is_programming_error());
        assert!(CodecError::UnresolvedPatch { count: 1, first: 8 }.is_programming_error());
        assert!(CodecError::PoolNotFlushed {
            pool: "wide",
            pending: 2
        }
        .is_programming_error());
        assert!(!CodecError::CountMismatch {
            what: "languages",
            expected: 2,
            found: 3
        }
        .is_programming_error());
    }

    #[test]
    fn display_uses_hex_offsets() {
        let err = CodecError::UnresolvedPatch {
            count: 2,
            first: 0x40,
        };
        assert_eq!(err.to_string(), "2 patch site(s) never resolved, first at 0x40");
    }
}
