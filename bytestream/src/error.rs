//! Error types for cursor operations.

use thiserror::Error;

/// Result type for cursor operations.
pub type ByteResult<T> = Result<T, ByteError>;

/// Errors that can occur while reading or writing through a cursor.
///
/// Offsets carried by these errors are absolute positions in the underlying
/// buffer, not positions relative to the frame that raised them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ByteError {
    /// Attempted to seek or read past the hard bound of the buffer.
    #[error("out of bounds at {offset:#x}: requested {requested} bytes, {available} available")]
    OutOfBounds {
        /// Absolute position of the access.
        offset: usize,
        /// Number of bytes requested.
        requested: usize,
        /// Number of bytes available from `offset`.
        available: usize,
    },

    /// A null-terminated string ran into the end of the buffer.
    #[error("unterminated string at {offset:#x}")]
    UnterminatedString { offset: usize },

    /// A null-terminated string ran past the allowed number of code units.
    #[error("string at {offset:#x} exceeds {limit} code units")]
    StringTooLong { offset: usize, limit: usize },

    /// A wide string was not valid UTF-16.
    #[error("invalid UTF-16 string at {offset:#x}")]
    InvalidUtf16 { offset: usize },

    /// A narrow string was not valid UTF-8.
    #[error("invalid UTF-8 string at {offset:#x}")]
    InvalidUtf8 { offset: usize },

    /// A string destined for an ASCII field contains non-ASCII characters.
    #[error("string {value:?} is not ASCII")]
    NonAscii { value: String },

    /// Alignment must be non-zero.
    #[error("invalid alignment {align}")]
    InvalidAlignment { align: usize },

    /// An integer-backed enum held a value with no matching variant.
    #[error("invalid {type_name} discriminant at {offset:#x}")]
    InvalidDiscriminant {
        type_name: &'static str,
        offset: usize,
    },
}

impl ByteError {
    /// Returns `true` if this is a bounds violation.
    #[must_use]
    pub const fn is_out_of_bounds(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_display() {
        let err = ByteError::OutOfBounds {
            offset: 0x40,
            requested: 8,
            available: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("0x40"), "should mention offset in hex");
        assert!(msg.contains("8 bytes"));
        assert!(msg.contains("3 available"));
    }

    #[test]
    fn non_ascii_display() {
        let err = ByteError::NonAscii {
            value: "héllo".to_owned(),
        };
        assert!(err.to_string().contains("héllo"));
    }

    #[test]
    fn classification() {
        assert!(ByteError::OutOfBounds {
            offset: 0,
            requested: 1,
            available: 0
        }
        .is_out_of_bounds());
        assert!(!ByteError::InvalidAlignment { align: 0 }.is_out_of_bounds());
    }

    #[test]
    fn error_is_std_error() {
        fn assert_error<E: std::error::Error>() {}
        assert_error::<ByteError>();
    }
}
