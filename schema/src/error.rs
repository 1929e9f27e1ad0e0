//! Version and layout validation errors.

use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur when building ladders and layouts or resolving versions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A version ladder has no thresholds.
    #[error("{format}: version ladder is empty")]
    EmptyLadder { format: &'static str },

    /// Ladder thresholds are not strictly increasing.
    #[error("{format}: threshold {current} does not follow {previous}")]
    UnorderedLadder {
        format: &'static str,
        previous: u32,
        current: u32,
    },

    /// A raw version lies below every known threshold.
    #[error("{format}: version {raw} is older than the oldest known revision {lowest}")]
    UnknownVersion {
        format: &'static str,
        raw: u32,
        lowest: u32,
    },

    /// Two fields in one layout share a name.
    #[error("{layout}: duplicate field {field}")]
    DuplicateField {
        layout: &'static str,
        field: &'static str,
    },

    /// A widened field is not wider than its original encoding.
    #[error("{layout}: field {field} narrows or changes kind when widened")]
    NarrowedField {
        layout: &'static str,
        field: &'static str,
    },

    /// An alignment region asks for zero alignment.
    #[error("{layout}: field {field} has zero alignment")]
    InvalidAlignment {
        layout: &'static str,
        field: &'static str,
    },

    /// A field present at an older revision is missing or reordered at a newer one.
    #[error("{layout}: field {field} present at {from} is missing or moved at {to}")]
    NotAdditive {
        layout: &'static str,
        field: &'static str,
        from: u32,
        to: u32,
    },
}
