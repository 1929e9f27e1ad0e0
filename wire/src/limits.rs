//! Configurable limits for bounded decoding.

use crate::error::{LimitKind, WireError, WireResult};

/// Framing limits enforced while decoding.
///
/// These bound the memory a malformed file can make the decoder allocate.
/// Writes are never limited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum size of a file in bytes.
    pub max_file_bytes: usize,

    /// Maximum number of entries in a single offset table.
    pub max_table_entries: usize,

    /// Maximum length of a single string in code units.
    pub max_string_units: usize,

    /// Maximum nesting depth of embedded sub-files.
    pub max_frame_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            // The largest shipped assets are a few hundred megabytes.
            max_file_bytes: 1 << 30,
            max_table_entries: 1 << 20,
            max_string_units: 1 << 16,
            max_frame_depth: 8,
        }
    }
}

impl Limits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_file_bytes: 1 << 20,
            max_table_entries: 256,
            max_string_units: 1024,
            max_frame_depth: 4,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_file_bytes: usize::MAX,
            max_table_entries: usize::MAX,
            max_string_units: usize::MAX,
            max_frame_depth: usize::MAX,
        }
    }

    /// Checks `actual` against the limit for `kind`.
    pub fn check(&self, kind: LimitKind, actual: usize) -> WireResult<()> {
        let limit = match kind {
            LimitKind::FileBytes => self.max_file_bytes,
            LimitKind::TableEntries => self.max_table_entries,
            LimitKind::StringUnits => self.max_string_units,
            LimitKind::FrameDepth => self.max_frame_depth,
        };
        if actual > limit {
            return Err(WireError::LimitsExceeded {
                kind,
                limit,
                actual,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testing_limits_smaller() {
        let test_limits = Limits::for_testing();
        let default_limits = Limits::default();

        assert!(test_limits.max_file_bytes < default_limits.max_file_bytes);
        assert!(test_limits.max_table_entries < default_limits.max_table_entries);
        assert!(test_limits.max_string_units < default_limits.max_string_units);
        assert!(test_limits.max_frame_depth < default_limits.max_frame_depth);
    }

    #[test]
    fn unlimited_limits() {
        let limits = Limits::unlimited();
        assert_eq!(limits.max_file_bytes, usize::MAX);
        assert_eq!(limits.max_frame_depth, usize::MAX);
        assert!(limits.check(LimitKind::TableEntries, usize::MAX).is_ok());
    }

    #[test]
    fn check_reports_kind() {
        let limits = Limits::for_testing();
        assert!(limits.check(LimitKind::TableEntries, 256).is_ok());
        assert_eq!(
            limits.check(LimitKind::TableEntries, 257),
            Err(WireError::LimitsExceeded {
                kind: LimitKind::TableEntries,
                limit: 256,
                actual: 257,
            })
        );
    }

    #[test]
    fn limits_const_constructible() {
        const LIMITS: Limits = Limits::for_testing();
        assert_eq!(LIMITS.max_frame_depth, 4);
    }
}
