//! Ordered format revisions and nearest-lower resolution.

use crate::error::{SchemaError, SchemaResult};

/// A named format revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Threshold {
    pub raw: u32,
    pub name: &'static str,
}

impl Threshold {
    /// Creates a named threshold.
    #[must_use]
    pub const fn new(raw: u32, name: &'static str) -> Self {
        Self { raw, name }
    }
}

/// The known revisions of one format, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VersionLadder {
    format: &'static str,
    thresholds: &'static [Threshold],
}

impl VersionLadder {
    /// Creates a ladder after checking that thresholds are non-empty and strictly increasing.
    pub fn new(format: &'static str, thresholds: &'static [Threshold]) -> SchemaResult<Self> {
        if thresholds.is_empty() {
            return Err(SchemaError::EmptyLadder { format });
        }
        for pair in thresholds.windows(2) {
            if pair[1].raw <= pair[0].raw {
                return Err(SchemaError::UnorderedLadder {
                    format,
                    previous: pair[0].raw,
                    current: pair[1].raw,
                });
            }
        }
        Ok(Self { format, thresholds })
    }

    /// Name of the format this ladder describes.
    #[must_use]
    pub const fn format(&self) -> &'static str {
        self.format
    }

    /// All thresholds, oldest first.
    #[must_use]
    pub const fn thresholds(&self) -> &'static [Threshold] {
        self.thresholds
    }

    /// The oldest known revision.
    #[must_use]
    pub const fn lowest(&self) -> Threshold {
        self.thresholds[0]
    }

    /// The newest known revision.
    #[must_use]
    pub const fn highest(&self) -> Threshold {
        self.thresholds[self.thresholds.len() - 1]
    }

    /// Looks up a threshold by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<Threshold> {
        self.thresholds.iter().copied().find(|t| t.name == name)
    }

    /// Resolves a raw on-disk version to the layout revision that reads it.
    ///
    /// Unknown values fall back to the nearest lower threshold, never a higher
    /// one. Values below the oldest threshold cannot be read.
    pub fn resolve(&self, raw: u32) -> SchemaResult<Resolved> {
        let threshold = self
            .thresholds
            .iter()
            .rev()
            .find(|t| t.raw <= raw)
            .copied()
            .ok_or(SchemaError::UnknownVersion {
                format: self.format,
                raw,
                lowest: self.lowest().raw,
            })?;
        Ok(Resolved { raw, threshold })
    }
}

/// A raw version together with the threshold whose layout applies to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    /// The version as stored in the file; written back unchanged.
    pub raw: u32,
    /// The revision whose layout is used.
    pub threshold: Threshold,
}

impl Resolved {
    /// Returns `true` if the raw version is a known threshold.
    #[must_use]
    pub const fn is_exact(self) -> bool {
        self.raw == self.threshold.raw
    }

    /// The version layouts are gated on.
    #[must_use]
    pub const fn layout_version(self) -> u32 {
        self.threshold.raw
    }

    /// Returns `true` if the layout revision is at or after `raw`.
    #[must_use]
    pub const fn at_least(self, raw: u32) -> bool {
        self.threshold.raw >= raw
    }
}
