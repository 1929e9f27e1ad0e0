//! Versioned layout descriptors.
//!
//! A [`Layout`] is the ordered list of fields a record emits, each gated on the
//! revision that introduced it. One generic routine (in the codec crate) walks
//! a layout at a resolved version instead of every format branching on version
//! numbers by hand.

use std::collections::HashSet;

use crate::error::{SchemaError, SchemaResult};
use crate::version::VersionLadder;

/// When a field is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Gate {
    /// Present in every revision.
    Always,
    /// Present from this revision on.
    Since(u32),
    /// Present in exactly this revision.
    Only(u32),
    /// Present in revisions older than this one. Layouts carrying such a
    /// field fail [`Layout::check_additive`].
    Before(u32),
}

impl Gate {
    /// Returns `true` if the gate admits `version`.
    #[must_use]
    pub const fn admits(self, version: u32) -> bool {
        match self {
            Self::Always => true,
            Self::Since(since) => version >= since,
            Self::Only(only) => version == only,
            Self::Before(until) => version < until,
        }
    }
}

/// On-disk encoding of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Encoding {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    /// `[f32; 2]`
    Vec2,
    /// `[f32; 3]`
    Vec3,
    /// `[f32; 4]`
    Vec4,
    /// 16 raw bytes.
    Guid,
    /// An 8-byte forward offset patched once its target is written.
    Offset,
    /// An 8-byte offset into the wide (UTF-16) string pool.
    WString,
    /// An 8-byte offset into the ASCII string pool.
    AString,
    /// Opaque bytes, discarded on read and written back as zero.
    Padding(usize),
    /// Zero padding up to the next multiple of the given alignment.
    Align(usize),
}

/// Broad family of an encoding; widening must stay within one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingKind {
    Unsigned,
    Signed,
    Float,
    Vector,
    Bytes,
    Reference,
    Opaque,
}

impl Encoding {
    /// Encoded width in bytes, or `None` when it depends on position.
    #[must_use]
    pub const fn width(self) -> Option<usize> {
        match self {
            Self::U8 | Self::I8 => Some(1),
            Self::U16 | Self::I16 => Some(2),
            Self::U32 | Self::I32 | Self::F32 => Some(4),
            Self::U64 | Self::I64 | Self::F64 | Self::Vec2 => Some(8),
            Self::Offset | Self::WString | Self::AString => Some(8),
            Self::Vec3 => Some(12),
            Self::Vec4 | Self::Guid => Some(16),
            Self::Padding(n) => Some(n),
            Self::Align(_) => None,
        }
    }

    /// The family this encoding belongs to.
    #[must_use]
    pub const fn kind(self) -> EncodingKind {
        match self {
            Self::U8 | Self::U16 | Self::U32 | Self::U64 => EncodingKind::Unsigned,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 => EncodingKind::Signed,
            Self::F32 | Self::F64 => EncodingKind::Float,
            Self::Vec2 | Self::Vec3 | Self::Vec4 => EncodingKind::Vector,
            Self::Guid => EncodingKind::Bytes,
            Self::Offset | Self::WString | Self::AString => EncodingKind::Reference,
            Self::Padding(_) | Self::Align(_) => EncodingKind::Opaque,
        }
    }

    /// Returns `true` for padding and alignment regions.
    #[must_use]
    pub const fn is_opaque(self) -> bool {
        matches!(self.kind(), EncodingKind::Opaque)
    }
}

/// One field of a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FieldDef {
    pub name: &'static str,
    pub gate: Gate,
    pub encoding: Encoding,
    /// A wider encoding used from the given revision on.
    pub widened: Option<(u32, Encoding)>,
}

impl FieldDef {
    /// Creates a field present in every revision.
    #[must_use]
    pub const fn new(name: &'static str, encoding: Encoding) -> Self {
        Self {
            name,
            gate: Gate::Always,
            encoding,
            widened: None,
        }
    }

    /// Creates an opaque padding region.
    #[must_use]
    pub const fn padding(name: &'static str, len: usize) -> Self {
        Self::new(name, Encoding::Padding(len))
    }

    /// Creates an alignment region.
    #[must_use]
    pub const fn align(name: &'static str, align: usize) -> Self {
        Self::new(name, Encoding::Align(align))
    }

    /// Makes the field present from `version` on.
    #[must_use]
    pub const fn since(mut self, version: u32) -> Self {
        self.gate = Gate::Since(version);
        self
    }

    /// Makes the field present in exactly `version`.
    #[must_use]
    pub const fn only(mut self, version: u32) -> Self {
        self.gate = Gate::Only(version);
        self
    }

    /// Switches to a wider `encoding` from `version` on.
    #[must_use]
    pub const fn widened(mut self, version: u32, encoding: Encoding) -> Self {
        self.widened = Some((version, encoding));
        self
    }

    /// Makes the field present only in revisions older than `version`.
    #[must_use]
    pub const fn before(mut self, version: u32) -> Self {
        self.gate = Gate::Before(version);
        self
    }

    /// Returns `true` if the field is emitted at `version`.
    #[must_use]
    pub const fn is_present(&self, version: u32) -> bool {
        self.gate.admits(version)
    }

    /// The encoding used at `version`.
    #[must_use]
    pub const fn encoding_at(&self, version: u32) -> Encoding {
        match self.widened {
            Some((since, wide)) if version >= since => wide,
            _ => self.encoding,
        }
    }
}

/// An ordered, version-gated field list for one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Layout {
    name: &'static str,
    fields: Vec<FieldDef>,
}

impl Layout {
    /// Creates a layout after validation.
    pub fn new(name: &'static str, fields: Vec<FieldDef>) -> SchemaResult<Self> {
        let layout = Self { name, fields };
        layout.validate()?;
        Ok(layout)
    }

    /// Creates a layout builder.
    #[must_use]
    pub const fn builder(name: &'static str) -> LayoutBuilder {
        LayoutBuilder {
            name,
            fields: Vec::new(),
        }
    }

    /// Name of the record type.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// All fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The fields emitted at `version`, in order, with their encodings at that version.
    pub fn fields_at(&self, version: u32) -> impl Iterator<Item = (&FieldDef, Encoding)> + '_ {
        self.fields
            .iter()
            .filter(move |f| f.is_present(version))
            .map(move |f| (f, f.encoding_at(version)))
    }

    /// Encoded size at `version` when the layout starts at a frame-relative
    /// position of zero.
    #[must_use]
    pub fn size_at(&self, version: u32) -> usize {
        self.fields_at(version).fold(0, |pos, (_, encoding)| match encoding {
            Encoding::Align(align) => pos.div_ceil(align) * align,
            other => pos + other.width().unwrap_or(0),
        })
    }

    /// Validates layout invariants.
    pub fn validate(&self) -> SchemaResult<()> {
        let mut names = HashSet::new();
        for field in &self.fields {
            if !names.insert(field.name) {
                return Err(SchemaError::DuplicateField {
                    layout: self.name,
                    field: field.name,
                });
            }
            if matches!(field.encoding, Encoding::Align(0)) {
                return Err(SchemaError::InvalidAlignment {
                    layout: self.name,
                    field: field.name,
                });
            }
            if let Some((_, wide)) = field.widened {
                let narrow = field.encoding;
                let wider = match (narrow.width(), wide.width()) {
                    (Some(a), Some(b)) => b > a,
                    _ => false,
                };
                if !wider || narrow.kind() != wide.kind() || narrow.is_opaque() {
                    return Err(SchemaError::NarrowedField {
                        layout: self.name,
                        field: field.name,
                    });
                }
            }
        }
        Ok(())
    }

    /// Checks the additive contract across every pair of consecutive revisions:
    /// each field present at the older revision is still present at the newer
    /// one, in the same relative order, and never narrower.
    ///
    /// Fields gated with [`Gate::Only`] are single-revision special cases and
    /// are exempt. Any field gated with [`Gate::Before`] fails, whether or not
    /// the ladder reaches the revision that drops it.
    pub fn check_additive(&self, ladder: &VersionLadder) -> SchemaResult<()> {
        let removed = self.fields.iter().find_map(|f| match f.gate {
            Gate::Before(until) => Some((f.name, until)),
            _ => None,
        });
        if let Some((field, until)) = removed {
            return Err(SchemaError::NotAdditive {
                layout: self.name,
                field,
                from: ladder.lowest().raw,
                to: until,
            });
        }
        for pair in ladder.thresholds().windows(2) {
            let (older, newer) = (pair[0].raw, pair[1].raw);
            let later: Vec<(&'static str, Encoding)> = self
                .fields_at(newer)
                .map(|(f, encoding)| (f.name, encoding))
                .collect();
            let mut cursor = 0usize;
            for (field, encoding) in self.fields_at(older) {
                if matches!(field.gate, Gate::Only(_)) {
                    continue;
                }
                let found = later[cursor..]
                    .iter()
                    .position(|(name, _)| *name == field.name);
                let Some(index) = found else {
                    return Err(SchemaError::NotAdditive {
                        layout: self.name,
                        field: field.name,
                        from: older,
                        to: newer,
                    });
                };
                let newer_encoding = later[cursor + index].1;
                if newer_encoding.width() < encoding.width()
                    || newer_encoding.kind() != encoding.kind()
                {
                    return Err(SchemaError::NotAdditive {
                        layout: self.name,
                        field: field.name,
                        from: older,
                        to: newer,
                    });
                }
                cursor += index + 1;
            }
        }
        Ok(())
    }
}

/// Builder for `Layout`.
#[derive(Debug)]
pub struct LayoutBuilder {
    name: &'static str,
    fields: Vec<FieldDef>,
}

impl LayoutBuilder {
    /// Appends a field.
    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Builds the layout after validation.
    pub fn build(self) -> SchemaResult<Layout> {
        Layout::new(self.name, self.fields)
    }
}
