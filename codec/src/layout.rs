//! Generic read and write of records described by a [`Layout`].
//!
//! Instead of branching on version numbers field by field, a format describes
//! a record once as a layout and lets [`read_fields`] and [`write_fields`] walk
//! it at the resolved version. Values travel in a [`Fields`] bag, in layout
//! order. Integer, float and vector values are held at their widest, so a field
//! widened in a newer revision needs no special handling.

use bytestream::{ByteReader, ByteWriter, Primitive};
use schema::{Encoding, EncodingKind, Layout};

use crate::error::{CodecError, CodecResult};
use crate::patch::PatchSite;
use crate::session::{ReadSession, WriteSession};

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    /// Up to four components; missing trailing components write as zero.
    Vector(Vec<f32>),
    Bytes([u8; 16]),
    /// A raw forward offset as read. Writing reserves a fresh placeholder.
    Offset(u64),
    /// A pooled string.
    Text(String),
}

impl Value {
    /// The encoding family this value belongs to.
    #[must_use]
    pub const fn kind(&self) -> EncodingKind {
        match self {
            Self::Unsigned(_) => EncodingKind::Unsigned,
            Self::Signed(_) => EncodingKind::Signed,
            Self::Float(_) => EncodingKind::Float,
            Self::Vector(_) => EncodingKind::Vector,
            Self::Bytes(_) => EncodingKind::Bytes,
            Self::Offset(_) | Self::Text(_) => EncodingKind::Reference,
        }
    }
}

/// Field values of one record, in layout order.
#[derive(Debug, Clone, PartialEq)]
pub struct Fields {
    layout: &'static str,
    values: Vec<(&'static str, Value)>,
}

impl Fields {
    /// Creates an empty bag for the named layout.
    #[must_use]
    pub const fn new(layout: &'static str) -> Self {
        Self {
            layout,
            values: Vec::new(),
        }
    }

    /// Sets a value, replacing any earlier value for the same field.
    pub fn set(&mut self, name: &'static str, value: Value) -> &mut Self {
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
        self
    }

    /// Builder form of [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, name: &'static str, value: Value) -> Self {
        self.set(name, value);
        self
    }

    /// The value of a field, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Field names and values in order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.values.iter().map(|(n, v)| (*n, v))
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// An unsigned integer field.
    pub fn unsigned(&self, name: &'static str) -> CodecResult<u64> {
        match self.require(name, EncodingKind::Unsigned)? {
            Value::Unsigned(v) => Ok(*v),
            _ => Err(self.mismatch(name, EncodingKind::Unsigned)),
        }
    }

    /// A signed integer field.
    pub fn signed(&self, name: &'static str) -> CodecResult<i64> {
        match self.require(name, EncodingKind::Signed)? {
            Value::Signed(v) => Ok(*v),
            _ => Err(self.mismatch(name, EncodingKind::Signed)),
        }
    }

    /// A float field.
    pub fn float(&self, name: &'static str) -> CodecResult<f64> {
        match self.require(name, EncodingKind::Float)? {
            Value::Float(v) => Ok(*v),
            _ => Err(self.mismatch(name, EncodingKind::Float)),
        }
    }

    /// A 16-byte field.
    pub fn bytes(&self, name: &'static str) -> CodecResult<[u8; 16]> {
        match self.require(name, EncodingKind::Bytes)? {
            Value::Bytes(v) => Ok(*v),
            _ => Err(self.mismatch(name, EncodingKind::Bytes)),
        }
    }

    /// A pooled string field.
    pub fn text(&self, name: &'static str) -> CodecResult<&str> {
        match self.require(name, EncodingKind::Reference)? {
            Value::Text(v) => Ok(v),
            _ => Err(self.mismatch(name, EncodingKind::Reference)),
        }
    }

    /// A raw offset field.
    pub fn offset(&self, name: &'static str) -> CodecResult<u64> {
        match self.require(name, EncodingKind::Reference)? {
            Value::Offset(v) => Ok(*v),
            _ => Err(self.mismatch(name, EncodingKind::Reference)),
        }
    }

    fn require(&self, name: &'static str, kind: EncodingKind) -> CodecResult<&Value> {
        let value = self.get(name).ok_or(CodecError::MissingField {
            layout: self.layout,
            field: name,
        })?;
        if value.kind() != kind {
            return Err(self.mismatch(name, kind));
        }
        Ok(value)
    }

    const fn mismatch(&self, field: &'static str, expected: EncodingKind) -> CodecError {
        CodecError::FieldTypeMismatch {
            layout: self.layout,
            field,
            expected,
        }
    }
}

/// Placeholders reserved for [`Encoding::Offset`] fields by [`write_fields`].
#[derive(Debug, Default)]
pub struct FieldSites {
    sites: Vec<(&'static str, PatchSite)>,
}

impl FieldSites {
    /// Takes the placeholder of an offset field.
    pub fn take(&mut self, name: &str) -> Option<PatchSite> {
        let index = self.sites.iter().position(|(n, _)| *n == name)?;
        Some(self.sites.remove(index).1)
    }

    /// Number of placeholders not yet taken.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Returns `true` if every placeholder was taken.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

/// Reads every field of `layout` present at `version`.
///
/// Padding and alignment regions are skipped; pooled strings are decoded.
pub fn read_fields(
    reader: &mut ByteReader<'_>,
    session: &mut ReadSession,
    layout: &Layout,
    version: u32,
) -> CodecResult<Fields> {
    let mut fields = Fields::new(layout.name());
    for (field, encoding) in layout.fields_at(version) {
        let value = match encoding {
            Encoding::U8 => Value::Unsigned(reader.read::<u8>()?.into()),
            Encoding::U16 => Value::Unsigned(reader.read::<u16>()?.into()),
            Encoding::U32 => Value::Unsigned(reader.read::<u32>()?.into()),
            Encoding::U64 => Value::Unsigned(reader.read::<u64>()?),
            Encoding::I8 => Value::Signed(reader.read::<i8>()?.into()),
            Encoding::I16 => Value::Signed(reader.read::<i16>()?.into()),
            Encoding::I32 => Value::Signed(reader.read::<i32>()?.into()),
            Encoding::I64 => Value::Signed(reader.read::<i64>()?),
            Encoding::F32 => Value::Float(reader.read::<f32>()?.into()),
            Encoding::F64 => Value::Float(reader.read::<f64>()?),
            Encoding::Vec2 => Value::Vector(reader.read::<[f32; 2]>()?.to_vec()),
            Encoding::Vec3 => Value::Vector(reader.read::<[f32; 3]>()?.to_vec()),
            Encoding::Vec4 => Value::Vector(reader.read::<[f32; 4]>()?.to_vec()),
            Encoding::Guid => Value::Bytes(reader.read::<[u8; 16]>()?),
            Encoding::Offset => Value::Offset(reader.read::<u64>()?),
            Encoding::WString => Value::Text(session.read_wstring_ref(reader)?),
            Encoding::AString => Value::Text(session.read_astring_ref(reader)?),
            Encoding::Padding(len) => {
                reader.skip(len)?;
                continue;
            }
            Encoding::Align(align) => {
                reader.align(align)?;
                continue;
            }
        };
        fields.set(field.name, value);
    }
    Ok(fields)
}

/// Writes every field of `layout` present at `version` from `fields`.
///
/// Padding and alignment regions are written as zeros. Pooled strings go
/// through the session pools. Offset fields get a placeholder whose site is
/// returned for the caller to resolve once the target is written.
pub fn write_fields(
    writer: &mut ByteWriter<'_>,
    session: &mut WriteSession,
    layout: &Layout,
    version: u32,
    fields: &Fields,
) -> CodecResult<FieldSites> {
    let mut sites = FieldSites::default();
    for (field, encoding) in layout.fields_at(version) {
        let name = field.name;
        match encoding {
            Encoding::Padding(len) => {
                writer.fill(0, len);
                continue;
            }
            Encoding::Align(align) => {
                writer.align(align)?;
                continue;
            }
            _ => {}
        }
        let value = fields.require(name, encoding.kind())?;
        let mismatch = || fields.mismatch(name, encoding.kind());
        match (encoding, value) {
            (Encoding::U8, Value::Unsigned(v)) => put::<u8, _>(writer, *v, mismatch)?,
            (Encoding::U16, Value::Unsigned(v)) => put::<u16, _>(writer, *v, mismatch)?,
            (Encoding::U32, Value::Unsigned(v)) => put::<u32, _>(writer, *v, mismatch)?,
            (Encoding::U64, Value::Unsigned(v)) => writer.write(*v),
            (Encoding::I8, Value::Signed(v)) => put::<i8, _>(writer, *v, mismatch)?,
            (Encoding::I16, Value::Signed(v)) => put::<i16, _>(writer, *v, mismatch)?,
            (Encoding::I32, Value::Signed(v)) => put::<i32, _>(writer, *v, mismatch)?,
            (Encoding::I64, Value::Signed(v)) => writer.write(*v),
            (Encoding::F32, Value::Float(v)) => writer.write(*v as f32),
            (Encoding::F64, Value::Float(v)) => writer.write(*v),
            (Encoding::Vec2 | Encoding::Vec3 | Encoding::Vec4, Value::Vector(v)) => {
                let width = encoding.width().unwrap_or(0) / 4;
                if v.len() > width {
                    return Err(mismatch());
                }
                writer.write_array(v);
                for _ in v.len()..width {
                    writer.write(0f32);
                }
            }
            (Encoding::Guid, Value::Bytes(v)) => writer.write(*v),
            (Encoding::Offset, Value::Offset(_)) => {
                let site = session.reserve(writer);
                sites.sites.push((name, site));
            }
            (Encoding::WString, Value::Text(v)) => {
                session.wide_ref(writer, v);
            }
            (Encoding::AString, Value::Text(v)) => {
                session.ascii_ref(writer, v);
            }
            _ => return Err(mismatch()),
        }
    }
    Ok(sites)
}

fn put<T, V>(
    writer: &mut ByteWriter<'_>,
    value: V,
    mismatch: impl FnOnce() -> CodecError,
) -> CodecResult<()>
where
    T: Primitive + TryFrom<V>,
{
    let narrow = T::try_from(value).map_err(|_| mismatch())?;
    writer.write(narrow);
    Ok(())
}
