//! Localized message tables.
//!
//! File layout:
//!
//! ```text
//! 0x00  version: u32, magic "GMSG", reserved: u64
//! 0x10  entry_count: u32, attribute_count: u32, language_count: u32, pad to 8
//! 0x20  data_offset, languages_offset, attribute_types_offset, attribute_names_offset: u64
//! 0x40  entry_count entry offsets: u64
//!       language ids: u32 * language_count
//!       attribute kinds: i32 * attribute_count
//!       attribute names: count: u64, then wide string offsets
//!       entries, each followed by its attribute values
//!       data segment: the wide string pool, encrypted when version > 12
//! ```

use bytestream::{ByteReader, ByteWriter, IntEnum};
use codec::{
    check_count, position, read_fields, resolve_version, write_fields, CodecError,
    CodecResult, Fields, ReadSession, Record, Value, WriteSession,
};
use schema::{Encoding, EncodingKind, FieldDef, Layout, Threshold, VersionLadder};
use tracing::debug;
use wire::cipher::{decrypt_segment, encrypt_segment};
use wire::{expect_magic, CipherGate, LimitKind, Magic};

/// File signature.
pub const MAGIC: Magic = Magic::new(*b"GMSG");

/// First revision with a per-entry hash.
pub const HASHED: u32 = 14;

/// First revision with per-entry attribute values.
pub const ATTRIBUTES: u32 = 15;

/// Known revisions.
pub const VERSIONS: &[Threshold] = &[
    Threshold::new(12, "v12"),
    Threshold::new(HASHED, "v14"),
    Threshold::new(ATTRIBUTES, "v15"),
];

/// The data segment is encrypted above this revision.
pub const CIPHER: CipherGate = CipherGate::above(12);

/// The version ladder for message tables.
pub fn ladder() -> CodecResult<VersionLadder> {
    Ok(VersionLadder::new("msg", VERSIONS)?)
}

/// The fixed part of an entry. Language strings follow it.
pub fn entry_layout() -> CodecResult<Layout> {
    let layout = Layout::builder("msg entry")
        .field(FieldDef::new("guid", Encoding::Guid))
        .field(FieldDef::new("crc", Encoding::U32))
        .field(FieldDef::new("hash", Encoding::U32).since(HASHED))
        .field(FieldDef::new("name", Encoding::WString))
        .field(FieldDef::new("attributes", Encoding::Offset).since(ATTRIBUTES))
        .build()?;
    Ok(layout)
}

/// Type of an attribute column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Unknown,
    Int,
    Float,
    Text,
}

impl IntEnum for AttributeKind {
    type Repr = i32;

    fn from_repr(raw: i32) -> Option<Self> {
        match raw {
            -1 => Some(Self::Unknown),
            0 => Some(Self::Int),
            1 => Some(Self::Float),
            2 => Some(Self::Text),
            _ => None,
        }
    }

    fn to_repr(self) -> i32 {
        match self {
            Self::Unknown => -1,
            Self::Int => 0,
            Self::Float => 1,
            Self::Text => 2,
        }
    }
}

impl AttributeKind {
    const fn encoding_kind(self) -> EncodingKind {
        match self {
            Self::Unknown | Self::Int => EncodingKind::Signed,
            Self::Float => EncodingKind::Float,
            Self::Text => EncodingKind::Reference,
        }
    }
}

/// An attribute column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDef {
    pub kind: AttributeKind,
    pub name: String,
}

/// One entry's value for an attribute column.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Unknown(i64),
    Int(i64),
    Float(f64),
    Text(String),
}

impl AttributeValue {
    /// The column type this value belongs to.
    #[must_use]
    pub const fn kind(&self) -> AttributeKind {
        match self {
            Self::Unknown(_) => AttributeKind::Unknown,
            Self::Int(_) => AttributeKind::Int,
            Self::Float(_) => AttributeKind::Float,
            Self::Text(_) => AttributeKind::Text,
        }
    }

    fn read(
        reader: &mut ByteReader<'_>,
        session: &mut ReadSession,
        kind: AttributeKind,
    ) -> CodecResult<Self> {
        Ok(match kind {
            AttributeKind::Unknown => Self::Unknown(reader.read()?),
            AttributeKind::Int => Self::Int(reader.read()?),
            AttributeKind::Float => Self::Float(reader.read()?),
            AttributeKind::Text => Self::Text(session.read_wstring_ref(reader)?),
        })
    }

    fn write(&self, writer: &mut ByteWriter<'_>, session: &mut WriteSession) {
        match self {
            Self::Unknown(v) | Self::Int(v) => writer.write(*v),
            Self::Float(v) => writer.write(*v),
            Self::Text(v) => {
                session.wide_ref(writer, v);
            }
        }
    }
}

/// One message: a name and one string per language.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub guid: [u8; 16],
    pub crc: u32,
    /// Zero before [`HASHED`].
    pub hash: u32,
    pub name: String,
    /// One value per attribute column; empty before [`ATTRIBUTES`].
    pub attributes: Vec<AttributeValue>,
    /// One string per language, in the table's language order.
    pub strings: Vec<String>,
}

impl Entry {
    fn read(
        reader: &mut ByteReader<'_>,
        session: &mut ReadSession,
        layout: &Layout,
        version: u32,
        columns: &[AttributeDef],
        language_count: usize,
    ) -> CodecResult<Self> {
        let fields = read_fields(reader, session, layout, version)?;
        let strings = (0..language_count)
            .map(|_| session.read_wstring_ref(reader))
            .collect::<CodecResult<Vec<_>>>()?;
        let attributes = match fields.get("attributes") {
            Some(&Value::Offset(at)) => reader.jump_back(position(at)?, |r| {
                columns
                    .iter()
                    .map(|column| AttributeValue::read(r, session, column.kind))
                    .collect::<CodecResult<Vec<_>>>()
            })?,
            _ => Vec::new(),
        };
        let hash = if fields.get("hash").is_some() {
            fields.unsigned("hash")? as u32
        } else {
            0
        };
        Ok(Self {
            guid: fields.bytes("guid")?,
            crc: fields.unsigned("crc")? as u32,
            hash,
            name: fields.text("name")?.to_owned(),
            attributes,
            strings,
        })
    }

    fn write(
        &self,
        writer: &mut ByteWriter<'_>,
        session: &mut WriteSession,
        layout: &Layout,
        version: u32,
        columns: &[AttributeDef],
    ) -> CodecResult<()> {
        let fields = Fields::new(layout.name())
            .with("guid", Value::Bytes(self.guid))
            .with("crc", Value::Unsigned(self.crc.into()))
            .with("hash", Value::Unsigned(self.hash.into()))
            .with("name", Value::Text(self.name.clone()))
            .with("attributes", Value::Offset(0));
        let mut sites = write_fields(writer, session, layout, version, &fields)?;
        for string in &self.strings {
            session.wide_ref(writer, string);
        }

        let Some(site) = sites.take("attributes") else {
            return check_count("entry attributes", 0, self.attributes.len());
        };
        check_count("entry attributes", columns.len(), self.attributes.len())?;
        writer.align(8)?;
        session.resolve_here(writer, site)?;
        for (column, value) in columns.iter().zip(&self.attributes) {
            if value.kind() != column.kind {
                return Err(CodecError::FieldTypeMismatch {
                    layout: "msg attributes",
                    field: "value",
                    expected: column.kind.encoding_kind(),
                });
            }
            value.write(writer, session);
        }
        Ok(())
    }
}

/// A localized message table.
#[derive(Debug, Clone, PartialEq)]
pub struct Msg {
    /// Raw version as stored; written back unchanged.
    pub version: u32,
    pub languages: Vec<u32>,
    pub attributes: Vec<AttributeDef>,
    pub entries: Vec<Entry>,
}

impl Msg {
    /// Looks up an entry by name.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// The string of `entry` for `language`, if both exist.
    #[must_use]
    pub fn text(&self, name: &str, language: u32) -> Option<&str> {
        let column = self.languages.iter().position(|&l| l == language)?;
        self.entry(name)?.strings.get(column).map(String::as_str)
    }
}

impl Record for Msg {
    fn read(reader: &mut ByteReader<'_>, session: &mut ReadSession) -> CodecResult<Self> {
        let version = reader.read::<u32>()?;
        expect_magic(reader, MAGIC)?;
        let resolved = resolve_version(&ladder()?, version)?;
        reader.skip(8)?;
        let entry_count = reader.read::<u32>()? as usize;
        let attribute_count = reader.read::<u32>()? as usize;
        let language_count = reader.read::<u32>()? as usize;
        reader.align(8)?;
        let data_offset = position(reader.read::<u64>()?)?;
        let languages_offset = position(reader.read::<u64>()?)?;
        let types_offset = position(reader.read::<u64>()?)?;
        let names_offset = position(reader.read::<u64>()?)?;
        let table_at = reader.tell();
        let limits = session.limits();
        limits.check(LimitKind::TableEntries, attribute_count)?;
        limits.check(LimitKind::TableEntries, language_count)?;

        let mut plain = reader.frame_bytes().to_vec();
        if CIPHER.applies(version) {
            decrypt_segment(&mut plain, data_offset)?;
        }
        let mut reader = ByteReader::new(&plain);

        let languages =
            reader.jump_back(languages_offset, |r| r.read_array::<u32>(language_count))?;
        let kinds = reader.jump_back(types_offset, |r| {
            (0..attribute_count)
                .map(|_| r.read_enum::<AttributeKind>())
                .collect::<Result<Vec<_>, _>>()
        })?;
        let names = reader.jump_back(names_offset, |r| {
            let count = position(r.read::<u64>()?)?;
            check_count("attribute names", attribute_count, count)?;
            (0..count)
                .map(|_| session.read_wstring_ref(r))
                .collect::<CodecResult<Vec<_>>>()
        })?;
        let attributes: Vec<AttributeDef> = kinds
            .into_iter()
            .zip(names)
            .map(|(kind, name)| AttributeDef { kind, name })
            .collect();

        let layout = entry_layout()?;
        let offsets = session.offset_table(&mut reader, table_at, entry_count)?;
        let entries = offsets
            .into_iter()
            .map(|offset| {
                reader.jump_back(position(offset)?, |r| {
                    Entry::read(
                        r,
                        session,
                        &layout,
                        resolved.layout_version(),
                        &attributes,
                        language_count,
                    )
                })
            })
            .collect::<CodecResult<Vec<_>>>()?;

        debug!(
            version,
            entries = entries.len(),
            languages = languages.len(),
            "msg decoded"
        );
        Ok(Self {
            version,
            languages,
            attributes,
            entries,
        })
    }

    fn write(&self, writer: &mut ByteWriter<'_>, session: &mut WriteSession) -> CodecResult<()> {
        let version = resolve_version(&ladder()?, self.version)?.layout_version();
        writer.write(self.version);
        MAGIC.write(writer);
        writer.write(0u64);
        writer.write(self.entries.len() as u32);
        writer.write(self.attributes.len() as u32);
        writer.write(self.languages.len() as u32);
        writer.align(8)?;
        let data_site = session.reserve(writer);
        let languages_site = session.reserve(writer);
        let types_site = session.reserve(writer);
        let names_site = session.reserve(writer);
        let table = session.reserve_table(writer, self.entries.len());

        writer.align(8)?;
        session.resolve_here(writer, languages_site)?;
        writer.write_array(&self.languages);

        writer.align(8)?;
        session.resolve_here(writer, types_site)?;
        for column in &self.attributes {
            writer.write_enum(column.kind);
        }

        writer.align(8)?;
        session.resolve_here(writer, names_site)?;
        writer.write(self.attributes.len() as u64);
        for column in &self.attributes {
            session.wide_ref(writer, &column.name);
        }

        let layout = entry_layout()?;
        for (&slot, entry) in table.slots().iter().zip(&self.entries) {
            check_count("entry strings", self.languages.len(), entry.strings.len())?;
            writer.align(8)?;
            session.resolve_here(writer, slot)?;
            entry.write(writer, session, &layout, version, &self.attributes)?;
        }

        writer.align(8)?;
        let data_offset = writer.tell();
        session.resolve_here(writer, data_site)?;
        session.flush_wide(writer)?;
        if CIPHER.applies(self.version) {
            encrypt_segment(writer.frame_bytes_mut(), data_offset)?;
        }
        Ok(())
    }
}
