//! Motion lists: a versioned header, then a table of embedded motion files.
//!
//! Table slots may be zero or point at the same motion more than once. Each
//! target starts with a `version: u32` and a type tag, and is an embedded file
//! with its own coordinate frame, so offsets inside a motion are relative to
//! the motion's start.

use bytestream::{ByteReader, ByteWriter};
use codec::{
    check_count, position, read_fields, read_ref_table, resolve_version, write_fields,
    write_ref_table, CodecError, CodecResult, Fields, ReadSession, Record, Ref, Value,
    WriteSession,
};
use schema::{Encoding, FieldDef, Layout, Threshold, VersionLadder};
use tracing::debug;
use wire::{distinct_offsets, expect_magic, peek_magic, CommonHeader, LimitKind, Magic};

/// File signature.
pub const MAGIC: Magic = Magic::new(*b"mlst");

/// Tag of a motion clip.
pub const MOT: Magic = Magic::new(*b"mot ");

/// Tag of a motion tree.
pub const MTRE: Magic = Magic::new(*b"mtre");

pub const RE2: u32 = 60;
pub const RE3: u32 = 85;
pub const RE8: u32 = 99;

/// Known revisions.
pub const VERSIONS: &[Threshold] = &[
    Threshold::new(RE2, "re2"),
    Threshold::new(RE3, "re3"),
    Threshold::new(RE8, "re8"),
];

/// Alignment of each embedded motion.
const MOTION_ALIGN: usize = 16;

/// The version ladder for motion lists.
pub fn ladder() -> CodecResult<VersionLadder> {
    Ok(VersionLadder::new("motlist", VERSIONS)?)
}

/// The motion list header.
pub fn header_layout() -> CodecResult<Layout> {
    let layout = Layout::builder("motlist header")
        .field(FieldDef::new("version", Encoding::U32))
        .field(FieldDef::new("magic", Encoding::U32))
        .field(FieldDef::padding("reserved", 8))
        .field(FieldDef::new("table", Encoding::Offset))
        .field(FieldDef::new("ids", Encoding::Offset).since(RE3))
        .field(FieldDef::new("name", Encoding::WString))
        .field(FieldDef::new("base_name", Encoding::WString).since(RE8))
        .field(FieldDef::new("count", Encoding::U16).widened(RE8, Encoding::U32))
        .field(FieldDef::new("flags", Encoding::U32).only(RE3))
        .field(FieldDef::align("pad", 8))
        .build()?;
    Ok(layout)
}

fn narrow_count(count: usize) -> CodecResult<u16> {
    u16::try_from(count).map_err(|_| CodecError::LimitsExceeded {
        kind: LimitKind::TableEntries,
        limit: u16::MAX.into(),
        actual: count,
    })
}

/// A named bone and the index of its parent (-1 for a root).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bone {
    pub name: String,
    pub parent: i32,
}

/// Fixed header of a motion clip.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MotHeader {
    version: u32,
    /// Total size of the clip, known only once it has been written.
    size: u32,
    bone_count: u16,
    key_count: u16,
    frame_rate: f32,
}

impl Record for MotHeader {
    fn read(reader: &mut ByteReader<'_>, _session: &mut ReadSession) -> CodecResult<Self> {
        let version = reader.read::<u32>()?;
        expect_magic(reader, MOT)?;
        Ok(Self {
            version,
            size: reader.read()?,
            bone_count: reader.read()?,
            key_count: reader.read()?,
            frame_rate: reader.read()?,
        })
    }

    fn write(&self, writer: &mut ByteWriter<'_>, _session: &mut WriteSession) -> CodecResult<()> {
        writer.write(self.version);
        MOT.write(writer);
        writer.write(self.size);
        writer.write(self.bone_count);
        writer.write(self.key_count);
        writer.write(self.frame_rate);
        Ok(())
    }
}

/// A motion clip: a bone list and rotation keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Mot {
    pub version: u32,
    pub name: String,
    pub frame_rate: f32,
    pub bones: Vec<Bone>,
    pub keys: Vec<[f32; 4]>,
}

impl Record for Mot {
    fn read(reader: &mut ByteReader<'_>, session: &mut ReadSession) -> CodecResult<Self> {
        let start = reader.tell();
        let header = MotHeader::read(reader, session)?;
        let mut body = reader.clone().with_limit(start + header.size as usize)?;
        let bones_offset = position(body.read::<u64>()?)?;
        let keys_offset = position(body.read::<u64>()?)?;
        let name = session.read_wstring_ref(&mut body)?;
        let bones = body.jump_back(bones_offset, |r| {
            (0..header.bone_count)
                .map(|_| {
                    let name = session.read_astring_ref(r)?;
                    let parent = r.read::<i32>()?;
                    r.skip(4)?;
                    Ok(Bone { name, parent })
                })
                .collect::<CodecResult<Vec<_>>>()
        })?;
        let keys = body.jump_back(keys_offset, |r| {
            r.read_array::<[f32; 4]>(header.key_count.into())
        })?;
        Ok(Self {
            version: header.version,
            name,
            frame_rate: header.frame_rate,
            bones,
            keys,
        })
    }

    fn write(&self, writer: &mut ByteWriter<'_>, session: &mut WriteSession) -> CodecResult<()> {
        let start = writer.tell();
        let at = session.checkpoint(writer);
        let mut header = MotHeader {
            version: self.version,
            size: 0,
            bone_count: narrow_count(self.bones.len())?,
            key_count: narrow_count(self.keys.len())?,
            frame_rate: self.frame_rate,
        };
        header.write(writer, session)?;
        let bones_site = session.reserve(writer);
        let keys_site = session.reserve(writer);
        session.wide_ref(writer, &self.name);

        writer.align(16)?;
        session.resolve_here(writer, bones_site)?;
        for bone in &self.bones {
            session.ascii_ref(writer, &bone.name);
            writer.write(bone.parent);
            writer.fill(0, 4);
        }

        writer.align(16)?;
        session.resolve_here(writer, keys_site)?;
        writer.write_array(&self.keys);

        session.flush_ascii(writer)?;
        writer.align(2)?;
        session.flush_wide(writer)?;

        header.size = u32::try_from(writer.tell() - start).map_err(|_| {
            CodecError::LimitsExceeded {
                kind: LimitKind::FileBytes,
                limit: u32::MAX as usize,
                actual: writer.tell() - start,
            }
        })?;
        header.rewrite(writer, session, at)
    }
}

/// A motion tree: a name and the ids of the motions it blends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotTree {
    pub version: u32,
    pub name: String,
    pub motion_ids: Vec<u32>,
}

impl MotTree {
    /// Position of the id table: right after the header and the name reference.
    const TABLE_AT: usize = CommonHeader::SIZE + 8;
}

impl Record for MotTree {
    fn read(reader: &mut ByteReader<'_>, session: &mut ReadSession) -> CodecResult<Self> {
        let header = CommonHeader::read(reader, MTRE)?;
        let name = session.read_wstring_ref(reader)?;
        let count = header.count as usize;
        session.limits().check(LimitKind::TableEntries, count)?;
        let motion_ids = reader.jump_back(position(header.table_offset)?, |r| {
            r.read_array::<u32>(count)
        })?;
        Ok(Self {
            version: header.version,
            name,
            motion_ids,
        })
    }

    fn write(&self, writer: &mut ByteWriter<'_>, session: &mut WriteSession) -> CodecResult<()> {
        let header = CommonHeader {
            version: self.version,
            magic: MTRE,
            table_offset: (writer.tell() + Self::TABLE_AT) as u64,
            count: self.motion_ids.len() as u32,
        };
        header.write(writer);
        session.wide_ref(writer, &self.name);
        writer.write_array(&self.motion_ids);
        writer.align(8)?;
        session.flush_wide(writer)?;
        Ok(())
    }
}

/// A motion list entry, selected by the target's type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionEntry {
    Clip(Mot),
    Tree(MotTree),
}

impl MotionEntry {
    /// The type tag written for this entry.
    #[must_use]
    pub const fn tag(&self) -> Magic {
        match self {
            Self::Clip(_) => MOT,
            Self::Tree(_) => MTRE,
        }
    }

    /// Name of the clip or tree.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Clip(mot) => &mot.name,
            Self::Tree(tree) => &tree.name,
        }
    }
}

impl Record for MotionEntry {
    fn read(reader: &mut ByteReader<'_>, session: &mut ReadSession) -> CodecResult<Self> {
        let at = reader.tell() + 4;
        let tag = peek_magic(reader, at)?;
        match tag {
            MOT => Ok(Self::Clip(Mot::read(reader, session)?)),
            MTRE => Ok(Self::Tree(MotTree::read(reader, session)?)),
            _ => Err(CodecError::UnknownTag {
                tag,
                offset: reader.absolute_position() + 4,
            }),
        }
    }

    fn write(&self, writer: &mut ByteWriter<'_>, session: &mut WriteSession) -> CodecResult<()> {
        match self {
            Self::Clip(mot) => mot.write(writer, session),
            Self::Tree(tree) => tree.write(writer, session),
        }
    }
}

/// Reads the embedded file starting at the reader's position.
fn read_embedded(reader: &mut ByteReader<'_>, session: &mut ReadSession) -> CodecResult<MotionEntry> {
    let mut child = session.embedded(reader, reader.tell())?;
    MotionEntry::read(&mut child, session)
}

/// Writes `entry` as an embedded file at the writer's position, with its own
/// frame and session, and leaves the writer after it.
fn write_embedded(
    entry: &MotionEntry,
    writer: &mut ByteWriter<'_>,
    session: &WriteSession,
) -> CodecResult<()> {
    let base = writer.tell();
    let mut sub = session.embedded();
    entry.write(&mut writer.with_offset(base)?, &mut sub)?;
    let report = sub.finish()?;
    debug!(
        tag = %entry.tag(),
        base,
        sites = report.sites_resolved,
        "embedded motion written"
    );
    writer.seek_end();
    Ok(())
}

/// A motion list.
#[derive(Debug, Clone, PartialEq)]
pub struct Motlist {
    /// Raw version as stored; written back unchanged.
    pub version: u32,
    pub name: String,
    /// Empty before [`RE8`].
    pub base_name: String,
    /// Only stored by the [`RE3`] layout.
    pub flags: u32,
    /// One id per motion slot from [`RE3`] on; empty before.
    pub ids: Vec<u32>,
    pub motions: Vec<Ref<MotionEntry>>,
}

impl Motlist {
    /// Iterates over present motions, once per slot.
    pub fn motions(&self) -> impl Iterator<Item = &MotionEntry> {
        self.motions.iter().filter_map(Ref::get)
    }
}

impl Record for Motlist {
    fn read(reader: &mut ByteReader<'_>, session: &mut ReadSession) -> CodecResult<Self> {
        let start = reader.tell();
        let raw = reader.peek::<u32>(start)?;
        reader.jump_back(start + 4, |r| expect_magic(r, MAGIC))?;
        let version = resolve_version(&ladder()?, raw)?.layout_version();

        let layout = header_layout()?;
        let fields = read_fields(reader, session, &layout, version)?;
        let count = position(fields.unsigned("count")?)?;
        let table_at = position(fields.offset("table")?)?;
        let ids = match fields.get("ids") {
            Some(&Value::Offset(at)) => {
                session.limits().check(LimitKind::TableEntries, count)?;
                reader.jump_back(position(at)?, |r| r.read_array::<u32>(count))?
            }
            _ => Vec::new(),
        };

        let offsets = session.offset_table(reader, table_at, count)?;
        debug!(
            slots = offsets.len(),
            distinct = distinct_offsets(&offsets).len(),
            "motion table read"
        );
        let motions = read_ref_table(reader, &offsets, |r| read_embedded(r, session))?;

        let base_name = match fields.get("base_name") {
            Some(_) => fields.text("base_name")?.to_owned(),
            None => String::new(),
        };
        let flags = match fields.get("flags") {
            Some(_) => fields.unsigned("flags")? as u32,
            None => 0,
        };
        Ok(Self {
            version: raw,
            name: fields.text("name")?.to_owned(),
            base_name,
            flags,
            ids,
            motions,
        })
    }

    fn write(&self, writer: &mut ByteWriter<'_>, session: &mut WriteSession) -> CodecResult<()> {
        let version = resolve_version(&ladder()?, self.version)?.layout_version();
        let layout = header_layout()?;
        let fields = Fields::new(layout.name())
            .with("version", Value::Unsigned(self.version.into()))
            .with("magic", Value::Unsigned(MAGIC.to_u32().into()))
            .with("table", Value::Offset(0))
            .with("ids", Value::Offset(0))
            .with("name", Value::Text(self.name.clone()))
            .with("base_name", Value::Text(self.base_name.clone()))
            .with("count", Value::Unsigned(self.motions.len() as u64))
            .with("flags", Value::Unsigned(self.flags.into()));
        let mut sites = write_fields(writer, session, &layout, version, &fields)?;

        if let Some(site) = sites.take("ids") {
            check_count("motion ids", self.motions.len(), self.ids.len())?;
            writer.align(8)?;
            session.resolve_here(writer, site)?;
            writer.write_array(&self.ids);
        } else {
            check_count("motion ids", 0, self.ids.len())?;
        }

        let table_site = sites.take("table").ok_or(CodecError::MissingField {
            layout: layout.name(),
            field: "table",
        })?;
        writer.align(8)?;
        session.resolve_here(writer, table_site)?;
        let table = session.reserve_table(writer, self.motions.len());
        write_ref_table(
            writer,
            session,
            &table,
            &self.motions,
            MOTION_ALIGN,
            |entry, w, s| write_embedded(entry, w, s),
        )?;

        writer.align(8)?;
        session.flush_wide(writer)?;
        Ok(())
    }
}
