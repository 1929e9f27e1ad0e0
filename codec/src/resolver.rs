//! Shared sub-object resolution for offset tables whose slots may alias.
//!
//! On read, a [`ReadResolver`] maps each raw offset to the object built from
//! it, so a repeated offset yields the same object instead of a second parse.
//! On write, a [`WriteResolver`] maps object identity to the offset the object
//! was written at, so every slot referring to one object gets the same offset
//! and the payload is emitted once. A zero offset always means "no reference"
//! and never enters either map.
//!
//! Identity is by address, not by value: two equal but distinct objects are
//! written twice.

use std::collections::HashMap;
use std::rc::Rc;

use bytestream::{ByteReader, ByteWriter};
use tracing::debug;

use crate::error::{CodecError, CodecResult};
use crate::patch::PatchTable;
use crate::session::{position, WriteSession};

/// One slot of a table whose targets may be shared.
#[derive(Debug, Clone, PartialEq)]
pub enum Ref<T> {
    /// A zero slot.
    Absent,
    /// An object referenced by exactly one slot.
    Owned(T),
    /// An object referenced by several slots; every clone of the `Rc` is one slot.
    Shared(Rc<T>),
}

impl<T> Default for Ref<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> Ref<T> {
    /// The referenced object, if any.
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Absent => None,
            Self::Owned(value) => Some(value),
            Self::Shared(rc) => Some(rc.as_ref()),
        }
    }

    /// Returns `true` for a zero slot.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Returns `true` if the object is shared with other slots.
    #[must_use]
    pub const fn is_shared(&self) -> bool {
        matches!(self, Self::Shared(_))
    }

    /// Returns `true` if both slots refer to the same object.
    #[must_use]
    pub fn same_target(&self, other: &Self) -> bool {
        match (self.get(), other.get()) {
            (Some(a), Some(b)) => std::ptr::eq(a, b),
            _ => false,
        }
    }
}

impl<T> From<Option<T>> for Ref<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Self::Owned)
    }
}

/// Read-time map from raw offset to the object constructed there.
#[derive(Debug)]
pub struct ReadResolver<T> {
    objects: HashMap<u64, Rc<T>>,
    hits: usize,
}

impl<T> Default for ReadResolver<T> {
    fn default() -> Self {
        Self {
            objects: HashMap::new(),
            hits: 0,
        }
    }
}

impl<T> ReadResolver<T> {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the object at `offset`, constructing it on first sight.
    ///
    /// A zero offset returns `None` without calling `construct`.
    pub fn get_or_insert(
        &mut self,
        offset: u64,
        construct: impl FnOnce(u64) -> CodecResult<T>,
    ) -> CodecResult<Option<Rc<T>>> {
        if offset == 0 {
            return Ok(None);
        }
        if let Some(existing) = self.objects.get(&offset) {
            self.hits += 1;
            return Ok(Some(Rc::clone(existing)));
        }
        let object = Rc::new(construct(offset)?);
        self.objects.insert(offset, Rc::clone(&object));
        Ok(Some(object))
    }

    /// Number of distinct objects constructed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if no object has been constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Number of lookups served from the map.
    #[must_use]
    pub const fn hits(&self) -> usize {
        self.hits
    }

    /// Ends the session and converts resolved slots into [`Ref`]s.
    ///
    /// Objects only one slot refers to become [`Ref::Owned`]; aliased objects
    /// stay [`Ref::Shared`].
    pub fn into_refs(self, slots: Vec<Option<Rc<T>>>) -> Vec<Ref<T>> {
        debug!(
            distinct = self.objects.len(),
            aliased = self.hits,
            "shared objects resolved"
        );
        drop(self.objects);
        slots
            .into_iter()
            .map(|slot| match slot {
                None => Ref::Absent,
                Some(rc) => match Rc::try_unwrap(rc) {
                    Ok(value) => Ref::Owned(value),
                    Err(rc) => Ref::Shared(rc),
                },
            })
            .collect()
    }
}

/// Write-time map from object identity to the offset it was written at.
#[derive(Debug)]
pub struct WriteResolver<T> {
    offsets: HashMap<*const T, u64>,
}

impl<T> Default for WriteResolver<T> {
    fn default() -> Self {
        Self {
            offsets: HashMap::new(),
        }
    }
}

impl<T> WriteResolver<T> {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The offset `object` was already written at, if any.
    ///
    /// The key is the address of `object` itself. For an object behind an
    /// `Rc`, use [`offset_for_shared`](Self::offset_for_shared) or pass `&*rc`.
    #[must_use]
    pub fn offset_for(&self, object: &T) -> Option<u64> {
        let key: *const T = object;
        self.offsets.get(&key).copied()
    }

    /// Records that `object` was written at `offset`.
    pub fn record(&mut self, object: &T, offset: u64) {
        let key: *const T = object;
        self.offsets.insert(key, offset);
    }

    /// The offset the allocation behind `rc` was already written at, if any.
    /// Every clone of `rc` finds the same entry.
    #[must_use]
    pub fn offset_for_shared(&self, rc: &Rc<T>) -> Option<u64> {
        self.offsets.get(&Rc::as_ptr(rc)).copied()
    }

    /// Records that the allocation behind `rc` was written at `offset`.
    pub fn record_shared(&mut self, rc: &Rc<T>, offset: u64) {
        self.offsets.insert(Rc::as_ptr(rc), offset);
    }

    /// Number of distinct objects written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Reads a table of possibly aliased objects.
///
/// Each non-zero offset is read once with `read_one`, positioned at the
/// target; the reader's own position is left unchanged.
pub fn read_ref_table<T, F>(
    reader: &mut ByteReader<'_>,
    offsets: &[u64],
    mut read_one: F,
) -> CodecResult<Vec<Ref<T>>>
where
    F: FnMut(&mut ByteReader<'_>) -> CodecResult<T>,
{
    let mut resolver = ReadResolver::new();
    let mut slots = Vec::with_capacity(offsets.len());
    for &offset in offsets {
        let slot = resolver.get_or_insert(offset, |offset| {
            reader.jump_back(position(offset)?, &mut read_one)
        })?;
        slots.push(slot);
    }
    Ok(resolver.into_refs(slots))
}

/// Writes the payloads of a table whose slots were reserved earlier.
///
/// Slots are visited in order. The first slot referring to an object writes
/// its payload at the writer's position (after aligning to `align`) with
/// `write_one`; every slot referring to it, including the first, is patched
/// with that offset. Absent slots are patched with zero.
pub fn write_ref_table<T, F>(
    writer: &mut ByteWriter<'_>,
    session: &mut WriteSession,
    table: &PatchTable,
    refs: &[Ref<T>],
    align: usize,
    mut write_one: F,
) -> CodecResult<usize>
where
    F: FnMut(&T, &mut ByteWriter<'_>, &mut WriteSession) -> CodecResult<()>,
{
    if table.len() != refs.len() {
        return Err(CodecError::CountMismatch {
            what: "table slots",
            expected: table.len(),
            found: refs.len(),
        });
    }
    let mut resolver = WriteResolver::new();
    for (&site, slot) in table.slots().iter().zip(refs) {
        let offset = match slot.get() {
            None => 0,
            Some(object) => match resolver.offset_for(object) {
                Some(offset) => offset,
                None => {
                    writer.align(align)?;
                    let offset = writer.tell() as u64;
                    resolver.record(object, offset);
                    write_one(object, writer, session)?;
                    offset
                }
            },
        };
        session.resolve(writer, site, offset)?;
    }
    debug!(
        slots = refs.len(),
        written = resolver.len(),
        "reference table written"
    );
    Ok(resolver.len())
}
