//! String interning pools.
//!
//! Text fields are stored out of line: the record holds an 8-byte offset and
//! the characters live in a pool emitted later. A pool collects values as
//! records reference them, writes each distinct value once in first-added
//! order when flushed, and then patches every recorded reference with the
//! value's final offset.
//!
//! The write protocol has two steps that must run in order:
//!
//! 1. [`StringPool::flush`] emits every value not yet written.
//! 2. [`StringPool::flush_offsets`] patches every reference site.
//!
//! Reading needs no pool: [`read_at`] decodes the string at an offset directly.

use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;

use bytestream::{ByteReader, ByteResult, ByteWriter};
use tracing::debug;
use wire::Limits;

use crate::config::EmptyString;
use crate::error::{CodecError, CodecResult};
use crate::patch::{PatchLedger, PatchSite};
use crate::session::position;

/// A character encoding a pool stores its values in.
pub trait PoolEncoding {
    /// Name used in logs and errors.
    const NAME: &'static str;

    /// Writes `value` with its terminator.
    fn write(writer: &mut ByteWriter<'_>, value: &str) -> ByteResult<()>;

    /// Reads a terminated value of at most `max_units` code units at the
    /// current position.
    fn read(reader: &mut ByteReader<'_>, max_units: usize) -> ByteResult<String>;
}

/// Null-terminated UTF-16LE.
#[derive(Debug, Clone, Copy, Default)]
pub struct Wide;

/// Null-terminated ASCII.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ascii;

impl PoolEncoding for Wide {
    const NAME: &'static str = "wide";

    fn write(writer: &mut ByteWriter<'_>, value: &str) -> ByteResult<()> {
        writer.write_wstring(value);
        Ok(())
    }

    fn read(reader: &mut ByteReader<'_>, max_units: usize) -> ByteResult<String> {
        reader.read_wstring_max(max_units)
    }
}

impl PoolEncoding for Ascii {
    const NAME: &'static str = "ascii";

    fn write(writer: &mut ByteWriter<'_>, value: &str) -> ByteResult<()> {
        writer.write_astring(value)
    }

    fn read(reader: &mut ByteReader<'_>, max_units: usize) -> ByteResult<String> {
        reader.read_astring_max(max_units)
    }
}

/// Handle to an interned value, resolvable to an offset once the pool is flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingRef {
    entry: Option<usize>,
}

impl PendingRef {
    /// The reference an empty string gets under [`EmptyString::NullOffset`].
    pub const NULL: Self = Self { entry: None };

    /// Returns `true` if this reference is written as a zero offset.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.entry.is_none()
    }
}

#[derive(Debug)]
struct Entry {
    value: String,
    offset: Option<u64>,
}

/// An interning pool for one string encoding.
#[derive(Debug)]
pub struct StringPool<E> {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    sites: BTreeMap<PatchSite, PendingRef>,
    flushed: usize,
    empty: EmptyString,
    encoding: PhantomData<E>,
}

/// Pool of UTF-16 strings.
pub type WidePool = StringPool<Wide>;

/// Pool of ASCII strings.
pub type AsciiPool = StringPool<Ascii>;

impl<E: PoolEncoding> Default for StringPool<E> {
    fn default() -> Self {
        Self::new(EmptyString::default())
    }
}

impl<E: PoolEncoding> StringPool<E> {
    /// Creates an empty pool with the given empty-string convention.
    #[must_use]
    pub fn new(empty: EmptyString) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            sites: BTreeMap::new(),
            flushed: 0,
            empty,
            encoding: PhantomData,
        }
    }

    /// Interns `value` and returns its handle. Equal values share one entry.
    pub fn add(&mut self, value: &str) -> PendingRef {
        if value.is_empty() && self.empty == EmptyString::NullOffset {
            return PendingRef::NULL;
        }
        if let Some(&entry) = self.index.get(value) {
            return PendingRef { entry: Some(entry) };
        }
        let entry = self.entries.len();
        self.entries.push(Entry {
            value: value.to_owned(),
            offset: None,
        });
        self.index.insert(value.to_owned(), entry);
        PendingRef { entry: Some(entry) }
    }

    /// Interns `value`, writes a placeholder for it at the writer's position,
    /// and registers the placeholder for [`flush_offsets`](Self::flush_offsets).
    pub fn reference(
        &mut self,
        writer: &mut ByteWriter<'_>,
        ledger: &mut PatchLedger,
        value: &str,
    ) -> PendingRef {
        let pending = self.add(value);
        let site = ledger.reserve(writer);
        self.sites.insert(site, pending);
        pending
    }

    /// Writes every value added since the last flush at the writer's position,
    /// in first-added order. Returns the number of values written.
    ///
    /// A second flush with no new values writes nothing.
    pub fn flush(&mut self, writer: &mut ByteWriter<'_>) -> CodecResult<usize> {
        let start = self.flushed;
        for entry in &mut self.entries[start..] {
            entry.offset = Some(writer.tell() as u64);
            E::write(writer, &entry.value)?;
        }
        self.flushed = self.entries.len();
        let written = self.flushed - start;
        debug!(
            pool = E::NAME,
            written,
            total = self.entries.len(),
            end = writer.tell(),
            "string pool flushed"
        );
        Ok(written)
    }

    /// Patches every registered reference site with its value's offset.
    ///
    /// Must run after [`flush`](Self::flush); fails with
    /// [`CodecError::PoolNotFlushed`] if any value has not been written yet.
    /// Returns the number of sites patched.
    pub fn flush_offsets(
        &mut self,
        writer: &mut ByteWriter<'_>,
        ledger: &mut PatchLedger,
    ) -> CodecResult<usize> {
        let pending = self.unflushed();
        if pending > 0 {
            return Err(CodecError::PoolNotFlushed {
                pool: E::NAME,
                pending,
            });
        }
        let sites = std::mem::take(&mut self.sites);
        let count = sites.len();
        for (site, pending) in sites {
            let offset = self.resolved(pending).unwrap_or(0);
            ledger.resolve(writer, site, offset)?;
        }
        Ok(count)
    }

    /// The final offset of `pending`, once flushed. Null references resolve to 0.
    #[must_use]
    pub fn resolved(&self, pending: PendingRef) -> Option<u64> {
        match pending.entry {
            None => Some(0),
            Some(entry) => self.entries.get(entry).and_then(|e| e.offset),
        }
    }

    /// Number of distinct values interned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of values added but not yet written.
    #[must_use]
    pub fn unflushed(&self) -> usize {
        self.entries.len() - self.flushed
    }

    /// Number of reference sites awaiting [`flush_offsets`](Self::flush_offsets).
    #[must_use]
    pub fn pending_sites(&self) -> usize {
        self.sites.len()
    }
}

/// Decodes the string at `offset` (frame-relative) without moving the reader.
///
/// A zero offset is a null reference and decodes to the empty string.
/// Decoding stops with [`CodecError::LimitsExceeded`] once the string passes
/// the configured number of code units.
pub fn read_at<E: PoolEncoding>(
    reader: &mut ByteReader<'_>,
    offset: u64,
    limits: &Limits,
) -> CodecResult<String> {
    if offset == 0 {
        return Ok(String::new());
    }
    let max_units = limits.max_string_units;
    reader.jump_back(position(offset)?, |r| E::read(r, max_units).map_err(CodecError::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wire::LimitKind;

    fn offsets(buf: &[u8], count: usize) -> Vec<u64> {
        buf.chunks_exact(8)
            .take(count)
            .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
            .collect()
    }

    #[test]
    fn equal_values_share_one_entry() {
        let mut pool = WidePool::default();
        let a = pool.add("bone");
        let b = pool.add("bone");
        let c = pool.add("root");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn flush_writes_in_first_added_order() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        let mut ledger = PatchLedger::new();
        let mut pool = WidePool::default();

        pool.reference(&mut writer, &mut ledger, "b");
        pool.reference(&mut writer, &mut ledger, "a");
        pool.reference(&mut writer, &mut ledger, "b");
        assert_eq!(pool.flush(&mut writer).unwrap(), 2);
        assert_eq!(pool.flush_offsets(&mut writer, &mut ledger).unwrap(), 3);
        ledger.finish(true).unwrap();

        assert_eq!(offsets(&buf, 3), vec![24, 28, 24]);
        assert_eq!(&buf[24..], &[b'b', 0, 0, 0, b'a', 0, 0, 0]);
    }

    #[test]
    fn second_flush_without_additions_writes_nothing() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        let mut pool = AsciiPool::default();
        pool.add("x");
        pool.flush(&mut writer).unwrap();
        let len = writer.len();
        assert_eq!(pool.flush(&mut writer).unwrap(), 0);
        assert_eq!(writer.len(), len);

        pool.add("x");
        assert_eq!(pool.flush(&mut writer).unwrap(), 0);
        pool.add("y");
        assert_eq!(pool.flush(&mut writer).unwrap(), 1);
        assert_eq!(buf, b"x\0y\0");
    }

    #[test]
    fn offsets_before_flush_fail() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        let mut ledger = PatchLedger::new();
        let mut pool = WidePool::default();
        pool.reference(&mut writer, &mut ledger, "late");
        assert!(matches!(
            pool.flush_offsets(&mut writer, &mut ledger),
            Err(CodecError::PoolNotFlushed {
                pool: "wide",
                pending: 1
            })
        ));
    }

    #[test]
    fn null_offset_convention_skips_empty_strings() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        let mut ledger = PatchLedger::new();
        let mut pool = WidePool::new(EmptyString::NullOffset);
        let empty = pool.reference(&mut writer, &mut ledger, "");
        assert!(empty.is_null());
        pool.flush(&mut writer).unwrap();
        pool.flush_offsets(&mut writer, &mut ledger).unwrap();
        ledger.finish(true).unwrap();
        assert!(pool.is_empty());
        assert_eq!(buf, vec![0u8; 8]);
    }

    #[test]
    fn pooled_convention_stores_empty_strings() {
        let mut pool = WidePool::new(EmptyString::Pooled);
        let empty = pool.add("");
        assert!(!empty.is_null());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn non_ascii_in_ascii_pool_fails_on_flush() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        let mut pool = AsciiPool::default();
        pool.add("bön");
        assert!(matches!(pool.flush(&mut writer), Err(CodecError::Bytes(_))));
    }

    #[test]
    fn read_at_decodes_and_checks_limits() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        writer.write(0u64);
        writer.write_wstring("hello");
        let mut reader = ByteReader::new(&buf);

        let limits = Limits::for_testing();
        assert_eq!(read_at::<Wide>(&mut reader, 8, &limits).unwrap(), "hello");
        assert_eq!(read_at::<Wide>(&mut reader, 0, &limits).unwrap(), "");
        assert_eq!(reader.tell(), 0);

        let tight = Limits {
            max_string_units: 4,
            ..Limits::for_testing()
        };
        assert!(matches!(
            read_at::<Wide>(&mut reader, 8, &tight),
            Err(CodecError::LimitsExceeded {
                kind: LimitKind::StringUnits,
                ..
            })
        ));
    }

    #[test]
    fn long_strings_stop_at_the_unit_limit() {
        // No terminator anywhere: a full decode would report the missing
        // terminator, a bounded one gives up after the limit.
        let mut buf = vec![0u8; 8];
        buf.extend(std::iter::repeat(b'x').take(4096));
        buf[0] = 8;
        let tight = Limits {
            max_string_units: 16,
            ..Limits::for_testing()
        };
        let mut reader = ByteReader::new(&buf);
        assert!(matches!(
            read_at::<Ascii>(&mut reader, 8, &tight),
            Err(CodecError::LimitsExceeded {
                kind: LimitKind::StringUnits,
                limit: 16,
                actual: 17,
            })
        ));
        assert!(matches!(
            read_at::<Wide>(&mut reader, 8, &tight),
            Err(CodecError::LimitsExceeded {
                kind: LimitKind::StringUnits,
                limit: 16,
                ..
            })
        ));
        assert_eq!(reader.tell(), 0);
    }
}
