//! Deferred patching of forward references.
//!
//! A forward reference is written as an 8-byte zero placeholder whose
//! location is remembered as a [`PatchSite`]. Once the referenced data has been
//! emitted, the site is resolved: the placeholder is overwritten with the real
//! offset and the writer's position is left where it was. The
//! [`PatchLedger`] tracks every site a session allocates so that a write can
//! be checked for completeness when it ends.
//!
//! All positions are relative to the frame of the writer the site was
//! reserved on.

use std::collections::BTreeSet;

use bytestream::ByteWriter;
use tracing::{trace, warn};

use crate::error::{CodecError, CodecResult};

/// The location of an 8-byte placeholder awaiting its final value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchSite {
    at: usize,
}

impl PatchSite {
    /// Frame-relative position of the placeholder.
    #[must_use]
    pub const fn position(self) -> usize {
        self.at
    }
}

/// A run of consecutive placeholders reserved up front for an offset table.
///
/// Slot `i` always belongs to logical item `i`, whatever order the slots end
/// up being resolved in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchTable {
    slots: Vec<PatchSite>,
}

impl PatchTable {
    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the table has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The site of slot `index`.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<PatchSite> {
        self.slots.get(index).copied()
    }

    /// All sites in slot order.
    #[must_use]
    pub fn slots(&self) -> &[PatchSite] {
        &self.slots
    }

    /// Position of the first slot, or `None` for an empty table.
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        self.slots.first().map(|site| site.position())
    }
}

/// Counters reported when a ledger is closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchStats {
    /// Sites allocated over the session.
    pub allocated: usize,
    /// Sites resolved over the session.
    pub resolved: usize,
    /// Sites left at their zero placeholder (only in non-strict sessions).
    pub zeroed: usize,
}

/// Bookkeeping for every patch site of one write session.
#[derive(Debug, Default)]
pub struct PatchLedger {
    open: BTreeSet<usize>,
    closed: BTreeSet<usize>,
    allocated: usize,
    resolved: usize,
}

impl PatchLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes an 8-byte zero placeholder at the current position and returns its site.
    ///
    /// Reserving a site that is still open (for example when a record is
    /// rewritten in place) returns the same site without counting it twice.
    pub fn reserve(&mut self, writer: &mut ByteWriter<'_>) -> PatchSite {
        let at = writer.tell();
        writer.write(0u64);
        if self.open.insert(at) {
            self.closed.remove(&at);
            self.allocated += 1;
        }
        PatchSite { at }
    }

    /// Reserves `count` consecutive placeholders.
    pub fn reserve_table(&mut self, writer: &mut ByteWriter<'_>, count: usize) -> PatchTable {
        let slots = (0..count).map(|_| self.reserve(writer)).collect();
        PatchTable { slots }
    }

    /// Overwrites the placeholder at `site` with `value` without moving the writer.
    pub fn resolve(
        &mut self,
        writer: &mut ByteWriter<'_>,
        site: PatchSite,
        value: u64,
    ) -> CodecResult<()> {
        if !self.open.remove(&site.at) {
            return Err(if self.closed.contains(&site.at) {
                CodecError::DoublePatch { site: site.at }
            } else {
                CodecError::UnknownPatchSite { site: site.at }
            });
        }
        writer.patch(site.at, value);
        self.closed.insert(site.at);
        self.resolved += 1;
        trace!(site = site.at, value, "patch resolved");
        Ok(())
    }

    /// Resolves `site` to the writer's current position.
    pub fn resolve_here(&mut self, writer: &mut ByteWriter<'_>, site: PatchSite) -> CodecResult<()> {
        let here = writer.tell() as u64;
        self.resolve(writer, site, here)
    }

    /// Number of sites still awaiting a value.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Returns `true` if `site` is still awaiting a value.
    #[must_use]
    pub fn is_open(&self, site: PatchSite) -> bool {
        self.open.contains(&site.at)
    }

    /// Closes the ledger.
    ///
    /// In strict mode any open site is an [`CodecError::UnresolvedPatch`].
    /// Otherwise open sites keep their zero placeholder, which readers
    /// interpret as an absent reference, and a warning is logged.
    pub fn finish(self, strict: bool) -> CodecResult<PatchStats> {
        let zeroed = self.open.len();
        if let Some(&first) = self.open.first() {
            if strict {
                return Err(CodecError::UnresolvedPatch {
                    count: zeroed,
                    first,
                });
            }
            warn!(count = zeroed, first, "unresolved patch sites left as zero");
        }
        Ok(PatchStats {
            allocated: self.allocated,
            resolved: self.resolved,
            zeroed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_then_resolve() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        let mut ledger = PatchLedger::new();

        writer.write(1u32);
        let site = ledger.reserve(&mut writer);
        assert_eq!(site.position(), 4);
        writer.write(0xAAu8);
        ledger.resolve(&mut writer, site, 0x1234).unwrap();
        assert_eq!(writer.tell(), 13);

        let stats = ledger.finish(true).unwrap();
        assert_eq!(stats.allocated, 1);
        assert_eq!(stats.resolved, 1);
        assert_eq!(&buf[4..12], &0x1234u64.to_le_bytes());
        assert_eq!(buf[12], 0xAA);
    }

    #[test]
    fn double_resolution_fails() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        let mut ledger = PatchLedger::new();
        let site = ledger.reserve(&mut writer);
        ledger.resolve(&mut writer, site, 8).unwrap();
        assert!(matches!(
            ledger.resolve(&mut writer, site, 8),
            Err(CodecError::DoublePatch { site: 0 })
        ));
    }

    #[test]
    fn foreign_site_fails() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        let mut other = PatchLedger::new();
        writer.write(0u32);
        let site = other.reserve(&mut writer);

        let mut ledger = PatchLedger::new();
        assert!(matches!(
            ledger.resolve(&mut writer, site, 0),
            Err(CodecError::UnknownPatchSite { site: 4 })
        ));
    }

    #[test]
    fn strict_finish_rejects_open_sites() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        let mut ledger = PatchLedger::new();
        writer.write(0u64);
        let _ = ledger.reserve(&mut writer);
        let _ = ledger.reserve(&mut writer);
        assert!(matches!(
            ledger.finish(true),
            Err(CodecError::UnresolvedPatch { count: 2, first: 8 })
        ));
    }

    #[test]
    fn lenient_finish_leaves_zero_sentinel() {
        let mut buf = vec![0xFF; 4];
        let mut writer = ByteWriter::new(&mut buf);
        writer.seek_end();
        let mut ledger = PatchLedger::new();
        let _ = ledger.reserve(&mut writer);
        let stats = ledger.finish(false).unwrap();
        assert_eq!(stats.zeroed, 1);
        assert_eq!(&buf[4..], &[0u8; 8]);
    }

    #[test]
    fn table_slots_resolve_out_of_order() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        let mut ledger = PatchLedger::new();
        let table = ledger.reserve_table(&mut writer, 3);
        assert_eq!(table.len(), 3);
        assert_eq!(table.position(), Some(0));

        for index in [2, 0, 1] {
            let site = table.slot(index).unwrap();
            ledger.resolve(&mut writer, site, 100 + index as u64).unwrap();
        }
        ledger.finish(true).unwrap();

        let values: Vec<u64> = buf
            .chunks_exact(8)
            .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(values, vec![100, 101, 102]);
    }

    #[test]
    fn rereserving_open_site_counts_once() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        let mut ledger = PatchLedger::new();
        let first = ledger.reserve(&mut writer);
        writer.seek(0);
        let second = ledger.reserve(&mut writer);
        assert_eq!(first, second);
        ledger.resolve_here(&mut writer, second).unwrap();
        let stats = ledger.finish(true).unwrap();
        assert_eq!(stats.allocated, 1);
        assert_eq!(&buf[..8], &8u64.to_le_bytes());
    }

    #[test]
    fn sites_are_frame_relative() {
        let mut buf = vec![0u8; 16];
        let mut parent = ByteWriter::new(&mut buf);
        let mut child = parent.with_offset(16).unwrap();
        let mut ledger = PatchLedger::new();
        child.write(7u32);
        let site = ledger.reserve(&mut child);
        assert_eq!(site.position(), 4);
        ledger.resolve_here(&mut child, site).unwrap();
        drop(child);
        assert_eq!(&buf[20..28], &12u64.to_le_bytes());
    }
}
