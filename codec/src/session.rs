//! Read and write sessions.
//!
//! A session carries the state one file (or one embedded sub-file) needs while
//! it is being decoded or encoded. Read sessions are light: configuration and
//! a few counters. Write sessions own the string pools, the patch ledger and
//! the open checkpoints, and [`WriteSession::finish`] checks that all of them
//! were settled.

use std::collections::BTreeMap;

use bytestream::{ByteReader, ByteWriter};
use schema::{Resolved, VersionLadder};
use tracing::{debug, warn};
use wire::{LimitKind, Limits};

use crate::config::CodecConfig;
use crate::error::{CodecError, CodecResult};
use crate::patch::{PatchLedger, PatchSite, PatchStats, PatchTable};
use crate::pool::{read_at, Ascii, AsciiPool, PendingRef, PoolEncoding, Wide, WidePool};

/// Resolves a raw version against `ladder`, logging when it falls back to an
/// older revision.
pub fn resolve_version(ladder: &VersionLadder, raw: u32) -> CodecResult<Resolved> {
    let resolved = ladder.resolve(raw)?;
    if !resolved.is_exact() {
        warn!(
            format = ladder.format(),
            raw,
            fallback = resolved.threshold.name,
            "unknown version, using nearest older layout"
        );
    }
    Ok(resolved)
}

/// Converts an on-disk offset to a cursor position.
pub fn position(offset: u64) -> CodecResult<usize> {
    usize::try_from(offset).map_err(|_| CodecError::OutOfBounds {
        offset: usize::MAX,
        requested: 0,
        available: 0,
    })
}

/// Fails with [`CodecError::CountMismatch`] unless two paired counts agree.
pub fn check_count(what: &'static str, expected: usize, found: usize) -> CodecResult<()> {
    if expected != found {
        return Err(CodecError::CountMismatch {
            what,
            expected,
            found,
        });
    }
    Ok(())
}

/// State for decoding one file.
#[derive(Debug)]
pub struct ReadSession {
    config: CodecConfig,
    strings_read: usize,
    tables_read: usize,
}

impl ReadSession {
    /// Creates a session.
    #[must_use]
    pub const fn new(config: CodecConfig) -> Self {
        Self {
            config,
            strings_read: 0,
            tables_read: 0,
        }
    }

    /// The session configuration.
    #[must_use]
    pub const fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// The decode limits.
    #[must_use]
    pub const fn limits(&self) -> &Limits {
        &self.config.limits
    }

    /// Opens an embedded sub-file whose position 0 is `base` in `reader`'s frame.
    ///
    /// Fails if the nesting would exceed the configured frame depth.
    pub fn embedded<'a>(&self, reader: &ByteReader<'a>, base: usize) -> CodecResult<ByteReader<'a>> {
        let child = reader.with_offset(base)?;
        self.config
            .limits
            .check(LimitKind::FrameDepth, child.frame().depth())?;
        Ok(child)
    }

    /// Reads an 8-byte offset table at `at` without moving the reader.
    pub fn offset_table(
        &mut self,
        reader: &mut ByteReader<'_>,
        at: usize,
        count: usize,
    ) -> CodecResult<Vec<u64>> {
        let table = wire::read_offset_table(reader, at, count, &self.config.limits)?;
        self.tables_read += 1;
        Ok(table)
    }

    /// Decodes the UTF-16 string at `offset`. A zero offset is the empty string.
    pub fn wstring_at(&mut self, reader: &mut ByteReader<'_>, offset: u64) -> CodecResult<String> {
        self.string_at::<Wide>(reader, offset)
    }

    /// Decodes the ASCII string at `offset`. A zero offset is the empty string.
    pub fn astring_at(&mut self, reader: &mut ByteReader<'_>, offset: u64) -> CodecResult<String> {
        self.string_at::<Ascii>(reader, offset)
    }

    /// Reads an 8-byte pooled reference and decodes the UTF-16 string it points at.
    pub fn read_wstring_ref(&mut self, reader: &mut ByteReader<'_>) -> CodecResult<String> {
        let offset = reader.read::<u64>()?;
        self.wstring_at(reader, offset)
    }

    /// Reads an 8-byte pooled reference and decodes the ASCII string it points at.
    pub fn read_astring_ref(&mut self, reader: &mut ByteReader<'_>) -> CodecResult<String> {
        let offset = reader.read::<u64>()?;
        self.astring_at(reader, offset)
    }

    /// Number of pooled strings decoded so far.
    #[must_use]
    pub const fn strings_read(&self) -> usize {
        self.strings_read
    }

    /// Number of offset tables read so far.
    #[must_use]
    pub const fn tables_read(&self) -> usize {
        self.tables_read
    }

    fn string_at<E: PoolEncoding>(
        &mut self,
        reader: &mut ByteReader<'_>,
        offset: u64,
    ) -> CodecResult<String> {
        let value = read_at::<E>(reader, offset, &self.config.limits)?;
        self.strings_read += 1;
        Ok(value)
    }
}

/// A position to come back to once a record's derived fields are known.
///
/// Obtained from [`WriteSession::checkpoint`] and consumed by
/// [`WriteSession::rewrite_at`].
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a checkpoint must be rewritten"]
pub struct Checkpoint {
    id: u64,
    at: usize,
}

impl Checkpoint {
    /// Frame-relative position of the checkpoint.
    pub const fn position(&self) -> usize {
        self.at
    }
}

/// Summary of a finished write session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Patch sites allocated.
    pub sites_allocated: usize,
    /// Patch sites resolved.
    pub sites_resolved: usize,
    /// Patch sites left at zero (non-strict sessions only).
    pub sites_zeroed: usize,
    /// Distinct UTF-16 strings pooled.
    pub wide_strings: usize,
    /// Distinct ASCII strings pooled.
    pub ascii_strings: usize,
}

/// State for encoding one file.
#[derive(Debug)]
pub struct WriteSession {
    config: CodecConfig,
    wide: WidePool,
    ascii: AsciiPool,
    ledger: PatchLedger,
    /// Open checkpoints by id; several may share a position.
    checkpoints: BTreeMap<u64, usize>,
    next_checkpoint: u64,
}

impl WriteSession {
    /// Creates a session.
    #[must_use]
    pub fn new(config: CodecConfig) -> Self {
        let empty = config.empty_strings;
        Self {
            config,
            wide: WidePool::new(empty),
            ascii: AsciiPool::new(empty),
            ledger: PatchLedger::new(),
            checkpoints: BTreeMap::new(),
            next_checkpoint: 0,
        }
    }

    /// A fresh session for an embedded sub-file, sharing this session's configuration.
    #[must_use]
    pub fn embedded(&self) -> Self {
        Self::new(self.config.clone())
    }

    /// The session configuration.
    #[must_use]
    pub const fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// The UTF-16 pool.
    pub fn wide_pool(&mut self) -> &mut WidePool {
        &mut self.wide
    }

    /// The ASCII pool.
    pub fn ascii_pool(&mut self) -> &mut AsciiPool {
        &mut self.ascii
    }

    /// Writes an 8-byte placeholder; see [`PatchLedger::reserve`].
    pub fn reserve(&mut self, writer: &mut ByteWriter<'_>) -> PatchSite {
        self.ledger.reserve(writer)
    }

    /// Writes `count` placeholders for an offset table.
    pub fn reserve_table(&mut self, writer: &mut ByteWriter<'_>, count: usize) -> PatchTable {
        self.ledger.reserve_table(writer, count)
    }

    /// Patches `site` with `offset`.
    pub fn resolve(
        &mut self,
        writer: &mut ByteWriter<'_>,
        site: PatchSite,
        offset: u64,
    ) -> CodecResult<()> {
        self.ledger.resolve(writer, site, offset)
    }

    /// Patches `site` with the writer's current position.
    pub fn resolve_here(&mut self, writer: &mut ByteWriter<'_>, site: PatchSite) -> CodecResult<()> {
        self.ledger.resolve_here(writer, site)
    }

    /// Writes a placeholder referencing `value` in the UTF-16 pool.
    pub fn wide_ref(&mut self, writer: &mut ByteWriter<'_>, value: &str) -> PendingRef {
        self.wide.reference(writer, &mut self.ledger, value)
    }

    /// Writes a placeholder referencing `value` in the ASCII pool.
    pub fn ascii_ref(&mut self, writer: &mut ByteWriter<'_>, value: &str) -> PendingRef {
        self.ascii.reference(writer, &mut self.ledger, value)
    }

    /// Emits the UTF-16 pool at the writer's position and patches its references.
    pub fn flush_wide(&mut self, writer: &mut ByteWriter<'_>) -> CodecResult<usize> {
        let written = self.wide.flush(writer)?;
        self.wide.flush_offsets(writer, &mut self.ledger)?;
        Ok(written)
    }

    /// Emits the ASCII pool at the writer's position and patches its references.
    pub fn flush_ascii(&mut self, writer: &mut ByteWriter<'_>) -> CodecResult<usize> {
        let written = self.ascii.flush(writer)?;
        self.ascii.flush_offsets(writer, &mut self.ledger)?;
        Ok(written)
    }

    /// Marks the writer's position for a later [`rewrite_at`](Self::rewrite_at).
    pub fn checkpoint(&mut self, writer: &ByteWriter<'_>) -> Checkpoint {
        let at = writer.tell();
        let id = self.next_checkpoint;
        self.next_checkpoint += 1;
        self.checkpoints.insert(id, at);
        Checkpoint { id, at }
    }

    /// Runs `f` at the checkpoint's position and restores the writer's
    /// position afterwards.
    pub fn rewrite_at<R>(
        &mut self,
        writer: &mut ByteWriter<'_>,
        checkpoint: Checkpoint,
        f: impl FnOnce(&mut ByteWriter<'_>, &mut Self) -> CodecResult<R>,
    ) -> CodecResult<R> {
        self.checkpoints.remove(&checkpoint.id);
        writer.jump_back(checkpoint.at, |w| f(w, self))
    }

    /// Ends the session.
    ///
    /// Checks, in order, that both pools were flushed, that every checkpoint
    /// was rewritten, and that every patch site was resolved. In a strict
    /// session the first failure is returned. Otherwise failures are logged
    /// and unresolved sites keep their zero placeholder.
    pub fn finish(self) -> CodecResult<WriteReport> {
        let strict = self.config.strict_patches;
        for (pool, pending) in [
            (Wide::NAME, self.wide.unflushed().max(self.wide.pending_sites())),
            (Ascii::NAME, self.ascii.unflushed().max(self.ascii.pending_sites())),
        ] {
            if pending > 0 {
                if strict {
                    return Err(CodecError::PoolNotFlushed { pool, pending });
                }
                warn!(pool, pending, "string pool not flushed");
            }
        }
        if let Some((_, &at)) = self.checkpoints.first_key_value() {
            if strict {
                return Err(CodecError::OpenCheckpoint { at });
            }
            warn!(
                count = self.checkpoints.len(),
                first = at,
                "checkpoints never rewritten"
            );
        }
        let PatchStats {
            allocated,
            resolved,
            zeroed,
        } = self.ledger.finish(strict)?;
        let report = WriteReport {
            sites_allocated: allocated,
            sites_resolved: resolved,
            sites_zeroed: zeroed,
            wide_strings: self.wide.len(),
            ascii_strings: self.ascii.len(),
        };
        debug!(?report, "write session finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::Threshold;

    const LADDER: &[Threshold] = &[Threshold::new(12, "v12"), Threshold::new(15, "v15")];

    #[test]
    fn version_fallback_and_rejection() {
        let ladder = VersionLadder::new("demo", LADDER).unwrap();
        assert_eq!(resolve_version(&ladder, 14).unwrap().layout_version(), 12);
        assert!(matches!(
            resolve_version(&ladder, 3),
            Err(CodecError::UnknownVersionField { raw: 3, lowest: 12, .. })
        ));
    }

    #[test]
    fn count_check() {
        check_count("names", 2, 2).unwrap();
        assert!(matches!(
            check_count("names", 2, 3),
            Err(CodecError::CountMismatch {
                what: "names",
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn embedded_depth_is_limited() {
        let data = [0u8; 64];
        let session = ReadSession::new(CodecConfig::for_testing());
        let mut reader = ByteReader::new(&data);
        for _ in 0..session.limits().max_frame_depth {
            reader = session.embedded(&reader, 1).unwrap();
        }
        assert!(matches!(
            session.embedded(&reader, 1),
            Err(CodecError::LimitsExceeded {
                kind: LimitKind::FrameDepth,
                ..
            })
        ));
    }

    #[test]
    fn pooled_strings_roundtrip_through_sessions() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        let mut session = WriteSession::new(CodecConfig::for_testing());
        session.wide_ref(&mut writer, "alpha");
        session.ascii_ref(&mut writer, "beta");
        session.wide_ref(&mut writer, "alpha");
        session.flush_wide(&mut writer).unwrap();
        session.flush_ascii(&mut writer).unwrap();
        let report = session.finish().unwrap();
        assert_eq!(report.sites_allocated, 3);
        assert_eq!(report.sites_resolved, 3);
        assert_eq!(report.wide_strings, 1);
        assert_eq!(report.ascii_strings, 1);

        let mut reader = ByteReader::new(&buf);
        let mut session = ReadSession::new(CodecConfig::for_testing());
        assert_eq!(session.read_wstring_ref(&mut reader).unwrap(), "alpha");
        assert_eq!(session.read_astring_ref(&mut reader).unwrap(), "beta");
        assert_eq!(session.read_wstring_ref(&mut reader).unwrap(), "alpha");
        assert_eq!(session.strings_read(), 3);
    }

    #[test]
    fn finish_requires_flushed_pools() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        let mut session = WriteSession::new(CodecConfig::for_testing());
        session.wide_ref(&mut writer, "never flushed");
        assert!(matches!(
            session.finish(),
            Err(CodecError::PoolNotFlushed { pool: "wide", .. })
        ));
    }

    #[test]
    fn rewrite_at_patches_header_after_body() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        let mut session = WriteSession::new(CodecConfig::for_testing());

        let checkpoint = session.checkpoint(&writer);
        writer.write(0u32); // size, known after the body
        writer.write_bytes(&[1, 2, 3, 4, 5]);
        let size = writer.tell() as u32;
        session
            .rewrite_at(&mut writer, checkpoint, |w, _| {
                w.write(size);
                Ok(())
            })
            .unwrap();
        assert_eq!(writer.tell(), 9);
        session.finish().unwrap();
        assert_eq!(&buf[..4], &9u32.to_le_bytes());
    }

    #[test]
    fn open_checkpoint_is_reported() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        writer.write(0u16);
        let mut session = WriteSession::new(CodecConfig::for_testing());
        let _checkpoint = session.checkpoint(&writer);
        assert!(matches!(
            session.finish(),
            Err(CodecError::OpenCheckpoint { at: 2 })
        ));
    }

    #[test]
    fn checkpoints_at_one_position_are_tracked_separately() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        let mut session = WriteSession::new(CodecConfig::for_testing());
        let outer = session.checkpoint(&writer);
        let inner = session.checkpoint(&writer);
        assert_eq!(outer.position(), inner.position());
        assert_ne!(outer, inner);
        writer.write(0u32);
        session
            .rewrite_at(&mut writer, outer, |w, _| {
                w.write(4u32);
                Ok(())
            })
            .unwrap();
        assert!(matches!(
            session.finish(),
            Err(CodecError::OpenCheckpoint { at: 0 })
        ));
    }

    #[test]
    fn lenient_session_degrades_to_zero() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        let config = CodecConfig::for_testing().with_strict_patches(false);
        let mut session = WriteSession::new(config);
        let _site = session.reserve(&mut writer);
        let report = session.finish().unwrap();
        assert_eq!(report.sites_zeroed, 1);
        assert_eq!(buf, vec![0u8; 8]);
    }
}
