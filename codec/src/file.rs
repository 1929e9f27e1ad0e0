//! Whole-file entry points.

use std::fs;
use std::path::Path;

use bytestream::{ByteReader, ByteWriter};
use tracing::debug;
use wire::LimitKind;

use crate::config::CodecConfig;
use crate::error::{CodecError, CodecResult};
use crate::record::Record;
use crate::session::{ReadSession, WriteReport, WriteSession};

/// Decodes a whole file held in memory.
///
/// Errors abort the read; no partial record is returned.
pub fn decode<R: Record>(bytes: &[u8], config: &CodecConfig) -> CodecResult<R> {
    config.limits.check(LimitKind::FileBytes, bytes.len())?;
    let mut session = ReadSession::new(config.clone());
    let mut reader = ByteReader::new(bytes);
    debug!(
        record = std::any::type_name::<R>(),
        len = bytes.len(),
        "decode started"
    );
    let record = R::read(&mut reader, &mut session)?;
    debug!(
        strings = session.strings_read(),
        tables = session.tables_read(),
        "decode finished"
    );
    Ok(record)
}

/// Encodes a record into a new buffer.
pub fn encode<R: Record>(record: &R, config: &CodecConfig) -> CodecResult<Vec<u8>> {
    encode_with_report(record, config).map(|(bytes, _)| bytes)
}

/// Encodes a record into a new buffer and returns the session summary with it.
pub fn encode_with_report<R: Record>(
    record: &R,
    config: &CodecConfig,
) -> CodecResult<(Vec<u8>, WriteReport)> {
    let mut buf = Vec::new();
    let mut session = WriteSession::new(config.clone());
    let mut writer = ByteWriter::new(&mut buf);
    debug!(record = std::any::type_name::<R>(), "encode started");
    record.write(&mut writer, &mut session)?;
    let report = session.finish()?;
    Ok((buf, report))
}

/// Reads and decodes the file at `path`.
pub fn decode_path<R: Record>(path: impl AsRef<Path>, config: &CodecConfig) -> CodecResult<R> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| CodecError::io(path, source))?;
    decode(&bytes, config)
}

/// Encodes `record` and writes it to `path`.
pub fn encode_path<R: Record>(
    path: impl AsRef<Path>,
    record: &R,
    config: &CodecConfig,
) -> CodecResult<WriteReport> {
    let path = path.as_ref();
    let (bytes, report) = encode_with_report(record, config)?;
    fs::write(path, bytes).map_err(|source| CodecError::io(path, source))?;
    Ok(report)
}
