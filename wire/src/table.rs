//! Offset tables: arrays of 8-byte offsets where zero means "absent".

use bytestream::ByteReader;

use crate::error::{LimitKind, WireError, WireResult};
use crate::limits::Limits;

/// Width of one offset table slot.
pub const SLOT_SIZE: usize = 8;

/// Reads `count` slots starting at `at` (frame-relative) without moving the reader.
///
/// Fails with a limits error before reading if `count` exceeds
/// [`Limits::max_table_entries`].
pub fn read_offset_table(
    reader: &mut ByteReader<'_>,
    at: usize,
    count: usize,
    limits: &Limits,
) -> WireResult<Vec<u64>> {
    limits.check(LimitKind::TableEntries, count)?;
    reader.jump_back(at, |r| r.read_array::<u64>(count).map_err(WireError::from))
}

/// Returns the distinct non-zero offsets of a table in first-seen order.
#[must_use]
pub fn distinct_offsets(table: &[u64]) -> Vec<u64> {
    let mut seen = std::collections::HashSet::new();
    table
        .iter()
        .copied()
        .filter(|&offset| offset != 0 && seen.insert(offset))
        .collect()
}
