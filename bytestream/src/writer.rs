//! Growable writer over a borrowed byte vector.

use crate::error::{ByteError, ByteResult};
use crate::frame::Frame;
use crate::primitive::{IntEnum, Primitive};
use crate::reader::padding_for;

/// A seekable writer with a coordinate frame.
///
/// The writer borrows a `Vec<u8>` so that child frames created with
/// [`with_offset`](Self::with_offset) write into the same storage as their
/// parent. Writing past the current end grows the buffer, zero-filling any gap
/// left by an earlier seek. Writing inside the buffer overwrites in place.
#[derive(Debug)]
pub struct ByteWriter<'a> {
    buf: &'a mut Vec<u8>,
    frame: Frame,
    pos: usize,
}

impl<'a> ByteWriter<'a> {
    /// Opens a writer over `buf` in the root frame, positioned at 0.
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        Self {
            buf,
            frame: Frame::ROOT,
            pos: 0,
        }
    }

    /// Returns a child writer whose position 0 maps to `base` in this frame.
    ///
    /// The child borrows this writer's storage; the parent can be used again
    /// once the child is dropped. The parent's position is not changed.
    /// Fails if the child's origin would not fit in `usize`.
    pub fn with_offset(&mut self, base: usize) -> ByteResult<ByteWriter<'_>> {
        let origin = self.frame.origin();
        let frame = self.frame.child(base).ok_or(ByteError::OutOfBounds {
            offset: origin,
            requested: base,
            available: usize::MAX - origin,
        })?;
        Ok(ByteWriter {
            buf: &mut *self.buf,
            frame,
            pos: frame.origin(),
        })
    }

    /// The writer's coordinate frame.
    #[must_use]
    pub const fn frame(&self) -> Frame {
        self.frame
    }

    /// Current position relative to the frame origin.
    #[must_use]
    pub const fn tell(&self) -> usize {
        self.frame.to_relative(self.pos)
    }

    /// Current absolute position in the underlying buffer.
    #[must_use]
    pub const fn absolute_position(&self) -> usize {
        self.pos
    }

    /// Bytes written so far past this frame's origin.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frame.to_relative(self.buf.len())
    }

    /// Returns `true` if nothing has been written in this frame.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The bytes of this frame written so far.
    #[must_use]
    pub fn frame_bytes(&self) -> &[u8] {
        let start = self.frame.origin().min(self.buf.len());
        &self.buf[start..]
    }

    /// Mutable access to the bytes of this frame written so far.
    pub fn frame_bytes_mut(&mut self) -> &mut [u8] {
        let start = self.frame.origin().min(self.buf.len());
        &mut self.buf[start..]
    }

    /// Moves to `pos` (frame-relative). Writes are unbounded, so any position is valid.
    pub fn seek(&mut self, pos: usize) {
        self.pos = self.frame.origin().saturating_add(pos);
    }

    /// Moves to the end of the data written so far.
    pub fn seek_end(&mut self) {
        self.pos = self.buf.len().max(self.frame.origin());
    }

    /// Advances `n` bytes, zero-filling any part of the gap past the current end.
    ///
    /// Existing bytes inside the gap are left untouched.
    pub fn skip(&mut self, n: usize) {
        let end = self.pos.saturating_add(n);
        if end > self.buf.len() {
            self.buf.resize(end, 0);
        }
        self.pos = end;
    }

    /// Advances to the next multiple of `align` (frame-relative), writing zeros over the gap.
    pub fn align(&mut self, align: usize) -> ByteResult<()> {
        let pad = padding_for(self.tell(), align)?;
        self.fill(0, pad);
        Ok(())
    }

    /// Writes `n` copies of `byte`.
    pub fn fill(&mut self, byte: u8, n: usize) {
        let range = self.reserve(n);
        self.buf[range].fill(byte);
    }

    /// Runs `f` at `pos` and restores the current position afterwards,
    /// whether `f` succeeds or fails.
    pub fn jump_back<R, E>(
        &mut self,
        pos: usize,
        f: impl FnOnce(&mut Self) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<ByteError>,
    {
        let saved = self.pos;
        self.seek(pos);
        let out = f(self);
        self.pos = saved;
        out
    }

    /// Overwrites the value at `pos` without moving.
    pub fn patch<T: Primitive>(&mut self, pos: usize, value: T) {
        let saved = self.pos;
        self.seek(pos);
        self.write(value);
        self.pos = saved;
    }

    /// Writes a fixed-width value.
    pub fn write<T: Primitive>(&mut self, value: T) {
        let range = self.reserve(T::SIZE);
        value.put_le_slice(&mut self.buf[range]);
    }

    /// Writes consecutive fixed-width values.
    pub fn write_array<T: Primitive>(&mut self, values: &[T]) {
        for &value in values {
            self.write(value);
        }
    }

    /// Writes an integer-backed enum.
    pub fn write_enum<E: IntEnum>(&mut self, value: E) {
        self.write(value.to_repr());
    }

    /// Writes raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let range = self.reserve(bytes.len());
        self.buf[range].copy_from_slice(bytes);
    }

    /// Writes a null-terminated UTF-16LE string.
    pub fn write_wstring(&mut self, value: &str) {
        for unit in value.encode_utf16() {
            self.write(unit);
        }
        self.write(0u16);
    }

    /// Writes a null-terminated ASCII string.
    pub fn write_astring(&mut self, value: &str) -> ByteResult<()> {
        if !value.is_ascii() {
            return Err(ByteError::NonAscii {
                value: value.to_owned(),
            });
        }
        self.write_bytes(value.as_bytes());
        self.write(0u8);
        Ok(())
    }

    /// Makes `n` bytes at the current position addressable and advances past them.
    fn reserve(&mut self, n: usize) -> std::ops::Range<usize> {
        let start = self.pos;
        let end = start.saturating_add(n);
        if end > self.buf.len() {
            self.buf.resize(end, 0);
        }
        self.pos = end;
        start..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_writer() {
        let mut buf = Vec::new();
        let writer = ByteWriter::new(&mut buf);
        assert!(writer.is_empty());
        assert_eq!(writer.tell(), 0);
    }

    #[test]
    fn write_typed_little_endian() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        writer.write(0x1234_5678u32);
        writer.write(-1i8);
        assert_eq!(writer.tell(), 5);
        assert_eq!(buf, vec![0x78, 0x56, 0x34, 0x12, 0xFF]);
    }

    #[test]
    fn overwrite_in_place_keeps_length() {
        let mut buf = vec![0u8; 8];
        let mut writer = ByteWriter::new(&mut buf);
        writer.seek(2);
        writer.write(0xABu8);
        assert_eq!(writer.len(), 8);
        assert_eq!(buf[2], 0xAB);
    }

    #[test]
    fn seek_past_end_then_write_zero_fills() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        writer.seek(3);
        writer.write(7u8);
        assert_eq!(buf, vec![0, 0, 0, 7]);
    }

    #[test]
    fn skip_extends_but_preserves() {
        let mut buf = vec![9u8, 9];
        let mut writer = ByteWriter::new(&mut buf);
        writer.skip(4);
        assert_eq!(writer.tell(), 4);
        assert_eq!(buf, vec![9, 9, 0, 0]);
    }

    #[test]
    fn align_zero_fills_gap() {
        let mut buf = vec![0xFFu8; 32];
        let mut writer = ByteWriter::new(&mut buf);
        writer.seek(5);
        writer.align(16).unwrap();
        assert_eq!(writer.tell(), 16);
        assert!(buf[5..16].iter().all(|&b| b == 0));
        assert_eq!(buf[4], 0xFF);
        assert_eq!(buf[16], 0xFF);
    }

    #[test]
    fn fill_writes_bytes() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        writer.fill(0xCD, 3);
        assert_eq!(buf, vec![0xCD; 3]);
    }

    #[test]
    fn jump_back_restores_position() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        writer.write(0u64);
        writer.write(1u32);
        writer
            .jump_back(0, |w| {
                w.write(0xAAu64);
                Ok::<_, ByteError>(())
            })
            .unwrap();
        assert_eq!(writer.tell(), 12);

        let err = writer
            .jump_back(4, |w| w.write_astring("é"))
            .unwrap_err();
        assert!(matches!(err, ByteError::NonAscii { .. }));
        assert_eq!(writer.tell(), 12);
        assert_eq!(&buf[..8], &0xAAu64.to_le_bytes());
    }

    #[test]
    fn patch_does_not_move() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        writer.write(0u32);
        writer.write(0u32);
        writer.patch(0, 0xDEADu32);
        assert_eq!(writer.tell(), 8);
        assert_eq!(&buf[..4], &0xDEADu32.to_le_bytes());
    }

    #[test]
    fn child_origin_overflow_is_rejected() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        let mut far = writer.with_offset(usize::MAX).unwrap();
        assert!(matches!(
            far.with_offset(1),
            Err(ByteError::OutOfBounds {
                offset: usize::MAX,
                requested: 1,
                available: 0,
            })
        ));
        assert_eq!(far.frame().origin(), usize::MAX);
        assert!(buf.is_empty());
    }

    #[test]
    fn child_frame_writes_into_parent_storage() {
        let mut buf = Vec::new();
        let mut outer = ByteWriter::new(&mut buf);
        outer.write(0xFFFF_FFFFu32);
        {
            let mut inner = outer.with_offset(8).unwrap();
            assert_eq!(inner.tell(), 0);
            inner.write(1u16);
            inner.write_wstring("a");
            // The child's patches are relative to its own origin.
            inner.patch(0, 2u16);
            assert_eq!(inner.tell(), 6);
            assert_eq!(inner.len(), 6);
        }
        assert_eq!(outer.tell(), 4);
        outer.seek_end();
        assert_eq!(outer.tell(), 14);
        assert_eq!(&buf[4..8], &[0, 0, 0, 0]);
        assert_eq!(&buf[8..14], &[2, 0, b'a', 0, 0, 0]);
    }

    #[test]
    fn strings() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        writer.write_wstring("hi");
        writer.write_astring("ok").unwrap();
        assert_eq!(buf, vec![b'h', 0, b'i', 0, 0, 0, b'o', b'k', 0]);
    }

    #[test]
    fn arrays_and_vectors() {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        writer.write_array(&[[1u16, 2], [3, 4]]);
        writer.write([0.0f32; 3]);
        assert_eq!(buf.len(), 8 + 12);
        assert_eq!(&buf[..8], &[1, 0, 2, 0, 3, 0, 4, 0]);
    }
}
