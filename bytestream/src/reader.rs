//! Bounded reader over a borrowed byte slice.

use crate::error::{ByteError, ByteResult};
use crate::frame::Frame;
use crate::primitive::{IntEnum, Primitive};

/// A seekable, bounds-checked reader with a coordinate frame.
///
/// Every position accepted or returned by the reader is relative to its
/// frame origin. Reads never go past the hard bound (`end`), which defaults to
/// the slice length and can only be narrowed. Child readers created with
/// [`with_offset`](Self::with_offset) share the slice and inherit the bound.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    frame: Frame,
    end: usize,
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Opens a reader over `data` in the root frame.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            frame: Frame::ROOT,
            end: data.len(),
            pos: 0,
        }
    }

    /// Narrows the hard bound to `len` bytes past this frame's origin.
    pub fn with_limit(mut self, len: usize) -> ByteResult<Self> {
        let end = self.absolute(len, 0)?;
        self.end = end;
        if self.pos > end {
            self.pos = end;
        }
        Ok(self)
    }

    /// Returns a child reader whose position 0 maps to `base` in this frame.
    ///
    /// The child starts at its own position 0.
    pub fn with_offset(&self, base: usize) -> ByteResult<Self> {
        let origin = self.absolute(base, 0)?;
        let frame = self.frame.child(base).ok_or(ByteError::OutOfBounds {
            offset: self.frame.origin(),
            requested: base,
            available: self.end - self.frame.origin(),
        })?;
        Ok(Self {
            data: self.data,
            frame,
            end: self.end,
            pos: origin,
        })
    }

    /// The reader's coordinate frame.
    #[must_use]
    pub const fn frame(&self) -> Frame {
        self.frame
    }

    /// Current position relative to the frame origin.
    #[must_use]
    pub const fn tell(&self) -> usize {
        self.pos - self.frame.origin()
    }

    /// Current absolute position in the underlying slice.
    #[must_use]
    pub const fn absolute_position(&self) -> usize {
        self.pos
    }

    /// Number of readable bytes in this frame.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.frame.origin()
    }

    /// Returns `true` if the frame holds no readable bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes left between the current position and the hard bound.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// The readable bytes of this frame.
    #[must_use]
    pub fn frame_bytes(&self) -> &'a [u8] {
        &self.data[self.frame.origin()..self.end]
    }

    /// Moves to `pos` (frame-relative). Seeking exactly to the bound is allowed.
    pub fn seek(&mut self, pos: usize) -> ByteResult<()> {
        self.pos = self.absolute(pos, 0)?;
        Ok(())
    }

    /// Advances `n` bytes.
    pub fn skip(&mut self, n: usize) -> ByteResult<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Advances to the next multiple of `align` (frame-relative).
    pub fn align(&mut self, align: usize) -> ByteResult<()> {
        let pad = padding_for(self.tell(), align)?;
        self.skip(pad)
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
        self.seek(pos)?;
        let out = f(self);
        self.pos = saved;
        out
    }

    /// Reads a fixed-width value.
    pub fn read<T: Primitive>(&mut self) -> ByteResult<T> {
        let bytes = self.read_bytes(T::SIZE)?;
        Ok(T::from_le_slice(bytes))
    }

    /// Reads a fixed-width value at `pos` without moving.
    pub fn peek<T: Primitive>(&mut self, pos: usize) -> ByteResult<T> {
        self.jump_back(pos, Self::read::<T>)
    }

    /// Reads `count` consecutive fixed-width values.
    pub fn read_array<T: Primitive>(&mut self, count: usize) -> ByteResult<Vec<T>> {
        let total = count.checked_mul(T::SIZE).ok_or(ByteError::OutOfBounds {
            offset: self.pos,
            requested: usize::MAX,
            available: self.remaining(),
        })?;
        let bytes = self.read_bytes(total)?;
        Ok(bytes.chunks_exact(T::SIZE).map(T::from_le_slice).collect())
    }

    /// Reads an integer-backed enum.
    pub fn read_enum<E: IntEnum>(&mut self) -> ByteResult<E> {
        let offset = self.pos;
        let raw = self.read::<E::Repr>()?;
        E::from_repr(raw).ok_or(ByteError::InvalidDiscriminant {
            type_name: std::any::type_name::<E>(),
            offset,
        })
    }

    /// Reads `n` raw bytes without copying.
    pub fn read_bytes(&mut self, n: usize) -> ByteResult<&'a [u8]> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Reads a null-terminated UTF-16LE string.
    pub fn read_wstring(&mut self) -> ByteResult<String> {
        self.read_wstring_max(usize::MAX)
    }

    /// Reads a null-terminated UTF-16LE string of at most `max_units` code
    /// units, failing with [`ByteError::StringTooLong`] as soon as the limit
    /// is passed.
    pub fn read_wstring_max(&mut self, max_units: usize) -> ByteResult<String> {
        let offset = self.pos;
        let mut units = Vec::new();
        loop {
            if self.remaining() < 2 {
                return Err(ByteError::UnterminatedString { offset });
            }
            let unit = self.read::<u16>()?;
            if unit == 0 {
                break;
            }
            if units.len() == max_units {
                return Err(ByteError::StringTooLong {
                    offset,
                    limit: max_units,
                });
            }
            units.push(unit);
        }
        String::from_utf16(&units).map_err(|_| ByteError::InvalidUtf16 { offset })
    }

    /// Reads a null-terminated narrow string.
    pub fn read_astring(&mut self) -> ByteResult<String> {
        self.read_astring_max(usize::MAX)
    }

    /// Reads a null-terminated narrow string of at most `max_units` bytes,
    /// scanning no further than one byte past the limit.
    pub fn read_astring_max(&mut self, max_units: usize) -> ByteResult<String> {
        let offset = self.pos;
        let rest = &self.data[self.pos..self.end];
        let window = &rest[..rest.len().min(max_units.saturating_add(1))];
        let Some(len) = window.iter().position(|&b| b == 0) else {
            if window.len() < rest.len() {
                return Err(ByteError::StringTooLong {
                    offset,
                    limit: max_units,
                });
            }
            return Err(ByteError::UnterminatedString { offset });
        };
        let value = std::str::from_utf8(&window[..len])
            .map_err(|_| ByteError::InvalidUtf8 { offset })?
            .to_owned();
        self.pos += len + 1;
        Ok(value)
    }

    /// Reads a null-terminated UTF-16LE string at `pos` without moving.
    pub fn read_wstring_at(&mut self, pos: usize) -> ByteResult<String> {
        self.jump_back(pos, Self::read_wstring)
    }

    /// Reads a null-terminated narrow string at `pos` without moving.
    pub fn read_astring_at(&mut self, pos: usize) -> ByteResult<String> {
        self.jump_back(pos, Self::read_astring)
    }

    fn absolute(&self, pos: usize, len: usize) -> ByteResult<usize> {
        let abs = self
            .frame
            .to_absolute(pos)
            .filter(|abs| abs.checked_add(len).is_some_and(|e| e <= self.end));
        abs.ok_or(ByteError::OutOfBounds {
            offset: self.frame.origin().saturating_add(pos),
            requested: len,
            available: self.end.saturating_sub(self.frame.origin().saturating_add(pos)),
        })
    }

    fn ensure(&self, n: usize) -> ByteResult<()> {
        if n > self.remaining() {
            return Err(ByteError::OutOfBounds {
                offset: self.pos,
                requested: n,
                available: self.remaining(),
            });
        }
        Ok(())
    }
}

/// Bytes needed to move `pos` up to the next multiple of `align`.
pub(crate) fn padding_for(pos: usize, align: usize) -> ByteResult<usize> {
    if align == 0 {
        return Err(ByteError::InvalidAlignment { align });
    }
    Ok((align - pos % align) % align)
}
