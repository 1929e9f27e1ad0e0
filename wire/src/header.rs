//! Signatures, type tags and the common file header.

use std::fmt;

use bytestream::{ByteReader, ByteWriter};

use crate::error::{WireError, WireResult};

/// A four-byte signature, stored in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Magic([u8; 4]);

impl Magic {
    /// Creates a signature from its bytes in file order.
    #[must_use]
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Creates a signature from a little-endian `u32`.
    #[must_use]
    pub const fn from_u32(raw: u32) -> Self {
        Self(raw.to_le_bytes())
    }

    /// The signature bytes in file order.
    #[must_use]
    pub const fn bytes(self) -> [u8; 4] {
        self.0
    }

    /// The signature as a little-endian `u32`.
    #[must_use]
    pub const fn to_u32(self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    /// Reads a signature at the current position.
    pub fn read(reader: &mut ByteReader<'_>) -> WireResult<Self> {
        Ok(Self(reader.read::<[u8; 4]>()?))
    }

    /// Writes the signature at the current position.
    pub fn write(self, writer: &mut ByteWriter<'_>) {
        writer.write(self.0);
    }
}

impl fmt::Display for Magic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            for &b in &self.0 {
                write!(f, "{}", char::from(b))?;
            }
            Ok(())
        } else {
            write!(f, "0x")?;
            for &b in &self.0 {
                write!(f, "{b:02X}")?;
            }
            Ok(())
        }
    }
}

/// Reads a signature and fails with [`WireError::MagicMismatch`] unless it equals `expected`.
pub fn expect_magic(reader: &mut ByteReader<'_>, expected: Magic) -> WireResult<()> {
    let offset = reader.absolute_position();
    let found = Magic::read(reader)?;
    if found != expected {
        return Err(WireError::MagicMismatch {
            expected,
            found,
            offset,
        });
    }
    Ok(())
}

/// Reads the type tag at `at` (frame-relative) without moving the reader.
pub fn peek_magic(reader: &mut ByteReader<'_>, at: usize) -> WireResult<Magic> {
    reader.jump_back(at, Magic::read)
}

/// The header shared by most formats: version, signature, and the location
/// and length of the primary offset table.
///
/// Layout (24 bytes): `version: u32`, `magic: [u8; 4]`, `table_offset: u64`,
/// `count: u32`, 4 reserved bytes written as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonHeader {
    pub version: u32,
    pub magic: Magic,
    pub table_offset: u64,
    pub count: u32,
}

impl CommonHeader {
    /// Encoded size in bytes.
    pub const SIZE: usize = 24;

    /// Position of `table_offset` relative to the header start.
    pub const TABLE_OFFSET_AT: usize = 8;

    /// Reads a header and validates its signature.
    pub fn read(reader: &mut ByteReader<'_>, expected: Magic) -> WireResult<Self> {
        let version = reader.read::<u32>()?;
        expect_magic(reader, expected)?;
        let table_offset = reader.read::<u64>()?;
        let count = reader.read::<u32>()?;
        reader.skip(4)?;
        Ok(Self {
            version,
            magic: expected,
            table_offset,
            count,
        })
    }

    /// Writes the header at the current position.
    pub fn write(&self, writer: &mut ByteWriter<'_>) {
        writer.write(self.version);
        self.magic.write(writer);
        writer.write(self.table_offset);
        writer.write(self.count);
        writer.fill(0, 4);
    }
}
