//! Chained XOR transform for protected text segments.
//!
//! Each byte is XORed with the key byte for its position and with the
//! *ciphertext* byte before it (zero before the first byte). Both directions
//! are single sequential passes done in place: position `i` depends on the
//! final ciphertext value at `i - 1`, so the passes cannot be split across
//! threads. Positions are relative to the start of the transformed region.

use bytestream::ByteError;

use crate::error::WireResult;

/// The fixed key table.
pub const KEY: [u8; 16] = [
    0xCF, 0xCE, 0xFB, 0xF8, 0xEC, 0x0A, 0x33, 0x66, 0x93, 0xA9, 0x1D, 0x93, 0x50, 0x39, 0x5F, 0x09,
];

/// Decrypts `buf` in place.
pub fn decrypt(buf: &mut [u8]) {
    let mut prev = 0u8;
    for (i, byte) in buf.iter_mut().enumerate() {
        let cipher = *byte;
        *byte = cipher ^ prev ^ KEY[i % KEY.len()];
        prev = cipher;
    }
}

/// Encrypts `buf` in place.
pub fn encrypt(buf: &mut [u8]) {
    let mut prev = 0u8;
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte ^= prev ^ KEY[i % KEY.len()];
        prev = *byte;
    }
}

/// Decrypts everything from `start` to the end of `buf`.
pub fn decrypt_segment(buf: &mut [u8], start: usize) -> WireResult<()> {
    decrypt(segment(buf, start)?);
    Ok(())
}

/// Encrypts everything from `start` to the end of `buf`.
pub fn encrypt_segment(buf: &mut [u8], start: usize) -> WireResult<()> {
    encrypt(segment(buf, start)?);
    Ok(())
}

fn segment(buf: &mut [u8], start: usize) -> WireResult<&mut [u8]> {
    let len = buf.len();
    buf.get_mut(start..).ok_or_else(|| {
        ByteError::OutOfBounds {
            offset: start,
            requested: 0,
            available: len,
        }
        .into()
    })
}

/// Version gate for the transform: segments are protected only when the
/// format version is strictly greater than `above`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherGate {
    pub above: u32,
}

impl CipherGate {
    /// Creates a gate that protects versions greater than `above`.
    #[must_use]
    pub const fn above(above: u32) -> Self {
        Self { above }
    }

    /// Returns `true` if files of `version` carry a protected segment.
    #[must_use]
    pub const fn applies(self, version: u32) -> bool {
        version > self.above
    }
}
