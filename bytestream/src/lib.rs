//! Offset-relative byte cursors for binary asset formats.
//!
//! This crate provides [`ByteReader`] and [`ByteWriter`]: seekable cursors whose
//! positions are measured against a [`Frame`] origin. A child frame created with
//! `with_offset` maps its position 0 onto a base offset in the parent, so an
//! embedded file can be read or written with its own internal offsets while
//! sharing the parent's storage.
//!
//! # Design Principles
//!
//! - **No unsafe code** - Safety is paramount.
//! - **Bounded reads** - Every read and seek is checked against a hard bound.
//! - **Unbounded writes** - Writers grow the buffer and zero-fill gaps.
//! - **No domain knowledge** - This crate knows nothing about pools, patches or formats.
//!
//! # Example
//!
//! ```
//! use bytestream::{ByteReader, ByteWriter};
//!
//! let mut buf = Vec::new();
//! let mut writer = ByteWriter::new(&mut buf);
//! writer.write(0u64); // placeholder
//! writer.write_wstring("name");
//! writer.patch(0, 8u64);
//!
//! let mut reader = ByteReader::new(&buf);
//! let offset = reader.read::<u64>().unwrap() as usize;
//! assert_eq!(reader.read_wstring_at(offset).unwrap(), "name");
//! ```

mod error;
mod frame;
mod primitive;
mod reader;
mod writer;

pub use error::{ByteError, ByteResult};
pub use frame::Frame;
pub use primitive::{IntEnum, Primitive};
pub use reader::ByteReader;
pub use writer::ByteWriter;
