//! On-disk framing for offset-relative asset formats.
//!
//! This crate handles the pieces of a file's layout that every format shares:
//! signatures and type tags, the common header, offset tables, decode limits,
//! and the chained XOR transform that protects text segments in some formats.
//! It does not know about pools, patching or any concrete record type.
//!
//! # Design Principles
//!
//! - **Bounded decoding** - Table counts are validated against limits before allocation.
//! - **No domain knowledge** - This crate handles framing, not field semantics.

pub mod cipher;
mod error;
mod header;
mod limits;
mod table;

pub use cipher::CipherGate;
pub use error::{LimitKind, WireError, WireResult};
pub use header::{expect_magic, peek_magic, CommonHeader, Magic};
pub use limits::Limits;
pub use table::{distinct_offsets, read_offset_table, SLOT_SIZE};
