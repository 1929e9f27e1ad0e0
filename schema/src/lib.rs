//! Version ladders and layout descriptors for offset-relative binary formats.
//!
//! This crate describes how a record's bytes change across file revisions:
//! - [`VersionLadder`] maps a raw on-disk version number to the nearest known revision
//! - [`Layout`] lists a record's fields in order, each gated on the revision that introduced it
//! - [`Layout::check_additive`] verifies that newer revisions only add or widen fields
//!
//! # Design Principles
//!
//! - **Ordered comparison** - field gates compare with `>=`; equality is reserved for
//!   explicit single-revision cases.
//! - **Additive evolution** - a newer revision never drops or narrows a field an older
//!   revision emitted.
//! - **Descriptors only** - no bytes are read or written here; the codec crate walks layouts.

mod error;
mod layout;
mod version;

pub use error::{SchemaError, SchemaResult};
pub use layout::{Encoding, EncodingKind, FieldDef, Gate, Layout, LayoutBuilder};
pub use version::{Resolved, Threshold, VersionLadder};
