//! Pools, patching and shared-object resolution for offset-relative formats.
//!
//! This is the main codec crate that ties together bytestream, wire and schema
//! into the machinery format modules are written against.
//!
//! # Features
//!
//! - String interning pools (UTF-16 and ASCII) with deferred offset patching
//! - A patch ledger that checks every forward reference gets resolved
//! - Checkpoints for rewriting a record once its derived fields are known
//! - Read/write resolvers for offset tables whose slots alias one object
//! - A generic routine that reads and writes records from layout descriptors
//! - Whole-file `decode`/`encode` entry points
//!
//! # Design Principles
//!
//! - **Frame-relative** - Every offset a session records is relative to its writer's frame.
//! - **Fail loudly** - Patch bookkeeping mistakes are errors in strict sessions.
//! - **Identity, not equality** - Shared objects are deduplicated by address.

mod config;
mod error;
mod file;
pub mod layout;
mod patch;
mod pool;
mod record;
mod resolver;
mod session;

pub use config::{CodecConfig, EmptyString};
pub use error::{CodecError, CodecResult};
pub use file::{decode, decode_path, encode, encode_path, encode_with_report};
pub use layout::{read_fields, write_fields, FieldSites, Fields, Value};
pub use patch::{PatchLedger, PatchSite, PatchStats, PatchTable};
pub use pool::{read_at, Ascii, AsciiPool, PendingRef, PoolEncoding, StringPool, Wide, WidePool};
pub use record::Record;
pub use resolver::{read_ref_table, write_ref_table, ReadResolver, Ref, WriteResolver};
pub use session::{
    check_count, position, resolve_version, Checkpoint, ReadSession, WriteReport,
    WriteSession,
};
pub use wire::Limits as WireLimits;
