//! Reference formats built on the codec.
//!
//! - [`msg`] is a localized message table whose entry layout grows across
//!   versions and whose string segment is encrypted in newer files.
//! - [`motlist`] is a motion list whose offset table points at embedded
//!   motion files, with slots that may be zero or shared.

pub mod motlist;
pub mod msg;

pub use motlist::{Bone, Mot, MotTree, MotionEntry, Motlist};
pub use msg::{AttributeDef, AttributeKind, AttributeValue, Entry, Msg};
