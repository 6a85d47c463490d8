//! Parsing of the per-video `entry.json` descriptor.
//!
//! The descriptor is a vendor format that drifts between client versions, so
//! parsing never panics and never fails the run: [`parse`] either returns a
//! normalised [`EntryDescriptor`] or an [`ErrorKind`] explaining why the
//! entry's metadata is unavailable, and the caller falls back to naming the
//! entry after its directory.

pub mod error;
mod lenient;
pub mod models;
mod parse;

pub use crate::models::{EntryDescriptor, NAME_SEPARATOR, Schema};
pub use crate::parse::parse;

/// File name of the descriptor inside an entry directory.
pub const DESCRIPTOR_FILE_NAME: &str = "entry.json";
