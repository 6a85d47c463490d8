//! Finds the entries of a download cache and converts each into an audio file.
//!
//! - [`scan`] groups the files of a [`StorageBackend`](bilicache_storage::StorageBackend)
//!   into [`CacheEntry`]s and resolves their metadata.
//! - [`NameGenerator`] turns an entry into a filesystem-safe output name.
//! - [`convert`] runs each entry through fragment selection, header repair
//!   and the transcoder, reporting one [`EntryReport`] per entry.

pub mod convert;
pub mod error;
mod naming;
mod report;
pub mod scan;

pub use crate::convert::{Context, ConvertEvent, OnExisting, convert, convert_entry};
pub use crate::naming::{DEFAULT_TEMPLATE, NameGenerator, Names, sanitize};
pub use crate::report::{EntryReport, Outcome, Summary};
pub use crate::scan::{CacheEntry, MetadataState, ScanEvent, scan};
