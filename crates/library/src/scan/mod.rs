//! Cache discovery.
//!
//! The mobile client lays its downloads out as
//! `<avid>/<c_cid>/<quality>/{audio,video}.m4s` (or `<avid>/<c_cid>/lua.flv…/N.blv`
//! for older downloads), with `entry.json` next to the quality directory.
//! Grouping files into entries is a pure function ([`discover`]) over the
//! listing, so results don't depend on directory iteration order; [`scan`]
//! wraps it with the I/O: listing the backend and reading descriptors.

mod discover;
pub(crate) mod error;
mod models;
mod stream;

pub use self::discover::{Discovery, FoundEntry, SkippedEntry, discover};
pub use self::error::ErrorKind;
pub use self::models::{CacheEntry, MetadataState};
pub use self::stream::{ScanEvent, scan};
