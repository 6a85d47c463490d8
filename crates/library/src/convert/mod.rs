//! The conversion pipeline.
//!
//! Every [`CacheEntry`](crate::CacheEntry) goes through the same stages:
//! output naming, [fragment selection](bilicache_fragment::select), header
//! repair and finally the [`Transcoder`](bilicache_transcode::Transcoder),
//! which writes into a hidden temporary file that is only renamed into place
//! once it holds a non-empty result.
//!
//! [`convert_entry`] drives a single entry; [`convert`] runs a whole scan's
//! worth of entries through a bounded worker pool, isolating failures so one
//! broken entry never stops the rest.

mod entry;
pub mod error;
mod stream;

pub use self::entry::convert_entry;
pub use self::stream::{ConvertEvent, convert};
use crate::naming::NameGenerator;
use bilicache_fragment::HeaderPatcher;
use bilicache_transcode::TranscoderHandle;
use std::path::PathBuf;

/// What to do when the output file of an entry already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnExisting {
    #[default]
    Overwrite,
    /// Leave the existing file alone and report the entry as skipped.
    Skip,
}

/// Everything a conversion run needs besides the cache itself.
pub struct Context {
    pub transcoder: TranscoderHandle,
    pub patcher: HeaderPatcher,
    pub names: NameGenerator,
    /// Directory the audio files are written to. Must exist.
    pub output: PathBuf,
    pub existing: OnExisting,
    /// Maximum number of entries converted at once.
    pub jobs: usize,
}
impl Context {
    pub fn new(transcoder: TranscoderHandle, output: impl Into<PathBuf>) -> Self {
        Self {
            transcoder,
            patcher: HeaderPatcher::default(),
            names: NameGenerator::default(),
            output: output.into(),
            existing: OnExisting::default(),
            jobs: 1,
        }
    }

    pub fn with_patcher(mut self, patcher: HeaderPatcher) -> Self {
        self.patcher = patcher;
        self
    }

    pub fn with_names(mut self, names: NameGenerator) -> Self {
        self.names = names;
        self
    }

    pub fn with_existing(mut self, existing: OnExisting) -> Self {
        self.existing = existing;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Final location of the output file for `stem`.
    pub fn target(&self, stem: &str) -> PathBuf {
        self.output.join(format!("{stem}.{}", self.transcoder.extension()))
    }
}
