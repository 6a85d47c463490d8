//! Hands patched fragment streams to an external transcoder.
//!
//! The pipeline only knows the narrow [`Transcoder`] interface: patched bytes
//! and an output path in, success or a diagnostic out. [`Ffmpeg`] is the real
//! implementation; `MockTranscoder` (behind the `mock` feature) stands in for
//! it in tests.

pub mod error;
mod ffmpeg;
#[cfg(feature = "mock")]
mod mock;
mod tags;

use crate::error::Result;
pub use crate::ffmpeg::{Ffmpeg, FfmpegOptions, InputMode};
#[cfg(feature = "mock")]
pub use crate::mock::{Job, MockTranscoder};
pub use crate::tags::Tags;
use async_trait::async_trait;
use bilicache_fragment::PatchedStream;
use std::path::Path;
use std::sync::Arc;

pub type TranscoderHandle = Arc<dyn Transcoder + Send + Sync>;

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Name of the transcoder, used for logging only.
    fn name(&self) -> &str;

    /// Extension (without the dot) of the files this transcoder produces.
    fn extension(&self) -> &str;

    /// Transcode `input` into an audio-only file at `output`, overwriting it.
    ///
    /// The extension of `output` must match [`extension()`](Self::extension)
    /// since it may be used to pick the output format. On failure `output`
    /// may be left behind partially written; removing it is up to the caller.
    async fn transcode(&self, input: &PatchedStream, output: &Path, tags: &Tags) -> Result<()>;
}
