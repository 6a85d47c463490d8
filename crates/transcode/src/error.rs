//! Transcode Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;
use std::time::Duration;

/// A transcode error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for transcode operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No transcoder could be located.
    #[display("ffmpeg not detected on your system; install it (https://ffmpeg.org/download.html) or set `transcoder.program`")]
    NotFound,
    /// The transcoder exists but `-version` did not succeed.
    #[display("transcoder at {} is not usable", _0.display())]
    Unusable(#[error(not(source))] PathBuf),
    /// The transcoder ran longer than allowed and was killed.
    #[display("transcoder killed after {_0:?}")]
    Timeout(#[error(not(source))] Duration),
    /// The transcoder exited unsuccessfully; carries its diagnostic output
    /// verbatim (or the exit status, if it printed nothing).
    #[display("{_0}")]
    Failed(#[error(not(source))] String),
    /// Spawning the transcoder or exchanging data with it failed.
    #[display("transcoder I/O failed: {_0}")]
    Io(std::io::Error),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
