//! Fragment Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A fragment error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for fragment operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// None of the entry's files carry an audio stream.
    #[display("no audio fragment found")]
    NoAudioFragment,
    /// The fragment does not start with the expected vendor prefix.
    #[display("vendor prefix not found")]
    MissingPrefix,
    /// The fragment ends before its header does.
    #[display("fragment truncated inside its header")]
    Truncated,
    /// The bytes after the prefix are not the expected container structure.
    #[display("invalid container header: {_0}")]
    InvalidContainer(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
