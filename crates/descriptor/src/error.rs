//! Descriptor Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A descriptor error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for descriptor parsing.
pub type Result<T> = std::result::Result<T, Error>;

/// Why an entry's metadata is unavailable.
///
/// None of these are fatal: every variant means "name the entry after its
/// directory instead".
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The descriptor is not valid UTF-8.
    #[display("descriptor is not valid UTF-8")]
    Encoding,
    /// The descriptor file is empty (or whitespace only).
    #[display("descriptor is empty")]
    Empty,
    /// The descriptor is not well-formed JSON.
    #[display("malformed JSON at line {line}, column {column}")]
    Syntax { line: usize, column: usize },
    /// Well-formed JSON, but not shaped like any known descriptor.
    #[display("unrecognised descriptor schema")]
    Schema,
    /// Neither a title nor a part name could be found.
    #[display("descriptor has no title")]
    Untitled,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // The bytes on disk won't change between attempts.
        false
    }
}
