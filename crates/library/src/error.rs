//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Run-level failures. Per-entry failures never surface here; they are
/// reported through [`Outcome::Failed`](crate::Outcome::Failed).
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The cache could not be listed at all.
    #[display("cache scan failed")]
    Scan,
    #[display("issue with output naming template")]
    Template,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
