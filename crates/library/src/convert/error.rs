//! Error types for the [`convert`](super) module.
//!
//! One [`Error`] describes why a single entry could not be converted; it never
//! aborts the run. Each variant names the stage that failed.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A conversion error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for conversion operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// None of the entry's fragments carry audio.
    #[display("no audio track")]
    NoAudioFragment,
    /// Some (or all) of the selected fragments failed header validation.
    #[display("corrupt fragment header ({rejected} of {total} fragments rejected)")]
    CorruptFragmentHeader { rejected: usize, total: usize },
    /// The transcoder failed; carries its diagnostic verbatim.
    #[display("transcoder failed: {_0}")]
    Transcoder(#[error(not(source))] String),
    /// A fragment couldn't be read, or the output couldn't be written.
    #[display("filesystem access failed: {}", _0.display())]
    Filesystem(#[error(not(source))] PathBuf),
    /// The transcoder reported success but wrote nothing.
    #[display("transcoder produced an empty file")]
    EmptyOutput,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Filesystem(_))
    }

    /// Whether some, but not all, fragments were rejected.
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::CorruptFragmentHeader { rejected, total } if rejected < total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 3, true)]
    #[case(3, 3, false)]
    fn test_is_partial(#[case] rejected: usize, #[case] total: usize, #[case] partial: bool) {
        assert_eq!(ErrorKind::CorruptFragmentHeader { rejected, total }.is_partial(), partial);
    }

    #[test]
    fn test_diagnostic_verbatim() {
        let kind = ErrorKind::Transcoder("pipe:0: Invalid data found when processing input".into());
        assert_eq!(kind.to_string(), "transcoder failed: pipe:0: Invalid data found when processing input");
    }
}
