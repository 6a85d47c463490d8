//! Path validation.
//!
//! Every path handed to a backend is relative to the cache root. These helpers
//! normalise such paths and refuse anything that would climb out of the root.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates and normalises a root-relative cache path.
///
/// `.` components, repeated and trailing separators are dropped, `..` is
/// resolved lexically, and the result must still name something *inside* the
/// root. Null bytes are rejected outright.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use bilicache_storage::validate_path;
/// assert!(validate_path("download/170001/c_279786/80/audio.m4s").is_ok());
/// assert!(validate_path("s_1/ep1/../ep2/entry.json").is_ok());
/// assert!(validate_path("../elsewhere").is_err());
/// assert!(validate_path("a/../../b").is_err());
/// assert!(validate_path("a\0b").is_err());
/// assert_eq!(
///     validate_path("./170001//c_279786/./entry.json/").unwrap(),
///     Path::new("170001/c_279786/entry.json")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let invalid = || ErrorKind::InvalidPath(original.to_path_buf());
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            // Null bytes survive Path::components() on Unix but truncate C strings.
            Component::Normal(s) if s.as_encoded_bytes().contains(&0) => exn::bail!(invalid()),
            Component::Normal(s) => components.push(s),
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(invalid()),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
        }
    }
    if components.is_empty() {
        exn::bail!(invalid());
    }
    Ok(components.into_iter().collect())
}
