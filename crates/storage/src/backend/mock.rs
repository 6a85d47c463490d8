//! In-memory storage backend for testing.

use super::FileInfoStream;
use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::models::FileInfo;
use crate::path::validate as validate_path;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::sync::RwLock;

/// In-memory cache tree for testing.
///
/// Files live in a map behind a [`RwLock`]. Directories can be marked
/// unreadable to exercise the scanner's error reporting without touching file
/// permissions on disk.
///
/// # Examples
///
/// ```
/// use bilicache_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("170001/c_279786/entry.json", b"{}".to_vec()),
/// ]);
/// assert_eq!(backend.read(Path::new("170001/c_279786/entry.json")).await?, b"{}");
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
    unreadable: BTreeSet<PathBuf>,
    failing: BTreeSet<PathBuf>,
    unreadable_root: bool,
    listing: Listing,
}

/// Order in which [`MockBackend`] lists its files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Listing {
    /// Lexicographic path order.
    #[default]
    Sorted,
    /// Reverse lexicographic order, for proving callers don't rely on ordering.
    Reversed,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation. If the test setup is wrong, the
    /// test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = BTreeMap::new();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            map.insert(validated, data.into());
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
            unreadable: BTreeSet::new(),
            failing: BTreeSet::new(),
            unreadable_root: false,
            listing: Listing::default(),
        }
    }

    /// Mark a directory as unreadable: listing reports it once and skips
    /// everything below it, reads below it fail with `PermissionDenied`.
    pub fn with_unreadable(mut self, dir: impl AsRef<Path>) -> Self {
        let Ok(validated) = validate_path(dir.as_ref()) else {
            panic!("MockBackend::with_unreadable: invalid path {}", dir.as_ref().display());
        };
        self.unreadable.insert(validated);
        self
    }

    /// Like [`with_unreadable`](Self::with_unreadable), but the directory
    /// fails with a generic I/O error (a dying SD card) instead.
    pub fn with_failing(mut self, dir: impl AsRef<Path>) -> Self {
        let Ok(validated) = validate_path(dir.as_ref()) else {
            panic!("MockBackend::with_failing: invalid path {}", dir.as_ref().display());
        };
        self.failing.insert(validated);
        self
    }

    /// Make the root itself unreadable.
    pub fn with_unreadable_root(mut self) -> Self {
        self.unreadable_root = true;
        self
    }

    pub fn with_listing(mut self, listing: Listing) -> Self {
        self.listing = listing;
        self
    }

    /// The error for accessing `path`, if it lies in an unreadable directory.
    fn blocked_by(&self, path: &Path) -> Option<ErrorKind> {
        if self.unreadable_root {
            return Some(ErrorKind::PermissionDenied(PathBuf::new()));
        }
        if let Some(dir) = self.unreadable.iter().find(|dir| path.starts_with(dir)) {
            return Some(ErrorKind::PermissionDenied(dir.clone()));
        }
        self.failing.iter().find(|dir| path.starts_with(dir)).map(|dir| ErrorKind::Io {
            path: dir.clone(),
            source: std::io::Error::other("input/output error"),
        })
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, Vec<u8>); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream(&self) -> FileInfoStream<'_> {
        Box::pin(stream! {
            if self.unreadable_root {
                yield Err(exn::Exn::from(ErrorKind::PermissionDenied(PathBuf::new())));
                return;
            }
            // Snapshot under the read lock, then drop it before yielding.
            let mut entries: Vec<(PathBuf, u64)> = {
                let guard = self.storage.read().await;
                guard.iter().map(|(path, data)| (path.clone(), data.len() as u64)).collect()
            };
            if self.listing == Listing::Reversed {
                entries.reverse();
            }
            let mut reported = BTreeSet::new();
            for (path, size) in entries {
                match self.blocked_by(&path) {
                    Some(kind) => {
                        if reported.insert(kind.path().to_path_buf()) {
                            yield Err(exn::Exn::from(kind));
                        }
                    },
                    None => yield Ok(FileInfo::new(path, size, OffsetDateTime::UNIX_EPOCH)),
                }
            }
        })
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        if let Some(kind) = self.blocked_by(&path) {
            exn::bail!(kind);
        }
        self.storage.read().await.get(&path).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn tree() -> MockBackend {
        MockBackend::with_files([
            ("a/entry.json", b"{}".to_vec()),
            ("a/80/audio.m4s", b"audio".to_vec()),
            ("b/80/audio.m4s", b"other".to_vec()),
        ])
    }

    #[tokio::test]
    async fn test_read() {
        let backend = tree();
        assert_eq!(backend.read(Path::new("a/80/audio.m4s")).await.unwrap(), b"audio");
        let err = backend.read(Path::new("missing")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_all() {
        let files = tree().list().await.unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(files[0].path, PathBuf::from("a/80/audio.m4s"));
    }

    #[tokio::test]
    async fn test_list_reversed() {
        let files = tree().with_listing(Listing::Reversed).list().await.unwrap();
        assert_eq!(files[0].path, PathBuf::from("b/80/audio.m4s"));
    }

    #[tokio::test]
    async fn test_unreadable_directory() {
        let backend = tree().with_unreadable("a/80");
        let items: Vec<_> = backend.list_stream().collect().await;
        assert_eq!(items.len(), 3);
        let errors: Vec<_> = items.iter().filter_map(|i| i.as_ref().err()).collect();
        assert_eq!(errors.len(), 1);
        assert!(matches!(&**errors[0], ErrorKind::PermissionDenied(p) if p == Path::new("a/80")));
        let err = backend.read(Path::new("a/80/audio.m4s")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_failing_directory() {
        let backend = tree().with_failing("b");
        let items: Vec<_> = backend.list_stream().collect().await;
        let errors: Vec<_> = items.iter().filter_map(|i| i.as_ref().err()).collect();
        assert_eq!(errors.len(), 1);
        assert!(matches!(&**errors[0], ErrorKind::Io { path, .. } if path == Path::new("b")));
        let err = backend.read(Path::new("b/80/audio.m4s")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Io { .. }));
    }

    #[tokio::test]
    async fn test_unreadable_root() {
        let backend = tree().with_unreadable_root();
        let items: Vec<_> = backend.list_stream().collect().await;
        assert_eq!(items.len(), 1);
        assert!(items[0].as_ref().unwrap_err().is_root());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        assert!(tree().read(Path::new("../etc/passwd")).await.is_err());
    }

    #[test]
    #[should_panic(expected = "invalid path")]
    fn test_with_files_panics_on_bad_path() {
        MockBackend::with_files([("../escape", b"bad".to_vec())]);
    }
}
