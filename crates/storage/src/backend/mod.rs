//! Storage backend trait and implementations.
//!
//! A backend is a read-only view of one cache root. The pipeline treats the
//! cache as input that must never be mutated, so the trait deliberately has no
//! write, rename or delete operations.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::{Listing, MockBackend};
use crate::error::Result;
use crate::models::FileInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;

pub(crate) type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// Unified, read-only interface over a cache tree.
///
/// # Path Handling
/// All paths are relative to the cache root and validated with
/// [`validate_path`](crate::validate_path) before use.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use bilicache_storage::{backend::StorageBackend, error::Result};
///
/// async fn descriptors(backend: &dyn StorageBackend) -> Result<Vec<Vec<u8>>> {
///     let mut found = Vec::new();
///     for info in backend.list().await? {
///         if info.path.ends_with("entry.json") {
///             found.push(backend.read(&info.path).await?);
///         }
///     }
///     Ok(found)
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the backend, used for logging only.
    fn name(&self) -> &str;

    /// List every file below the root.
    ///
    /// Collects [`list_stream()`](Self::list_stream) into a [`Vec`], stopping
    /// at the first error. Callers that need to survive unreadable directories
    /// should consume the stream instead.
    async fn list(&self) -> Result<Vec<FileInfo>> {
        self.list_stream().try_collect().await
    }

    /// Stream metadata for every file below the root.
    ///
    /// Listing order is unspecified. A directory that cannot be read yields a
    /// single `Err` item ([`PermissionDenied`](crate::error::ErrorKind::PermissionDenied)
    /// or [`NotFound`](crate::error::ErrorKind::NotFound), carrying the
    /// root-relative directory path; the empty path is the root itself) and the
    /// stream carries on with the remaining directories.
    ///
    /// ```
    /// use futures::StreamExt;
    /// # use bilicache_storage::backend::StorageBackend;
    /// # async fn example(backend: &dyn StorageBackend) {
    /// let mut stream = backend.list_stream();
    /// while let Some(item) = stream.next().await {
    ///     match item {
    ///         Ok(info) => println!("{}: {} bytes", info.path.display(), info.size),
    ///         Err(e) => eprintln!("skipping: {e:?}"),
    ///     }
    /// }
    /// # }
    /// ```
    fn list_stream(&self) -> FileInfoStream<'_>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;
}
