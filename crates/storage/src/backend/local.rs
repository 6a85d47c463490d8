//! Local filesystem storage backend.
//!
//! Walks a cache directory on disk with `tokio::fs`. The root is treated as
//! read-only input: the backend never creates, modifies or removes anything.

use crate::backend::FileInfoStream;
use crate::error::ErrorKind;
use crate::{FileInfo, StorageBackend, error::Result, path::validate as validate_path};
use async_stream::stream;
use async_trait::async_trait;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs::{self, DirEntry};

enum WalkEntry {
    File(FileInfo),
    Descend(PathBuf),
    Skip,
}

/// Local filesystem storage backend.
///
/// All paths are relative to the configured root directory.
///
/// # Examples
///
/// ```no_run
/// use bilicache_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("cache", "/sdcard/Android/data/tv.danmaku.bili/download")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct LocalBackend {
    name: String,
    /// Root directory of the cache
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// # Errors
    ///
    /// - [`InvalidPath`](ErrorKind::InvalidPath) if the path is not absolute
    ///   or is not a directory.
    /// - [`NotFound`](ErrorKind::NotFound) if the root does not exist.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        // Synchronous on purpose; it happens once per run.
        match std::fs::metadata(&root) {
            Ok(meta) if meta.is_dir() => {},
            Ok(_) => exn::bail!(ErrorKind::InvalidPath(root)),
            Err(e) => exn::bail!(Self::map_io_error(e, &root)),
        }
        Ok(Self { name: name.into(), root })
    }

    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    /// Root-relative form of an absolute path below the root. The root itself
    /// becomes the empty path.
    fn relative_path(&self, absolute: &Path) -> PathBuf {
        absolute.strip_prefix(&self.root).map(Path::to_path_buf).unwrap_or_else(|_| absolute.to_path_buf())
    }

    /// Some filesystems (certain FUSE and FAT mounts) can't report a
    /// modification time; those files get the epoch instead.
    fn metadata(path: &Path, metadata: Metadata) -> FileInfo {
        let modified = metadata.modified().map(OffsetDateTime::from).unwrap_or_else(|e| {
            tracing::debug!(path = %path.display(), error = %e, "Modification time unavailable");
            OffsetDateTime::UNIX_EPOCH
        });
        FileInfo::new(path, metadata.len(), modified)
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io { path: path.to_path_buf(), source: e },
        }
    }

    /// Keeps the `?`-hostile body of the stream loop small.
    async fn process_entry(&self, entry: DirEntry) -> Result<WalkEntry> {
        let path = entry.path();
        let relative = self.relative_path(&path);
        let metadata = entry.metadata().await.map_err(|e| Self::map_io_error(e, &relative))?;
        if metadata.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        if metadata.is_file() {
            return Ok(WalkEntry::File(Self::metadata(&relative, metadata)));
        }
        // Symlinks and other special files are not part of a cache layout.
        Ok(WalkEntry::Skip)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream(&self) -> FileInfoStream<'_> {
        let mut stack = vec![self.root.clone()];

        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let relative = self.relative_path(&current);
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    // A subdirectory disappearing mid-walk is not worth reporting;
                    // the root disappearing is.
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound && current != self.root => continue 'dirs,
                    Err(err) => {
                        tracing::debug!(dir = %current.display(), error = %err, "Unable to read directory");
                        yield Err(exn::Exn::from(Self::map_io_error(err, &relative)));
                        continue 'dirs;
                    }
                };

                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(e) => {
                            yield Err(exn::Exn::from(Self::map_io_error(e, &relative)));
                            break 'entries;
                        },
                    };
                    match self.process_entry(entry).await {
                        Ok(WalkEntry::File(f)) => yield Ok(f),
                        Ok(WalkEntry::Descend(d)) => stack.push(d),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    };
                }
            }
        })
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{create_dir_all, write};

    fn cache_tree() -> tempfile::TempDir {
        let temp_dir = tempfile::tempdir().unwrap();
        let entry = temp_dir.path().join("170001/c_279786");
        create_dir_all(entry.join("80")).unwrap();
        write(entry.join("entry.json"), b"{}").unwrap();
        write(entry.join("80/audio.m4s"), b"000000000audio").unwrap();
        write(entry.join("80/video.m4s"), b"000000000video").unwrap();
        temp_dir
    }

    #[test]
    fn test_new_requires_existing_absolute_directory() {
        let temp_dir = cache_tree();
        assert!(LocalBackend::new("cache", temp_dir.path()).is_ok());
        assert!(LocalBackend::new("cache", "relative/path").is_err());
        let missing = LocalBackend::new("cache", temp_dir.path().join("missing")).unwrap_err();
        assert!(matches!(&*missing, ErrorKind::NotFound(_)));
        let file = LocalBackend::new("cache", temp_dir.path().join("170001/c_279786/entry.json")).unwrap_err();
        assert!(matches!(&*file, ErrorKind::InvalidPath(_)));
    }

    #[test]
    fn test_new_does_not_create_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("nope");
        assert!(LocalBackend::new("cache", &root).is_err());
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_list_returns_relative_files() {
        let temp_dir = cache_tree();
        let backend = LocalBackend::new("cache", temp_dir.path()).unwrap();
        let mut paths: Vec<_> = backend.list().await.unwrap().into_iter().map(|f| f.path).collect();
        paths.sort();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("170001/c_279786/80/audio.m4s"),
                PathBuf::from("170001/c_279786/80/video.m4s"),
                PathBuf::from("170001/c_279786/entry.json"),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_reports_sizes() {
        let temp_dir = cache_tree();
        let backend = LocalBackend::new("cache", temp_dir.path()).unwrap();
        let files = backend.list().await.unwrap();
        let audio = files.iter().find(|f| f.path.ends_with("audio.m4s")).unwrap();
        assert_eq!(audio.size, 14);
    }

    #[tokio::test]
    async fn test_list_empty_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("cache", temp_dir.path()).unwrap();
        assert!(backend.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read() {
        let temp_dir = cache_tree();
        let backend = LocalBackend::new("cache", temp_dir.path()).unwrap();
        let data = backend.read(Path::new("170001/c_279786/80/audio.m4s")).await.unwrap();
        assert_eq!(data, b"000000000audio");
        let err = backend.read(Path::new("170001/missing.m4s")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(p) if p == Path::new("170001/missing.m4s")));
    }

    #[test]
    fn test_io_errors_keep_their_path() {
        let other = std::io::Error::other("input/output error");
        let kind = LocalBackend::map_io_error(other, Path::new("170001/c_279786/80"));
        assert!(matches!(&kind, ErrorKind::Io { path, .. } if path == Path::new("170001/c_279786/80")));
        assert!(!kind.is_root());
        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert!(matches!(LocalBackend::map_io_error(denied, Path::new("a")), ErrorKind::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_path_security() {
        let temp_dir = cache_tree();
        let backend = LocalBackend::new("cache", temp_dir.path()).unwrap();
        assert!(backend.read(Path::new("../etc/passwd")).await.is_err());
        assert!(backend.read(Path::new("170001/../../passwd")).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_directory_is_reported_and_skipped() {
        use std::os::unix::fs::PermissionsExt;
        let temp_dir = cache_tree();
        let locked = temp_dir.path().join("locked");
        create_dir_all(&locked).unwrap();
        write(locked.join("audio.m4s"), b"data").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        // Running as root ignores permission bits; nothing to assert then.
        if std::fs::read_dir(&locked).is_ok() {
            std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let backend = LocalBackend::new("cache", temp_dir.path()).unwrap();
        let items: Vec<_> = futures::StreamExt::collect(backend.list_stream()).await;
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        let errors: Vec<_> = items.iter().filter_map(|i| i.as_ref().err()).collect();
        assert_eq!(errors.len(), 1);
        assert!(matches!(&**errors[0], ErrorKind::PermissionDenied(p) if p == Path::new("locked")));
        assert_eq!(items.iter().filter(|i| i.is_ok()).count(), 3);
    }
}
