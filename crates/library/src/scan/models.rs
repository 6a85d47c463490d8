use bilicache_descriptor::EntryDescriptor;
use bilicache_descriptor::error::ErrorKind as DescriptorErrorKind;
use bilicache_storage::FileInfo;
use std::path::{Path, PathBuf};

/// What became of an entry's `entry.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataState {
    Parsed(EntryDescriptor),
    /// The entry has no descriptor.
    Missing,
    /// The descriptor exists but could not be read.
    Unreadable,
    /// The descriptor was read but is unusable.
    Invalid(DescriptorErrorKind),
}
impl MetadataState {
    pub fn descriptor(&self) -> Option<&EntryDescriptor> {
        match self {
            Self::Parsed(descriptor) => Some(descriptor),
            _ => None,
        }
    }

    /// Whether the entry is named after its directory instead of its metadata.
    pub fn is_fallback(&self) -> bool {
        self.descriptor().is_none()
    }
}

/// One cached video (or one page/episode of it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Entry directory relative to the cache root, components joined by `_`
    /// (just the directory name for top-level entries).
    pub id: String,
    /// Entry directory relative to the cache root.
    pub dir: PathBuf,
    /// Every fragment file below the entry directory, sorted by path.
    pub fragments: Vec<FileInfo>,
    pub metadata: MetadataState,
}
impl CacheEntry {
    /// Builds the identifier for an entry directory.
    pub fn id_for(dir: &Path) -> String {
        dir.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("_")
    }

    /// Human-readable name: `"<title> - <part>"` from the descriptor, or the
    /// entry identifier when metadata is unavailable.
    pub fn display_name(&self) -> String {
        self.metadata.descriptor().and_then(EntryDescriptor::display_name).unwrap_or_else(|| self.id.clone())
    }
}
