use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::scan::discover::{FoundEntry, SkippedEntry, discover};
use crate::scan::error::{ErrorKind as ScanErrorKind, Result as ScanResult};
use crate::scan::models::{CacheEntry, MetadataState};
use async_stream::stream;
use bilicache_storage::BackendHandle;
use exn::ResultExt;
use futures::{Stream, StreamExt};
use std::path::PathBuf;

/// Progress events emitted by [`scan`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started) exactly once.
/// 2. [`Unreadable`](Self::Unreadable) and [`Skipped`](Self::Skipped), zero or
///    more times.
/// 3. [`DiscoveryComplete`](Self::DiscoveryComplete) exactly once, with the
///    number of entries about to be emitted.
/// 4. [`Discovered`](Self::Discovered) once per entry, sorted by directory.
/// 5. [`Complete`](Self::Complete) exactly once.
///
/// An unreadable cache root terminates the stream with an `Err` item right
/// after [`Started`](Self::Started).
#[derive(Debug)]
pub enum ScanEvent {
    Started,
    /// A directory outside any entry couldn't be listed.
    Unreadable(PathBuf),
    /// An entry was found but part of it couldn't be listed.
    Skipped(SkippedEntry),
    DiscoveryComplete(u64),
    Discovered(Box<CacheEntry>),
    Complete,
}

/// Streams [`ScanEvent`]s for the cache behind `backend`.
///
/// The whole tree is listed before grouping so that entries don't depend on
/// listing order; descriptors are only read as the stream is polled.
pub fn scan(backend: &BackendHandle) -> impl Stream<Item = LibraryResult<ScanEvent>> + '_ {
    stream! {
        for await event in scan_inner(backend) {
            yield event.or_raise(|| LibraryErrorKind::Scan);
        }
    }
}

fn scan_inner(backend: &BackendHandle) -> impl Stream<Item = ScanResult<ScanEvent>> + '_ {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        yield Ok(ScanEvent::Started);

        let mut files = Vec::new();
        let mut unreadable = Vec::new();
        let mut listing = backend.list_stream();
        while let Some(item) = listing.next().await {
            match item {
                Ok(file) => files.push(file),
                Err(e) if e.is_root() => {
                    yield Err(e).or_raise(|| ScanErrorKind::RootUnreadable);
                    return;
                },
                Err(e) => {
                    tracing::warn!(dir = %e.path().display(), error = %*e, "Directory not readable");
                    unreadable.push(e.path().to_path_buf());
                },
            }
        }
        drop(listing);
        tracing::debug!(files = files.len(), unreadable = unreadable.len(), "Cache listed");

        let discovery = discover(files, &unreadable);
        for dir in discovery.unreadable {
            yield Ok(ScanEvent::Unreadable(dir));
        }
        for skipped in discovery.skipped {
            yield Ok(ScanEvent::Skipped(skipped));
        }
        // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
        yield Ok(ScanEvent::DiscoveryComplete(u64::try_from(discovery.entries.len()).unwrap_or(0)));

        for found in discovery.entries {
            let entry = load(backend, found).await;
            yield Ok(ScanEvent::Discovered(Box::new(entry)));
        }

        yield Ok(ScanEvent::Complete);
    })
}

/// Reads and parses the descriptor of a found entry. Never fails: any problem
/// is recorded in the entry's [`MetadataState`].
async fn load(backend: &BackendHandle, found: FoundEntry) -> CacheEntry {
    let FoundEntry { dir, descriptor, fragments } = found;
    let id = CacheEntry::id_for(&dir);
    let metadata = match descriptor {
        None => MetadataState::Missing,
        Some(path) => match backend.read(&path).await {
            Err(e) => {
                tracing::warn!(entry = %id, path = %path.display(), error = %*e, "Descriptor not readable");
                MetadataState::Unreadable
            },
            Ok(raw) => match bilicache_descriptor::parse(&raw) {
                Ok(descriptor) => MetadataState::Parsed(descriptor),
                Err(e) => {
                    tracing::info!(entry = %id, reason = %*e, "Descriptor unusable; falling back to directory name");
                    MetadataState::Invalid((*e).clone())
                },
            },
        },
    };
    CacheEntry { id, dir, fragments, metadata }
}
