use bilicache_descriptor::DESCRIPTOR_FILE_NAME;
use bilicache_fragment::is_fragment;
use bilicache_storage::FileInfo;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// An entry directory and its files, before any metadata is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundEntry {
    pub dir: PathBuf,
    pub descriptor: Option<PathBuf>,
    pub fragments: Vec<FileInfo>,
}

/// An entry that can't be converted because part of it couldn't be listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub dir: PathBuf,
    pub unreadable: PathBuf,
}

/// The result of grouping a listing into entries. Every list is sorted by
/// path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub entries: Vec<FoundEntry>,
    pub skipped: Vec<SkippedEntry>,
    /// Unreadable directories that don't belong to any entry.
    pub unreadable: Vec<PathBuf>,
}

/// Groups listed files into entries.
///
/// A fragment belongs to the nearest directory above it holding an
/// `entry.json`; failing that, to the top-level directory it sits in.
/// Fragments lying directly in the root belong to nothing, and directories
/// without fragments aren't entries. The output is the same for any ordering
/// of `files` and `unreadable`.
///
/// `unreadable` lists directories the listing couldn't enter. One that falls
/// within an entry skips that entry (its fragment list might be incomplete);
/// any other is passed through in [`Discovery::unreadable`].
pub fn discover(files: impl IntoIterator<Item = FileInfo>, unreadable: &[PathBuf]) -> Discovery {
    let files: Vec<FileInfo> = files.into_iter().collect();
    let described: BTreeSet<&Path> = files
        .iter()
        .filter(|file| file.file_name() == Some(DESCRIPTOR_FILE_NAME))
        .filter_map(|file| file.path.parent())
        // A descriptor in the root doesn't make the root an entry.
        .filter(|dir| !dir.as_os_str().is_empty())
        .collect();

    let mut grouped: BTreeMap<PathBuf, Vec<FileInfo>> = BTreeMap::new();
    for file in &files {
        if !file.file_name().is_some_and(is_fragment) {
            continue;
        }
        let Some(dir) = file.path.parent().and_then(|parent| entry_dir(parent, &described)) else {
            tracing::debug!(path = %file.path.display(), "Fragment outside any entry directory; ignoring");
            continue;
        };
        grouped.entry(dir).or_default().push(file.clone());
    }

    let mut blocked: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
    let mut stray = Vec::new();
    for dir in unreadable {
        match entry_dir(dir, &described) {
            Some(entry) if grouped.contains_key(&entry) || described.contains(entry.as_path()) => {
                // Keep the first (by path) unreadable directory as the reason.
                let reason = blocked.entry(entry).or_insert_with(|| dir.clone());
                if *dir < *reason {
                    *reason = dir.clone();
                }
            },
            _ => stray.push(dir.clone()),
        }
    }
    stray.sort();

    let entries = grouped
        .into_iter()
        .filter(|(dir, _)| !blocked.contains_key(dir))
        .map(|(dir, mut fragments)| {
            fragments.sort_by(|a, b| a.path.cmp(&b.path));
            let descriptor = described.contains(dir.as_path()).then(|| dir.join(DESCRIPTOR_FILE_NAME));
            FoundEntry { dir, descriptor, fragments }
        })
        .collect();
    let skipped = blocked.into_iter().map(|(dir, unreadable)| SkippedEntry { dir, unreadable }).collect();
    Discovery { entries, skipped, unreadable: stray }
}

/// Entry directory for something located in `dir`: the nearest of `dir` and
/// its ancestors holding a descriptor, else the top-level directory.
fn entry_dir(dir: &Path, described: &BTreeSet<&Path>) -> Option<PathBuf> {
    if let Some(found) = dir.ancestors().find(|ancestor| described.contains(ancestor)) {
        return Some(found.to_path_buf());
    }
    let top = dir.components().next()?;
    Some(PathBuf::from(top.as_os_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::OffsetDateTime;

    fn files(paths: &[&str]) -> Vec<FileInfo> {
        paths.iter().map(|p| FileInfo::new(*p, 10, OffsetDateTime::UNIX_EPOCH)).collect()
    }

    fn dirs(discovery: &Discovery) -> Vec<&str> {
        discovery.entries.iter().map(|e| e.dir.to_str().unwrap()).collect()
    }

    #[test]
    fn test_nested_layout() {
        let discovery = discover(
            files(&[
                "170001/c_279786/entry.json",
                "170001/c_279786/80/audio.m4s",
                "170001/c_279786/80/video.m4s",
                "170001/c_279786/80/index.json",
                "170001/c_279787/entry.json",
                "170001/c_279787/16/audio.m4s",
                "170002/c_1/entry.json",
                "170002/c_1/lua.flv.bili2api.16/0.blv",
                "170002/c_1/lua.flv.bili2api.16/1.blv",
            ]),
            &[],
        );
        assert_eq!(dirs(&discovery), ["170001/c_279786", "170001/c_279787", "170002/c_1"]);
        let first = &discovery.entries[0];
        assert_eq!(first.descriptor, Some(PathBuf::from("170001/c_279786/entry.json")));
        assert_eq!(first.fragments.len(), 2);
        assert_eq!(discovery.entries[2].fragments.len(), 2);
    }

    #[test]
    fn test_flat_layout_without_descriptors() {
        let discovery = discover(files(&["video-a/0.blv", "video-b/sub/audio.m4s", "video-b/cover.jpg"]), &[]);
        assert_eq!(dirs(&discovery), ["video-a", "video-b"]);
        assert!(discovery.entries.iter().all(|e| e.descriptor.is_none()));
    }

    #[test]
    fn test_ignores_non_entries() {
        let discovery = discover(
            files(&["stray.m4s", "entry.json", "empty/entry.json", "notes/readme.txt", "real/audio.m4s"]),
            &[],
        );
        assert_eq!(dirs(&discovery), ["real"]);
    }

    #[test]
    fn test_independent_of_order() {
        let mut listing = files(&[
            "b/entry.json",
            "b/80/audio.m4s",
            "a/c_2/entry.json",
            "a/c_2/80/audio_1.m4s",
            "a/c_2/80/audio.m4s",
            "c/0.blv",
        ]);
        let expected = discover(listing.clone(), &[]);
        listing.reverse();
        assert_eq!(discover(listing.clone(), &[]), expected);
        listing.rotate_left(2);
        assert_eq!(discover(listing, &[]), expected);
        assert_eq!(dirs(&expected), ["a/c_2", "b", "c"]);
        assert_eq!(expected.entries[0].fragments[0].path, PathBuf::from("a/c_2/80/audio.m4s"));
    }

    #[rstest]
    #[case::inside_entry(&["a/c_1/80"], &["b"], &["a/c_1"], &[])]
    #[case::inside_fallback_entry(&["b/sub"], &["a/c_1"], &["b"], &[])]
    #[case::both(&["b/sub", "a/c_1/80/x", "a/c_1/16"], &[], &["a/c_1", "b"], &[])]
    #[case::outside_entries(&["other/deep"], &["a/c_1", "b"], &[], &["other/deep"])]
    #[case::top_level(&["hidden"], &["a/c_1", "b"], &[], &["hidden"])]
    fn test_unreadable(
        #[case] unreadable: &[&str],
        #[case] entries: &[&str],
        #[case] skipped: &[&str],
        #[case] stray: &[&str],
    ) {
        let listing = files(&["a/c_1/entry.json", "a/c_1/80/audio.m4s", "b/0.blv"]);
        let unreadable: Vec<PathBuf> = unreadable.iter().map(PathBuf::from).collect();
        let discovery = discover(listing, &unreadable);
        assert_eq!(dirs(&discovery), entries);
        let skipped_dirs: Vec<_> = discovery.skipped.iter().map(|s| s.dir.to_str().unwrap()).collect();
        assert_eq!(skipped_dirs, skipped);
        let stray_dirs: Vec<_> = discovery.unreadable.iter().map(|p| p.to_str().unwrap()).collect();
        assert_eq!(stray_dirs, stray);
    }

    #[test]
    fn test_unreadable_reason_is_first_path() {
        let listing = files(&["a/c_1/entry.json", "a/c_1/80/audio.m4s"]);
        let discovery = discover(listing, &[PathBuf::from("a/c_1/80/z"), PathBuf::from("a/c_1/16")]);
        assert_eq!(discovery.skipped, [SkippedEntry { dir: "a/c_1".into(), unreadable: "a/c_1/16".into() }]);
    }

    #[test]
    fn test_descriptor_with_hidden_fragments() {
        // Only the descriptor could be listed; the quality directory couldn't.
        let listing = files(&["a/c_1/entry.json"]);
        let discovery = discover(listing, &[PathBuf::from("a/c_1/80")]);
        assert!(discovery.entries.is_empty());
        assert_eq!(discovery.skipped[0].dir, PathBuf::from("a/c_1"));
    }
}
