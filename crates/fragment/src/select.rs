use crate::error::{ErrorKind, Result};
use crate::name::{Container, FragmentName, Role, classify};
use bilicache_storage::FileInfo;
use exn::OptionExt;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Which rule picked the fragments of a [`Selection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Fragments named as audio (`audio*.m4s`).
    AudioTrack,
    /// FLV segments carrying audio and video; the transcoder drops the video.
    MuxedTrack,
    /// Fragments with no role in their name, all numbered: one sequence
    /// ordered by number.
    IndexedSequence,
    /// Fragments with no role in their name and no numbering: the smallest
    /// file, ties broken by path. An audio track is a fraction of the size of
    /// the video track it accompanies.
    SmallestFile,
}

/// The fragments to concatenate for an entry's audio, in order.
#[derive(Debug, Clone)]
pub struct Selection {
    pub rule: Rule,
    pub container: Container,
    /// Directory of the chosen variant (the client keeps one per quality).
    pub variant: PathBuf,
    pub fragments: Vec<FileInfo>,
}

/// Picks and orders the audio-bearing fragments among an entry's files.
///
/// Files that aren't fragments are ignored, so the whole entry listing can be
/// passed in. The result never depends on the order of `files`:
///
/// 1. The role is chosen by priority: audio, then muxed, then unknown. Video
///    fragments are never selected.
/// 2. Fragments of that role are grouped by parent directory and the variant
///    with the highest numeric directory name wins (non-numeric names rank
///    below numeric ones and compare lexicographically).
/// 3. Fragments are ordered by sequence index, then path. A repeated index
///    keeps the first fragment and drops the rest with a warning.
///
/// Returns [`ErrorKind::NoAudioFragment`] if nothing qualifies.
pub fn select<'a>(files: impl IntoIterator<Item = &'a FileInfo>) -> Result<Selection> {
    let classified: Vec<(&FileInfo, FragmentName)> =
        files.into_iter().filter_map(|file| Some((file, classify(file.file_name()?)?))).collect();
    let role = [Role::Audio, Role::Muxed, Role::Unknown]
        .into_iter()
        .find(|role| classified.iter().any(|(_, name)| name.role == *role))
        .ok_or_raise(|| ErrorKind::NoAudioFragment)?;
    let candidates: Vec<_> = classified.into_iter().filter(|(_, name)| name.role == role).collect();
    let variant = candidates
        .iter()
        .map(|(file, _)| parent(file))
        .max_by(|a, b| compare_variants(a, b))
        .map(Path::to_path_buf)
        .ok_or_raise(|| ErrorKind::NoAudioFragment)?;
    let mut chosen: Vec<_> = candidates.into_iter().filter(|(file, _)| parent(file) == variant).collect();

    let rule = match role {
        Role::Audio => Rule::AudioTrack,
        Role::Muxed => Rule::MuxedTrack,
        _ if chosen.iter().all(|(_, name)| name.index.is_some()) => Rule::IndexedSequence,
        _ => Rule::SmallestFile,
    };
    if rule == Rule::SmallestFile {
        chosen.sort_by(|(a, _), (b, _)| a.size.cmp(&b.size).then_with(|| a.path.cmp(&b.path)));
        chosen.truncate(1);
    } else {
        // Unnumbered fragments go last.
        chosen.sort_by(|(a, x), (b, y)| {
            (x.index.is_none(), x.index).cmp(&(y.index.is_none(), y.index)).then_with(|| a.path.cmp(&b.path))
        });
        let mut previous = None;
        chosen.retain(|(file, name)| {
            if name.index.is_some() && name.index == previous {
                tracing::warn!(path = %file.path.display(), index = ?name.index, "Duplicate fragment index; ignoring");
                return false;
            }
            previous = name.index;
            true
        });
    }

    let container = chosen.first().map(|(_, name)| name.container).ok_or_raise(|| ErrorKind::NoAudioFragment)?;
    let fragments: Vec<FileInfo> = chosen.into_iter().map(|(file, _)| file.clone()).collect();
    tracing::debug!(?rule, variant = %variant.display(), fragments = fragments.len(), "Fragments selected");
    Ok(Selection { rule, container, variant, fragments })
}

fn parent(file: &FileInfo) -> &Path {
    file.path.parent().unwrap_or(Path::new(""))
}

fn compare_variants(a: &Path, b: &Path) -> Ordering {
    let name = |p: &Path| p.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
    let (a_name, b_name) = (name(a), name(b));
    match (a_name.parse::<u64>().ok(), b_name.parse::<u64>().ok()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a_name.cmp(&b_name),
    }
    .then_with(|| a.cmp(b))
}
