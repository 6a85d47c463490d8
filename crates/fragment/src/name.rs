use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

regex!(AUDIO_REGEX, r"(?i)^audio[_-]?(\d+)?\.m4s$");
regex!(VIDEO_REGEX, r"(?i)^video.*\.m4s$");
regex!(INDEXED_REGEX, r"(?i)^(\d+)\.(?:m4s|blv)$");

/// Container format of a fragment, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    /// `.m4s`: vendor-prefixed ISO-BMFF.
    Mp4,
    /// `.blv`: plain FLV.
    Flv,
}
impl Container {
    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "m4s" => Some(Self::Mp4),
            "blv" => Some(Self::Flv),
            _ => None,
        }
    }

    /// File extension a demuxer recognises once the fragment is patched.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Flv => "flv",
        }
    }

    /// FFmpeg demuxer name, for inputs that can't be probed by extension.
    pub fn demuxer(&self) -> &'static str {
        match self {
            Self::Mp4 => "mov",
            Self::Flv => "flv",
        }
    }
}

/// Stream role implied by a fragment's file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Audio,
    Video,
    /// Audio and video in the same file (FLV segments).
    Muxed,
    /// Name carries no role; see [`Rule`](crate::Rule) for how these are
    /// resolved.
    Unknown,
}

/// What a fragment's file name says about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentName {
    pub container: Container,
    pub role: Role,
    /// Position in the concatenation sequence, when the name has one.
    pub index: Option<u64>,
}

/// Classifies a fragment by file name; `None` for anything that isn't a
/// fragment at all.
///
/// | File name (case-insensitive)                 | Role      | Index |
/// |----------------------------------------------|-----------|-------|
/// | `audio.m4s`                                  | `Audio`   | 0     |
/// | `audio_N.m4s`, `audio-N.m4s`, `audioN.m4s`   | `Audio`   | N     |
/// | `video*.m4s`                                 | `Video`   | -     |
/// | `N.blv`                                      | `Muxed`   | N     |
/// | `N.m4s`                                      | `Unknown` | N     |
/// | any other `*.blv`                            | `Muxed`   | -     |
/// | any other `*.m4s`                            | `Unknown` | -     |
///
/// ```
/// use bilicache_fragment::{classify, Role};
/// assert_eq!(classify("audio.m4s").unwrap().role, Role::Audio);
/// assert_eq!(classify("3.blv").unwrap().index, Some(3));
/// assert!(classify("entry.json").is_none());
/// ```
pub fn classify(file_name: &str) -> Option<FragmentName> {
    let ext = Path::new(file_name).extension()?.to_str()?;
    let container = Container::from_extension(ext)?;
    let indexed = || INDEXED_REGEX.captures(file_name).and_then(|c| c[1].parse().ok());
    let (role, index) = match container {
        Container::Mp4 => {
            if let Some(captures) = AUDIO_REGEX.captures(file_name) {
                // An index too large for u64 is as good as no index.
                match captures.get(1) {
                    Some(n) => (Role::Audio, n.as_str().parse().ok()),
                    None => (Role::Audio, Some(0)),
                }
            } else if VIDEO_REGEX.is_match(file_name) {
                (Role::Video, None)
            } else {
                (Role::Unknown, indexed())
            }
        },
        Container::Flv => (Role::Muxed, indexed()),
    };
    Some(FragmentName { container, role, index })
}

/// Whether the file name has a fragment extension.
pub fn is_fragment(file_name: &str) -> bool {
    Path::new(file_name).extension().and_then(|e| e.to_str()).and_then(Container::from_extension).is_some()
}
