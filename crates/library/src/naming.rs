//! Output naming.
//!
//! Converts a [`CacheEntry`] into a file stem using a user-configured [upon]
//! template. The template syntax follows upon's Mustache-like conventions
//! (`{{ variable }}`, `{{ value|formatter }}`), extended with:
//!
//! - **`slug`**: an ASCII slug of a title, dropping quote marks and CJK corner
//!   brackets so `「Live」 Stage` becomes `live-stage`.
//! - **`truncate`**: keeps at most `n` bytes of a title without splitting a
//!   character, as `truncate(title, n)` or `{{ title|truncate: n }}`.
//!
//! # Template Variables
//!
//! | Variable | Type             | Description                                           |
//! |----------|------------------|-------------------------------------------------------|
//! | `name`   | `String`         | `"<title> - <part>"`, or the entry id without metadata |
//! | `title`  | `Option<String>` | Video or series title                                 |
//! | `part`   | `Option<String>` | Part or episode name                                  |
//! | `page`   | `Option<u64>`    | Page or episode number                                |
//! | `owner`  | `Option<String>` | Uploader                                              |
//! | `bvid`   | `Option<String>` | `BV…` identifier                                      |
//! | `id`     | `String`         | Entry id (derived from the directory)                 |
//!
//! Whatever the template produces is then [sanitized](sanitize) and, across a
//! run, made unique by [`Names`].

use crate::error::{Error, ErrorKind, Result};
use crate::scan::CacheEntry;
use exn::ResultExt;
use std::collections::HashSet;
use std::str::FromStr;
use tracing::instrument;
use upon::{Engine, Template};

pub const DEFAULT_TEMPLATE: &str = "{{ name }}";
const DEFAULT_MAX_LENGTH: usize = 180;
const FORBIDDEN: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];
const RESERVED: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9", "LPT1",
    "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Renders output file stems for cache entries.
///
/// Constructed via [`FromStr`], which compiles the template eagerly so that
/// syntax errors surface at creation time rather than at render time.
pub struct NameGenerator {
    engine: Engine<'static>,
    template: Template<'static>,
    max_length: usize,
}
impl FromStr for NameGenerator {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut engine = Engine::new();
        title_filters::register(&mut engine);
        // Compile the template early so we can fail-fast in construction.
        let template = engine.compile(s.to_string()).or_raise(|| ErrorKind::Template)?;
        Ok(Self { engine, template, max_length: DEFAULT_MAX_LENGTH })
    }
}
impl Default for NameGenerator {
    fn default() -> Self {
        let mut engine = Engine::new();
        title_filters::register(&mut engine);
        let template = match engine.compile(DEFAULT_TEMPLATE) {
            Ok(template) => template,
            Err(e) => unreachable!("default template must compile: {e}"),
        };
        Self { engine, template, max_length: DEFAULT_MAX_LENGTH }
    }
}
impl NameGenerator {
    /// Maximum stem length in bytes.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length.max(1);
        self
    }

    /// Renders and sanitizes the stem for `entry`. An empty result falls back
    /// to the entry id.
    #[instrument(skip_all, fields(entry = %entry.id))]
    pub fn generate(&self, entry: &CacheEntry) -> Result<String> {
        let rendered =
            self.template.render(&self.engine, Self::parameters(entry)).to_string().or_raise(|| ErrorKind::Template)?;
        let stem = sanitize(&rendered, self.max_length);
        if !stem.is_empty() {
            return Ok(stem);
        }
        tracing::debug!(rendered, "Template rendered an empty name; using entry id");
        Ok(self.fallback(entry))
    }

    /// Like [`generate`](Self::generate) but never fails: a template that
    /// can't be rendered for this entry falls back to the entry id.
    pub fn stem(&self, entry: &CacheEntry) -> String {
        self.generate(entry).unwrap_or_else(|e| {
            tracing::warn!(entry = %entry.id, error = ?e, "Could not render output name; using entry id");
            self.fallback(entry)
        })
    }

    fn fallback(&self, entry: &CacheEntry) -> String {
        Some(sanitize(&entry.id, self.max_length)).filter(|s| !s.is_empty()).unwrap_or_else(|| "untitled".to_string())
    }

    fn parameters(entry: &CacheEntry) -> upon::Value {
        let descriptor = entry.metadata.descriptor();
        upon::value! {
            name: entry.display_name(),
            title: descriptor.and_then(|d| d.title.clone()),
            part: descriptor.and_then(|d| d.part.clone()),
            page: descriptor.and_then(|d| d.page),
            owner: descriptor.and_then(|d| d.owner.clone()),
            bvid: descriptor.and_then(|d| d.bvid.clone()),
            id: entry.id.as_str(),
        }
    }
}

/// Makes `raw` safe to use as a file name on every common filesystem.
///
/// - `\ / : * ? " < > |` and control characters become `_`.
/// - Surrounding whitespace and trailing dots are trimmed.
/// - Windows device names (`CON`, `nul.txt`, `COM1`…) get a `_` after the device part.
/// - The result is cut to at most `max_length` bytes on a character boundary.
///
/// May return an empty string.
pub fn sanitize(raw: &str, max_length: usize) -> String {
    let replaced: String = raw.chars().map(|c| if FORBIDDEN.contains(&c) || c.is_control() { '_' } else { c }).collect();
    let mut name = trim(&replaced).to_string();
    let device = name.split('.').next().unwrap_or_default().trim_end().len();
    if RESERVED.iter().any(|reserved| reserved.eq_ignore_ascii_case(&name[..device])) {
        name.insert(device, '_');
    }
    if name.len() > max_length {
        name = trim(&name[..name.floor_char_boundary(max_length)]).to_string();
    }
    name
}

fn trim(s: &str) -> &str {
    s.trim().trim_end_matches(|c: char| c == '.' || c.is_whitespace())
}

/// Output stems already handed out in this run, compared case-insensitively
/// (output directories may live on case-insensitive filesystems).
#[derive(Debug, Default)]
pub struct Names {
    taken: HashSet<String>,
}
impl Names {
    /// Returns `stem` if it's free, otherwise `"<stem> [<id>]"`, otherwise that
    /// with a counter: `"<stem> [<id>] (2)"`, `(3)`…
    pub fn claim(&mut self, stem: String, id: &str) -> String {
        if self.taken.insert(stem.to_lowercase()) {
            return stem;
        }
        let base = format!("{stem} [{id}]");
        let mut candidate = base.clone();
        let mut counter = 2;
        while !self.taken.insert(candidate.to_lowercase()) {
            candidate = format!("{base} ({counter})");
            counter += 1;
        }
        tracing::debug!(stem, unique = candidate, "Output name already taken");
        candidate
    }
}

/// Custom [`upon`] extensions for file-name-safe string manipulation.
mod title_filters {
    use rslug::slugify;
    use std::fmt::Write;
    use upon::{Engine, Value, fmt as upon_fmt};

    /// Quote marks and the CJK corner brackets uploaders wrap titles in.
    const QUOTES: &[char] = &[
        '\'', '"', '`', '\u{2018}', '\u{2019}', '\u{201B}', '\u{201C}', '\u{201D}', '\u{201E}', '\u{00AB}', '\u{00BB}',
        '\u{2039}', '\u{203A}', '\u{300C}', '\u{300D}', '\u{300E}', '\u{300F}',
    ];

    /// `{{ title|slug }}`: an ASCII slug of a title, with quotes dropped
    /// rather than turned into hyphens.
    fn title_slug(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        let Value::String(title) = value else {
            return upon_fmt::default(f, value);
        };
        let unquoted: String = title.chars().filter(|c| !QUOTES.contains(c)).collect();
        write!(f, "{}", slugify!(&unquoted))?;
        Ok(())
    }

    /// `truncate(title, n)`: at most `n` bytes of a title, never splitting a
    /// character.
    fn clip_title(title: &str, max_bytes: usize) -> String {
        title[..title.floor_char_boundary(max_bytes)].to_string()
    }

    pub(crate) fn register(engine: &mut Engine<'_>) {
        engine.add_formatter("slug", title_slug);
        engine.add_function("truncate", clip_title);
    }
}
