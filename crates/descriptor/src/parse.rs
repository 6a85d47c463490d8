use crate::error::{ErrorKind, Result};
use crate::lenient;
use crate::models::{EntryDescriptor, Schema};
use exn::ResultExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

#[derive(Deserialize)]
struct RawEntry {
    #[serde(default, deserialize_with = "lenient::string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    owner_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    bvid: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    avid: Option<u64>,
    #[serde(default, deserialize_with = "lenient::object")]
    page_data: Option<RawPage>,
    #[serde(default, deserialize_with = "lenient::object")]
    ep: Option<RawEpisode>,
}

#[derive(Deserialize)]
struct RawPage {
    #[serde(default, deserialize_with = "lenient::string")]
    part: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    page: Option<u64>,
}

#[derive(Deserialize)]
struct RawEpisode {
    #[serde(default, deserialize_with = "lenient::string")]
    index: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    index_title: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    bvid: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    av_id: Option<u64>,
}

/// Parses raw descriptor bytes into an [`EntryDescriptor`].
///
/// Accepts raw bytes rather than `&str` so that encoding problems are reported
/// as [`ErrorKind::Encoding`] instead of being the caller's problem. A leading
/// UTF-8 byte order mark is ignored.
///
/// Shape detection, most specific first:
/// 1. `ep` object → [`Schema::Episode`]; the part name is `ep.index_title`,
///    falling back to `ep.index`.
/// 2. `page_data` object → [`Schema::Page`]; the part name is `page_data.part`.
/// 3. otherwise → [`Schema::Flat`], title only.
///
/// ```
/// let d = bilicache_descriptor::parse(r#"{"title":"Episode 1","page_data":{"part":"Intro","page":1}}"#).unwrap();
/// assert_eq!(d.part.as_deref(), Some("Intro"));
/// assert!(bilicache_descriptor::parse(b"\xff\xfe").is_err());
/// ```
#[instrument(skip(raw), fields(size = raw.as_ref().len()))]
pub fn parse(raw: impl AsRef<[u8]>) -> Result<EntryDescriptor> {
    let text = std::str::from_utf8(raw.as_ref()).or_raise(|| ErrorKind::Encoding)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.trim().is_empty() {
        exn::bail!(ErrorKind::Empty);
    }
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            let kind = ErrorKind::Syntax { line: e.line(), column: e.column() };
            return Err(e).or_raise(|| kind);
        },
    };
    if !value.is_object() {
        exn::bail!(ErrorKind::Schema);
    }
    let raw = RawEntry::deserialize(value).or_raise(|| ErrorKind::Schema)?;
    let descriptor = normalise(raw);
    if descriptor.title.is_none() && descriptor.part.is_none() {
        exn::bail!(ErrorKind::Untitled);
    }
    tracing::trace!(schema = ?descriptor.schema, title = ?descriptor.title, part = ?descriptor.part, "Parsed descriptor");
    Ok(descriptor)
}

fn normalise(raw: RawEntry) -> EntryDescriptor {
    let RawEntry { title, owner_name, bvid, avid, page_data, ep } = raw;
    match (ep, page_data) {
        (Some(ep), _) => EntryDescriptor {
            schema: Schema::Episode,
            title,
            page: ep.index.as_deref().and_then(|i| i.parse().ok()),
            part: ep.index_title.or(ep.index),
            owner: owner_name,
            bvid: ep.bvid.or(bvid),
            avid: ep.av_id.or(avid),
        },
        (None, Some(page)) => EntryDescriptor {
            schema: Schema::Page,
            title,
            part: page.part,
            page: page.page,
            owner: owner_name,
            bvid,
            avid,
        },
        (None, None) => EntryDescriptor {
            schema: Schema::Flat,
            title,
            part: None,
            page: None,
            owner: owner_name,
            bvid,
            avid,
        },
    }
}
