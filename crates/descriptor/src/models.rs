/// Separator placed between the video title and the part name.
pub const NAME_SEPARATOR: &str = " - ";

/// Which descriptor shape an [`EntryDescriptor`] was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schema {
    /// Regular uploads: a `page_data` object carries the part name of one page
    /// of a multi-page video.
    Page,
    /// Bangumi/series: an `ep` object carries the episode index and title.
    Episode,
    /// A bare title and nothing else.
    Flat,
}

/// Normalised naming information for one cache entry.
///
/// Empty strings never make it in here; a missing field is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDescriptor {
    pub schema: Schema,
    /// Video (or series) title
    pub title: Option<String>,
    /// Part or episode name
    pub part: Option<String>,
    /// Page number or episode index
    pub page: Option<u64>,
    /// Uploader name
    pub owner: Option<String>,
    /// `BV…` identifier
    pub bvid: Option<String>,
    /// Numeric `av` identifier
    pub avid: Option<u64>,
}
impl EntryDescriptor {
    /// Human-readable name: `"<title> - <part>"`, or whichever of the two is
    /// present. A part name identical to the title is not repeated (single-page
    /// uploads often duplicate it).
    ///
    /// ```
    /// # use bilicache_descriptor::{EntryDescriptor, Schema};
    /// let d = EntryDescriptor {
    ///     schema: Schema::Page,
    ///     title: Some("Episode 1".into()),
    ///     part: Some("Intro".into()),
    ///     page: Some(1), owner: None, bvid: None, avid: None,
    /// };
    /// assert_eq!(d.display_name().as_deref(), Some("Episode 1 - Intro"));
    /// ```
    pub fn display_name(&self) -> Option<String> {
        match (self.title.as_deref(), self.part.as_deref()) {
            (Some(title), Some(part)) if title == part => Some(title.to_string()),
            (Some(title), Some(part)) => Some(format!("{title}{NAME_SEPARATOR}{part}")),
            (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
            (None, None) => None,
        }
    }
}
