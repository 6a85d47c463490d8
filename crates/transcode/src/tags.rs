/// Metadata tags written into the output file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    pub title: Option<String>,
    pub album: Option<String>,
    pub artist: Option<String>,
    pub track: Option<u64>,
}
impl Tags {
    /// `(key, value)` pairs for the tags that are set.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        [
            ("title", self.title.clone()),
            ("album", self.album.clone()),
            ("artist", self.artist.clone()),
            ("track", self.track.map(|t| t.to_string())),
        ]
        .into_iter()
        .filter_map(|(key, value)| Some((key, value?)))
        .collect()
    }
}
