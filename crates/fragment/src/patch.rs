use crate::error::{ErrorKind, Result};
use crate::name::Container;
use crate::{flv, mp4};

/// Bytes the mobile client prepends to every `.m4s` fragment: nine ASCII
/// zeroes, found by inspecting downloaded caches.
pub const VENDOR_MAGIC: &[u8] = b"000000000";

/// Where a fragment sits in the concatenation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Carries the container header for the whole stream.
    First,
    /// Contributes payload only.
    Subsequent,
}
impl Position {
    pub fn of(index: usize) -> Self {
        if index == 0 { Self::First } else { Self::Subsequent }
    }
}

/// Removes the vendor prefix from fragments and validates what's left.
///
/// The magic is configuration rather than a hard-coded constant so that a
/// client update changing it only needs a config change. Payload bytes are
/// never modified: patching only decides the offset at which forwarding
/// starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPatcher {
    magic: Vec<u8>,
    require_prefix: bool,
}
impl Default for HeaderPatcher {
    fn default() -> Self {
        Self::new(VENDOR_MAGIC)
    }
}
impl HeaderPatcher {
    pub fn new(magic: impl Into<Vec<u8>>) -> Self {
        Self { magic: magic.into(), require_prefix: true }
    }

    /// Accept `.m4s` fragments that lack the vendor prefix (for example ones
    /// already repaired by another tool) instead of rejecting them.
    pub fn with_require_prefix(mut self, require_prefix: bool) -> Self {
        self.require_prefix = require_prefix;
        self
    }

    /// Offset at which the standard container data to forward begins.
    ///
    /// ```
    /// use bilicache_fragment::{Container, HeaderPatcher, Position};
    /// let mut fragment = b"000000000".to_vec();
    /// fragment.extend_from_slice(b"\0\0\0\x10ftypiso5\0\0\0\x01");
    /// let offset = HeaderPatcher::default().offset(Container::Mp4, &fragment, Position::First).unwrap();
    /// assert_eq!(offset, 9);
    /// ```
    pub fn offset(&self, container: Container, data: &[u8], position: Position) -> Result<usize> {
        match container {
            Container::Mp4 => {
                let start = if data.starts_with(&self.magic) {
                    self.magic.len()
                } else if self.require_prefix {
                    exn::bail!(ErrorKind::MissingPrefix);
                } else {
                    0
                };
                mp4::payload_offset(data, start, position)
            },
            Container::Flv => flv::payload_offset(data, position),
        }
    }

    /// Takes ownership of a fragment's bytes and returns a view starting at
    /// its [`offset`](Self::offset).
    pub fn patch(&self, container: Container, data: Vec<u8>, position: Position) -> Result<Patched> {
        let offset = self.offset(container, &data, position)?;
        tracing::trace!(?container, ?position, size = data.len(), offset, "Fragment patched");
        Ok(Patched { data, offset })
    }
}

/// A fragment's bytes plus the offset where forwarding starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patched {
    data: Vec<u8>,
    offset: usize,
}
impl Patched {
    /// The bytes handed to the transcoder.
    pub fn payload(&self) -> &[u8] {
        &self.data[self.offset..]
    }

    pub fn len(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flv::tests::flv;
    use crate::mp4::tests::mp4_box;

    fn dash(prefix: &[u8]) -> Vec<u8> {
        let mut data = prefix.to_vec();
        data.extend(mp4_box(b"ftyp", b"iso5\0\0\0\x01iso6mp41"));
        data.extend(mp4_box(b"moov", b"mvhd"));
        data.extend(mp4_box(b"moof", b"mfhd"));
        data.extend(mp4_box(b"mdat", b"\x21\x10\x04\x60\x8c\x1c"));
        data
    }

    #[test]
    fn test_strips_exactly_the_prefix() {
        let raw = dash(VENDOR_MAGIC);
        let patched = HeaderPatcher::default().patch(Container::Mp4, raw.clone(), Position::First).unwrap();
        assert_eq!(patched.len(), raw.len() - VENDOR_MAGIC.len());
        assert_eq!(patched.payload(), &raw[9..]);
        assert_eq!(&patched.payload()[4..8], b"ftyp");
    }

    #[test]
    fn test_rejects_missing_prefix() {
        let err = HeaderPatcher::default().patch(Container::Mp4, dash(b""), Position::First).unwrap_err();
        assert_eq!(*err, ErrorKind::MissingPrefix);
        let err = HeaderPatcher::default().patch(Container::Mp4, dash(b"00000000X"), Position::First).unwrap_err();
        assert_eq!(*err, ErrorKind::MissingPrefix);
    }

    #[test]
    fn test_rejects_prefix_without_container() {
        let mut raw = VENDOR_MAGIC.to_vec();
        raw.extend(mp4_box(b"moof", b"mfhd"));
        let err = HeaderPatcher::default().patch(Container::Mp4, raw, Position::First).unwrap_err();
        assert!(matches!(*err, ErrorKind::InvalidContainer(_)));
        let mut raw = VENDOR_MAGIC.to_vec();
        raw.extend_from_slice(b"not an mp4 at all");
        assert!(HeaderPatcher::default().patch(Container::Mp4, raw, Position::First).is_err());
        let err = HeaderPatcher::default().patch(Container::Mp4, VENDOR_MAGIC.to_vec(), Position::First).unwrap_err();
        assert_eq!(*err, ErrorKind::Truncated);
    }

    #[test]
    fn test_optional_prefix() {
        let patcher = HeaderPatcher::default().with_require_prefix(false);
        let bare = dash(b"");
        assert_eq!(patcher.patch(Container::Mp4, bare.clone(), Position::First).unwrap().payload(), &bare[..]);
        assert_eq!(patcher.offset(Container::Mp4, &dash(VENDOR_MAGIC), Position::First).unwrap(), 9);
    }

    #[test]
    fn test_custom_magic() {
        let patcher = HeaderPatcher::new(b"BILI".to_vec());
        assert_eq!(patcher.offset(Container::Mp4, &dash(b"BILI"), Position::First).unwrap(), 4);
        assert!(patcher.offset(Container::Mp4, &dash(VENDOR_MAGIC), Position::First).is_err());
    }

    #[test]
    fn test_subsequent_mp4_fragment() {
        let raw = dash(VENDOR_MAGIC);
        let patched = HeaderPatcher::default().patch(Container::Mp4, raw, Position::Subsequent).unwrap();
        assert_eq!(&patched.payload()[4..8], b"moof");
    }

    #[test]
    fn test_flv_ignores_vendor_magic() {
        let raw = flv(b"\x08tag");
        let first = HeaderPatcher::default().patch(Container::Flv, raw.clone(), Position::First).unwrap();
        assert_eq!(first.payload(), &raw[..]);
        let next = HeaderPatcher::default().patch(Container::Flv, raw, Position::Subsequent).unwrap();
        assert_eq!(next.payload(), b"\x08tag");
    }

    #[test]
    fn test_position_of() {
        assert_eq!(Position::of(0), Position::First);
        assert_eq!(Position::of(1), Position::Subsequent);
    }
}
