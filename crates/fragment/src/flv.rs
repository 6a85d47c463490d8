//! FLV file header.
//!
//! ```text
//! "FLV" | version (1) | flags (1) | data offset (u32 BE) | PreviousTagSize0 (u32 BE, always 0) | tags…
//! ```

use crate::error::{ErrorKind, Result};
use crate::patch::Position;

const SIGNATURE: &[u8; 3] = b"FLV";
const HEADER_LEN: usize = 9;

pub(crate) fn payload_offset(data: &[u8], position: Position) -> Result<usize> {
    if data.len() < HEADER_LEN {
        exn::bail!(ErrorKind::Truncated);
    }
    if &data[..3] != SIGNATURE {
        exn::bail!(ErrorKind::InvalidContainer("missing FLV signature"));
    }
    if data[3] != 1 {
        exn::bail!(ErrorKind::InvalidContainer("unsupported FLV version"));
    }
    let header_len = u32::from_be_bytes([data[5], data[6], data[7], data[8]]) as usize;
    if header_len < HEADER_LEN {
        exn::bail!(ErrorKind::InvalidContainer("FLV header shorter than 9 bytes"));
    }
    let tags = header_len.saturating_add(4);
    if data.len() < tags {
        exn::bail!(ErrorKind::Truncated);
    }
    if data[header_len..tags] != [0; 4] {
        exn::bail!(ErrorKind::InvalidContainer("PreviousTagSize0 is not zero"));
    }
    Ok(match position {
        Position::First => 0,
        Position::Subsequent => tags,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rstest::rstest;

    /// Audio+video FLV header, PreviousTagSize0, then `tags`.
    pub(crate) fn flv(tags: &[u8]) -> Vec<u8> {
        let mut out = b"FLV\x01\x05\0\0\0\x09\0\0\0\0".to_vec();
        out.extend_from_slice(tags);
        out
    }

    #[test]
    fn test_offsets() {
        let data = flv(b"\x08tagdata");
        assert_eq!(payload_offset(&data, Position::First).unwrap(), 0);
        assert_eq!(payload_offset(&data, Position::Subsequent).unwrap(), 13);
    }

    #[test]
    fn test_extended_header() {
        let mut data = b"FLV\x01\x05\0\0\0\x0c".to_vec();
        data.extend_from_slice(b"xyz\0\0\0\0tags");
        assert_eq!(payload_offset(&data, Position::Subsequent).unwrap(), 16);
    }

    #[rstest]
    #[case::short(b"FLV\x01".to_vec(), ErrorKind::Truncated)]
    #[case::signature(b"FLX\x01\x05\0\0\0\x09\0\0\0\0".to_vec(), ErrorKind::InvalidContainer("missing FLV signature"))]
    #[case::version(b"FLV\x02\x05\0\0\0\x09\0\0\0\0".to_vec(), ErrorKind::InvalidContainer("unsupported FLV version"))]
    #[case::header_len(b"FLV\x01\x05\0\0\0\x05\0\0\0\0".to_vec(), ErrorKind::InvalidContainer("FLV header shorter than 9 bytes"))]
    #[case::no_tag_size(b"FLV\x01\x05\0\0\0\x09\0\0".to_vec(), ErrorKind::Truncated)]
    #[case::tag_size(b"FLV\x01\x05\0\0\0\x09\0\0\0\x01".to_vec(), ErrorKind::InvalidContainer("PreviousTagSize0 is not zero"))]
    fn test_rejects(#[case] data: Vec<u8>, #[case] expected: ErrorKind) {
        assert_eq!(*payload_offset(&data, Position::First).unwrap_err(), expected);
    }
}
