//! Just enough ISO-BMFF to find where media starts.

use crate::error::{ErrorKind, Result};
use crate::patch::Position;

pub(crate) const FTYP: [u8; 4] = *b"ftyp";
const MOOV: [u8; 4] = *b"moov";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BoxHeader {
    pub kind: [u8; 4],
    /// Size of the whole box, header included.
    pub size: usize,
}

/// Reads and validates the box header starting at `at`.
///
/// A box must be at least as large as its own header and must end within
/// `data`. A 32-bit size of `1` means a 64-bit size follows the type; `0`
/// means the box runs to the end of the data.
pub(crate) fn read_box(data: &[u8], at: usize) -> Result<BoxHeader> {
    let remaining = data.len().saturating_sub(at);
    if remaining < 8 {
        exn::bail!(ErrorKind::Truncated);
    }
    let head = &data[at..];
    let kind = [head[4], head[5], head[6], head[7]];
    if !kind.iter().all(|b| (0x20..=0x7e).contains(b)) {
        exn::bail!(ErrorKind::InvalidContainer("box type is not a four-character code"));
    }
    let size = match u32::from_be_bytes([head[0], head[1], head[2], head[3]]) {
        0 => remaining,
        1 => {
            if remaining < 16 {
                exn::bail!(ErrorKind::Truncated);
            }
            let mut large = [0; 8];
            large.copy_from_slice(&head[8..16]);
            let large = u64::from_be_bytes(large);
            if large < 16 {
                exn::bail!(ErrorKind::InvalidContainer("box smaller than its header"));
            }
            // Anything beyond usize can't possibly be in bounds.
            usize::try_from(large).unwrap_or(usize::MAX)
        },
        n if n < 8 => exn::bail!(ErrorKind::InvalidContainer("box smaller than its header")),
        n => n as usize,
    };
    if size > remaining {
        exn::bail!(ErrorKind::Truncated);
    }
    Ok(BoxHeader { kind, size })
}

/// Offset of the first byte to forward, given that container data starts at
/// `start`.
///
/// The first fragment must open with `ftyp`. Later fragments may repeat the
/// initialisation boxes, which are skipped so the transcoder sees one
/// initialisation segment followed by media.
pub(crate) fn payload_offset(data: &[u8], start: usize, position: Position) -> Result<usize> {
    let first = read_box(data, start)?;
    match position {
        Position::First if first.kind != FTYP => {
            exn::bail!(ErrorKind::InvalidContainer("missing ftyp box"))
        },
        Position::First => Ok(start),
        Position::Subsequent => {
            let mut at = start;
            let mut current = first;
            while current.kind == FTYP || current.kind == MOOV {
                at += current.size;
                if at == data.len() {
                    exn::bail!(ErrorKind::InvalidContainer("no media after initialisation boxes"));
                }
                current = read_box(data, at)?;
            }
            Ok(at)
        },
    }
}
