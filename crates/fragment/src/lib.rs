//! Media fragments of a cache entry.
//!
//! The mobile client stores each download as one or more fragment files next
//! to the descriptor:
//!
//! - **`.m4s`**: DASH segments (ISO-BMFF) with a vendor prefix glued onto the
//!   front, one file per elementary stream (`video.m4s`, `audio.m4s`).
//! - **`.blv`**: legacy FLV segments (`0.blv`, `1.blv`, …) muxing audio and
//!   video together.
//!
//! This crate decides which of those files make up the audio track
//! ([`select`]) and turns each of them into bytes a standard demuxer accepts
//! ([`HeaderPatcher`]), collected into a [`PatchedStream`].

pub mod error;
mod flv;
mod mp4;
mod name;
mod patch;
mod select;
mod stream;

pub use crate::name::{Container, FragmentName, Role, classify, is_fragment};
pub use crate::patch::{HeaderPatcher, Patched, Position, VENDOR_MAGIC};
pub use crate::select::{Rule, Selection, select};
pub use crate::stream::PatchedStream;
