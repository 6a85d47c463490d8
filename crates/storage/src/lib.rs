//! Read-only access to a download cache tree.
//!
//! The conversion pipeline never touches the filesystem directly: everything it
//! knows about the cache comes through a [`StorageBackend`], which makes the
//! scanner a pure function over the listed files and lets tests describe a
//! whole cache tree in memory (see `MockBackend` behind the `mock` feature).

pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::models::FileInfo;
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
