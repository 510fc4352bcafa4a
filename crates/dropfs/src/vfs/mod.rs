//! Virtual filesystem contract.
//!
//! This module defines the provider-neutral surface callers program against:
//!
//! - [`Filesystem`] - Path-based operations (info, listing, open, remove)
//! - [`BinaryFile`] - Handle returned by [`Filesystem::openbin`]
//! - [`SubFs`] - A view of one directory of a parent filesystem
//! - [`VfsError`] - The failure kinds every operation reports
//!
//! ## Design Decisions
//!
//! - **Handles buffer locally**: reads, writes and seeks on a [`BinaryFile`]
//!   are synchronous; only open and close may talk to the backing store.
//! - **String paths**: paths are `/`-separated strings, not host paths, so
//!   behaviour is identical on every platform.

mod error;
mod mode;
mod ops;
pub mod path;
mod subfs;
mod types;

pub use error::{VfsError, VfsResult};
pub use mode::OpenMode;
pub(crate) use ops::ensure_open;
pub use ops::{BinaryFile, Filesystem};
pub use subfs::SubFs;
pub use types::{Capabilities, EntryInfo, FileType, MediaInfo, SetInfo};
