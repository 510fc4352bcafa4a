//! The remote-backed filesystem.
//!
//! [`RemoteFs`] implements [`Filesystem`](crate::vfs::Filesystem) over any
//! [`RemoteClient`](crate::remote::RemoteClient); [`RemoteFile`] is the
//! buffered handle its `openbin` returns.

mod file;
mod filesystem;
mod info;

pub use file::RemoteFile;
pub use filesystem::{INVALID_PATH_CHARS, RemoteFs};
