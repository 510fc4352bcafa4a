//! # dropfs
//!
//! Dropbox as a virtual filesystem.
//!
//! The crate maps a generic path-based filesystem contract onto a remote
//! file API:
//! - [`vfs`] defines the contract: [`Filesystem`], [`BinaryFile`], [`SubFs`]
//!   and the [`VfsError`] kinds
//! - [`remote`] is the provider boundary: the [`RemoteClient`] trait, its
//!   decoded error unions, an in-memory implementation and (feature `http`)
//!   the HTTP client
//! - [`drive`] implements the contract over a remote: [`RemoteFs`] and the
//!   buffered [`RemoteFile`] handle, which uploads on close only if the
//!   revision it opened is still current
//! - [`locator`] parses `dropbox://` URLs; [`config`] loads endpoint settings

pub mod config;
pub mod drive;
pub mod locator;
pub mod remote;
pub mod vfs;

pub use config::{Config, ConfigError};
pub use drive::{RemoteFile, RemoteFs};
pub use locator::{Credentials, FsLocator, LocatorError};
#[cfg(feature = "http")]
pub use locator::{OpenError, open_fs};
#[cfg(feature = "http")]
pub use remote::DropboxClient;
pub use remote::{MemoryRemote, RemoteClient, RemoteError};
pub use vfs::{
    BinaryFile, Capabilities, EntryInfo, FileType, Filesystem, MediaInfo, OpenMode, SetInfo, SubFs,
    VfsError, VfsResult,
};
