//! Remote storage provider boundary.
//!
//! [`RemoteClient`] is the capability set the filesystem layer consumes.
//! [`MemoryRemote`] implements it in memory for tests and local use;
//! [`DropboxClient`] (feature `http`) talks to the real API.

mod client;
mod content_hash;
mod error;
#[cfg(feature = "http")]
mod http;
mod memory;
mod types;

pub use client::{RemoteClient, RemoteResult};
pub use content_hash::{BLOCK_SIZE, content_hash};
pub use error::{
    CreateFolderError, DeleteError, DownloadError, Endpoint, GetMetadataError, ListFolderContinueError,
    ListFolderError, LookupError, RemoteError, UploadError, WriteConflictError, WriteError,
};
#[cfg(feature = "http")]
pub use http::DropboxClient;
pub use memory::{DEFAULT_PAGE_SIZE, MemoryRemote};
pub use types::{
    DeletedMetadata, Dimensions, FileMetadata, FolderMetadata, GpsCoordinates, ListFolderResult,
    MediaMetadata, RemoteMediaInfo, RemoteMetadata, WriteMode,
};
