//! Remote client trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RemoteError;
use super::types::{FileMetadata, FolderMetadata, ListFolderResult, RemoteMetadata, WriteMode};

/// Result type for remote calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Capability set of the remote storage provider.
///
/// Paths are absolute and `/`-separated, except that listing the root takes
/// the empty string. Implementations own authentication; callers never see
/// tokens.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Metadata for one object. The root has no metadata.
    async fn get_metadata(&self, path: &str) -> RemoteResult<RemoteMetadata>;

    /// First page of a folder listing. `limit` caps the page size.
    async fn list_folder(&self, path: &str, limit: Option<u32>) -> RemoteResult<ListFolderResult>;

    /// Next page of a listing started by [`RemoteClient::list_folder`].
    async fn list_folder_continue(&self, cursor: &str) -> RemoteResult<ListFolderResult>;

    /// Create a folder (and any missing ancestors).
    async fn create_folder(&self, path: &str) -> RemoteResult<FolderMetadata>;

    /// Delete a file, or a folder with everything beneath it.
    async fn delete(&self, path: &str) -> RemoteResult<RemoteMetadata>;

    /// Fetch a file's metadata and full content.
    async fn download(&self, path: &str) -> RemoteResult<(FileMetadata, Vec<u8>)>;

    /// Store `data` at `path` under the given write mode.
    async fn upload(
        &self,
        data: Vec<u8>,
        path: &str,
        mode: WriteMode,
        client_modified: DateTime<Utc>,
    ) -> RemoteResult<FileMetadata>;
}
