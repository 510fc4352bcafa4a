//! Filesystem over a remote client.
//!
//! [`RemoteFs`] enforces the [`Filesystem`] contract (existence, type and
//! emptiness checks) on top of a [`RemoteClient`], and translates the
//! provider's error unions into [`VfsError`] kinds. No provider error
//! escapes this module.

use async_trait::async_trait;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

use super::file::RemoteFile;
use super::info::entry_info;
use crate::remote::{
    CreateFolderError, LookupError, RemoteClient, RemoteError, RemoteMetadata, WriteError,
};
use crate::vfs::path;
use crate::vfs::{
    BinaryFile, Capabilities, EntryInfo, Filesystem, OpenMode, SetInfo, SubFs, VfsError,
    VfsResult,
};

/// Characters the provider rejects in paths.
pub const INVALID_PATH_CHARS: &str = ":";

/// A [`Filesystem`] backed by a remote storage provider.
///
/// Cheap to clone; clones share the client and the operation guard.
#[derive(Clone)]
pub struct RemoteFs {
    client: Arc<dyn RemoteClient>,
    /// Serializes check-then-act sequences issued through this instance.
    guard: Arc<Mutex<()>>,
    list_page_limit: Option<u32>,
}

impl fmt::Debug for RemoteFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteFs")
            .field("list_page_limit", &self.list_page_limit)
            .finish_non_exhaustive()
    }
}

impl RemoteFs {
    pub fn new(client: impl RemoteClient + 'static) -> Self {
        Self::from_client(Arc::new(client))
    }

    /// Wrap a shared client.
    pub fn from_client(client: Arc<dyn RemoteClient>) -> Self {
        Self {
            client,
            guard: Arc::new(Mutex::new(())),
            list_page_limit: None,
        }
    }

    /// Ask the provider for at most `limit` entries per listing page.
    pub fn with_list_page_limit(mut self, limit: u32) -> Self {
        self.list_page_limit = Some(limit);
        self
    }

    pub fn client(&self) -> &Arc<dyn RemoteClient> {
        &self.client
    }

    /// Open a directory as a view rooted at it.
    pub async fn opendir(&self, path: &str) -> VfsResult<SubFs> {
        let path = resolve(path)?;
        let info = self.getinfo(&path).await?;
        if !info.is_dir() {
            return Err(VfsError::directory_expected(path));
        }
        self.subfs(&path)
    }

    fn subfs(&self, path: &str) -> VfsResult<SubFs> {
        SubFs::new(Arc::new(self.clone()), path)
    }

    /// Info for `path`, or `None` if it does not exist.
    async fn lookup(&self, path: &str) -> VfsResult<Option<EntryInfo>> {
        match self.getinfo(path).await {
            Ok(info) => Ok(Some(info)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Collect every entry of a folder, following continuation cursors.
    async fn list_all(&self, path: &str) -> VfsResult<Vec<RemoteMetadata>> {
        let mut page = self
            .client
            .list_folder(path::remote_token(path), self.list_page_limit)
            .await
            .map_err(|e| listing_error(path, e))?;
        let mut entries = std::mem::take(&mut page.entries);

        let mut rounds = 1;
        while page.has_more {
            page = self
                .client
                .list_folder_continue(&page.cursor)
                .await
                .map_err(|e| listing_error(path, e))?;
            entries.append(&mut page.entries);
            rounds += 1;
        }
        debug!(path, entries = entries.len(), rounds, "listed folder");
        Ok(entries)
    }

    /// Whether a folder has at least one child. Stops at the first
    /// non-empty page.
    async fn has_children(&self, path: &str) -> VfsResult<bool> {
        let mut page = self
            .client
            .list_folder(path::remote_token(path), self.list_page_limit)
            .await
            .map_err(|e| listing_error(path, e))?;
        loop {
            if page.entries.iter().any(|e| entry_info(e).is_some()) {
                return Ok(true);
            }
            if !page.has_more {
                return Ok(false);
            }
            page = self
                .client
                .list_folder_continue(&page.cursor)
                .await
                .map_err(|e| listing_error(path, e))?;
        }
    }
}

#[async_trait]
impl Filesystem for RemoteFs {
    #[tracing::instrument(skip(self), name = "dropfs.getinfo")]
    async fn getinfo(&self, path: &str) -> VfsResult<EntryInfo> {
        let path = resolve(path)?;
        if path::is_root(&path) {
            return Ok(EntryInfo::root());
        }

        match self.client.get_metadata(&path).await {
            Ok(meta) => entry_info(&meta).ok_or_else(|| VfsError::not_found(&path)),
            Err(e) => Err(lookup_error(&path, e)),
        }
    }

    #[tracing::instrument(skip(self), name = "dropfs.listdir")]
    async fn listdir(&self, path: &str) -> VfsResult<Vec<String>> {
        let path = resolve(path)?;
        Ok(self
            .list_all(&path)
            .await?
            .iter()
            .filter_map(entry_info)
            .map(|info| info.name)
            .collect())
    }

    #[tracing::instrument(skip(self), name = "dropfs.scandir")]
    async fn scandir(&self, path: &str, page: Option<Range<usize>>) -> VfsResult<Vec<EntryInfo>> {
        let path = resolve(path)?;
        let entries = self.list_all(&path).await?;
        let infos = entries.iter().filter_map(entry_info);
        Ok(match page {
            Some(range) => infos
                .skip(range.start)
                .take(range.end.saturating_sub(range.start))
                .collect(),
            None => infos.collect(),
        })
    }

    #[tracing::instrument(skip(self), name = "dropfs.openbin")]
    async fn openbin(&self, path: &str, mode: &str) -> VfsResult<Box<dyn BinaryFile>> {
        let mode = OpenMode::parse_binary(mode)?;
        let path = resolve(path)?;
        let _guard = self.guard.lock().await;

        let existing = self.lookup(&path).await?;
        if mode.exclusive && existing.is_some() {
            return Err(VfsError::file_exists(path));
        }
        match &existing {
            None if !mode.create => return Err(VfsError::not_found(path)),
            Some(info) if info.is_dir() => return Err(VfsError::file_expected(path)),
            _ => {}
        }
        if mode.writing {
            let parent = self.getinfo(path::dirname(&path)).await?;
            if !parent.is_dir() {
                return Err(VfsError::directory_expected(path::dirname(&path)));
            }
        }

        let file = RemoteFile::open(Arc::clone(&self.client), &path, mode).await?;
        Ok(Box::new(file))
    }

    #[tracing::instrument(skip(self, _info), name = "dropfs.setinfo")]
    async fn setinfo(&self, path: &str, _info: &SetInfo) -> VfsResult<()> {
        // The provider has no settable attributes; only existence is checked.
        self.getinfo(path).await.map(|_| ())
    }

    #[tracing::instrument(skip(self), name = "dropfs.makedir")]
    async fn makedir(&self, path: &str, recreate: bool) -> VfsResult<SubFs> {
        let path = resolve(path)?;
        let _guard = self.guard.lock().await;

        match self.lookup(&path).await? {
            Some(info) if info.is_dir() && recreate => return self.subfs(&path),
            Some(_) => return Err(VfsError::directory_exists(path)),
            None => {}
        }

        let parent = path::dirname(&path);
        match self.lookup(parent).await? {
            Some(info) if info.is_dir() => {}
            Some(_) => return Err(VfsError::directory_expected(parent)),
            None => return Err(VfsError::not_found(parent)),
        }

        match self.client.create_folder(&path).await {
            Ok(_) => {
                debug!(path = %path, "created folder");
                self.subfs(&path)
            }
            Err(RemoteError::CreateFolder(CreateFolderError::Path {
                path: WriteError::Conflict { .. },
            })) => Err(VfsError::directory_exists(path)),
            Err(e @ RemoteError::CreateFolder(_)) => Err(VfsError::operation_failed(path, e)),
            Err(e) => Err(non_api_error("create_folder", &path, e)),
        }
    }

    #[tracing::instrument(skip(self), name = "dropfs.remove")]
    async fn remove(&self, path: &str) -> VfsResult<()> {
        let path = resolve(path)?;
        let _guard = self.guard.lock().await;

        if self.getinfo(&path).await?.is_dir() {
            return Err(VfsError::file_expected(path));
        }
        match self.client.delete(&path).await {
            Ok(_) => Ok(()),
            Err(RemoteError::Delete(_)) => Err(VfsError::file_expected(path)),
            Err(e) => Err(non_api_error("delete", &path, e)),
        }
    }

    #[tracing::instrument(skip(self), name = "dropfs.removedir")]
    async fn removedir(&self, path: &str) -> VfsResult<()> {
        let path = resolve(path)?;
        if path::is_root(&path) {
            return Err(VfsError::RemoveRoot);
        }
        let _guard = self.guard.lock().await;

        if !self.getinfo(&path).await?.is_dir() {
            return Err(VfsError::directory_expected(path));
        }
        if self.has_children(&path).await? {
            return Err(VfsError::directory_not_empty(path));
        }
        match self.client.delete(&path).await {
            Ok(_) => Ok(()),
            Err(RemoteError::Delete(_)) => Err(VfsError::directory_expected(path)),
            Err(e) => Err(non_api_error("delete", &path, e)),
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            case_insensitive: true,
            invalid_path_chars: INVALID_PATH_CHARS.to_string(),
            max_path_length: None,
            max_sys_path_length: None,
            network: true,
            read_only: false,
            supports_rename: false,
            thread_safe: true,
            unicode_paths: true,
            virtual_fs: false,
        }
    }
}

fn resolve(path: &str) -> VfsResult<String> {
    path::validate(path, INVALID_PATH_CHARS)
}

/// Translate a metadata lookup failure. Any lookup result means the path
/// cannot be resolved.
fn lookup_error(path: &str, err: RemoteError) -> VfsError {
    match err {
        RemoteError::GetMetadata(_) if err.lookup().is_some() => VfsError::not_found(path),
        RemoteError::GetMetadata(_) => VfsError::operation_failed(path, err),
        other => non_api_error("get_metadata", path, other),
    }
}

/// Translate a listing failure.
fn listing_error(path: &str, err: RemoteError) -> VfsError {
    if !matches!(err, RemoteError::ListFolder(_) | RemoteError::ListFolderContinue(_)) {
        return non_api_error("list_folder", path, err);
    }
    match err.lookup() {
        Some(LookupError::NotFolder) => VfsError::directory_expected(path),
        Some(_) => VfsError::not_found(path),
        None => VfsError::operation_failed(path, &err),
    }
}

/// Failures that are not the endpoint's own error union. A union from a
/// different endpoint means the client broke its contract.
fn non_api_error(call: &str, path: &str, err: RemoteError) -> VfsError {
    match err {
        RemoteError::Auth(_) | RemoteError::Transport(_) | RemoteError::Unrecognized { .. } => {
            VfsError::operation_failed(path, err)
        }
        _ => {
            error!(call, path, error = %err, "remote returned an error for a different endpoint");
            VfsError::operation_failed(path, err)
        }
    }
}
