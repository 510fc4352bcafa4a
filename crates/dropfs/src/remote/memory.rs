//! In-memory remote.
//!
//! Behaves like the provider for everything the filesystem layer relies on:
//! case-insensitive paths, implicit creation of missing ancestor folders,
//! paginated listings with continuation cursors, per-version revision tags,
//! and the provider's error payloads. All data is lost when dropped.

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};

use super::client::{RemoteClient, RemoteResult};
use super::content_hash::content_hash;
use super::error::{
    CreateFolderError, DeleteError, DownloadError, Endpoint, GetMetadataError, ListFolderContinueError,
    ListFolderError, LookupError, RemoteError, UploadError, WriteConflictError, WriteError,
};
use super::types::{
    FileMetadata, FolderMetadata, ListFolderResult, RemoteMediaInfo, RemoteMetadata, WriteMode,
};

/// Default number of entries per listing page.
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Unfinished listings kept before the oldest cursor is dropped.
const MAX_OPEN_CURSORS: usize = 64;

/// Stored file version.
#[derive(Debug, Clone)]
struct StoredFile {
    display: String,
    id: String,
    data: Vec<u8>,
    rev: String,
    server_modified: DateTime<Utc>,
    client_modified: DateTime<Utc>,
    media_info: Option<RemoteMediaInfo>,
}

impl StoredFile {
    fn metadata(&self, key: &str) -> FileMetadata {
        FileMetadata {
            name: leaf(&self.display).to_string(),
            id: self.id.clone(),
            path_display: Some(self.display.clone()),
            path_lower: Some(key.to_string()),
            rev: self.rev.clone(),
            size: self.data.len() as u64,
            server_modified: self.server_modified,
            client_modified: self.client_modified,
            content_hash: Some(content_hash(&self.data)),
            media_info: self.media_info.clone(),
        }
    }
}

/// Stored object.
#[derive(Debug, Clone)]
enum Node {
    Folder { display: String, id: String },
    File(StoredFile),
}

impl Node {
    fn is_folder(&self) -> bool {
        matches!(self, Node::Folder { .. })
    }

    fn metadata(&self, key: &str) -> RemoteMetadata {
        match self {
            Node::Folder { display, id } => {
                RemoteMetadata::Folder(folder_metadata(display, id, key))
            }
            Node::File(file) => RemoteMetadata::File(file.metadata(key)),
        }
    }
}

fn folder_metadata(display: &str, id: &str, key: &str) -> FolderMetadata {
    FolderMetadata {
        name: leaf(display).to_string(),
        id: id.to_string(),
        path_display: Some(display.to_string()),
        path_lower: Some(key.to_string()),
    }
}

#[derive(Debug, Default)]
struct State {
    /// Objects keyed by lower-cased path. The root is implicit.
    nodes: BTreeMap<String, Node>,
    /// Remaining pages per unfinished listing. Cursor names sort by age.
    cursors: BTreeMap<String, VecDeque<Vec<RemoteMetadata>>>,
    injected: HashMap<Endpoint, VecDeque<RemoteError>>,
    calls: HashMap<Endpoint, usize>,
    counter: u64,
}

impl State {
    /// Count a call and return a pending injected failure, if any.
    fn enter(&mut self, endpoint: Endpoint) -> RemoteResult<()> {
        *self.calls.entry(endpoint).or_default() += 1;
        match self.injected.get_mut(&endpoint).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn next(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }

    fn next_id(&mut self) -> String {
        format!("id:{:016x}", self.next())
    }

    fn next_rev(&mut self) -> String {
        format!("{:012x}", 0x015c_0000_0000 + self.next())
    }

    /// Name a cursor for `pages`. Only listings with pages left are
    /// remembered; a finished cursor continues to `Reset`.
    fn open_cursor(&mut self, pages: VecDeque<Vec<RemoteMetadata>>) -> String {
        let cursor = format!("cursor-{:016x}", self.next());
        if !pages.is_empty() {
            self.cursors.insert(cursor.clone(), pages);
            while self.cursors.len() > MAX_OPEN_CURSORS {
                self.cursors.pop_first();
            }
        }
        cursor
    }

    /// Whether any ancestor of `key` is a file.
    fn file_ancestor(&self, key: &str) -> bool {
        ancestors(key).any(|a| matches!(self.nodes.get(a), Some(Node::File(_))))
    }

    /// Create every missing ancestor folder of `display`.
    fn ensure_ancestors(&mut self, display: &str) {
        let missing: Vec<(String, String)> = ancestors(display)
            .map(|a| (a.to_lowercase(), a.to_string()))
            .filter(|(key, _)| !self.nodes.contains_key(key))
            .collect();
        for (ancestor, ancestor_display) in missing {
            let id = self.next_id();
            self.nodes.insert(
                ancestor,
                Node::Folder {
                    display: ancestor_display,
                    id,
                },
            );
        }
    }

    fn children(&self, key: &str) -> Vec<RemoteMetadata> {
        self.nodes
            .iter()
            .filter(|(k, _)| parent_key(k) == key)
            .map(|(k, node)| node.metadata(k))
            .collect()
    }
}

/// In-memory implementation of [`RemoteClient`].
///
/// Thread-safe via an internal mutex. Test hooks allow seeding content,
/// injecting failures per endpoint and counting calls.
#[derive(Debug)]
pub struct MemoryRemote {
    state: Mutex<State>,
    page_size: usize,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    /// Create an empty remote.
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create an empty remote whose listings return at most `page_size`
    /// entries per page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: page_size.max(1),
        }
    }

    /// Store a file directly, creating ancestors. Returns its revision.
    pub fn put_file(&self, path: &str, data: &[u8]) -> String {
        let key = key_of(path).unwrap_or_default();
        let display = display_of(path);
        let mut state = self.state.lock();
        state.ensure_ancestors(&display);
        let id = state.next_id();
        let rev = state.next_rev();
        let now = now();
        state.nodes.insert(
            key,
            Node::File(StoredFile {
                display,
                id,
                data: data.to_vec(),
                rev: rev.clone(),
                server_modified: now,
                client_modified: now,
                media_info: None,
            }),
        );
        rev
    }

    /// Create a folder directly, with ancestors.
    pub fn put_folder(&self, path: &str) {
        let key = key_of(path).unwrap_or_default();
        let display = display_of(path);
        let mut state = self.state.lock();
        state.ensure_ancestors(&display);
        let id = state.next_id();
        state.nodes.insert(key, Node::Folder { display, id });
    }

    /// Attach media metadata to an existing file.
    pub fn set_media_info(&self, path: &str, info: RemoteMediaInfo) -> bool {
        let key = key_of(path).unwrap_or_default();
        let mut state = self.state.lock();
        match state.nodes.get_mut(&key) {
            Some(Node::File(file)) => {
                file.media_info = Some(info);
                true
            }
            _ => false,
        }
    }

    /// Current content of a file, bypassing call accounting.
    pub fn file_content(&self, path: &str) -> Option<Vec<u8>> {
        let key = key_of(path)?;
        match self.state.lock().nodes.get(&key) {
            Some(Node::File(file)) => Some(file.data.clone()),
            _ => None,
        }
    }

    /// Whether anything exists at `path`, bypassing call accounting.
    pub fn contains(&self, path: &str) -> bool {
        key_of(path).is_some_and(|key| key.is_empty() || self.state.lock().nodes.contains_key(&key))
    }

    /// Make the next call to `endpoint` fail with `err`.
    pub fn inject_error(&self, endpoint: Endpoint, err: RemoteError) {
        self.state
            .lock()
            .injected
            .entry(endpoint)
            .or_default()
            .push_back(err);
    }

    /// Number of calls made to `endpoint`.
    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.state.lock().calls.get(&endpoint).copied().unwrap_or(0)
    }

    /// Total number of calls across all endpoints.
    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.values().sum()
    }

    /// Forget all call counts.
    pub fn reset_calls(&self) {
        self.state.lock().calls.clear();
    }

    fn paginate(&self, state: &mut State, entries: Vec<RemoteMetadata>, limit: usize) -> ListFolderResult {
        let mut pages: VecDeque<Vec<RemoteMetadata>> = entries
            .chunks(limit)
            .map(<[RemoteMetadata]>::to_vec)
            .collect();
        let first = pages.pop_front().unwrap_or_default();
        let has_more = !pages.is_empty();
        let cursor = state.open_cursor(pages);
        ListFolderResult {
            entries: first,
            cursor,
            has_more,
        }
    }
}

#[async_trait]
impl RemoteClient for MemoryRemote {
    async fn get_metadata(&self, path: &str) -> RemoteResult<RemoteMetadata> {
        let mut state = self.state.lock();
        state.enter(Endpoint::GetMetadata)?;

        let lookup = |path| RemoteError::GetMetadata(GetMetadataError::Path { path });
        let key = match key_of(path) {
            Some(key) if !key.is_empty() => key,
            _ => return Err(lookup(LookupError::MalformedPath)),
        };
        state
            .nodes
            .get(&key)
            .map(|node| node.metadata(&key))
            .ok_or_else(|| lookup(LookupError::NotFound))
    }

    async fn list_folder(&self, path: &str, limit: Option<u32>) -> RemoteResult<ListFolderResult> {
        let mut state = self.state.lock();
        state.enter(Endpoint::ListFolder)?;

        let lookup = |path| RemoteError::ListFolder(ListFolderError::Path { path });
        let key = if path.is_empty() {
            String::new()
        } else {
            match key_of(path) {
                Some(key) if !key.is_empty() => key,
                _ => return Err(lookup(LookupError::MalformedPath)),
            }
        };
        if !key.is_empty() {
            match state.nodes.get(&key) {
                Some(node) if node.is_folder() => {}
                Some(_) => return Err(lookup(LookupError::NotFolder)),
                None => return Err(lookup(LookupError::NotFound)),
            }
        }

        let entries = state.children(&key);
        let limit = limit.map_or(self.page_size, |l| (l as usize).max(1));
        Ok(self.paginate(&mut state, entries, limit))
    }

    async fn list_folder_continue(&self, cursor: &str) -> RemoteResult<ListFolderResult> {
        let mut state = self.state.lock();
        state.enter(Endpoint::ListFolderContinue)?;

        let Some(mut pages) = state.cursors.remove(cursor) else {
            return Err(RemoteError::ListFolderContinue(ListFolderContinueError::Reset));
        };
        let entries = pages.pop_front().unwrap_or_default();
        let has_more = !pages.is_empty();
        let next = state.open_cursor(pages);
        Ok(ListFolderResult {
            entries,
            cursor: next,
            has_more,
        })
    }

    async fn create_folder(&self, path: &str) -> RemoteResult<FolderMetadata> {
        let mut state = self.state.lock();
        state.enter(Endpoint::CreateFolder)?;

        let write = |path| RemoteError::CreateFolder(CreateFolderError::Path { path });
        let conflict = |conflict| write(WriteError::Conflict { conflict });
        let key = match key_of(path) {
            Some(key) if !key.is_empty() => key,
            _ => return Err(write(WriteError::MalformedPath)),
        };
        match state.nodes.get(&key) {
            Some(Node::Folder { .. }) => return Err(conflict(WriteConflictError::Folder)),
            Some(Node::File(_)) => return Err(conflict(WriteConflictError::File)),
            None => {}
        }
        if state.file_ancestor(&key) {
            return Err(conflict(WriteConflictError::FileAncestor));
        }

        let display = display_of(path);
        state.ensure_ancestors(&display);
        let id = state.next_id();
        let meta = folder_metadata(&display, &id, &key);
        state.nodes.insert(key, Node::Folder { display, id });
        Ok(meta)
    }

    async fn delete(&self, path: &str) -> RemoteResult<RemoteMetadata> {
        let mut state = self.state.lock();
        state.enter(Endpoint::Delete)?;

        let lookup = |path_lookup| RemoteError::Delete(DeleteError::PathLookup { path_lookup });
        let key = match key_of(path) {
            Some(key) if !key.is_empty() => key,
            _ => return Err(lookup(LookupError::MalformedPath)),
        };
        let Some(node) = state.nodes.remove(&key) else {
            return Err(lookup(LookupError::NotFound));
        };
        let prefix = format!("{key}/");
        state.nodes.retain(|k, _| !k.starts_with(&prefix));
        Ok(node.metadata(&key))
    }

    async fn download(&self, path: &str) -> RemoteResult<(FileMetadata, Vec<u8>)> {
        let mut state = self.state.lock();
        state.enter(Endpoint::Download)?;

        let lookup = |path| RemoteError::Download(DownloadError::Path { path });
        let key = match key_of(path) {
            Some(key) if !key.is_empty() => key,
            _ => return Err(lookup(LookupError::MalformedPath)),
        };
        match state.nodes.get(&key) {
            Some(Node::File(file)) => Ok((file.metadata(&key), file.data.clone())),
            Some(Node::Folder { .. }) => Err(lookup(LookupError::NotFile)),
            None => Err(lookup(LookupError::NotFound)),
        }
    }

    async fn upload(
        &self,
        data: Vec<u8>,
        path: &str,
        mode: WriteMode,
        client_modified: DateTime<Utc>,
    ) -> RemoteResult<FileMetadata> {
        let mut state = self.state.lock();
        state.enter(Endpoint::Upload)?;

        let write = |reason| RemoteError::Upload(UploadError::Path { reason });
        let conflict = |conflict| write(WriteError::Conflict { conflict });
        let key = match key_of(path) {
            Some(key) if !key.is_empty() => key,
            _ => return Err(write(WriteError::MalformedPath)),
        };
        if state.file_ancestor(&key) {
            return Err(conflict(WriteConflictError::FileAncestor));
        }

        let existing_rev = match state.nodes.get(&key) {
            Some(Node::Folder { .. }) => return Err(conflict(WriteConflictError::Folder)),
            Some(Node::File(file)) => Some(file.rev.as_str()),
            None => None,
        };
        match (&mode, existing_rev) {
            (WriteMode::Add, Some(_)) => return Err(conflict(WriteConflictError::File)),
            (WriteMode::Update(expected), current) if current != Some(expected.as_str()) => {
                return Err(conflict(WriteConflictError::File));
            }
            _ => {}
        }

        let display = display_of(path);
        state.ensure_ancestors(&display);
        let id = match state.nodes.get(&key) {
            Some(Node::File(file)) => file.id.clone(),
            _ => state.next_id(),
        };
        let rev = state.next_rev();
        let file = StoredFile {
            display,
            id,
            data,
            rev,
            server_modified: now(),
            client_modified: client_modified.trunc_subsecs(0),
            media_info: None,
        };
        let meta = file.metadata(&key);
        state.nodes.insert(key, Node::File(file));
        Ok(meta)
    }
}

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Lookup key for a path: lower-cased, no trailing slash, `""` for root.
/// `None` for paths that are not absolute.
fn key_of(path: &str) -> Option<String> {
    if !path.starts_with('/') {
        return None;
    }
    Some(path.trim_end_matches('/').to_lowercase())
}

fn display_of(path: &str) -> String {
    path.trim_end_matches('/').to_string()
}

fn leaf(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn parent_key(key: &str) -> &str {
    key.rfind('/').map_or("", |idx| &key[..idx])
}

/// Proper ancestors of `path`, excluding the root, shortest first.
fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/')
        .map(|(idx, _)| &path[..idx])
        .filter(|a| !a.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_and_download() {
        let remote = MemoryRemote::new();
        let meta = remote
            .upload(b"hello".to_vec(), "/Docs/a.txt", WriteMode::Add, Utc::now())
            .await
            .unwrap();
        assert_eq!(meta.name, "a.txt");
        assert_eq!(meta.size, 5);

        let (downloaded, data) = remote.download("/docs/A.TXT").await.unwrap();
        assert_eq!(data, b"hello");
        assert_eq!(downloaded.rev, meta.rev);

        // Ancestor folder was created implicitly
        let folder = remote.get_metadata("/docs").await.unwrap();
        assert!(folder.is_folder());
        assert_eq!(folder.name(), "Docs");
    }

    #[tokio::test]
    async fn test_update_requires_matching_revision() {
        let remote = MemoryRemote::new();
        let rev = remote.put_file("/a.txt", b"v1");

        let meta = remote
            .upload(b"v2".to_vec(), "/a.txt", WriteMode::Update(rev.clone()), Utc::now())
            .await
            .unwrap();
        assert_ne!(meta.rev, rev);

        // Stale revision now conflicts
        let err = remote
            .upload(b"v3".to_vec(), "/a.txt", WriteMode::Update(rev), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RemoteError::Upload(UploadError::Path {
                reason: WriteError::Conflict {
                    conflict: WriteConflictError::File
                }
            })
        ));
        assert_eq!(remote.file_content("/a.txt").unwrap(), b"v2");
    }

    #[tokio::test]
    async fn test_add_conflicts_with_existing_file() {
        let remote = MemoryRemote::new();
        remote.put_file("/a.txt", b"v1");
        let err = remote
            .upload(b"v2".to_vec(), "/a.txt", WriteMode::Add, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Upload(_)));

        remote
            .upload(b"v2".to_vec(), "/a.txt", WriteMode::Overwrite, Utc::now())
            .await
            .unwrap();
        assert_eq!(remote.file_content("/a.txt").unwrap(), b"v2");
    }

    #[tokio::test]
    async fn test_listing_pages() {
        let remote = MemoryRemote::with_page_size(2);
        for name in ["a", "b", "c", "d", "e"] {
            remote.put_file(&format!("/dir/{name}"), name.as_bytes());
        }

        let mut page = remote.list_folder("/dir", None).await.unwrap();
        let mut names: Vec<String> = page.entries.iter().map(|e| e.name().to_string()).collect();
        while page.has_more {
            page = remote.list_folder_continue(&page.cursor).await.unwrap();
            names.extend(page.entries.iter().map(|e| e.name().to_string()));
        }
        assert_eq!(names, ["a", "b", "c", "d", "e"]);
        assert_eq!(remote.calls(Endpoint::ListFolderContinue), 2);
    }

    #[tokio::test]
    async fn test_drained_listings_release_cursors() {
        let remote = MemoryRemote::with_page_size(1);
        remote.put_file("/dir/a", b"");
        remote.put_file("/dir/b", b"");

        for _ in 0..100 {
            let mut page = remote.list_folder("/dir", None).await.unwrap();
            while page.has_more {
                page = remote.list_folder_continue(&page.cursor).await.unwrap();
            }
        }
        assert!(remote.state.lock().cursors.is_empty());

        // Single-page listings never hold a cursor
        remote.list_folder("/", None).await.unwrap();
        assert!(remote.state.lock().cursors.is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_cursors_are_bounded() {
        let remote = MemoryRemote::with_page_size(1);
        remote.put_file("/dir/a", b"");
        remote.put_file("/dir/b", b"");

        let first = remote.list_folder("/dir", None).await.unwrap();
        for _ in 0..MAX_OPEN_CURSORS {
            remote.list_folder("/dir", None).await.unwrap();
        }
        assert_eq!(remote.state.lock().cursors.len(), MAX_OPEN_CURSORS);

        // The oldest abandoned listing was evicted
        let err = remote.list_folder_continue(&first.cursor).await.unwrap_err();
        assert_eq!(
            err,
            RemoteError::ListFolderContinue(ListFolderContinueError::Reset)
        );
    }

    #[tokio::test]
    async fn test_list_errors() {
        let remote = MemoryRemote::new();
        remote.put_file("/file.txt", b"x");

        let err = remote.list_folder("/missing", None).await.unwrap_err();
        assert!(err.is_not_found());

        let err = remote.list_folder("/file.txt", None).await.unwrap_err();
        assert_eq!(err.lookup(), Some(&LookupError::NotFolder));

        let err = remote.list_folder_continue("bogus").await.unwrap_err();
        assert_eq!(
            err,
            RemoteError::ListFolderContinue(ListFolderContinueError::Reset)
        );
    }

    #[tokio::test]
    async fn test_delete_is_recursive() {
        let remote = MemoryRemote::new();
        remote.put_file("/dir/sub/a.txt", b"a");
        remote.put_file("/dirty.txt", b"b");

        remote.delete("/dir").await.unwrap();
        assert!(!remote.contains("/dir"));
        assert!(!remote.contains("/dir/sub/a.txt"));
        assert!(remote.contains("/dirty.txt"));

        let err = remote.delete("/dir").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_create_folder_conflicts() {
        let remote = MemoryRemote::new();
        remote.put_file("/f", b"x");
        remote.create_folder("/d").await.unwrap();

        let err = remote.create_folder("/d").await.unwrap_err();
        assert!(matches!(err, RemoteError::CreateFolder(_)));

        let err = remote.create_folder("/f/sub").await.unwrap_err();
        assert_eq!(
            err,
            RemoteError::CreateFolder(CreateFolderError::Path {
                path: WriteError::Conflict {
                    conflict: WriteConflictError::FileAncestor
                }
            })
        );
    }

    #[tokio::test]
    async fn test_injected_error_is_returned_once() {
        let remote = MemoryRemote::new();
        remote.put_file("/a", b"x");
        remote.inject_error(Endpoint::GetMetadata, RemoteError::Transport("boom".into()));

        assert!(remote.get_metadata("/a").await.is_err());
        assert!(remote.get_metadata("/a").await.is_ok());
        assert_eq!(remote.calls(Endpoint::GetMetadata), 2);
    }

    #[test]
    fn test_ancestors() {
        let all: Vec<_> = ancestors("/a/b/c").collect();
        assert_eq!(all, ["/a", "/a/b"]);
        assert_eq!(parent_key("/a/b"), "/a");
        assert_eq!(parent_key("/a"), "");
    }
}
