//! Open remote files.
//!
//! A [`RemoteFile`] downloads its object once when opened and holds it in a
//! local buffer. Reads, writes, seeks and truncation touch only the buffer.
//! Closing a writable handle uploads the whole buffer in one call,
//! conditioned on the revision seen at open time so that a concurrent writer
//! is detected instead of silently overwritten.

use async_trait::async_trait;
use chrono::Utc;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use tracing::{debug, warn};

use super::info::file_info;
use crate::remote::{RemoteClient, WriteMode};
use crate::vfs::{BinaryFile, EntryInfo, OpenMode, VfsError, VfsResult, ensure_open};

/// Buffered handle on one remote file.
pub struct RemoteFile {
    client: Option<Arc<dyn RemoteClient>>,
    path: Option<String>,
    mode: Option<OpenMode>,
    buffer: Cursor<Vec<u8>>,
    /// Revision observed at open; `None` when the file did not exist.
    rev: Option<String>,
    closed: bool,
    uploaded: Option<EntryInfo>,
}

impl std::fmt::Debug for RemoteFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFile")
            .field("path", &self.path)
            .field("mode", &self.mode.as_ref().map(OpenMode::as_str))
            .field("rev", &self.rev)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl RemoteFile {
    /// Open `path` with `mode`, downloading any existing content.
    ///
    /// A missing file is not an error here: it is a new file that will be
    /// created on close. Existence and type checks belong to the caller.
    pub async fn open(client: Arc<dyn RemoteClient>, path: &str, mode: OpenMode) -> VfsResult<Self> {
        let (rev, data) = match client.download(path).await {
            Ok((meta, data)) => (Some(meta.rev), data),
            Err(e) if e.is_not_found() => (None, Vec::new()),
            Err(e) => return Err(VfsError::operation_failed(path, e)),
        };
        debug!(path, rev = ?rev, bytes = data.len(), mode = %mode, "opened remote file");

        let data = if mode.keeps_content() { data } else { Vec::new() };
        let mut buffer = Cursor::new(data);
        if mode.appending {
            buffer.set_position(buffer.get_ref().len() as u64);
        }

        Ok(Self {
            client: Some(client),
            path: Some(path.to_string()),
            mode: Some(mode),
            buffer,
            rev,
            closed: false,
            uploaded: None,
        })
    }

    /// Path the handle is bound to, until closed.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Revision observed when the file was opened.
    pub fn base_revision(&self) -> Option<&str> {
        self.rev.as_deref()
    }

    /// Metadata reported by the upload at close, if it succeeded.
    pub fn info(&self) -> Option<&EntryInfo> {
        self.uploaded.as_ref()
    }

    fn open_mode(&self) -> VfsResult<&OpenMode> {
        ensure_open(self.closed)?;
        self.mode.as_ref().ok_or(VfsError::FileClosed)
    }

    fn check_readable(&self) -> VfsResult<()> {
        if self.open_mode()?.reading {
            Ok(())
        } else {
            Err(VfsError::unsupported("file not open for reading"))
        }
    }

    fn check_writable(&self) -> VfsResult<()> {
        if self.open_mode()?.writing {
            Ok(())
        } else {
            Err(VfsError::unsupported("file not open for writing"))
        }
    }

    fn io_error(&self, e: io::Error) -> VfsError {
        VfsError::operation_failed(self.path.as_deref().unwrap_or_default(), e)
    }
}

#[async_trait]
impl BinaryFile for RemoteFile {
    fn mode(&self) -> Option<&OpenMode> {
        self.mode.as_ref()
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize> {
        self.check_readable()?;
        self.buffer.read(buf).map_err(|e| self.io_error(e))
    }

    fn read_to_end(&mut self) -> VfsResult<Vec<u8>> {
        self.check_readable()?;
        let mut out = Vec::new();
        self.buffer
            .read_to_end(&mut out)
            .map_err(|e| self.io_error(e))?;
        Ok(out)
    }

    fn write(&mut self, data: &[u8]) -> VfsResult<usize> {
        self.check_writable()?;
        self.buffer.write(data).map_err(|e| self.io_error(e))
    }

    fn seek(&mut self, pos: SeekFrom) -> VfsResult<u64> {
        ensure_open(self.closed)?;
        self.buffer.seek(pos).map_err(|e| match e.kind() {
            io::ErrorKind::InvalidInput => {
                VfsError::InvalidInput(format!("cannot seek to {pos:?}: before start of file"))
            }
            _ => self.io_error(e),
        })
    }

    fn tell(&self) -> VfsResult<u64> {
        ensure_open(self.closed)?;
        Ok(self.buffer.position())
    }

    fn truncate(&mut self, size: Option<u64>) -> VfsResult<u64> {
        self.check_writable()?;
        let position = self.buffer.position();
        let size = size.unwrap_or(position);
        let len = usize::try_from(size)
            .map_err(|_| VfsError::InvalidInput(format!("truncate size {size} too large")))?;

        // Vec::resize covers both directions; growth is zero-filled.
        self.buffer.get_mut().resize(len, 0);
        self.buffer.set_position(position);
        Ok(size)
    }

    async fn close(&mut self) -> VfsResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let client = self.client.take();
        let path = self.path.take();
        let mode = self.mode.take();
        let data = std::mem::take(self.buffer.get_mut());
        self.buffer.set_position(0);

        let (Some(client), Some(path), Some(mode)) = (client, path, mode) else {
            return Ok(());
        };
        if !mode.writing {
            return Ok(());
        }

        // Exclusive handles never replace an object, even one that appeared
        // after the existence check.
        let write_mode = if mode.exclusive {
            WriteMode::Add
        } else {
            WriteMode::for_revision(self.rev.as_deref())
        };
        debug!(path = %path, bytes = data.len(), mode = ?write_mode, "uploading on close");
        let meta = client
            .upload(data, &path, write_mode, Utc::now())
            .await
            .map_err(|e| VfsError::operation_failed(&path, e))?;
        self.uploaded = Some(file_info(&meta));
        Ok(())
    }
}

impl Drop for RemoteFile {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if self.mode.as_ref().is_some_and(|m| m.writing) {
            warn!(
                path = self.path.as_deref().unwrap_or_default(),
                "remote file dropped without close; buffered changes discarded"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{Endpoint, MemoryRemote, RemoteError};

    async fn open(remote: &Arc<MemoryRemote>, path: &str, mode: &str) -> RemoteFile {
        let client: Arc<dyn RemoteClient> = remote.clone();
        RemoteFile::open(client, path, OpenMode::parse(mode).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_read_existing() {
        let remote = Arc::new(MemoryRemote::new());
        remote.put_file("/a.txt", b"hello world");

        let mut file = open(&remote, "/a.txt", "rb").await;
        let mut buf = [0u8; 5];
        assert_eq!(file.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
        assert_eq!(file.read_to_end().unwrap(), b" world");

        // Read-only handles never upload
        file.close().await.unwrap();
        assert_eq!(remote.calls(Endpoint::Upload), 0);
    }

    #[tokio::test]
    async fn test_mode_gates_access() {
        let remote = Arc::new(MemoryRemote::new());
        remote.put_file("/a.txt", b"abc");

        let mut file = open(&remote, "/a.txt", "rb").await;
        assert!(matches!(file.write(b"x"), Err(VfsError::Unsupported(_))));
        assert!(matches!(file.truncate(Some(0)), Err(VfsError::Unsupported(_))));

        let mut file = open(&remote, "/b.txt", "wb").await;
        let mut buf = [0u8; 1];
        assert!(matches!(file.read(&mut buf), Err(VfsError::Unsupported(_))));
        file.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_write_mode_starts_empty_and_updates_revision() {
        let remote = Arc::new(MemoryRemote::new());
        let rev = remote.put_file("/a.txt", b"old content");

        let mut file = open(&remote, "/a.txt", "wb").await;
        assert_eq!(file.base_revision(), Some(rev.as_str()));
        assert_eq!(file.tell().unwrap(), 0);
        file.write(b"new").unwrap();
        file.close().await.unwrap();

        assert_eq!(remote.file_content("/a.txt").unwrap(), b"new");
        let info = file.info().unwrap();
        assert_eq!(info.size, Some(3));
        assert_ne!(info.rev.as_deref(), Some(rev.as_str()));
    }

    #[tokio::test]
    async fn test_append_positions_at_end() {
        let remote = Arc::new(MemoryRemote::new());
        remote.put_file("/log", b"AAA");

        let mut file = open(&remote, "/log", "ab").await;
        assert_eq!(file.tell().unwrap(), 3);
        file.write(b"BBB").unwrap();
        file.close().await.unwrap();
        assert_eq!(remote.file_content("/log").unwrap(), b"AAABBB");
    }

    #[tokio::test]
    async fn test_seek_before_start_is_invalid() {
        let remote = Arc::new(MemoryRemote::new());
        remote.put_file("/a", b"abc");

        let mut file = open(&remote, "/a", "rb").await;
        assert!(matches!(
            file.seek(SeekFrom::Current(-1)),
            Err(VfsError::InvalidInput(_))
        ));
        assert_eq!(file.seek(SeekFrom::End(-1)).unwrap(), 2);
        assert_eq!(file.read_to_end().unwrap(), b"c");
    }

    #[tokio::test]
    async fn test_truncate_shrink_and_default_size() {
        let remote = Arc::new(MemoryRemote::new());
        remote.put_file("/a", b"abcdef");

        let mut file = open(&remote, "/a", "rb+").await;
        file.seek(SeekFrom::Start(2)).unwrap();
        assert_eq!(file.truncate(None).unwrap(), 2);
        assert_eq!(file.tell().unwrap(), 2);
        file.close().await.unwrap();
        assert_eq!(remote.file_content("/a").unwrap(), b"ab");
    }

    #[tokio::test]
    async fn test_write_past_end_zero_fills() {
        let remote = Arc::new(MemoryRemote::new());
        let mut file = open(&remote, "/gap", "wb").await;
        file.seek(SeekFrom::Start(2)).unwrap();
        file.write(b"x").unwrap();
        file.close().await.unwrap();
        assert_eq!(remote.file_content("/gap").unwrap(), b"\0\0x");
    }

    #[tokio::test]
    async fn test_closed_handle_rejects_everything() {
        let remote = Arc::new(MemoryRemote::new());
        let mut file = open(&remote, "/a", "wb").await;
        file.close().await.unwrap();
        assert!(file.is_closed());
        assert!(file.mode().is_none());
        assert!(file.path().is_none());

        let mut buf = [0u8; 1];
        assert!(matches!(file.read(&mut buf), Err(VfsError::FileClosed)));
        assert!(matches!(file.write(b"x"), Err(VfsError::FileClosed)));
        assert!(matches!(file.tell(), Err(VfsError::FileClosed)));

        // Second close is a no-op
        file.close().await.unwrap();
        assert_eq!(remote.calls(Endpoint::Upload), 1);
    }

    #[tokio::test]
    async fn test_failed_upload_still_closes() {
        let remote = Arc::new(MemoryRemote::new());
        remote.inject_error(Endpoint::Upload, RemoteError::Transport("reset".into()));

        let mut file = open(&remote, "/a", "wb").await;
        file.write(b"data").unwrap();
        let err = file.close().await.unwrap_err();
        assert!(matches!(err, VfsError::OperationFailed { .. }));
        assert!(file.is_closed());
        assert!(file.info().is_none());
        assert!(!remote.contains("/a"));
    }

    #[tokio::test]
    async fn test_exclusive_never_replaces_existing() {
        let remote = Arc::new(MemoryRemote::new());
        // Created by someone else after the caller checked for existence
        remote.put_file("/late", b"theirs");

        let mut file = open(&remote, "/late", "xb").await;
        assert!(file.base_revision().is_some());
        file.write(b"ours").unwrap();

        let err = file.close().await.unwrap_err();
        assert!(matches!(err, VfsError::OperationFailed { .. }));
        assert_eq!(remote.file_content("/late").unwrap(), b"theirs");
    }

    #[tokio::test]
    async fn test_download_failure_is_operation_failed() {
        let remote = Arc::new(MemoryRemote::new());
        remote.inject_error(Endpoint::Download, RemoteError::Transport("timeout".into()));

        let client: Arc<dyn RemoteClient> = remote.clone();
        let err = RemoteFile::open(client, "/a", OpenMode::read())
            .await
            .unwrap_err();
        assert!(matches!(err, VfsError::OperationFailed { .. }));
    }
}
