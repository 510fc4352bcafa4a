//! Filesystem contract traits.
//!
//! [`Filesystem`] is the path-based operation set every provider exposes;
//! [`BinaryFile`] is the handle returned by [`Filesystem::openbin`].

use async_trait::async_trait;
use std::io::SeekFrom;
use std::ops::Range;

use super::mode::OpenMode;
use super::subfs::SubFs;
use super::types::{Capabilities, EntryInfo, SetInfo};
use super::{VfsError, VfsResult};

/// Core filesystem operations.
///
/// Paths are `/`-separated; relative paths are taken relative to the
/// filesystem root.
#[async_trait]
pub trait Filesystem: Send + Sync {
    // ========================================================================
    // Reading
    // ========================================================================

    /// Get metadata for a path.
    async fn getinfo(&self, path: &str) -> VfsResult<EntryInfo>;

    /// List the names of a directory's immediate children.
    async fn listdir(&self, path: &str) -> VfsResult<Vec<String>>;

    /// List a directory's immediate children with their metadata.
    ///
    /// `page` selects a `start..end` window of the full listing.
    async fn scandir(&self, path: &str, page: Option<Range<usize>>) -> VfsResult<Vec<EntryInfo>>;

    /// Open a file for binary access with a mode string such as `"rb"`.
    async fn openbin(&self, path: &str, mode: &str) -> VfsResult<Box<dyn BinaryFile>>;

    // ========================================================================
    // Writing
    // ========================================================================

    /// Change metadata on a path.
    async fn setinfo(&self, path: &str, info: &SetInfo) -> VfsResult<()>;

    /// Create a directory and return a view bound to it.
    ///
    /// With `recreate`, an existing directory is not an error.
    async fn makedir(&self, path: &str, recreate: bool) -> VfsResult<SubFs>;

    /// Remove a file.
    async fn remove(&self, path: &str) -> VfsResult<()>;

    /// Remove an empty directory.
    async fn removedir(&self, path: &str) -> VfsResult<()>;

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Describe what this filesystem supports.
    fn capabilities(&self) -> Capabilities;

    // ========================================================================
    // Convenience methods (default implementations)
    // ========================================================================

    /// Check if a path exists.
    async fn exists(&self, path: &str) -> VfsResult<bool> {
        match self.getinfo(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Check if a path exists and is a directory.
    async fn isdir(&self, path: &str) -> VfsResult<bool> {
        match self.getinfo(path).await {
            Ok(info) => Ok(info.is_dir()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Check if a path exists and is a file.
    async fn isfile(&self, path: &str) -> VfsResult<bool> {
        match self.getinfo(path).await {
            Ok(info) => Ok(info.is_file()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Read entire file contents.
    async fn readbytes(&self, path: &str) -> VfsResult<Vec<u8>> {
        let mut file = self.openbin(path, "rb").await?;
        let data = file.read_to_end();
        file.close().await?;
        data
    }

    /// Replace a file's contents, creating it if needed.
    async fn writebytes(&self, path: &str, data: &[u8]) -> VfsResult<()> {
        let mut file = self.openbin(path, "wb").await?;
        if let Err(e) = file.write(data) {
            // Nothing was buffered; closing only releases the handle.
            let _ = file.close().await;
            return Err(e);
        }
        file.close().await
    }
}

/// An open file.
///
/// Reads, writes and seeks act on local state; [`BinaryFile::close`] is where
/// buffered changes are committed. Every operation after close fails with
/// [`VfsError::FileClosed`].
#[async_trait]
pub trait BinaryFile: Send + std::fmt::Debug {
    /// The mode the file was opened with, or `None` once closed.
    fn mode(&self) -> Option<&OpenMode>;

    /// Whether the handle has been closed.
    fn is_closed(&self) -> bool;

    /// Read up to `buf.len()` bytes from the current position.
    fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize>;

    /// Read from the current position to the end.
    fn read_to_end(&mut self) -> VfsResult<Vec<u8>>;

    /// Write `data` at the current position, returning the bytes written.
    fn write(&mut self, data: &[u8]) -> VfsResult<usize>;

    /// Move the cursor, returning the new absolute position.
    fn seek(&mut self, pos: SeekFrom) -> VfsResult<u64>;

    /// Current cursor position.
    fn tell(&self) -> VfsResult<u64>;

    /// Resize the file to `size` bytes (the current position if `None`).
    ///
    /// Growing pads with zero bytes and leaves the cursor where it was.
    /// Returns the new size.
    fn truncate(&mut self, size: Option<u64>) -> VfsResult<u64>;

    /// Commit and release the handle. Idempotent.
    async fn close(&mut self) -> VfsResult<()>;
}

/// Fail with [`VfsError::FileClosed`] when `closed` is set.
pub(crate) fn ensure_open(closed: bool) -> VfsResult<()> {
    if closed {
        Err(VfsError::FileClosed)
    } else {
        Ok(())
    }
}
