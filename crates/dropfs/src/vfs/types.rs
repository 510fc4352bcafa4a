//! Core VFS types.
//!
//! These are the provider-neutral shapes handed to filesystem callers.
//! Remote metadata is translated into them at the `drive` boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }

    /// Returns true if this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        matches!(self, FileType::Symlink)
    }
}

/// Photo/video metadata attached to some files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// When the photo or video was taken.
    pub time_taken: Option<DateTime<Utc>>,
    /// `(latitude, longitude)` of the capture location.
    pub location: Option<(f64, f64)>,
    /// `(width, height)` in pixels.
    pub dimensions: Option<(u64, u64)>,
}

/// Metadata for one entry of the tree.
///
/// Directories carry only a name and a kind: the provider reports no size,
/// timestamps or revisions for folders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryInfo {
    /// Leaf name (empty for the root).
    pub name: String,
    /// Entry type.
    pub kind: FileType,
    /// Size in bytes (files only).
    pub size: Option<u64>,
    /// Server-side modification time (files only).
    pub modified: Option<DateTime<Utc>>,
    /// Modification time claimed by the uploading client; unverified.
    pub client_modified: Option<DateTime<Utc>>,
    /// Provider content hash, for display and diagnostics.
    pub content_hash: Option<String>,
    /// Revision tag identifying this stored version.
    pub rev: Option<String>,
    /// Photo/video metadata, when the provider has any.
    pub media: Option<MediaInfo>,
}

impl EntryInfo {
    /// Info for a directory.
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FileType::Directory,
            size: None,
            modified: None,
            client_modified: None,
            content_hash: None,
            rev: None,
            media: None,
        }
    }

    /// Info for a file with the given size; the remaining details start empty.
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            kind: FileType::File,
            size: Some(size),
            ..Self::directory(name)
        }
    }

    /// The synthetic entry for `/`, which has no backing remote object.
    pub fn root() -> Self {
        Self::directory("")
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// Attributes a caller asks to change (for the setinfo operation).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetInfo {
    /// New modification time.
    pub modified: Option<DateTime<Utc>>,
    /// New access time.
    pub accessed: Option<DateTime<Utc>>,
}

impl SetInfo {
    /// Create a new empty SetInfo.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the modification time.
    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }
}

/// Static description of what a filesystem supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Whether `a` and `A` name the same entry.
    pub case_insensitive: bool,
    /// Characters rejected anywhere in a path.
    pub invalid_path_chars: String,
    /// Maximum path length, if known.
    pub max_path_length: Option<usize>,
    /// Maximum system path length, if there is a system path at all.
    pub max_sys_path_length: Option<usize>,
    /// Whether operations go over the network.
    pub network: bool,
    /// Whether the filesystem refuses writes.
    pub read_only: bool,
    /// Whether rename is supported.
    pub supports_rename: bool,
    /// Whether one instance may be shared across tasks.
    pub thread_safe: bool,
    /// Whether non-ASCII paths are accepted.
    pub unicode_paths: bool,
    /// Whether the filesystem exists only in memory.
    pub virtual_fs: bool,
}
