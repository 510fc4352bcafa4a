//! Remote object metadata, as the provider reports it.
//!
//! Field names and `.tag` discriminators follow the provider's JSON so the
//! HTTP client can deserialize responses directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for any remote object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
pub enum RemoteMetadata {
    File(FileMetadata),
    Folder(FolderMetadata),
    Deleted(DeletedMetadata),
}

impl RemoteMetadata {
    /// Leaf name of the object.
    pub fn name(&self) -> &str {
        match self {
            RemoteMetadata::File(f) => &f.name,
            RemoteMetadata::Folder(f) => &f.name,
            RemoteMetadata::Deleted(d) => &d.name,
        }
    }

    /// Returns true for folders.
    pub fn is_folder(&self) -> bool {
        matches!(self, RemoteMetadata::Folder(_))
    }
}

/// A stored file version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub path_display: Option<String>,
    #[serde(default)]
    pub path_lower: Option<String>,
    /// Revision tag of this version.
    pub rev: String,
    pub size: u64,
    pub server_modified: DateTime<Utc>,
    pub client_modified: DateTime<Utc>,
    #[serde(default)]
    pub content_hash: Option<String>,
    #[serde(default)]
    pub media_info: Option<RemoteMediaInfo>,
}

/// A folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderMetadata {
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub path_display: Option<String>,
    #[serde(default)]
    pub path_lower: Option<String>,
}

/// A deleted object (only returned when deleted entries are requested).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletedMetadata {
    pub name: String,
    #[serde(default)]
    pub path_display: Option<String>,
    #[serde(default)]
    pub path_lower: Option<String>,
}

/// Photo/video metadata state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
pub enum RemoteMediaInfo {
    /// Still being extracted by the provider.
    Pending,
    Metadata { metadata: MediaMetadata },
}

/// Extracted photo/video metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub location: Option<GpsCoordinates>,
    #[serde(default)]
    pub time_taken: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub height: u64,
    pub width: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// One page of a folder listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListFolderResult {
    pub entries: Vec<RemoteMetadata>,
    /// Continuation token for the next page.
    pub cursor: String,
    /// Whether another page is available via the cursor.
    pub has_more: bool,
}

/// How an upload treats an existing object at the target path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteMode {
    /// Create; fail with a conflict if a file already exists.
    Add,
    /// Replace whatever is there.
    Overwrite,
    /// Replace only if the current revision matches.
    Update(String),
}

impl WriteMode {
    /// The write mode for a handle that observed `rev` when it was opened.
    pub fn for_revision(rev: Option<&str>) -> Self {
        match rev {
            Some(rev) => WriteMode::Update(rev.to_string()),
            None => WriteMode::Add,
        }
    }
}
