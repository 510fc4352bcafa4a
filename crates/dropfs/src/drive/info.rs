//! Remote metadata to [`EntryInfo`] conversion.

use crate::remote::{FileMetadata, RemoteMediaInfo, RemoteMetadata};
use crate::vfs::{EntryInfo, MediaInfo};

/// Convert a listing or lookup entry. Deleted entries have no info.
pub(crate) fn entry_info(meta: &RemoteMetadata) -> Option<EntryInfo> {
    match meta {
        RemoteMetadata::File(file) => Some(file_info(file)),
        RemoteMetadata::Folder(folder) => Some(EntryInfo::directory(&folder.name)),
        RemoteMetadata::Deleted(_) => None,
    }
}

pub(crate) fn file_info(file: &FileMetadata) -> EntryInfo {
    EntryInfo {
        modified: Some(file.server_modified),
        client_modified: Some(file.client_modified),
        content_hash: file.content_hash.clone(),
        rev: Some(file.rev.clone()),
        media: file.media_info.as_ref().and_then(media_info),
        ..EntryInfo::file(&file.name, file.size)
    }
}

// Pending extraction carries nothing yet.
fn media_info(info: &RemoteMediaInfo) -> Option<MediaInfo> {
    match info {
        RemoteMediaInfo::Pending => None,
        RemoteMediaInfo::Metadata { metadata } => Some(MediaInfo {
            time_taken: metadata.time_taken,
            location: metadata.location.map(|l| (l.latitude, l.longitude)),
            dimensions: metadata.dimensions.map(|d| (d.width, d.height)),
        }),
    }
}
