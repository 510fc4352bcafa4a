//! Remote provider errors.
//!
//! The provider reports failures as JSON unions discriminated by `.tag`.
//! They are decoded once, at the client boundary, into the closed enums
//! below. Every union has an `Other` arm for tags this crate does not know.

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Remote API endpoints, used to pick the error shape to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    GetMetadata,
    ListFolder,
    ListFolderContinue,
    CreateFolder,
    Delete,
    Download,
    Upload,
}

impl Endpoint {
    /// Route of the endpoint, relative to the API base URL.
    pub fn route(self) -> &'static str {
        match self {
            Endpoint::GetMetadata => "files/get_metadata",
            Endpoint::ListFolder => "files/list_folder",
            Endpoint::ListFolderContinue => "files/list_folder/continue",
            Endpoint::CreateFolder => "files/create_folder_v2",
            Endpoint::Delete => "files/delete_v2",
            Endpoint::Download => "files/download",
            Endpoint::Upload => "files/upload",
        }
    }

    /// Whether the endpoint moves file content (and lives on the content host).
    pub fn is_content(self) -> bool {
        matches!(self, Endpoint::Download | Endpoint::Upload)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route())
    }
}

/// Why a path could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
pub enum LookupError {
    MalformedPath,
    NotFound,
    NotFile,
    NotFolder,
    RestrictedContent,
    UnsupportedContentType,
    Locked,
    #[serde(other)]
    Other,
}

/// What already occupies a path a write targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
pub enum WriteConflictError {
    File,
    Folder,
    FileAncestor,
    #[serde(other)]
    Other,
}

/// Why a write was refused.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
pub enum WriteError {
    MalformedPath,
    Conflict { conflict: WriteConflictError },
    NoWritePermission,
    InsufficientSpace,
    DisallowedName,
    TeamFolder,
    OperationSuppressed,
    TooManyWriteOperations,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
pub enum GetMetadataError {
    Path {
        path: LookupError,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
pub enum ListFolderError {
    Path {
        path: LookupError,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
pub enum ListFolderContinueError {
    Path {
        path: LookupError,
    },
    /// The cursor is no longer valid; the listing must restart.
    Reset,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
pub enum CreateFolderError {
    Path {
        path: WriteError,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
pub enum DeleteError {
    PathLookup {
        path_lookup: LookupError,
    },
    PathWrite {
        path_write: WriteError,
    },
    TooManyWriteOperations,
    TooManyFiles,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
pub enum DownloadError {
    Path {
        path: LookupError,
    },
    UnsupportedFile,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
pub enum UploadError {
    /// The write failed; `reason` says why.
    Path {
        reason: WriteError,
    },
    PayloadTooLarge,
    ContentHashMismatch,
    #[serde(other)]
    Other,
}

/// Error returned by a [`RemoteClient`](super::RemoteClient).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemoteError {
    #[error("get_metadata failed: {0:?}")]
    GetMetadata(GetMetadataError),

    #[error("list_folder failed: {0:?}")]
    ListFolder(ListFolderError),

    #[error("list_folder/continue failed: {0:?}")]
    ListFolderContinue(ListFolderContinueError),

    #[error("create_folder failed: {0:?}")]
    CreateFolder(CreateFolderError),

    #[error("delete failed: {0:?}")]
    Delete(DeleteError),

    #[error("download failed: {0:?}")]
    Download(DownloadError),

    #[error("upload failed: {0:?}")]
    Upload(UploadError),

    /// Credentials were rejected or could not be refreshed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The request did not produce an API response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider returned an error body this crate cannot decode.
    #[error("unrecognized error from {endpoint}: {summary}")]
    Unrecognized { endpoint: Endpoint, summary: String },
}

#[derive(Deserialize)]
struct ApiErrorEnvelope<T> {
    #[serde(default)]
    error_summary: String,
    error: T,
}

impl RemoteError {
    /// Decode an endpoint-specific error body.
    ///
    /// Bodies that do not match the endpoint's union become
    /// [`RemoteError::Unrecognized`] carrying whatever summary is readable.
    pub fn decode(endpoint: Endpoint, body: &[u8]) -> Self {
        fn parse<T: for<'de> Deserialize<'de>>(body: &[u8]) -> Option<T> {
            serde_json::from_slice::<ApiErrorEnvelope<T>>(body)
                .ok()
                .map(|envelope| envelope.error)
        }

        let decoded = match endpoint {
            Endpoint::GetMetadata => parse(body).map(RemoteError::GetMetadata),
            Endpoint::ListFolder => parse(body).map(RemoteError::ListFolder),
            Endpoint::ListFolderContinue => parse(body).map(RemoteError::ListFolderContinue),
            Endpoint::CreateFolder => parse(body).map(RemoteError::CreateFolder),
            Endpoint::Delete => parse(body).map(RemoteError::Delete),
            Endpoint::Download => parse(body).map(RemoteError::Download),
            Endpoint::Upload => parse(body).map(RemoteError::Upload),
        };

        decoded.unwrap_or_else(|| {
            let summary = serde_json::from_slice::<ApiErrorEnvelope<serde_json::Value>>(body)
                .map(|envelope| envelope.error_summary)
                .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());
            RemoteError::Unrecognized { endpoint, summary }
        })
    }

    /// The lookup failure carried by this error, if it is one.
    pub fn lookup(&self) -> Option<&LookupError> {
        match self {
            RemoteError::GetMetadata(GetMetadataError::Path { path })
            | RemoteError::ListFolder(ListFolderError::Path { path })
            | RemoteError::ListFolderContinue(ListFolderContinueError::Path { path })
            | RemoteError::Download(DownloadError::Path { path }) => Some(path),
            RemoteError::Delete(DeleteError::PathLookup { path_lookup }) => Some(path_lookup),
            _ => None,
        }
    }

    /// Whether this error means the target path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self.lookup(), Some(LookupError::NotFound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_not_found() {
        let body = br#"{"error_summary": "path/not_found/..", "error": {".tag": "path", "path": {".tag": "not_found"}}}"#;
        let err = RemoteError::decode(Endpoint::GetMetadata, body);
        assert_eq!(
            err,
            RemoteError::GetMetadata(GetMetadataError::Path {
                path: LookupError::NotFound
            })
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_decode_not_folder() {
        let body = br#"{"error_summary": "path/not_folder/", "error": {".tag": "path", "path": {".tag": "not_folder"}}}"#;
        let err = RemoteError::decode(Endpoint::ListFolder, body);
        assert_eq!(err.lookup(), Some(&LookupError::NotFolder));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_decode_upload_conflict() {
        let body = br#"{
            "error_summary": "path/conflict/file/..",
            "error": {
                ".tag": "path",
                "reason": {".tag": "conflict", "conflict": {".tag": "file"}},
                "upload_session_id": "AAAAAAAAAAuTl8ilDAtc3A"
            }
        }"#;
        let err = RemoteError::decode(Endpoint::Upload, body);
        assert_eq!(
            err,
            RemoteError::Upload(UploadError::Path {
                reason: WriteError::Conflict {
                    conflict: WriteConflictError::File
                }
            })
        );
    }

    #[test]
    fn test_decode_delete_lookup() {
        let body = br#"{"error_summary": "path_lookup/not_found/", "error": {".tag": "path_lookup", "path_lookup": {".tag": "not_found"}}}"#;
        let err = RemoteError::decode(Endpoint::Delete, body);
        assert!(err.is_not_found());
    }

    #[test]
    fn test_decode_unknown_tags_fall_back() {
        let body = br#"{"error_summary": "path/brand_new/", "error": {".tag": "path", "path": {".tag": "brand_new"}}}"#;
        let err = RemoteError::decode(Endpoint::Download, body);
        assert_eq!(
            err,
            RemoteError::Download(DownloadError::Path {
                path: LookupError::Other
            })
        );

        let body = br#"{"error_summary": "shiny/", "error": {".tag": "shiny"}}"#;
        let err = RemoteError::decode(Endpoint::CreateFolder, body);
        assert_eq!(err, RemoteError::CreateFolder(CreateFolderError::Other));
    }

    #[test]
    fn test_decode_garbage_is_unrecognized() {
        let err = RemoteError::decode(Endpoint::Delete, b"<html>bad gateway</html>");
        assert!(matches!(
            err,
            RemoteError::Unrecognized {
                endpoint: Endpoint::Delete,
                ..
            }
        ));

        let body = br#"{"error_summary": "weird/", "error": 42}"#;
        let err = RemoteError::decode(Endpoint::Upload, body);
        assert_eq!(
            err,
            RemoteError::Unrecognized {
                endpoint: Endpoint::Upload,
                summary: "weird/".into()
            }
        );
    }
}
