//! VFS error types.

use std::io;
use thiserror::Error;

/// VFS error type.
///
/// Every failure a [`Filesystem`](super::Filesystem) operation can report is
/// one of these kinds; provider-specific errors never cross that boundary.
#[derive(Debug, Error)]
pub enum VfsError {
    /// File or directory not found.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// Exclusive create against an existing path.
    #[error("file exists: {0}")]
    FileExists(String),

    /// Directory creation against an existing path.
    #[error("directory exists: {0}")]
    DirectoryExists(String),

    /// Expected a file, found a directory.
    #[error("path is a directory, expected a file: {0}")]
    FileExpected(String),

    /// Expected a directory, found a file.
    #[error("path is not a directory: {0}")]
    DirectoryExpected(String),

    /// Directory not empty.
    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// Attempt to remove the root directory.
    #[error("root directory may not be removed")]
    RemoveRoot,

    /// The remote provider rejected or failed the operation.
    #[error("operation failed on {path}: {reason}")]
    OperationFailed { path: String, reason: String },

    /// Malformed or unsupported open mode.
    #[error("invalid mode: {0}")]
    InvalidMode(String),

    /// Path contains characters the provider does not accept.
    #[error("path contains invalid characters: {0}")]
    InvalidCharsInPath(String),

    /// Path uses `..` to climb above the root.
    #[error("illegal back reference: {0}")]
    IllegalBackReference(String),

    /// Operation on a closed file handle.
    #[error("I/O operation on closed file")]
    FileClosed,

    /// Operation not permitted by the handle's mode.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Invalid argument.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl VfsError {
    /// Create a ResourceNotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::ResourceNotFound(path.into())
    }

    /// Create a FileExists error.
    pub fn file_exists(path: impl Into<String>) -> Self {
        Self::FileExists(path.into())
    }

    /// Create a DirectoryExists error.
    pub fn directory_exists(path: impl Into<String>) -> Self {
        Self::DirectoryExists(path.into())
    }

    /// Create a FileExpected error.
    pub fn file_expected(path: impl Into<String>) -> Self {
        Self::FileExpected(path.into())
    }

    /// Create a DirectoryExpected error.
    pub fn directory_expected(path: impl Into<String>) -> Self {
        Self::DirectoryExpected(path.into())
    }

    /// Create a DirectoryNotEmpty error.
    pub fn directory_not_empty(path: impl Into<String>) -> Self {
        Self::DirectoryNotEmpty(path.into())
    }

    /// Create an OperationFailed error.
    pub fn operation_failed(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::OperationFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an InvalidMode error.
    pub fn invalid_mode(mode: impl Into<String>) -> Self {
        Self::InvalidMode(mode.into())
    }

    /// Create an Unsupported error.
    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::Unsupported(what.into())
    }

    /// Returns true for [`VfsError::ResourceNotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound(_))
    }
}

/// Convert VfsError to std::io::Error for compatibility.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        let kind = match &e {
            VfsError::ResourceNotFound(_) => io::ErrorKind::NotFound,
            VfsError::FileExists(_) | VfsError::DirectoryExists(_) => {
                io::ErrorKind::AlreadyExists
            }
            VfsError::FileExpected(_) => io::ErrorKind::IsADirectory,
            VfsError::DirectoryExpected(_) => io::ErrorKind::NotADirectory,
            VfsError::DirectoryNotEmpty(_) => io::ErrorKind::DirectoryNotEmpty,
            VfsError::RemoveRoot => io::ErrorKind::PermissionDenied,
            VfsError::InvalidMode(_)
            | VfsError::InvalidCharsInPath(_)
            | VfsError::IllegalBackReference(_)
            | VfsError::InvalidInput(_) => io::ErrorKind::InvalidInput,
            VfsError::Unsupported(_) => io::ErrorKind::Unsupported,
            VfsError::FileClosed | VfsError::OperationFailed { .. } => io::ErrorKind::Other,
        };
        io::Error::new(kind, e)
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;
