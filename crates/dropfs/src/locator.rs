//! `dropbox://` locators.
//!
//! ```text
//! dropbox://[label]/[subtree]?access_token=TOKEN
//! dropbox://[label]/[subtree]?refresh_token=TOKEN&app_key=KEY[&app_secret=SECRET]
//! ```
//!
//! The authority is a free-form label (an account name, say) and is ignored.
//! The subtree is the path after it: `dropbox:///Photos/2024` and
//! `dropbox://work/Photos/2024` both bind the filesystem to `/Photos/2024`.

use percent_encoding::percent_decode_str;
use std::fmt;
use thiserror::Error;
use url::Url;

use crate::vfs::path;

pub const SCHEME: &str = "dropbox";

/// Errors parsing a locator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocatorError {
    #[error("invalid locator: {0}")]
    Invalid(String),

    #[error("unsupported scheme: {0} (expected {SCHEME}://)")]
    Scheme(String),

    #[error("missing credentials: pass access_token, or refresh_token with app_key")]
    MissingCredentials,

    #[error("conflicting credentials: {0}")]
    ConflictingCredentials(&'static str),

    #[error("invalid subtree: {0}")]
    Subtree(String),
}

/// How the client authenticates.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Long-lived or pre-issued bearer token.
    AccessToken(String),
    /// Refresh token exchanged for short-lived access tokens.
    RefreshToken {
        refresh_token: String,
        app_key: String,
        app_secret: Option<String>,
    },
}

// Tokens stay out of logs and panics.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::AccessToken(_) => f.write_str("AccessToken(..)"),
            Credentials::RefreshToken { app_key, .. } => f
                .debug_struct("RefreshToken")
                .field("app_key", app_key)
                .finish_non_exhaustive(),
        }
    }
}

/// Parsed `dropbox://` locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsLocator {
    pub credentials: Credentials,
    /// Normalized absolute subtree, `None` for the whole account.
    pub root: Option<String>,
}

impl FsLocator {
    pub fn parse(input: &str) -> Result<Self, LocatorError> {
        let url = Url::parse(input).map_err(|e| LocatorError::Invalid(e.to_string()))?;
        if url.scheme() != SCHEME {
            return Err(LocatorError::Scheme(url.scheme().to_string()));
        }

        let mut access_token = None;
        let mut refresh_token = None;
        let mut app_key = None;
        let mut app_secret = None;
        for (key, value) in url.query_pairs() {
            let slot = match key.as_ref() {
                "access_token" => &mut access_token,
                "refresh_token" => &mut refresh_token,
                "app_key" => &mut app_key,
                "app_secret" => &mut app_secret,
                _ => continue,
            };
            *slot = Some(value.into_owned()).filter(|v| !v.is_empty());
        }

        let credentials = match (access_token, refresh_token) {
            (Some(_), Some(_)) => {
                return Err(LocatorError::ConflictingCredentials(
                    "access_token and refresh_token are mutually exclusive",
                ));
            }
            (Some(token), None) => Credentials::AccessToken(token),
            (None, Some(refresh_token)) => Credentials::RefreshToken {
                refresh_token,
                app_key: app_key.ok_or(LocatorError::MissingCredentials)?,
                app_secret,
            },
            (None, None) => return Err(LocatorError::MissingCredentials),
        };

        let raw = percent_decode_str(url.path())
            .decode_utf8()
            .map_err(|_| LocatorError::Invalid(format!("non-UTF-8 path {}", url.path())))?;
        let root = if raw.trim_matches('/').is_empty() {
            None
        } else {
            Some(path::normalize(&raw).map_err(|e| LocatorError::Subtree(e.to_string()))?)
        };

        Ok(Self { credentials, root })
    }
}

impl std::str::FromStr for FsLocator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Open a filesystem for a `dropbox://` locator.
///
/// Returns a sub-view when the locator names a subtree.
#[cfg(feature = "http")]
pub async fn open_fs(
    locator: &str,
    config: &crate::config::Config,
) -> Result<std::sync::Arc<dyn crate::vfs::Filesystem>, OpenError> {
    use std::sync::Arc;

    use crate::drive::RemoteFs;
    use crate::remote::DropboxClient;

    let locator = FsLocator::parse(locator)?;
    let client = DropboxClient::new(locator.credentials, config)?;
    let mut fs = RemoteFs::new(client);
    if let Some(limit) = config.list_page_limit {
        fs = fs.with_list_page_limit(limit);
    }

    match locator.root {
        Some(root) => Ok(Arc::new(fs.opendir(&root).await?)),
        None => Ok(Arc::new(fs)),
    }
}

/// Errors from [`open_fs`].
#[cfg(feature = "http")]
#[derive(Debug, Error)]
pub enum OpenError {
    #[error(transparent)]
    Locator(#[from] LocatorError),

    #[error(transparent)]
    Remote(#[from] crate::remote::RemoteError),

    #[error(transparent)]
    Vfs(#[from] crate::vfs::VfsError),
}
