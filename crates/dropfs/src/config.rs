//! Client configuration.
//!
//! Read from `~/.config/dropfs/config.toml` (or the platform equivalent).
//! Every field is optional; a missing file yields the defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Endpoint and transport settings for the remote client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL for RPC endpoints.
    pub api_base: String,
    /// Base URL for content (upload/download) endpoints.
    pub content_base: String,
    /// Token endpoint used to exchange refresh tokens.
    pub oauth_url: String,
    /// Per-request transport timeout.
    pub timeout_secs: u64,
    /// Page size hint for folder listings.
    pub list_page_limit: Option<u32>,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "https://api.dropboxapi.com/2".into(),
            content_base: "https://content.dropboxapi.com/2".into(),
            oauth_url: "https://api.dropboxapi.com/oauth2/token".into(),
            timeout_secs: 30,
            list_page_limit: None,
            user_agent: concat!("dropfs/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl Config {
    /// Default config file location (`<config_dir>/dropfs/config.toml`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("dropfs").join("config.toml"))
    }

    /// Load from the default location, falling back to defaults when there
    /// is no config directory or no file.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("no config directory available, using default config");
                Ok(Self::default())
            }
        }
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
