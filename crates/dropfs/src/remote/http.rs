//! Dropbox HTTP client.
//!
//! RPC endpoints take a JSON body at `api_base`; content endpoints take their
//! argument as JSON in the `Dropbox-API-Arg` header at `content_base`, with
//! file bytes as the request or response body. A 409 response carries an
//! endpoint-specific error union.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use super::client::{RemoteClient, RemoteResult};
use super::error::{Endpoint, RemoteError};
use super::types::{FileMetadata, FolderMetadata, ListFolderResult, RemoteMetadata, WriteMode};
use crate::config::Config;
use crate::locator::Credentials;

const API_ARG_HEADER: &str = "Dropbox-API-Arg";
const API_RESULT_HEADER: &str = "Dropbox-API-Result";

/// Refresh this long before the provider says a token expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

enum Auth {
    Static(String),
    Refresh {
        refresh_token: String,
        app_key: String,
        app_secret: Option<String>,
        cached: Mutex<Option<CachedToken>>,
    },
}

/// [`RemoteClient`] over the Dropbox v2 HTTP API.
pub struct DropboxClient {
    http: Client,
    api_base: String,
    content_base: String,
    oauth_url: String,
    auth: Auth,
}

impl fmt::Debug for DropboxClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DropboxClient")
            .field("api_base", &self.api_base)
            .field("content_base", &self.content_base)
            .finish_non_exhaustive()
    }
}

impl DropboxClient {
    pub fn new(credentials: Credentials, config: &Config) -> RemoteResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let auth = match credentials {
            Credentials::AccessToken(token) => Auth::Static(token),
            Credentials::RefreshToken {
                refresh_token,
                app_key,
                app_secret,
            } => Auth::Refresh {
                refresh_token,
                app_key,
                app_secret,
                cached: Mutex::new(None),
            },
        };

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            content_base: config.content_base.trim_end_matches('/').to_string(),
            oauth_url: config.oauth_url.clone(),
            auth,
        })
    }

    fn url(&self, endpoint: Endpoint) -> String {
        let base = if endpoint.is_content() {
            &self.content_base
        } else {
            &self.api_base
        };
        format!("{base}/{}", endpoint.route())
    }

    /// Current bearer token, exchanging the refresh token when needed.
    async fn bearer(&self) -> RemoteResult<String> {
        let (refresh_token, app_key, app_secret, cached) = match &self.auth {
            Auth::Static(token) => return Ok(token.clone()),
            Auth::Refresh {
                refresh_token,
                app_key,
                app_secret,
                cached,
            } => (refresh_token, app_key, app_secret, cached),
        };

        let mut cached = cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.expires_at > Instant::now()) {
            return Ok(token.token.clone());
        }

        debug!("refreshing access token");
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", app_key.as_str()),
        ];
        if let Some(secret) = app_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let response = self
            .http
            .post(&self.oauth_url)
            .form(&form)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Auth(format!("token refresh failed ({status}): {body}")));
        }
        let grant: TokenResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Auth(format!("bad token response: {e}")))?;

        let lifetime = Duration::from_secs(grant.expires_in).saturating_sub(EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            token: grant.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(grant.access_token)
    }

    /// Drop a refreshed token the provider no longer accepts, so the next
    /// call exchanges the refresh token again.
    async fn forget_token(&self) {
        if let Auth::Refresh { cached, .. } = &self.auth {
            if cached.lock().await.take().is_some() {
                debug!("discarding rejected access token");
            }
        }
    }

    /// Map non-success statuses to errors.
    async fn check(&self, endpoint: Endpoint, response: Response) -> RemoteResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.map_err(transport)?;
        let err = status_error(endpoint, status, &body);
        if matches!(err, RemoteError::Auth(_)) {
            self.forget_token().await;
        }
        Err(err)
    }

    async fn rpc<R: DeserializeOwned>(&self, endpoint: Endpoint, arg: Value) -> RemoteResult<R> {
        trace!(%endpoint, "rpc");
        let response = self
            .http
            .post(self.url(endpoint))
            .bearer_auth(self.bearer().await?)
            .json(&arg)
            .send()
            .await
            .map_err(transport)?;
        let response = self.check(endpoint, response).await?;
        response.json().await.map_err(transport)
    }

    async fn content(&self, endpoint: Endpoint, arg: Value, body: Vec<u8>) -> RemoteResult<Response> {
        trace!(%endpoint, bytes = body.len(), "content request");
        let mut request = self
            .http
            .post(self.url(endpoint))
            .bearer_auth(self.bearer().await?)
            .header(API_ARG_HEADER, header_json(&arg));
        // Download rejects any content type on its empty body.
        if endpoint == Endpoint::Upload {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(body);
        }
        let response = request.send().await.map_err(transport)?;
        self.check(endpoint, response).await
    }
}

#[derive(Deserialize)]
struct MetadataResult<T> {
    metadata: T,
}

#[async_trait]
impl RemoteClient for DropboxClient {
    async fn get_metadata(&self, path: &str) -> RemoteResult<RemoteMetadata> {
        self.rpc(
            Endpoint::GetMetadata,
            json!({ "path": path, "include_media_info": true }),
        )
        .await
    }

    async fn list_folder(&self, path: &str, limit: Option<u32>) -> RemoteResult<ListFolderResult> {
        let mut arg = json!({ "path": path, "recursive": false, "include_media_info": true });
        if let Some(limit) = limit {
            arg["limit"] = json!(limit);
        }
        self.rpc(Endpoint::ListFolder, arg).await
    }

    async fn list_folder_continue(&self, cursor: &str) -> RemoteResult<ListFolderResult> {
        self.rpc(Endpoint::ListFolderContinue, json!({ "cursor": cursor }))
            .await
    }

    async fn create_folder(&self, path: &str) -> RemoteResult<FolderMetadata> {
        let result: MetadataResult<FolderMetadata> = self
            .rpc(
                Endpoint::CreateFolder,
                json!({ "path": path, "autorename": false }),
            )
            .await?;
        Ok(result.metadata)
    }

    async fn delete(&self, path: &str) -> RemoteResult<RemoteMetadata> {
        let result: MetadataResult<RemoteMetadata> =
            self.rpc(Endpoint::Delete, json!({ "path": path })).await?;
        Ok(result.metadata)
    }

    async fn download(&self, path: &str) -> RemoteResult<(FileMetadata, Vec<u8>)> {
        let response = self
            .content(Endpoint::Download, json!({ "path": path }), Vec::new())
            .await?;

        let meta = response
            .headers()
            .get(API_RESULT_HEADER)
            .ok_or_else(|| RemoteError::Transport(format!("missing {API_RESULT_HEADER} header")))?;
        let meta: FileMetadata = serde_json::from_slice(meta.as_bytes())
            .map_err(|e| RemoteError::Transport(format!("bad {API_RESULT_HEADER} header: {e}")))?;
        let data = response.bytes().await.map_err(transport)?;
        debug!(path, bytes = data.len(), rev = %meta.rev, "downloaded");
        Ok((meta, data.to_vec()))
    }

    async fn upload(
        &self,
        data: Vec<u8>,
        path: &str,
        mode: WriteMode,
        client_modified: DateTime<Utc>,
    ) -> RemoteResult<FileMetadata> {
        let arg = json!({
            "path": path,
            "mode": write_mode_json(&mode),
            "autorename": false,
            "client_modified": client_modified.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            "mute": false,
        });
        let response = self.content(Endpoint::Upload, arg, data).await?;
        response.json().await.map_err(transport)
    }
}

fn status_error(endpoint: Endpoint, status: StatusCode, body: &[u8]) -> RemoteError {
    match status {
        StatusCode::CONFLICT => RemoteError::decode(endpoint, body),
        StatusCode::UNAUTHORIZED => RemoteError::Auth(String::from_utf8_lossy(body).into_owned()),
        _ => RemoteError::Transport(format!(
            "{endpoint}: HTTP {status}: {}",
            String::from_utf8_lossy(body)
        )),
    }
}

fn transport(e: reqwest::Error) -> RemoteError {
    RemoteError::Transport(e.to_string())
}

fn write_mode_json(mode: &WriteMode) -> Value {
    match mode {
        WriteMode::Add => json!({ ".tag": "add" }),
        WriteMode::Overwrite => json!({ ".tag": "overwrite" }),
        WriteMode::Update(rev) => json!({ ".tag": "update", "update": rev }),
    }
}

/// Serialize `arg` as JSON safe for an HTTP header: non-ASCII characters and
/// DEL are written as `\uXXXX` escapes.
fn header_json(arg: &Value) -> String {
    let raw = arg.to_string();
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii() && c != '\x7f' {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}
