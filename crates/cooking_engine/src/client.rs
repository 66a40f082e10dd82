use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cooking_core::{StatusUpdate, TaskKey, TaskStatus};
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde::Deserialize;
use tempfile::NamedTempFile;
use tracker_logging::{tracker_debug, tracker_info};
use url::Url;

use crate::persist::ensure_dir;
use crate::{CookRequest, FailureKind, LinkState, VaultError};

const CSRF_HEADER: HeaderName = HeaderName::from_static("x-csrftoken");

#[derive(Debug, Clone)]
pub struct VaultSettings {
    pub base_url: Url,
    /// Path of the vault API below `base_url`.
    pub api_root: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub csrf_token: Option<String>,
    pub user_agent: String,
}

impl VaultSettings {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_root: "api/1/vault/".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            csrf_token: None,
            user_agent: format!("cooktrack/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// The remote cooking service.
#[async_trait::async_trait]
pub trait VaultClient: Send + Sync {
    /// Enqueues cooking of the requested bundle.
    async fn request_cook(&self, request: &CookRequest) -> Result<(), VaultError>;

    /// Current state of the cooking job for `key`.
    async fn cook_status(&self, key: &TaskKey) -> Result<StatusUpdate, VaultError>;

    /// Checks whether `fetch_url` still serves a bundle.
    async fn probe(&self, fetch_url: &str) -> Result<LinkState, VaultError>;
}

#[derive(Debug, Deserialize)]
struct StatusDocument {
    status: String,
    #[serde(default)]
    fetch_url: Option<String>,
    #[serde(default)]
    progress_message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReqwestVaultClient {
    settings: VaultSettings,
    http: reqwest::Client,
}

impl ReqwestVaultClient {
    pub fn new(settings: VaultSettings) -> Result<Self, VaultError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = settings.csrf_token.as_deref() {
            let value = HeaderValue::from_str(token)
                .map_err(|err| VaultError::new(FailureKind::InvalidSettings, err.to_string()))?;
            headers.insert(CSRF_HEADER, value);
        }

        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|err| VaultError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self { settings, http })
    }

    pub fn settings(&self) -> &VaultSettings {
        &self.settings
    }

    /// `{base_url}/{api_root}/{bundle segment}/{swhid}/`
    pub fn endpoint(&self, key: &TaskKey) -> Result<Url, VaultError> {
        let mut url = self.settings.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                VaultError::new(FailureKind::InvalidUrl, "base url cannot carry a path")
            })?;
            segments.pop_if_empty();
            segments.extend(self.settings.api_root.split('/').filter(|s| !s.is_empty()));
            segments.push(key.bundle_type.api_segment());
            segments.push(&key.swhid);
            segments.push("");
        }
        Ok(url)
    }

    /// Streams the bundle at `fetch_url` into `dir`, named after the URL's last segment.
    pub async fn download_bundle(&self, fetch_url: &str, dir: &Path) -> Result<PathBuf, VaultError> {
        let url = parse_url(fetch_url)?;
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(http_status_error(status));
        }

        ensure_dir(dir).map_err(|err| VaultError::new(FailureKind::Io, err.to_string()))?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_error)?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            tmp.write_all(&chunk).map_err(io_error)?;
            written += chunk.len() as u64;
        }
        tmp.flush().map_err(io_error)?;
        tmp.as_file_mut().sync_all().map_err(io_error)?;

        let target = dir.join(bundle_filename(&url));
        tmp.persist(&target)
            .map_err(|err| VaultError::new(FailureKind::Io, err.error.to_string()))?;
        tracker_info!("Downloaded {} bytes to {:?}", written, target);
        Ok(target)
    }
}

#[async_trait::async_trait]
impl VaultClient for ReqwestVaultClient {
    async fn request_cook(&self, request: &CookRequest) -> Result<(), VaultError> {
        let mut url = self.endpoint(&request.key)?;
        if let Some(email) = request.email.as_deref() {
            url.query_pairs_mut().append_pair("email", email);
        }
        tracker_debug!("POST {}", url);

        let response = self.http.post(url).send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(http_status_error(status));
        }
        Ok(())
    }

    async fn cook_status(&self, key: &TaskKey) -> Result<StatusUpdate, VaultError> {
        let url = self.endpoint(key)?;
        tracker_debug!("GET {}", url);

        let response = self.http.get(url).send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(http_status_error(status));
        }
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        let document: StatusDocument = serde_json::from_slice(&body)
            .map_err(|err| VaultError::new(FailureKind::Decode, err.to_string()))?;
        let status: TaskStatus = document
            .status
            .parse()
            .map_err(|err: cooking_core::ParseStatusError| {
                VaultError::new(FailureKind::Decode, err.to_string())
            })?;

        Ok(StatusUpdate {
            status,
            fetch_url: document.fetch_url.filter(|url| !url.is_empty()),
            progress_message: document.progress_message,
        })
    }

    async fn probe(&self, fetch_url: &str) -> Result<LinkState, VaultError> {
        let url = parse_url(fetch_url)?;
        let response = self
            .http
            .head(url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            // The body is dropped unread; only the status line matters.
            tracker_debug!("HEAD not allowed on {}, probing with GET", url);
            self.http
                .get(url)
                .send()
                .await
                .map_err(map_reqwest_error)?
                .status()
        } else {
            response.status()
        };

        if status.is_success() {
            Ok(LinkState::Alive)
        } else {
            Ok(LinkState::Dead {
                status: status.as_u16(),
            })
        }
    }
}

fn parse_url(raw: &str) -> Result<Url, VaultError> {
    Url::parse(raw).map_err(|err| VaultError::new(FailureKind::InvalidUrl, err.to_string()))
}

fn bundle_filename(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|segment| !segment.is_empty()))
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| "bundle".to_string())
}

fn http_status_error(status: StatusCode) -> VaultError {
    VaultError::new(FailureKind::HttpStatus(status.as_u16()), status.to_string())
}

fn io_error(err: std::io::Error) -> VaultError {
    VaultError::new(FailureKind::Io, err.to_string())
}

fn map_reqwest_error(err: reqwest::Error) -> VaultError {
    if err.is_timeout() {
        return VaultError::new(FailureKind::Timeout, err.to_string());
    }
    VaultError::new(FailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cooking_core::BundleType;

    fn client(base: &str) -> ReqwestVaultClient {
        ReqwestVaultClient::new(VaultSettings::new(Url::parse(base).unwrap())).unwrap()
    }

    #[test]
    fn endpoint_joins_api_root_and_key() {
        let client = client("https://archive.example.org/");
        let url = client
            .endpoint(&TaskKey::new(BundleType::GitBare, "swh:1:rev:abc"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://archive.example.org/api/1/vault/git-bare/swh:1:rev:abc/"
        );
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let client = client("https://example.org/archive");
        let url = client
            .endpoint(&TaskKey::new(BundleType::Flat, "swh:1:dir:abc"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.org/archive/api/1/vault/flat/swh:1:dir:abc/"
        );
    }

    #[test]
    fn bundle_filename_uses_last_segment() {
        let url = Url::parse("https://vault.example.org/bundles/abc.tar.gz?sig=1").unwrap();
        assert_eq!(bundle_filename(&url), "abc.tar.gz");
        let url = Url::parse("https://vault.example.org/fetch/abc/").unwrap();
        assert_eq!(bundle_filename(&url), "abc");
        let url = Url::parse("https://vault.example.org/").unwrap();
        assert_eq!(bundle_filename(&url), "bundle");
    }
}
