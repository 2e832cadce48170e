use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use imghost_core::normalize_directory;
use imghost_logging::{imghost_debug, imghost_info, imghost_warn};
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::paths::{basename, candidate_path};
use crate::{RemoteFile, RemoteLink, TransferError, TransferErrorKind};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const DEFAULT_COMMITTER_NAME: &str = "Swift Image Host";
const DEFAULT_COMMITTER_EMAIL: &str = "noreply@example.com";
const PLACEHOLDER_FILE: &str = ".gitkeep";

/// Repository-hosted blob storage, addressed by path.
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    /// Writes `content` as a new file under `target_dir`. When `filename` is
    /// taken the store picks a free variant; the returned link names the path
    /// actually written.
    async fn put_file(
        &self,
        target_dir: &str,
        filename: &str,
        content: &[u8],
        message: &str,
    ) -> Result<RemoteLink, TransferError>;

    /// Creates `path` as an empty directory. An existing directory is left
    /// as is.
    async fn create_directory(&self, path: &str) -> Result<(), TransferError>;

    /// True when `path` names an existing directory.
    async fn directory_exists(&self, path: &str) -> Result<bool, TransferError>;

    /// Every directory at or below `root_dir`, sorted, including `root_dir`.
    async fn list_directories(&self, root_dir: &str) -> Result<Vec<String>, TransferError>;

    /// Files directly inside `dir`. A missing directory lists as empty.
    async fn list_files(&self, dir: &str) -> Result<Vec<RemoteFile>, TransferError>;
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub api_base: String,
    pub raw_base: String,
    pub web_base: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_collision_attempts: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            raw_base: "https://raw.githubusercontent.com".to_string(),
            web_base: "https://github.com".to_string(),
            user_agent: "swift-image-uploader".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            max_collision_attempts: 50,
        }
    }
}

/// Which repository and branch to write to, and as whom.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RepoConfig {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub token: String,
    pub committer_name: String,
    pub committer_email: String,
}

impl fmt::Debug for RepoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoConfig")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("token", &if self.token.is_empty() { "<unset>" } else { "<redacted>" })
            .field("committer_name", &self.committer_name)
            .field("committer_email", &self.committer_email)
            .finish()
    }
}

impl RepoConfig {
    fn ensure_readable(&self) -> Result<(), TransferError> {
        if self.owner.trim().is_empty() || self.repo.trim().is_empty() || self.branch.trim().is_empty() {
            return Err(TransferError::new(
                TransferErrorKind::NotConfigured,
                "Configure owner/repo/branch in Settings.",
            ));
        }
        Ok(())
    }

    fn ensure_writable(&self) -> Result<(), TransferError> {
        self.ensure_readable()?;
        if self.token.trim().is_empty() {
            return Err(TransferError::new(
                TransferErrorKind::NotConfigured,
                "GitHub token not set in Settings.",
            ));
        }
        Ok(())
    }

    fn committer(&self) -> Committer<'_> {
        Committer {
            name: non_empty_or(&self.committer_name, DEFAULT_COMMITTER_NAME),
            email: non_empty_or(&self.committer_email, DEFAULT_COMMITTER_EMAIL),
        }
    }
}

/// [`ContentStore`] backed by the GitHub Contents and Git Trees REST APIs.
#[derive(Debug, Clone)]
pub struct GithubStore {
    client: reqwest::Client,
    settings: StoreSettings,
    repo: RepoConfig,
}

#[derive(Serialize)]
struct Committer<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
struct PutContentsBody<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    committer: Committer<'a>,
}

#[derive(Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct ContentEntry {
    name: String,
    path: String,
    #[serde(default)]
    sha: String,
    #[serde(default)]
    size: u64,
    #[serde(rename = "type")]
    kind: String,
    download_url: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

impl GithubStore {
    pub fn new(settings: StoreSettings, repo: RepoConfig) -> Result<Self, TransferError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| TransferError::new(TransferErrorKind::Network, err.to_string()))?;
        Ok(Self {
            client,
            settings,
            repo,
        })
    }

    pub fn repo(&self) -> &RepoConfig {
        &self.repo
    }

    /// Raw and web locators for a repository path on the configured branch.
    pub fn link_for(&self, path: &str) -> Result<RemoteLink, TransferError> {
        let mut raw = [self.repo.owner.as_str(), self.repo.repo.as_str(), self.repo.branch.as_str()]
            .to_vec();
        raw.extend(path.split('/'));
        let mut web = [
            self.repo.owner.as_str(),
            self.repo.repo.as_str(),
            "blob",
            self.repo.branch.as_str(),
        ]
        .to_vec();
        web.extend(path.split('/'));

        Ok(RemoteLink {
            path: path.to_string(),
            raw_url: build_url(&self.settings.raw_base, &raw)?.to_string(),
            web_url: build_url(&self.settings.web_base, &web)?.to_string(),
        })
    }

    fn contents_url(&self, path: &str, with_ref: bool) -> Result<Url, TransferError> {
        let mut segments = vec!["repos", self.repo.owner.as_str(), self.repo.repo.as_str(), "contents"];
        segments.extend(path.split('/').filter(|segment| !segment.is_empty()));
        let mut url = build_url(&self.settings.api_base, &segments)?;
        if with_ref {
            url.query_pairs_mut().append_pair("ref", &self.repo.branch);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, url)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(USER_AGENT, self.settings.user_agent.as_str());
        if !self.repo.token.is_empty() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", self.repo.token));
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, TransferError> {
        builder.send().await.map_err(map_reqwest_error)
    }

    /// True when something already lives at `path` on the branch.
    async fn exists(&self, path: &str) -> Result<bool, TransferError> {
        let url = self.contents_url(path, true)?;
        let response = self.send(self.request(Method::GET, url)).await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(status_error(response).await),
        }
    }

    async fn free_path(&self, dir: &str, filename: &str) -> Result<String, TransferError> {
        for attempt in 0..=self.settings.max_collision_attempts {
            let candidate = candidate_path(dir, filename, attempt);
            if !self.exists(&candidate).await? {
                if attempt > 0 {
                    imghost_debug!("{} is taken, using {}", filename, candidate);
                }
                return Ok(candidate);
            }
        }
        Err(TransferError::new(
            TransferErrorKind::CollisionLimit {
                attempts: self.settings.max_collision_attempts,
            },
            format!(
                "no free name for {} in {:?} after {} attempts",
                filename, dir, self.settings.max_collision_attempts
            ),
        ))
    }

    async fn put_contents(&self, path: &str, content: &[u8], message: &str) -> Result<(), TransferError> {
        let body = PutContentsBody {
            message,
            content: STANDARD.encode(content),
            branch: &self.repo.branch,
            committer: self.repo.committer(),
        };
        let payload = serde_json::to_vec(&body)
            .map_err(|err| TransferError::new(TransferErrorKind::InvalidRequest, err.to_string()))?;
        let url = self.contents_url(path, false)?;
        let response = self
            .send(
                self.request(Method::PUT, url)
                    .header(CONTENT_TYPE, "application/json")
                    .body(payload),
            )
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<Option<T>, TransferError> {
        let response = self.send(self.request(Method::GET, url)).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(status_error(response).await);
        }
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|err| TransferError::new(TransferErrorKind::InvalidResponse, err.to_string()))
    }
}

#[async_trait::async_trait]
impl ContentStore for GithubStore {
    async fn put_file(
        &self,
        target_dir: &str,
        filename: &str,
        content: &[u8],
        message: &str,
    ) -> Result<RemoteLink, TransferError> {
        self.repo.ensure_writable()?;
        if filename.trim().is_empty() || filename.contains('/') {
            return Err(TransferError::new(
                TransferErrorKind::InvalidRequest,
                format!("invalid file name {filename:?}"),
            ));
        }
        let dir = normalize_directory(target_dir);
        let path = self.free_path(&dir, filename).await?;
        let message = if message.trim().is_empty() {
            format!("feat: upload {}", basename(&path))
        } else {
            message.to_string()
        };

        self.put_contents(&path, content, &message).await?;
        imghost_info!("stored {} ({} bytes)", path, content.len());
        self.link_for(&path)
    }

    async fn create_directory(&self, path: &str) -> Result<(), TransferError> {
        self.repo.ensure_writable()?;
        let dir = normalize_directory(path);
        if dir.is_empty() {
            return Err(TransferError::new(
                TransferErrorKind::InvalidRequest,
                "directory path is empty",
            ));
        }
        let placeholder = format!("{dir}/{PLACEHOLDER_FILE}");
        match self
            .put_contents(&placeholder, &[], &format!("chore: create folder {dir}"))
            .await
        {
            Ok(()) => {
                imghost_info!("created folder {}", dir);
                Ok(())
            }
            // GitHub refuses a sha-less write over an existing placeholder.
            Err(err) if err.kind == TransferErrorKind::Unprocessable => {
                imghost_info!("folder {} already exists", dir);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn directory_exists(&self, path: &str) -> Result<bool, TransferError> {
        self.repo.ensure_readable()?;
        let dir = normalize_directory(path);
        if dir.is_empty() {
            return Ok(true);
        }
        let url = self.contents_url(&dir, true)?;
        let listing = self.get_json::<serde_json::Value>(url).await?;
        Ok(listing.is_some_and(|listing| listing.is_array()))
    }

    async fn list_directories(&self, root_dir: &str) -> Result<Vec<String>, TransferError> {
        self.repo.ensure_readable()?;
        let root = normalize_directory(root_dir);
        let mut url = build_url(
            &self.settings.api_base,
            &[
                "repos",
                self.repo.owner.as_str(),
                self.repo.repo.as_str(),
                "git",
                "trees",
                self.repo.branch.as_str(),
            ],
        )?;
        url.query_pairs_mut().append_pair("recursive", "1");

        let tree: TreeResponse = self.get_json(url).await?.ok_or_else(|| {
            TransferError::new(
                TransferErrorKind::NotFound,
                format!("branch {} not found", self.repo.branch),
            )
        })?;
        if tree.truncated {
            imghost_warn!("tree listing for {} was truncated by GitHub", self.repo.branch);
        }

        let mut dirs: BTreeSet<String> = tree
            .tree
            .into_iter()
            .filter(|entry| entry.kind == "tree")
            .map(|entry| normalize_directory(&entry.path))
            .filter(|path| is_within(path, &root))
            .collect();
        if !root.is_empty() {
            dirs.insert(root);
        }
        Ok(dirs.into_iter().collect())
    }

    async fn list_files(&self, dir: &str) -> Result<Vec<RemoteFile>, TransferError> {
        self.repo.ensure_readable()?;
        let url = self.contents_url(&normalize_directory(dir), true)?;
        let Some(listing) = self.get_json::<serde_json::Value>(url).await? else {
            return Ok(Vec::new());
        };
        // A path naming a file answers with an object rather than an array.
        if !listing.is_array() {
            return Ok(Vec::new());
        }
        let entries: Vec<ContentEntry> = serde_json::from_value(listing)
            .map_err(|err| TransferError::new(TransferErrorKind::InvalidResponse, err.to_string()))?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.kind == "file")
            .map(|entry| RemoteFile {
                name: entry.name,
                path: entry.path,
                size: entry.size,
                sha: entry.sha,
                download_url: entry.download_url,
            })
            .collect())
    }
}

fn build_url(base: &str, segments: &[&str]) -> Result<Url, TransferError> {
    let mut url = Url::parse(base).map_err(|err| {
        TransferError::new(
            TransferErrorKind::NotConfigured,
            format!("invalid base url {base:?}: {err}"),
        )
    })?;
    url.path_segments_mut()
        .map_err(|_| {
            TransferError::new(
                TransferErrorKind::NotConfigured,
                format!("base url {base:?} cannot carry a path"),
            )
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn is_within(path: &str, root: &str) -> bool {
    root.is_empty() || path == root || path.starts_with(&format!("{root}/"))
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

async fn status_error(response: reqwest::Response) -> TransferError {
    let status = response.status();
    let kind = classify_status(status, response.headers());
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|parsed| parsed.message)
        .unwrap_or(body);
    TransferError::new(kind, format!("GitHub {}: {}", status.as_u16(), detail.trim()))
}

fn classify_status(status: StatusCode, headers: &HeaderMap) -> TransferErrorKind {
    let exhausted = headers
        .get("x-ratelimit-remaining")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim() == "0")
        .unwrap_or(false);
    match status {
        StatusCode::UNAUTHORIZED => TransferErrorKind::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => TransferErrorKind::RateLimited,
        StatusCode::FORBIDDEN if exhausted => TransferErrorKind::RateLimited,
        StatusCode::FORBIDDEN => TransferErrorKind::Forbidden,
        StatusCode::NOT_FOUND => TransferErrorKind::NotFound,
        StatusCode::CONFLICT => TransferErrorKind::Conflict,
        StatusCode::UNPROCESSABLE_ENTITY => TransferErrorKind::Unprocessable,
        other => TransferErrorKind::HttpStatus(other.as_u16()),
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransferError {
    if err.is_timeout() {
        return TransferError::new(TransferErrorKind::Timeout, format!("GitHub request timed out: {err}"));
    }
    TransferError::new(TransferErrorKind::Network, format!("GitHub network error: {err}"))
}
