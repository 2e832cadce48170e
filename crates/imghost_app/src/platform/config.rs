//! Uploader settings, read from a RON file.
//!
//! Every section and field is optional in the file; anything left out takes
//! its default. Nothing is ever written back.

use std::fs;
use std::path::Path;
use std::time::Duration;

use imghost_core::{normalize_directory, DEFAULT_CONCURRENCY_LIMIT};
use imghost_engine::{RepoConfig, StoreSettings};
use imghost_logging::{imghost_info, imghost_warn};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILENAME: &str = "imghost.ron";
pub const TOKEN_ENV_VAR: &str = "IMGHOST_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub repo: RepoSection,
    pub upload: UploadSection,
    pub api: ApiSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoSection {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub token: String,
    pub root_dir: String,
    pub committer_name: String,
    pub committer_email: String,
}

impl Default for RepoSection {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            branch: "main".to_string(),
            token: String::new(),
            root_dir: "images".to_string(),
            committer_name: "Swift Image Host".to_string(),
            committer_email: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSection {
    pub concurrency_limit: usize,
    pub target_directory: Option<String>,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            target_directory: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub api_base: String,
    pub raw_base: String,
    pub web_base: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ApiSection {
    fn default() -> Self {
        let defaults = StoreSettings::default();
        Self {
            api_base: defaults.api_base,
            raw_base: defaults.raw_base,
            web_base: defaults.web_base,
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            request_timeout_secs: defaults.request_timeout.as_secs(),
            user_agent: defaults.user_agent,
        }
    }
}

/// Reads the config at `path`. A missing or unreadable file falls back to
/// defaults.
pub fn load_config(path: &Path) -> AppConfig {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            imghost_info!("No config at {:?}; using defaults", path);
            return AppConfig::default();
        }
        Err(err) => {
            imghost_warn!("Failed to read config from {:?}: {}", path, err);
            return AppConfig::default();
        }
    };

    match ron::from_str(&content) {
        Ok(config) => {
            imghost_info!("Loaded config from {:?}", path);
            config
        }
        Err(err) => {
            imghost_warn!("Failed to parse config from {:?}: {}", path, err);
            AppConfig::default()
        }
    }
}

impl AppConfig {
    /// A non-blank token from the environment wins over the file.
    pub fn apply_token_override(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|token| !token.trim().is_empty()) {
            self.repo.token = token.trim().to_string();
        }
    }

    pub fn repo_config(&self) -> RepoConfig {
        RepoConfig {
            owner: self.repo.owner.trim().to_string(),
            repo: self.repo.repo.trim().to_string(),
            branch: self.repo.branch.trim().to_string(),
            token: self.repo.token.clone(),
            committer_name: self.repo.committer_name.clone(),
            committer_email: self.repo.committer_email.clone(),
        }
    }

    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            api_base: self.api.api_base.clone(),
            raw_base: self.api.raw_base.clone(),
            web_base: self.api.web_base.clone(),
            user_agent: self.api.user_agent.clone(),
            connect_timeout: Duration::from_secs(self.api.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.api.request_timeout_secs),
            ..StoreSettings::default()
        }
    }

    pub fn root_dir(&self) -> String {
        normalize_directory(&self.repo.root_dir)
    }

    /// Upload folder: the configured one, else the root folder.
    pub fn default_target(&self) -> String {
        self.upload
            .target_directory
            .as_deref()
            .map(normalize_directory)
            .filter(|dir| !dir.is_empty())
            .unwrap_or_else(|| self.root_dir())
    }
}
