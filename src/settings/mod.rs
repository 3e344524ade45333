use crate::storage::{config_path, FileStore, KeyValueStore, KeyringStore, MemoryStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_ORIGIN: &str = "http://localhost:8000";
pub const API_ORIGIN_ENV: &str = "CAREERFORGE_API_ORIGIN";
const API_PREFIX: &str = "/api";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("Unknown storage backend: {0}")]
    UnknownBackend(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiSettings {
    pub origin: Option<String>,               // "http://localhost:8000"
    pub request_timeout_secs: Option<u64>,    // unset = wait indefinitely
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageSettings {
    pub backend: Option<String>,      // "keyring", "file", "memory"
    pub path: Option<PathBuf>,        // file backend only
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdzunaSettings {
    pub app_id: Option<String>,
    pub app_key: Option<String>,
    pub base_url: String,             // "https://api.adzuna.com/v1/api/jobs"
    pub country: String,              // "us"
    pub daily_limit: u32,             // free tier is ~1000 per month
}

impl Default for AdzunaSettings {
    fn default() -> Self {
        Self {
            app_id: None,
            app_key: None,
            base_url: "https://api.adzuna.com/v1/api/jobs".to_string(),
            country: "us".to_string(),
            daily_limit: 33,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JoobleSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub daily_limit: u32,
}

impl Default for JoobleSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://jooble.org/api".to_string(),
            daily_limit: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CareerJetSettings {
    pub affiliate_id: Option<String>,
    pub base_url: String,
    pub daily_limit: u32,
}

impl Default for CareerJetSettings {
    fn default() -> Self {
        Self {
            affiliate_id: None,
            base_url: "https://public-api.careerjet.com/search".to_string(),
            daily_limit: 1000,
        }
    }
}

/// Third-party job boards queried for the opportunities feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSearchSettings {
    pub adzuna: AdzunaSettings,
    pub jooble: JoobleSettings,
    pub careerjet: CareerJetSettings,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    pub cache_path: Option<PathBuf>,  // file-backed stores only
    pub request_timeout_secs: u64,
}

impl Default for JobSearchSettings {
    fn default() -> Self {
        Self {
            adzuna: AdzunaSettings::default(),
            jooble: JoobleSettings::default(),
            careerjet: CareerJetSettings::default(),
            cache_ttl_secs: 60 * 60,
            cache_max_entries: 100,
            cache_path: None,
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientSettings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub jobs: JobSearchSettings,
}

impl ClientSettings {
    /// Backend base URL: the configured origin plus the `/api` prefix.
    pub fn api_base_url(&self) -> String {
        base_url_for(self.api.origin.as_deref().unwrap_or(DEFAULT_API_ORIGIN))
    }

    /// Overrides the origin with `value` when it is non-blank.
    pub fn with_origin_override(mut self, value: Option<String>) -> Self {
        if let Some(origin) = value.filter(|value| !value.trim().is_empty()) {
            self.api.origin = Some(origin);
        }
        self
    }

    /// Applies `CAREERFORGE_API_ORIGIN`, which wins over the settings file.
    pub fn with_env_overrides(self) -> Self {
        self.with_origin_override(std::env::var(API_ORIGIN_ENV).ok())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.api.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn build_store(&self) -> Result<Arc<dyn KeyValueStore>, SettingsError> {
        match self.storage.backend.as_deref().unwrap_or("keyring") {
            "keyring" => Ok(Arc::new(KeyringStore::new())),
            "file" => {
                let path = self
                    .storage
                    .path
                    .clone()
                    .unwrap_or_else(FileStore::default_path);
                Ok(Arc::new(FileStore::new(path)))
            }
            "memory" => Ok(Arc::new(MemoryStore::new())),
            other => Err(SettingsError::UnknownBackend(other.to_string())),
        }
    }

    /// Store for the job cache, rate-limit counters and bookmarks. These are
    /// not secrets, so they go to a file unless everything is in memory.
    pub fn build_cache_store(&self) -> Result<Arc<dyn KeyValueStore>, SettingsError> {
        match self.storage.backend.as_deref().unwrap_or("keyring") {
            "memory" => Ok(Arc::new(MemoryStore::new())),
            "keyring" | "file" => {
                let path = self
                    .jobs
                    .cache_path
                    .clone()
                    .unwrap_or_else(|| config_path("job_cache.json"));
                Ok(Arc::new(FileStore::new(path)))
            }
            other => Err(SettingsError::UnknownBackend(other.to_string())),
        }
    }
}

pub fn base_url_for(origin: &str) -> String {
    format!("{}{}", origin.trim().trim_end_matches('/'), API_PREFIX)
}

fn get_settings_path() -> PathBuf {
    config_path("settings.json")
}

/// Settings file contents with environment overrides applied.
pub fn load_settings() -> Result<ClientSettings, SettingsError> {
    Ok(load_settings_from(&get_settings_path())?.with_env_overrides())
}

pub fn save_settings(settings: &ClientSettings) -> Result<(), SettingsError> {
    save_settings_to(&get_settings_path(), settings)
}

pub fn load_settings_from(path: &Path) -> Result<ClientSettings, SettingsError> {
    if !path.exists() {
        return Ok(ClientSettings::default());
    }

    let contents = std::fs::read_to_string(path)?;
    let settings = serde_json::from_str(&contents)?;
    Ok(settings)
}

pub fn save_settings_to(path: &Path, settings: &ClientSettings) -> Result<(), SettingsError> {
    // Ensure directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, contents)?;

    log::info!("Settings saved to {:?}", path);
    Ok(())
}
