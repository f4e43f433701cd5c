use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::secrets::{expand_home, resolve_secret_optional};

pub const DEFAULT_TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default = "default_version")]
    pub version: String,
    /// SQLite file; `~/.reelname/data/reelname.db` when unset.
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default = "default_auto_match_threshold")]
    pub auto_match_threshold: f64,
    #[serde(default = "default_max_concurrent_transfers")]
    pub max_concurrent_transfers: usize,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default)]
    pub transfer: TransferSettings,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_auto_match_threshold() -> f64 {
    0.85
}

fn default_max_concurrent_transfers() -> usize {
    2
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            database_path: None,
            auto_match_threshold: default_auto_match_threshold(),
            max_concurrent_transfers: default_max_concurrent_transfers(),
            catalog: CatalogConfig::default(),
            naming: NamingConfig::default(),
            transfer: TransferSettings::default(),
        }
    }
}

impl EngineConfig {
    /// The database file to open, with `~` expanded.
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        match self.database_path.as_deref().filter(|p| !p.is_empty()) {
            Some(path) => Some(PathBuf::from(expand_home(path))),
            None => crate::db::default_database_path(),
        }
    }
}

/// Metadata catalog (TMDB) settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<String>,
    #[serde(default)]
    pub api_key_env_var: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_TMDB_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_file: None,
            api_key_env_var: None,
            base_url: default_base_url(),
            rate_limit: RateLimitConfig::default(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "****"))
            .field("api_key_file", &self.api_key_file)
            .field("api_key_env_var", &self.api_key_env_var)
            .field("base_url", &self.base_url)
            .field("rate_limit", &self.rate_limit)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl CatalogConfig {
    /// Resolves the API key from value, file or env var. `Ok(None)` when no source
    /// is configured.
    pub fn resolve_api_key(&self) -> Result<Option<SecretString>, ConfigError> {
        Ok(resolve_secret_optional(
            self.api_key.as_deref(),
            self.api_key_file.as_deref(),
            self.api_key_env_var.as_deref(),
        )?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// At most `quota` catalog requests in any rolling `window_secs` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfig {
    #[serde(default = "default_quota")]
    pub quota: usize,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_quota() -> usize {
    35
}

fn default_window_secs() -> u64 {
    10
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            quota: default_quota(),
            window_secs: default_window_secs(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Library layout convention the destination paths follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NamingPreset {
    #[default]
    Jellyfin,
    Plex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamingConfig {
    #[serde(default)]
    pub preset: NamingPreset,
    #[serde(default = "default_specials_folder_name")]
    pub specials_folder_name: String,
    #[serde(default = "default_extras_folder_name")]
    pub extras_folder_name: String,
}

fn default_specials_folder_name() -> String {
    "Specials".to_string()
}

fn default_extras_folder_name() -> String {
    "Extras".to_string()
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            preset: NamingPreset::default(),
            specials_folder_name: default_specials_folder_name(),
            extras_folder_name: default_extras_folder_name(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSettings {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_chunk_size() -> usize {
    64 * 1024
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl TransferSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
