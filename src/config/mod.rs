// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for utilkit

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::tools::files::hasher::HashAlgorithm;
use crate::tools::web::url_status::timeout_duration;
use crate::{Result, UtilkitError};

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Default log level when no CLI flag overrides it
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// File hasher defaults
    #[serde(default)]
    pub hashing: HashingConfig,

    /// URL status checker defaults
    #[serde(default)]
    pub url_check: UrlCheckConfig,

    /// Batch rename settings
    #[serde(default)]
    pub rename: RenameConfig,

    /// Text-to-speech settings
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Tool index settings
    #[serde(default)]
    pub index: IndexConfig,

    /// Web UI settings
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HashingConfig {
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UrlCheckConfig {
    #[serde(default = "default_url_timeout")]
    pub timeout_secs: f64,
    #[serde(default = "default_url_workers")]
    pub max_workers: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RenameConfig {
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SpeechConfig {
    /// Force a specific engine binary instead of probing
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default = "default_speech_rate")]
    pub rate: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexConfig {
    /// Repository root that relative paths are resolved against
    #[serde(default = "default_index_root")]
    pub root: PathBuf,
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
    #[serde(default = "default_readme")]
    pub readme: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

// Default value functions
fn default_log_level() -> String { "info".to_string() }
fn default_algorithm() -> String { "sha256".to_string() }
fn default_url_timeout() -> f64 { 10.0 }
fn default_url_workers() -> usize { 8 }
fn default_user_agent() -> String { format!("utilkit-url-status/{}", env!("CARGO_PKG_VERSION")) }
fn default_history_path() -> PathBuf { PathBuf::from("utilkit_history.jsonl") }
fn default_speech_rate() -> u32 { 175 }
fn default_index_root() -> PathBuf { PathBuf::from(".") }
fn default_source_dir() -> PathBuf { PathBuf::from("src/tools") }
fn default_cache_path() -> PathBuf { PathBuf::from("tool_index.json") }
fn default_readme() -> PathBuf { PathBuf::from("README.md") }
fn default_web_host() -> String { "127.0.0.1".to_string() }
fn default_web_port() -> u16 { 5000 }

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            hashing: HashingConfig::default(),
            url_check: UrlCheckConfig::default(),
            rename: RenameConfig::default(),
            speech: SpeechConfig::default(),
            index: IndexConfig::default(),
            web: WebConfig::default(),
        }
    }
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            workers: default_workers(),
        }
    }
}

impl Default for UrlCheckConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_url_timeout(),
            max_workers: default_url_workers(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            history_path: default_history_path(),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            engine: None,
            voice: None,
            rate: default_speech_rate(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            root: default_index_root(),
            source_dir: default_source_dir(),
            cache_path: default_cache_path(),
            readme: default_readme(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
        }
    }
}

impl IndexConfig {
    /// Cache path resolved against the index root
    pub fn resolved_cache_path(&self) -> PathBuf {
        self.root.join(&self.cache_path)
    }

    /// README path resolved against the index root
    pub fn resolved_readme(&self) -> PathBuf {
        self.root.join(&self.readme)
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| UtilkitError::Config(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check values that serde cannot constrain on its own
    pub fn validate(&self) -> Result<()> {
        if self.hashing.algorithm.parse::<HashAlgorithm>().is_err() {
            return Err(UtilkitError::Config(format!(
                "Unknown hashing algorithm: {}",
                self.hashing.algorithm
            )));
        }
        if self.hashing.workers == 0 {
            return Err(UtilkitError::Config("hashing.workers must be >= 1".to_string()));
        }
        if self.url_check.max_workers == 0 {
            return Err(UtilkitError::Config("url_check.max_workers must be >= 1".to_string()));
        }
        if timeout_duration(self.url_check.timeout_secs).is_err() {
            return Err(UtilkitError::Config(
                "url_check.timeout_secs must be a positive, finite number of seconds".to_string(),
            ));
        }
        if self.web.port == 0 {
            return Err(UtilkitError::Config("web.port must be non-zero".to_string()));
        }
        Ok(())
    }
}
