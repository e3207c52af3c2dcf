use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::credential::{CredentialSource, CredentialSources};

pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// base_url = "https://api.weatherapi.com"
/// timeout_secs = 10
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Provider root, without the `/v1/...` path.
    pub base_url: Option<String>,

    /// Ceiling for a single fetch, in seconds.
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Replace the given fields. Returns whether anything changed.
    pub fn update(&mut self, base_url: Option<String>, timeout_secs: Option<u64>) -> bool {
        let before = self.clone();
        if let Some(url) = base_url {
            let url = url.trim().trim_end_matches('/');
            self.base_url = (!url.is_empty()).then(|| url.to_string());
        }
        if let Some(secs) = timeout_secs {
            self.timeout_secs = Some(secs);
        }
        *self != before
    }

    /// Load config from the platform config directory.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Load config from `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save config to the platform config directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Everything the search controller needs at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Resolved API key; empty when none of the sources had one.
    pub credential: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Settings {
    pub fn from_parts(config: &Config, sources: &CredentialSources) -> Self {
        let credential = match sources.resolve_with_source() {
            Some((source, key)) => {
                tracing::debug!(%source, "resolved API key");
                key
            }
            None => String::new(),
        };

        Self {
            credential,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            timeout: config.timeout(),
        }
    }

    pub fn credential_source(sources: &CredentialSources) -> Option<CredentialSource> {
        sources.resolve_with_source().map(|(source, _)| source)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_parts(&Config::default(), &CredentialSources::default())
    }
}
