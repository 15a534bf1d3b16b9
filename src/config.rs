//! Configuration - `~/.toolbox/config.json` with environment overrides

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Toolbox data directory (~/.toolbox/)
pub fn toolbox_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".toolbox")
}

pub fn config_path() -> PathBuf {
    toolbox_dir().join("config.json")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Extra descriptor directory, merged over the built-in tools
    pub content_dir: Option<PathBuf>,
    /// Where image/file downloads are written
    pub save_dir: Option<PathBuf>,
    /// Timeout for fetching remote plugins
    pub plugin_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content_dir: None,
            save_dir: None,
            plugin_timeout_secs: 30,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("Invalid config {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
}

impl Config {
    /// Config file (if any) plus process environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path();
        let config = if path.exists() { Self::load_from(&path)? } else { Self::default() };
        Ok(config.with_env(|key| std::env::var(key).ok()))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Apply `TOOLBOX_*` overrides from `lookup`
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("TOOLBOX_CONTENT_DIR").filter(|v| !v.is_empty()) {
            self.content_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = lookup("TOOLBOX_SAVE_DIR").filter(|v| !v.is_empty()) {
            self.save_dir = Some(PathBuf::from(dir));
        }
        if let Some(secs) = lookup("TOOLBOX_PLUGIN_TIMEOUT") {
            match secs.parse() {
                Ok(secs) => self.plugin_timeout_secs = secs,
                Err(_) => tracing::warn!(value = %secs, "Ignoring invalid TOOLBOX_PLUGIN_TIMEOUT"),
            }
        }
        self
    }
}
