//! Configuration for collabspace.
//!
//! [`Config`] holds where the local provider keeps its database and how to
//! reach the cloud service. It is persisted as TOML (typically at
//! `~/.config/collabspace/config.toml` on Unix systems).
//!
//! # Example
//!
//! ```ignore
//! use collabspace_core::config::Config;
//!
//! let mut config = Config::load()?;
//! config.cloud_server_url = Some("https://app.example.com".into());
//! config.save()?;
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// User-configurable settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Verbose logging
    #[serde(default)]
    pub debug: bool,

    /// SQLite database used by the local provider
    pub local_db_path: PathBuf,

    /// Base URL of the cloud service (e.g., "https://app.example.com").
    /// The cloud provider is only registered when this is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_server_url: Option<String>,

    /// Session token for the cloud service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_session_token: Option<String>,
}

impl Config {
    /// Create a config storing local workspaces at `local_db_path`.
    pub fn new(local_db_path: impl Into<PathBuf>) -> Self {
        Self {
            debug: false,
            local_db_path: local_db_path.into(),
            cloud_server_url: None,
            cloud_session_token: None,
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save config to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

// ============================================================================
// Native-only implementation (not available in WASM)
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("collabspace");
        Self::new(data_dir.join("workspaces.db"))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Config {
    /// Get the config file path (~/.config/collabspace/config.toml)
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("collabspace").join("config.toml"))
    }

    /// Load config from the default location, or return the default if the file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            return Self::load_from(&path);
        }
        Ok(Config::default())
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().ok_or(crate::error::CollabError::NoConfigDir)?;
        self.save_to(&path)
    }
}
