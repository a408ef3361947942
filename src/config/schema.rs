//! Configuration schema for getpack
//!
//! Configuration is stored at `~/.config/getpack/config.toml`

use crate::fetch::FetchSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache location and locking
    pub cache: CacheConfig,

    /// Download timeouts
    pub network: NetworkConfig,

    /// Additional resource declarations
    pub catalog: CatalogConfig,
}

impl Config {
    /// Timeouts handed to the network transports
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            timeout: Duration::from_secs(self.network.timeout_secs),
            connect_timeout: Duration::from_secs(self.network.connect_timeout_secs),
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.cache.lock_timeout_secs)
    }

    pub fn staging_max_age(&self) -> Duration {
        Duration::from_secs(self.cache.staging_max_age_hours * 3600)
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache root (default: platform cache dir + `getpack`)
    pub root: Option<PathBuf>,

    /// Seconds to wait for another process installing the same resource
    pub lock_timeout_secs: u64,

    /// `clean` removes abandoned staging dirs older than this
    pub staging_max_age_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: None,
            lock_timeout_secs: 300,
            staging_max_age_hours: 24,
        }
    }
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Whole-download timeout in seconds
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 600,
            connect_timeout_secs: 30,
        }
    }
}

/// Catalog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// TOML file merged over the built-in catalog
    pub path: Option<PathBuf>,
}
