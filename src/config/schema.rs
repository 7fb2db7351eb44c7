//! Configuration schema for archivist
//!
//! Configuration is stored at `~/.config/archivist/config.toml`

use crate::cache::OPENED_ARCHIVES_CACHE_SIZE;
use crate::coordinator::{CoordinatorOptions, DEFAULT_LOADING_FAILED_MESSAGE};
use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Archive cache settings
    pub cache: CacheConfig,

    /// Directory listing settings
    pub listing: ListingConfig,
}

impl Config {
    /// Coordinator tuning derived from this configuration
    pub fn coordinator_options(&self) -> CoordinatorOptions {
        CoordinatorOptions {
            capacity: self.cache.capacity,
            loading_failed_message: self.listing.loading_failed_message.clone(),
            refresh: None,
        }
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Archive cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Number of archives kept open at once (default: 4)
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: OPENED_ARCHIVES_CACHE_SIZE,
        }
    }
}

/// Directory listing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Message shown for archives that failed to open
    pub loading_failed_message: String,

    /// How long the CLI waits for an archive to finish loading
    pub load_timeout_secs: u64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            loading_failed_message: DEFAULT_LOADING_FAILED_MESSAGE.to_string(),
            load_timeout_secs: 30,
        }
    }
}
