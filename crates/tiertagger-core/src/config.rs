//! Application configuration management.
//!
//! Only the settings the ranking caches need live here: the fallback cache
//! lifetime, the refresh period and the two API base URLs.
//!
//! Configuration is stored at `~/.config/ctl-tiertagger/config.json`, next
//! to the persisted leaderboard (`cache.json`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::client::{DEFAULT_PROFILE_API_URL, DEFAULT_RANKINGS_API_URL};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "ctl-tiertagger";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Persisted leaderboard file name
const CACHE_FILE: &str = "cache.json";

const DEFAULT_CACHE_TIME_MINUTES: u64 = 30;

const DEFAULT_REFRESH_INTERVAL_MINUTES: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// How long a fallback profile stays fresh.
    pub cache_time_minutes: u64,
    pub refresh_interval_minutes: u64,
    pub rankings_api_url: String,
    pub profile_api_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_time_minutes: DEFAULT_CACHE_TIME_MINUTES,
            refresh_interval_minutes: DEFAULT_REFRESH_INTERVAL_MINUTES,
            rankings_api_url: DEFAULT_RANKINGS_API_URL.to_string(),
            profile_api_url: DEFAULT_PROFILE_API_URL.to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn app_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::app_dir()?.join(CONFIG_FILE))
    }

    /// Where the raw leaderboard is persisted.
    pub fn cache_file() -> Result<PathBuf> {
        Ok(Self::app_dir()?.join(CACHE_FILE))
    }

    pub fn cache_time(&self) -> Duration {
        Duration::from_secs(self.cache_time_minutes.saturating_mul(60))
    }

    /// Refresh period, never shorter than one minute.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_minutes.max(1).saturating_mul(60))
    }
}
