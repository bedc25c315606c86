use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};

use crate::utils::format_age;

/// Consider the persisted leaderboard stale after 24 hours.
/// It is still served; staleness only changes what gets logged at startup.
const DISK_STALE_HOURS: i64 = 24;

/// Leaderboard body read back from disk.
#[derive(Debug, Clone)]
pub struct DiskSnapshot {
    pub payload: String,
    pub saved_at: DateTime<Utc>,
}

impl DiskSnapshot {
    pub fn age(&self) -> Duration {
        Utc::now() - self.saved_at
    }

    pub fn age_display(&self) -> String {
        format_age(self.age())
    }

    pub fn is_stale(&self) -> bool {
        self.age() > Duration::hours(DISK_STALE_HOURS)
    }
}

/// Persists the raw leaderboard body to a single file.
#[derive(Debug, Clone)]
pub struct DiskCache {
    path: PathBuf,
}

impl DiskCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Read the last saved body. `Ok(None)` when nothing has been saved yet.
    pub fn load(&self) -> Result<Option<DiskSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let payload = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read cache file: {}", self.path.display()))?;

        let saved_at = std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(Some(DiskSnapshot { payload, saved_at }))
    }

    /// Replace the saved body. The file is written next to the target and
    /// renamed over it, so readers never see a half-written file.
    pub fn save(&self, payload: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory: {}", parent.display())
            })?;
        }

        let temp = self.temp_path();
        std::fs::write(&temp, payload)
            .with_context(|| format!("Failed to write cache file: {}", temp.display()))?;
        std::fs::rename(&temp, &self.path)
            .with_context(|| format!("Failed to replace cache file: {}", self.path.display()))?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
