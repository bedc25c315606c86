//! Lifecycle of the ranking caches.
//!
//! `RankingService` owns the bulk and fallback caches, starts the refresh
//! worker and stops it again. Rendering code only ever sees the
//! `RankingLookup` it hands out.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::info;

use crate::api::{ApiClient, RankingSource};
use crate::cache::{BulkRankingCache, DiskCache, FallbackCache, RefreshPolicy};
use crate::config::Config;
use crate::lookup::RankingLookup;
use crate::models::RankingRecord;

pub struct RankingService {
    bulk: Arc<BulkRankingCache>,
    fallback: Arc<FallbackCache>,
    lookup: RankingLookup,
}

impl RankingService {
    /// Build the caches, load the persisted leaderboard and start the
    /// refresh worker.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    pub fn start(config: &Config, cache_file: PathBuf, source: Arc<dyn RankingSource>) -> Self {
        let policy = RefreshPolicy::default().with_interval(config.refresh_interval());
        let bulk = Arc::new(BulkRankingCache::new(
            Arc::clone(&source),
            DiskCache::new(cache_file),
            policy,
        ));
        let fallback = Arc::new(FallbackCache::new(source, config.cache_time(), Handle::current()));

        bulk.start();
        info!(players = bulk.len(), "Ranking service started");

        let lookup = RankingLookup::new(Arc::clone(&bulk), Arc::clone(&fallback));
        Self {
            bulk,
            fallback,
            lookup,
        }
    }

    /// Start against the configured API, persisting under the config directory.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = ApiClient::with_base_urls(&config.rankings_api_url, &config.profile_api_url)?;
        let cache_file = Config::cache_file()?;
        Ok(Self::start(config, cache_file, Arc::new(client)))
    }

    pub fn lookup(&self) -> RankingLookup {
        self.lookup.clone()
    }

    pub fn get_ranking_data(&self, name: &str) -> Option<Arc<RankingRecord>> {
        self.lookup.get_ranking_data(name)
    }

    pub fn bulk(&self) -> &BulkRankingCache {
        &self.bulk
    }

    pub fn fallback(&self) -> &FallbackCache {
        &self.fallback
    }

    pub fn force_refresh(&self) {
        self.bulk.force_refresh();
    }

    pub fn set_cache_time(&self, cache_time: Duration) {
        self.fallback.set_stale_after(cache_time);
    }

    pub fn clear_fallback(&self) {
        self.fallback.clear();
    }

    /// Stop the refresh worker. Await the handle to wait for it to exit.
    pub fn shutdown(&self) -> Option<JoinHandle<()>> {
        self.bulk.shutdown()
    }
}

impl Drop for RankingService {
    fn drop(&mut self) {
        self.bulk.shutdown();
    }
}
