//! Per-player cache for players missing from the overall leaderboard.
//!
//! Lookups never wait on the network. A miss (or a stale hit) returns what
//! is cached right now and kicks off a background profile fetch, at most
//! one per player at a time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::{DashMap, DashSet};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::api::RankingSource;
use crate::models::RankingRecord;
use crate::utils::normalize_player_name;

/// Default staleness threshold, matching the default `cache_time_minutes`.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(30 * 60);

/// Clears a player's in-flight marker when the fetch task ends, however it ends.
struct InFlightGuard {
    in_flight: Arc<DashSet<String>>,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
    }
}

pub struct FallbackCache {
    entries: Arc<DashMap<String, Arc<RankingRecord>>>,
    in_flight: Arc<DashSet<String>>,
    source: Arc<dyn RankingSource>,
    stale_after_ms: AtomicU64,
    runtime: Handle,
}

impl FallbackCache {
    /// `runtime` runs the background fetches, so `get` works from threads
    /// outside Tokio.
    pub fn new(source: Arc<dyn RankingSource>, stale_after: Duration, runtime: Handle) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            in_flight: Arc::new(DashSet::new()),
            source,
            stale_after_ms: AtomicU64::new(duration_millis(stale_after)),
            runtime,
        }
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms.load(Ordering::Relaxed))
    }

    /// Change the staleness threshold; applies to the next `get`.
    pub fn set_stale_after(&self, stale_after: Duration) {
        self.stale_after_ms
            .store(duration_millis(stale_after), Ordering::Relaxed);
    }

    /// Return the cached record for `name`, matched case-insensitively.
    ///
    /// Fresh hits return immediately. Otherwise the cached value, stale or
    /// `None`, is returned and a background fetch is started unless one is
    /// already running for this player. The fetch asks for the name as the
    /// caller spelled it, so the stored record keeps that casing.
    pub fn get(&self, name: &str) -> Option<Arc<RankingRecord>> {
        let key = normalize_player_name(name)?;
        let cached = self.entries.get(&key).map(|entry| Arc::clone(entry.value()));

        let fresh = cached
            .as_ref()
            .is_some_and(|record| !record.is_stale(self.stale_after()));
        if !fresh {
            self.spawn_fetch(key, name.trim());
        }

        cached
    }

    fn spawn_fetch(&self, key: String, display_name: &str) {
        // The insert is the claim: only one caller per key gets `true`
        if !self.in_flight.insert(key.clone()) {
            return;
        }

        let guard = InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            key,
        };
        let entries = Arc::clone(&self.entries);
        let source = Arc::clone(&self.source);
        let display_name = display_name.to_string();

        self.runtime.spawn(async move {
            let key = guard.key.clone();
            let result = source.fetch_one(&display_name).await;
            match result {
                Ok(Some(record)) => {
                    debug!(player = %display_name, "Fetched ranking via profile fallback");
                    entries.insert(key, Arc::new(record));
                }
                Ok(None) => debug!(player = %display_name, "Player has no profile"),
                Err(e) => warn!(player = %display_name, error = %e, "Failed to fetch player profile"),
            }
            drop(guard);
        });
    }

    /// True while a background fetch for `key` (lower-cased) is outstanding.
    pub fn is_fetching(&self, key: &str) -> bool {
        self.in_flight.contains(key)
    }

    pub fn remove(&self, key: &str) -> Option<Arc<RankingRecord>> {
        self.entries.remove(key).map(|(_, record)| record)
    }

    /// Drop every cached record. Fetches still running keep their in-flight
    /// markers and store their result when they finish.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn insert(&self, key: &str, record: RankingRecord) {
        self.entries.insert(key.to_string(), Arc::new(record));
    }
}

fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::testing::{FakeSource, ProfileReply};

    fn build(source: &Arc<FakeSource>) -> Arc<FallbackCache> {
        Arc::new(FallbackCache::new(
            Arc::clone(source) as Arc<dyn RankingSource>,
            DEFAULT_STALE_AFTER,
            Handle::current(),
        ))
    }

    async fn settle(cache: &FallbackCache, key: &str) {
        for _ in 0..1_000 {
            if !cache.is_fetching(key) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("fetch for {key} never settled");
    }

    async fn wait_for_calls(source: &FakeSource, calls: usize) {
        for _ in 0..1_000 {
            if source.profile_calls() >= calls {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("expected {calls} profile calls, saw {}", source.profile_calls());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_fetch_once() {
        let gate = Arc::new(Semaphore::new(0));
        let source = Arc::new(FakeSource::gated(Arc::clone(&gate)));
        source.set_profile(
            "newbie",
            ProfileReply::Found(RankingRecord::new("Newbie", "EU", 3, "Rookie", 0)),
        );
        let cache = build(&source);

        let callers: Vec<_> = (0..32)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get("newbie") })
            })
            .collect();
        for result in futures::future::join_all(callers).await {
            assert!(result.expect("caller joins").is_none());
        }

        wait_for_calls(&source, 1).await;
        assert!(cache.is_fetching("newbie"));
        assert!(cache.get("newbie").is_none());

        gate.add_permits(1);
        settle(&cache, "newbie").await;
        assert_eq!(source.profile_calls(), 1);

        let record = cache.get("newbie").expect("stored after fetch");
        assert_eq!(record.region, "EU");
        assert_eq!(cache.len(), 1);

        // Fresh hit: no new fetch
        assert!(!cache.is_fetching("newbie"));
        assert_eq!(source.profile_calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_keeps_caller_spelling() {
        let source = Arc::new(FakeSource::new());
        source.set_profile("NewBie", ProfileReply::FromBody(r#"{"profile":{"region":"EU"}}"#.to_string()));
        let cache = build(&source);

        assert!(cache.get("  NewBie ").is_none());
        settle(&cache, "newbie").await;

        assert_eq!(source.profile_requests(), vec!["NewBie".to_string()]);
        let record = cache.get("newbie").expect("stored under the lower-cased key");
        assert_eq!(record.name, "NewBie");
        assert_eq!(record.region, "EU");
        assert!(cache.get("   ").is_none());
    }

    #[tokio::test]
    async fn test_not_found_leaves_cache_empty() {
        let source = Arc::new(FakeSource::new());
        let cache = build(&source);

        assert!(cache.get("ghost").is_none());
        settle(&cache, "ghost").await;

        assert_eq!(source.profile_calls(), 1);
        assert!(cache.is_empty());

        // Absent keys are fetched again on the next lookup
        assert!(cache.get("ghost").is_none());
        settle(&cache, "ghost").await;
        assert_eq!(source.profile_calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_stale_value() {
        let source = Arc::new(FakeSource::new());
        source.set_profile("veteran", ProfileReply::Fail);
        let cache = build(&source);

        let old = RankingRecord::fetched_at(
            "Veteran",
            "NA",
            99,
            "Rookie",
            0,
            Utc::now() - chrono::Duration::hours(2),
        );
        cache.insert("veteran", old);

        let stale = cache.get("veteran").expect("stale value served");
        assert_eq!(stale.total_points, 99);
        settle(&cache, "veteran").await;

        assert_eq!(source.profile_calls(), 1);
        assert_eq!(cache.get("veteran").expect("still cached").total_points, 99);
    }

    #[tokio::test]
    async fn test_stale_value_is_replaced() {
        let source = Arc::new(FakeSource::new());
        source.set_profile(
            "veteran",
            ProfileReply::Found(RankingRecord::new("Veteran", "NA", 150, "Ace", 9)),
        );
        let cache = build(&source);
        cache.insert(
            "veteran",
            RankingRecord::fetched_at("Veteran", "NA", 99, "Rookie", 0, Utc::now() - chrono::Duration::hours(2)),
        );

        assert_eq!(cache.get("veteran").expect("stale value").total_points, 99);
        settle(&cache, "veteran").await;
        assert_eq!(cache.get("veteran").expect("fresh value").total_points, 150);
        assert_eq!(source.profile_calls(), 1);
    }

    #[tokio::test]
    async fn test_threshold_is_read_on_each_call() {
        let source = Arc::new(FakeSource::new());
        let cache = build(&source);
        cache.insert(
            "veteran",
            RankingRecord::fetched_at("Veteran", "NA", 1, "Rookie", 0, Utc::now() - chrono::Duration::minutes(10)),
        );

        assert!(cache.get("veteran").is_some());
        assert_eq!(source.profile_calls(), 0);

        cache.set_stale_after(Duration::from_secs(60));
        assert_eq!(cache.stale_after(), Duration::from_secs(60));
        assert!(cache.get("veteran").is_some());
        settle(&cache, "veteran").await;
        assert_eq!(source.profile_calls(), 1);
    }

    #[tokio::test]
    async fn test_get_from_non_runtime_thread() {
        let source = Arc::new(FakeSource::new());
        source.set_profile(
            "outsider",
            ProfileReply::Found(RankingRecord::new("Outsider", "SA", 1, "Rookie", 0)),
        );
        let cache = build(&source);

        let from_thread = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || cache.get("outsider"))
                .join()
                .expect("thread joins")
        };
        assert!(from_thread.is_none());

        settle(&cache, "outsider").await;
        assert!(cache.get("outsider").is_some());
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let source = Arc::new(FakeSource::new());
        let cache = build(&source);
        cache.insert("a", RankingRecord::new("A", "NA", 0, "Rookie", 0));
        cache.insert("b", RankingRecord::new("B", "NA", 0, "Rookie", 0));

        assert_eq!(cache.remove("a").map(|r| r.name.clone()), Some("A".to_string()));
        assert!(cache.remove("a").is_none());
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
