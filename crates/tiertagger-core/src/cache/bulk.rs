//! Bulk cache of the overall leaderboard.
//!
//! The whole ranked population lives in one immutable map behind an `Arc`.
//! A refresh parses a brand-new map and swaps the pointer, so readers see
//! either the old snapshot or the new one, never a mix. The last good body
//! is persisted to disk and read back at startup so lookups work before the
//! network does.
//!
//! All refresh activity runs on a single worker task: one retrying refresh
//! at startup, then one attempt per interval. Forced refreshes are queued to
//! the same worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::api::{parse_leaderboard, PlayerMap, RankingSource};
use crate::models::RankingRecord;

use super::DiskCache;

/// Attempts made by a retrying refresh before giving up for this cycle.
const MAX_REFRESH_ATTEMPTS: u32 = 3;

/// Delay after each failed attempt of a retrying refresh.
const RETRY_DELAYS_SECS: [u64; 3] = [5, 15, 30];

/// Period of the scheduled refresh.
const REFRESH_INTERVAL_SECS: u64 = 60 * 60;

/// Timing of the refresh worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub max_attempts: u32,
    /// Delay after failed attempt `i` is `backoff[i]`; the last entry is
    /// reused when there are more attempts than delays.
    pub backoff: Vec<Duration>,
    pub interval: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_REFRESH_ATTEMPTS,
            backoff: RETRY_DELAYS_SECS
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
            interval: Duration::from_secs(REFRESH_INTERVAL_SECS),
        }
    }
}

impl RefreshPolicy {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    fn delay_after(&self, attempt: usize) -> Duration {
        self.backoff
            .get(attempt)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

/// How a retrying refresh ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RefreshOutcome {
    Refreshed,
    GaveUp,
    Cancelled,
}

struct Worker {
    force_tx: mpsc::Sender<()>,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct BulkRankingCache {
    players: RwLock<Arc<PlayerMap>>,
    source: Arc<dyn RankingSource>,
    disk: DiskCache,
    policy: RefreshPolicy,
    initialized: AtomicBool,
    last_refresh: RwLock<Option<DateTime<Utc>>>,
    worker: Mutex<Option<Worker>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BulkRankingCache {
    /// Create the cache and synchronously load the last persisted leaderboard.
    /// A missing or unreadable file leaves the cache empty.
    pub fn new(source: Arc<dyn RankingSource>, disk: DiskCache, policy: RefreshPolicy) -> Self {
        let cache = Self {
            players: RwLock::new(Arc::new(PlayerMap::new())),
            source,
            disk,
            policy,
            initialized: AtomicBool::new(false),
            last_refresh: RwLock::new(None),
            worker: Mutex::new(None),
        };
        cache.load_from_disk();
        cache
    }

    fn load_from_disk(&self) {
        let snapshot = match self.disk.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                debug!(path = %self.disk.path().display(), "No disk cache found");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Failed to load cache from disk");
                return;
            }
        };

        match parse_leaderboard(&snapshot.payload) {
            Ok(players) if !players.is_empty() => {
                if snapshot.is_stale() {
                    warn!(age = %snapshot.age_display(), "Disk cache is stale, will refresh from API");
                }
                let count = players.len();
                self.replace(players);
                info!(players = count, "Loaded players from disk cache");
            }
            Ok(_) => debug!("Disk cache holds no players"),
            Err(e) => warn!(error = %e, path = %self.disk.path().display(), "Failed to parse disk cache"),
        }
    }

    /// Swap in a new map. The old map is dropped after the lock is released.
    fn replace(&self, players: PlayerMap) {
        let mut guard = write(&self.players);
        let old = std::mem::replace(&mut *guard, Arc::new(players));
        drop(guard);
        drop(old);
    }

    // ===== Lookups =====

    /// Case-insensitive lookup. Never touches the network.
    pub fn get(&self, name: &str) -> Option<Arc<RankingRecord>> {
        let key = name.trim().to_lowercase();
        read(&self.players).get(&key).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        let key = name.trim().to_lowercase();
        read(&self.players).contains_key(&key)
    }

    /// The current map. Stays consistent however long the caller holds it.
    pub fn snapshot(&self) -> Arc<PlayerMap> {
        Arc::clone(&read(&self.players))
    }

    pub fn len(&self) -> usize {
        read(&self.players).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.players).is_empty()
    }

    /// True once the refresh worker has been started.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn last_refresh_time(&self) -> Option<DateTime<Utc>> {
        *read(&self.last_refresh)
    }

    // ===== Refresh =====

    /// One fetch attempt. Returns true if a new snapshot was swapped in.
    pub async fn refresh_once(&self) -> bool {
        let started = Instant::now();
        info!("Refreshing ranking cache from API");

        let leaderboard = match self.source.fetch_bulk().await {
            Ok(leaderboard) => leaderboard,
            Err(e) => {
                warn!(error = %e, "Failed to fetch overall rankings");
                return false;
            }
        };

        if leaderboard.players.is_empty() {
            warn!("API returned a leaderboard with no players");
            return false;
        }

        let count = leaderboard.players.len();
        self.replace(leaderboard.players);
        *write(&self.last_refresh) = Some(Utc::now());

        // The swap stands even if the disk write fails
        if let Err(e) = self.disk.save(&leaderboard.raw) {
            error!(error = %e, "Failed to save cache to disk");
        }

        info!(
            players = count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ranking cache refreshed"
        );
        true
    }

    /// Refresh with bounded retries and backoff. A shutdown signal during a
    /// backoff sleep abandons the remaining attempts.
    pub(crate) async fn refresh_with_retry(&self, shutdown: &mut watch::Receiver<bool>) -> RefreshOutcome {
        let attempts = self.policy.max_attempts.max(1);

        for attempt in 0..attempts {
            if *shutdown.borrow() {
                return RefreshOutcome::Cancelled;
            }
            if self.refresh_once().await {
                return RefreshOutcome::Refreshed;
            }
            if attempt + 1 == attempts {
                break;
            }

            let delay = self.policy.delay_after(attempt as usize);
            warn!(
                attempt = attempt + 1,
                max_attempts = attempts,
                delay_secs = delay.as_secs(),
                "Cache refresh failed, retrying"
            );
            tokio::select! {
                _ = time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    info!("Shutdown during refresh backoff, abandoning retries");
                    return RefreshOutcome::Cancelled;
                }
            }
        }

        error!(attempts, "Cache refresh failed after all attempts");
        RefreshOutcome::GaveUp
    }

    async fn run(
        self: Arc<Self>,
        mut force_rx: mpsc::Receiver<()>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        if self.refresh_with_retry(&mut shutdown_rx).await == RefreshOutcome::Cancelled {
            info!("Ranking refresh worker stopped");
            return;
        }

        let period = self.policy.interval;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break,
                _ = ticker.tick() => {
                    self.refresh_once().await;
                }
                forced = force_rx.recv() => match forced {
                    Some(()) => {
                        if self.refresh_with_retry(&mut shutdown_rx).await == RefreshOutcome::Cancelled {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        info!("Ranking refresh worker stopped");
    }

    // ===== Lifecycle =====

    /// Start the refresh worker on the current Tokio runtime.
    ///
    /// The worker immediately runs a retrying refresh, then refreshes once per
    /// interval. Returns false if a worker is already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut worker = lock(&self.worker);
        if worker.is_some() {
            warn!("Ranking refresh worker already running");
            return false;
        }

        // Capacity 1: forced refreshes requested while one is pending coalesce
        let (force_tx, force_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(Arc::clone(self).run(force_rx, shutdown_rx));

        *worker = Some(Worker {
            force_tx,
            shutdown_tx,
            handle,
        });
        self.initialized.store(true, Ordering::Release);

        info!(
            players = self.len(),
            interval_secs = self.policy.interval.as_secs(),
            "Ranking cache initialized, API refresh started"
        );
        true
    }

    /// Queue a retrying refresh on the worker without waiting for it.
    /// Callable from any thread.
    pub fn force_refresh(&self) {
        let worker = lock(&self.worker);
        let Some(worker) = worker.as_ref() else {
            warn!("Refresh worker not running, ignoring forced refresh");
            return;
        };

        match worker.force_tx.try_send(()) {
            Ok(()) => debug!("Forced refresh queued"),
            Err(TrySendError::Full(_)) => debug!("Forced refresh already pending"),
            Err(TrySendError::Closed(_)) => warn!("Refresh worker has stopped, ignoring forced refresh"),
        }
    }

    /// Stop scheduling refreshes. An HTTP call already in flight is allowed
    /// to finish; await the returned handle to wait for the worker to exit.
    pub fn shutdown(&self) -> Option<JoinHandle<()>> {
        let worker = lock(&self.worker).take()?;
        // Err only means the worker already exited
        let _ = worker.shutdown_tx.send(true);
        info!("Ranking cache shutting down");
        Some(worker.handle)
    }
}

// ============================================================================
// Tests
// ============================================================================
