//! Ranking caches.
//!
//! - `BulkRankingCache`: the overall leaderboard, refreshed on a schedule and
//!   persisted to disk for offline startup
//! - `FallbackCache`: per-player profiles for players missing from the
//!   leaderboard, fetched in the background one request per player
//! - `DiskCache`: raw leaderboard persistence

pub mod bulk;
pub mod disk;
pub mod fallback;

pub use bulk::{BulkRankingCache, RefreshPolicy};
pub use disk::{DiskCache, DiskSnapshot};
pub use fallback::{FallbackCache, DEFAULT_STALE_AFTER};
