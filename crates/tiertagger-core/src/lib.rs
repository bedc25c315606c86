//! Core library for tiertagger.
//!
//! Fetches player rankings from the Central Tier List service and keeps them
//! available to latency-sensitive callers:
//!
//! - `api`: HTTP client and wire-format parsing
//! - `cache`: the bulk leaderboard cache (scheduled refresh, retries, disk
//!   persistence) and the per-player fallback cache
//! - `lookup`: the read-only `RankingLookup` used by rendering code
//! - `service`: `RankingService`, which wires everything together and owns
//!   the refresh worker's lifecycle

pub mod api;
pub mod cache;
pub mod config;
pub mod lookup;
pub mod models;
pub mod service;
pub mod utils;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, FetchError, Leaderboard, RankingSource};
pub use cache::{BulkRankingCache, FallbackCache, RefreshPolicy};
pub use config::Config;
pub use lookup::RankingLookup;
pub use models::{CategoryStanding, PlayerSearchResult, RankingRecord};
pub use service::RankingService;
