//! REST API client module for the Central Tier List ranking service.
//!
//! This module provides the `ApiClient` for fetching the overall
//! leaderboard and individual player profiles, plus the `RankingSource`
//! trait the caches fetch through.

pub mod client;
pub mod error;
pub mod payload;

use async_trait::async_trait;

use crate::models::RankingRecord;

pub use client::ApiClient;
pub use error::FetchError;
pub use payload::{parse_leaderboard, PlayerMap};

/// A parsed overall leaderboard together with the body it came from.
///
/// The raw body is what gets persisted, so a later startup can parse exactly
/// what the service sent.
#[derive(Debug, Clone)]
pub struct Leaderboard {
    pub players: PlayerMap,
    pub raw: String,
}

/// Where the caches get ranking data from.
#[async_trait]
pub trait RankingSource: Send + Sync {
    /// Fetch the whole leaderboard in one request.
    async fn fetch_bulk(&self) -> Result<Leaderboard, FetchError>;

    /// Fetch one player. `Ok(None)` is a successful "no such player".
    async fn fetch_one(&self, name: &str) -> Result<Option<RankingRecord>, FetchError>;
}
