//! API client for the Central Tier List ranking service.
//!
//! One request per call, no retries and no caching: callers decide what to
//! do with failures.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode, Url};
use tracing::debug;

use crate::models::{PlayerSearchResult, RankingRecord};

use super::payload::{parse_leaderboard, parse_profile, parse_search};
use super::{FetchError, Leaderboard, RankingSource};

// ============================================================================
// Constants
// ============================================================================

/// Base URL serving the overall leaderboard.
pub const DEFAULT_RANKINGS_API_URL: &str = "https://api.centraltierlist.com";

/// Base URL serving per-player profiles and search.
pub const DEFAULT_PROFILE_API_URL: &str = "https://ctltierlist-api-b2s8.vercel.app";

/// TCP connect timeout shared by all requests.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Total timeout for the overall leaderboard; the payload lists every ranked player.
const BULK_TIMEOUT_SECS: u64 = 60;

/// Total timeout for a single profile lookup.
const PROFILE_TIMEOUT_SECS: u64 = 15;

/// Total timeout for an interactive profile search.
const SEARCH_TIMEOUT_SECS: u64 = 10;

/// API client for the ranking service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    rankings_base: Url,
    profile_base: Url,
}

impl ApiClient {
    /// Create a client against the public ranking service.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_base_urls(DEFAULT_RANKINGS_API_URL, DEFAULT_PROFILE_API_URL)
    }

    /// Create a client against custom base URLs (mirrors, staging, tests).
    pub fn with_base_urls(rankings_base: &str, profile_base: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(concat!("tiertagger/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            rankings_base: Self::parse_base(rankings_base)?,
            profile_base: Self::parse_base(profile_base)?,
        })
    }

    fn parse_base(base: &str) -> Result<Url, FetchError> {
        let url = Url::parse(base).map_err(|e| FetchError::InvalidUrl(format!("{base}: {e}")))?;
        if url.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl(base.to_string()));
        }
        Ok(url)
    }

    /// Append path segments to a base URL, percent-encoding each one.
    fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn bulk_url(&self) -> Result<Url, FetchError> {
        Self::endpoint(&self.rankings_base, &["rankings", "overall"])
    }

    pub fn profile_url(&self, name: &str) -> Result<Url, FetchError> {
        Self::endpoint(&self.profile_base, &["api", "search_profile", name])
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, FetchError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(FetchError::from_status(status, &body))
        }
    }

    async fn get_text(&self, url: Url, timeout_secs: u64) -> Result<Option<String>, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "application/json")
            .timeout(Duration::from_secs(timeout_secs))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(url = %url, "Ranking service returned 404");
            return Ok(None);
        }

        let response = Self::check_response(response).await?;
        Ok(Some(response.text().await?))
    }

    // ===== Data Fetching Methods =====

    /// Fetch and parse the overall leaderboard.
    pub async fn fetch_bulk(&self) -> Result<Leaderboard, FetchError> {
        let url = self.bulk_url()?;
        debug!(url = %url, "Fetching overall leaderboard");

        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .timeout(Duration::from_secs(BULK_TIMEOUT_SECS))
            .send()
            .await?;
        let response = Self::check_response(response).await?;

        let raw = response.text().await?;
        let players = parse_leaderboard(&raw)?;
        debug!(players = players.len(), bytes = raw.len(), "Leaderboard parsed");

        Ok(Leaderboard { players, raw })
    }

    /// Fetch a single player's profile. `Ok(None)` means the service has no
    /// such player.
    pub async fn fetch_one(&self, name: &str) -> Result<Option<RankingRecord>, FetchError> {
        let url = self.profile_url(name)?;
        debug!(player = name, "Fetching player profile");

        match self.get_text(url, PROFILE_TIMEOUT_SECS).await? {
            Some(body) => parse_profile(&body, name),
            None => Ok(None),
        }
    }

    /// Search profiles by name.
    pub async fn search_players(&self, query: &str) -> Result<Vec<PlayerSearchResult>, FetchError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.profile_url(query)?;
        match self.get_text(url, SEARCH_TIMEOUT_SECS).await? {
            Some(body) => parse_search(&body, query),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl RankingSource for ApiClient {
    async fn fetch_bulk(&self) -> Result<Leaderboard, FetchError> {
        ApiClient::fetch_bulk(self).await
    }

    async fn fetch_one(&self, name: &str) -> Result<Option<RankingRecord>, FetchError> {
        ApiClient::fetch_one(self, name).await
    }
}
