//! Wire formats of the ranking endpoints and their conversion to
//! [`RankingRecord`]s.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Deserialize;

use crate::models::{PlayerSearchResult, RankingRecord, UNRANKED};

use super::FetchError;

/// Player map keyed by lower-cased name.
pub type PlayerMap = HashMap<String, Arc<RankingRecord>>;

/// Region used when the API omits one.
const DEFAULT_REGION: &str = "Unknown";

/// Title the overall leaderboard implies for players without one.
const DEFAULT_LEADERBOARD_TITLE: &str = "Rookie";

// ============================================================================
// Wire types - internal only
// ============================================================================

#[derive(Debug, Deserialize)]
struct LeaderboardResponse {
    leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Deserialize)]
struct LeaderboardEntry {
    #[serde(rename = "ingameName")]
    ingame_name: String,
    region: Option<String>,
    #[serde(rename = "totalPoints")]
    total_points: Option<i64>,
    title: Option<String>,
    rank: Option<i64>,
    ranks: Option<BTreeMap<String, RankEntry>>,
}

#[derive(Debug, Deserialize)]
struct RankEntry {
    rank: Option<String>,
    retired: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    profile: Option<ProfileInfo>,
    #[serde(rename = "totalPoints")]
    total_points: Option<i64>,
    title: Option<String>,
    rank: Option<i64>,
    ranks: Option<BTreeMap<String, RankEntry>>,
}

#[derive(Debug, Deserialize)]
struct ProfileInfo {
    name: Option<String>,
    region: Option<String>,
    uuid: Option<String>,
    avatar: Option<String>,
}

fn apply_ranks(
    mut record: RankingRecord,
    ranks: Option<BTreeMap<String, RankEntry>>,
) -> RankingRecord {
    for (category, entry) in ranks.into_iter().flatten() {
        if let Some(rank) = entry.rank {
            record = record.with_standing(&category, rank, entry.retired.unwrap_or(false));
        }
    }
    record
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse the body of `/rankings/overall` into a fresh player map.
pub fn parse_leaderboard(body: &str) -> Result<PlayerMap, FetchError> {
    let parsed: LeaderboardResponse = serde_json::from_str(body)?;

    let mut players = PlayerMap::with_capacity(parsed.leaderboard.len());
    for entry in parsed.leaderboard {
        let record = RankingRecord::new(
            entry.ingame_name,
            entry.region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
            entry.total_points.unwrap_or(0),
            entry
                .title
                .unwrap_or_else(|| DEFAULT_LEADERBOARD_TITLE.to_string()),
            entry.rank.unwrap_or(0),
        );
        let record = apply_ranks(record, entry.ranks);
        players.insert(record.key(), Arc::new(record));
    }

    Ok(players)
}

/// Parse the body of `/api/search_profile/<name>`.
///
/// A body without a `profile` object means the player doesn't exist and
/// yields `Ok(None)`.
pub fn parse_profile(body: &str, requested: &str) -> Result<Option<RankingRecord>, FetchError> {
    let parsed: ProfileResponse = serde_json::from_str(body)?;
    let Some(profile) = parsed.profile else {
        return Ok(None);
    };

    let record = RankingRecord::new(
        profile.name.unwrap_or_else(|| requested.to_string()),
        profile.region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
        parsed.total_points.unwrap_or(0),
        parsed.title.unwrap_or_else(|| UNRANKED.to_string()),
        parsed.rank.unwrap_or(0),
    )
    .with_profile(profile.uuid, profile.avatar);

    Ok(Some(apply_ranks(record, parsed.ranks)))
}

/// Parse a profile search body into search hits (zero or one).
pub fn parse_search(body: &str, query: &str) -> Result<Vec<PlayerSearchResult>, FetchError> {
    let results = parse_profile(body, query)?
        .map(|record| PlayerSearchResult {
            tier: record.highest_tier().to_string(),
            uuid: record.uuid.clone().unwrap_or_default(),
            name: record.name,
        })
        .into_iter()
        .collect();
    Ok(results)
}
