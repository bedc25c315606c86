use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::category::{normalize_category, tier_ordinal, UNRANKED, UNRANKED_ORDINAL};

/// A player's standing in one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryStanding {
    pub rank: String,
    pub retired: bool,
}

impl CategoryStanding {
    pub fn ordinal(&self) -> u32 {
        tier_ordinal(&self.rank)
    }
}

/// Snapshot of one player's rankings as returned by the ranking service.
///
/// Records are built once while parsing a response and are shared behind an
/// `Arc` afterwards; newer data replaces a record, it never edits one.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingRecord {
    /// Display name as the API spelled it.
    pub name: String,
    pub region: String,
    pub total_points: i64,
    pub title: String,
    /// Position on the overall leaderboard, 0 when unknown.
    pub overall_rank: i64,
    pub uuid: Option<String>,
    pub avatar_url: Option<String>,
    fetched_at: DateTime<Utc>,
    categories: BTreeMap<String, CategoryStanding>,
}

impl RankingRecord {
    pub fn new(
        name: impl Into<String>,
        region: impl Into<String>,
        total_points: i64,
        title: impl Into<String>,
        overall_rank: i64,
    ) -> Self {
        Self::fetched_at(name, region, total_points, title, overall_rank, Utc::now())
    }

    pub(crate) fn fetched_at(
        name: impl Into<String>,
        region: impl Into<String>,
        total_points: i64,
        title: impl Into<String>,
        overall_rank: i64,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
            total_points,
            title: title.into(),
            overall_rank,
            uuid: None,
            avatar_url: None,
            fetched_at,
            categories: BTreeMap::new(),
        }
    }

    pub fn with_profile(mut self, uuid: Option<String>, avatar_url: Option<String>) -> Self {
        self.uuid = uuid;
        self.avatar_url = avatar_url;
        self
    }

    /// Add a category standing. The category name is normalized and empty
    /// rank labels are dropped.
    pub fn with_standing(mut self, category: &str, rank: impl Into<String>, retired: bool) -> Self {
        let rank = rank.into();
        if !rank.is_empty() {
            self.categories
                .insert(normalize_category(category), CategoryStanding { rank, retired });
        }
        self
    }

    /// Lower-cased name used as the cache key.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn fetch_time(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn categories(&self) -> &BTreeMap<String, CategoryStanding> {
        &self.categories
    }

    pub fn standing(&self, category: &str) -> Option<&CategoryStanding> {
        self.categories.get(&normalize_category(category))
    }

    /// Rank label for a category, or `Unranked`.
    pub fn tier_for(&self, category: &str) -> &str {
        self.standing(category)
            .map(|s| s.rank.as_str())
            .unwrap_or(UNRANKED)
    }

    pub fn is_retired(&self, category: &str) -> bool {
        self.standing(category).map(|s| s.retired).unwrap_or(false)
    }

    pub fn has_tier(&self, category: &str) -> bool {
        self.standing(category)
            .map(|s| s.rank != UNRANKED)
            .unwrap_or(false)
    }

    /// Category holding the best tier.
    ///
    /// Equal ordinals resolve to the lexicographically smallest category
    /// name, which is the first one in the map's iteration order.
    pub fn highest_tier_category(&self) -> Option<(&str, &CategoryStanding)> {
        let mut best: Option<(&str, &CategoryStanding)> = None;
        for (category, standing) in &self.categories {
            let ordinal = standing.ordinal();
            if ordinal == UNRANKED_ORDINAL {
                continue;
            }
            match best {
                Some((_, current)) if current.ordinal() <= ordinal => {}
                _ => best = Some((category.as_str(), standing)),
            }
        }
        best
    }

    pub fn highest_tier(&self) -> &str {
        self.highest_tier_category()
            .map(|(_, s)| s.rank.as_str())
            .unwrap_or(UNRANKED)
    }

    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.fetched_at
    }

    /// True once the record is older than `threshold`.
    pub fn is_stale(&self, threshold: Duration) -> bool {
        match chrono::Duration::from_std(threshold) {
            Ok(threshold) => self.age() > threshold,
            Err(_) => false,
        }
    }
}
