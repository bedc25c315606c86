use std::sync::Arc;

use crate::cache::{BulkRankingCache, FallbackCache};
use crate::models::RankingRecord;
use crate::utils::normalize_player_name;

/// Read-only entry point for rendering code.
///
/// Checks the bulk leaderboard first and the per-player fallback second.
/// Never waits on the network: a `None` means "nothing to show right now".
#[derive(Clone)]
pub struct RankingLookup {
    bulk: Arc<BulkRankingCache>,
    fallback: Arc<FallbackCache>,
}

impl RankingLookup {
    pub fn new(bulk: Arc<BulkRankingCache>, fallback: Arc<FallbackCache>) -> Self {
        Self { bulk, fallback }
    }

    pub fn get_ranking_data(&self, name: &str) -> Option<Arc<RankingRecord>> {
        let key = normalize_player_name(name)?;
        self.bulk.get(&key).or_else(|| self.fallback.get(name))
    }
}
