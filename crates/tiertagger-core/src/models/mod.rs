//! Data models for ranking data.
//!
//! - `RankingRecord`, `CategoryStanding`: one player's ranking snapshot
//! - `normalize_category`, `tier_ordinal`: category and tier comparison rules
//! - `PlayerSearchResult`: profile search hits

pub mod category;
pub mod ranking;
pub mod search;

pub use category::{normalize_category, tier_ordinal, UNRANKED, UNRANKED_ORDINAL};
pub use ranking::{CategoryStanding, RankingRecord};
pub use search::PlayerSearchResult;
