//! tiertagger - look up Central Tier List rankings from the command line.
//!
//! Starts the ranking service (disk snapshot first, then the API), prints
//! the requested players and exits.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tiertagger_core::cache::DiskCache;
use tiertagger_core::utils::{format_age, normalize_player_name};
use tiertagger_core::{
    ApiClient, BulkRankingCache, Config, PlayerSearchResult, RankingRecord, RankingService, RefreshPolicy,
};

// ============================================================================
// Constants
// ============================================================================

/// Default time to wait for the first API refresh and profile fetches.
const DEFAULT_WAIT_SECS: u64 = 10;

/// How often to check whether background work has finished.
const POLL_INTERVAL_MS: u64 = 100;

/// Maximum concurrent profile searches.
const MAX_CONCURRENT_SEARCHES: usize = 4;

/// File name prefix for rolling log files.
const LOG_FILE_PREFIX: &str = "tiertagger.log";

/// Look up Central Tier List rankings for one or more players.
///
/// Set RUST_LOG to control log verbosity (e.g. RUST_LOG=debug).
#[derive(Debug, Parser)]
#[command(name = "tiertagger", version, arg_required_else_help = true)]
struct Args {
    /// Players to look up
    names: Vec<String>,

    /// Search player profiles (repeatable)
    #[arg(long, value_name = "QUERY")]
    search: Vec<String>,

    /// Seconds to wait for fresh data
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_WAIT_SECS)]
    wait: u64,

    /// Only use the rankings saved on disk
    #[arg(long)]
    offline: bool,

    /// Also write logs to a daily file in this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let _log_guard = init_tracing(args.log_dir.as_deref());
    info!("tiertagger starting");

    let config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        Config::default()
    });

    if !args.search.is_empty() {
        run_searches(&config, &args.search).await?;
    }

    if !args.names.is_empty() {
        run_lookups(&config, &args).await?;
    }

    info!("tiertagger shutting down");
    Ok(())
}

async fn run_lookups(config: &Config, args: &Args) -> Result<()> {
    if args.offline {
        return print_offline(config, &args.names);
    }

    let service = RankingService::from_config(config)?;
    let deadline = Instant::now() + Duration::from_secs(args.wait);

    wait_until(deadline, || service.bulk().last_refresh_time().is_some()).await;
    if service.bulk().last_refresh_time().is_none() {
        warn!("No fresh leaderboard yet, showing saved rankings");
    }

    // First pass starts profile fetches for players missing from the leaderboard
    let lookup = service.lookup();
    for name in &args.names {
        lookup.get_ranking_data(name);
    }
    let keys: Vec<String> = args
        .names
        .iter()
        .filter_map(|n| normalize_player_name(n))
        .collect();
    wait_until(deadline, || keys.iter().all(|k| !service.fallback().is_fetching(k))).await;

    for name in &args.names {
        print_lookup(name, lookup.get_ranking_data(name).as_deref());
    }

    service.shutdown();
    Ok(())
}

/// Print straight from the persisted leaderboard.
fn print_offline(config: &Config, names: &[String]) -> Result<()> {
    let bulk = offline_cache(config, Config::cache_file()?)?;
    if bulk.is_empty() {
        warn!("No saved rankings on disk");
    }

    for name in names {
        print_lookup(name, bulk.get(name).as_deref());
    }
    Ok(())
}

/// Leaderboard cache loaded from disk only. Its refresh worker is never
/// started, so nothing touches the network.
fn offline_cache(config: &Config, cache_file: PathBuf) -> Result<BulkRankingCache> {
    let client = ApiClient::with_base_urls(&config.rankings_api_url, &config.profile_api_url)?;
    Ok(BulkRankingCache::new(
        Arc::new(client),
        DiskCache::new(cache_file),
        RefreshPolicy::default(),
    ))
}

async fn wait_until(deadline: Instant, mut done: impl FnMut() -> bool) {
    while !done() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
    }
}

async fn run_searches(config: &Config, queries: &[String]) -> Result<()> {
    let client = ApiClient::with_base_urls(&config.rankings_api_url, &config.profile_api_url)?;

    let results: Vec<_> = stream::iter(queries)
        .map(|query| {
            let client = client.clone();
            async move { (query, client.search_players(query).await) }
        })
        .buffer_unordered(MAX_CONCURRENT_SEARCHES)
        .collect()
        .await;

    for (query, result) in results {
        match result {
            Ok(hits) if hits.is_empty() => println!("{}: no players found", query),
            Ok(hits) => {
                for hit in hits {
                    println!("{}", format_search_hit(&hit));
                }
            }
            Err(e) => println!("{}: search failed ({})", query, e),
        }
    }
    Ok(())
}

fn format_search_hit(hit: &PlayerSearchResult) -> String {
    if hit.uuid.is_empty() {
        format!("{} - {}", hit.name, hit.tier)
    } else {
        format!("{} [{}] - {}", hit.name, hit.uuid, hit.tier)
    }
}

fn print_lookup(name: &str, record: Option<&RankingRecord>) {
    match record {
        Some(record) => println!("{}", format_record(record)),
        None => println!("{}: no ranking data", name.trim()),
    }
}

fn format_record(record: &RankingRecord) -> String {
    let mut lines = vec![format!(
        "{} ({}) #{} - {}, {} points",
        record.name, record.region, record.overall_rank, record.title, record.total_points
    )];

    for (category, standing) in record.categories() {
        let retired = if standing.retired { " (retired)" } else { "" };
        lines.push(format!("  {}: {}{}", category, standing.rank, retired));
    }

    match record.highest_tier_category() {
        Some((category, standing)) => lines.push(format!("  Best: {} in {}", standing.rank, category)),
        None => lines.push("  Best: Unranked".to_string()),
    }
    lines.push(format!("  Fetched {}", format_age(record.age())));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("tiertagger").chain(list.iter().copied()))
    }

    #[test]
    fn test_parse_args() {
        let parsed = args(&["Steve", "--search", "alex", "--wait", "3", "--offline", "Notch"])
            .expect("valid args");
        assert_eq!(parsed.names, vec!["Steve", "Notch"]);
        assert_eq!(parsed.search, vec!["alex"]);
        assert_eq!(parsed.wait, 3);
        assert!(parsed.offline);
        assert!(parsed.log_dir.is_none());
    }

    #[test]
    fn test_parse_args_defaults() {
        let parsed = args(&["Steve", "--search", "a", "--search", "b"]).expect("valid args");
        assert_eq!(parsed.wait, DEFAULT_WAIT_SECS);
        assert_eq!(parsed.search, vec!["a", "b"]);
        assert!(!parsed.offline);
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(args(&["--wait"]).is_err());
        assert!(args(&["--wait", "soon"]).is_err());
        assert!(args(&["--bogus"]).is_err());
        assert!(args(&[]).is_err());
    }

    #[test]
    fn test_command_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_offline_cache_reads_disk_without_worker() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache_file = dir.path().join("cache.json");
        DiskCache::new(&cache_file)
            .save(r#"{"leaderboard":[{"ingameName":"Foo","region":"NA","ranks":{"sword":{"rank":"HT1"}}}]}"#)
            .expect("seed disk cache");

        let bulk = offline_cache(&Config::default(), cache_file).expect("cache builds");
        assert_eq!(bulk.get("foo").expect("foo on disk").region, "NA");
        assert!(!bulk.is_initialized());
        assert!(bulk.last_refresh_time().is_none());
    }

    #[test]
    fn test_format_record() {
        let record = RankingRecord::new("Foo", "NA", 310, "Combat Master", 1)
            .with_standing("sword", "HT1", false)
            .with_standing("cpvp", "LT2", true);
        let text = format_record(&record);
        assert!(text.starts_with("Foo (NA) #1 - Combat Master, 310 points"));
        assert!(text.contains("  Crystal: LT2 (retired)"));
        assert!(text.contains("  Best: HT1 in Sword"));
        assert!(text.ends_with("Fetched just now"));
    }

    #[test]
    fn test_format_search_hit() {
        let hit = PlayerSearchResult {
            name: "Alex".to_string(),
            uuid: String::new(),
            tier: "LT3".to_string(),
        };
        assert_eq!(format_search_hit(&hit), "Alex - LT3");
    }
}
