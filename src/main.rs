use grocery_compare::analyzer::{MatchEngine, best_per_retailer};
use grocery_compare::config::{AppConfig, RetailerConfig, load_config};
use grocery_compare::model::{Deal, RawCandidate, ScrapeRequest};
use grocery_compare::normalizer::normalize_all;
use grocery_compare::parser::{Parser, RetailerParser};
use grocery_compare::scraper::{Scraper, ScraperImpl};
use grocery_compare::storage::SqliteStorage;

use clap::Parser as ClapParser;
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

#[derive(ClapParser, Debug)]
#[command(name = "grocery-compare", about = "Compare grocery unit prices across retailers")]
struct Args {
    /// Path to the JSON config file
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Skip the deal cache for this run
    #[arg(long)]
    no_cache: bool,

    /// Items to look up, e.g. "pork belly" "eggs" "นมสด"
    #[arg(required = true)]
    items: Vec<String>,
}

#[derive(Serialize)]
struct Report {
    results: BTreeMap<String, Vec<Deal>>,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let config: Arc<AppConfig> = match load_config(&args.config) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!("Config load error: {}", e);
            return;
        }
    };
    if config.retailers.is_empty() {
        warn!("No retailers configured in {}", args.config);
    }

    let engine = match MatchEngine::from_config(&config.matching) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            error!("Match engine setup failed: {}", e);
            return;
        }
    };
    info!("Match engine ready ({:?} mode)", engine.mode());

    let scraper = match ScraperImpl::new(&config.retailers, config.request_timeout_seconds) {
        Ok(s) => s,
        Err(e) => {
            error!("HTTP client setup failed: {}", e);
            return;
        }
    };

    let parsers: Vec<(&RetailerConfig, RetailerParser)> = config
        .retailers
        .iter()
        .filter_map(|r| match RetailerParser::new(r) {
            Ok(p) => Some((r, p)),
            Err(e) => {
                warn!("Skipping retailer {}: {}", r.name, e);
                None
            }
        })
        .collect();

    let cache = if config.cache.enabled && !args.no_cache {
        open_cache(&config)
    } else {
        None
    };

    let mut report = Report {
        results: BTreeMap::new(),
    };
    for item in &args.items {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let deals = process_item(item, &scraper, &parsers, engine.clone(), cache.clone(), &config).await;
        report.results.insert(item.to_string(), deals);
    }

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to serialize results: {}", e),
    }
}

fn open_cache(config: &AppConfig) -> Option<Arc<Mutex<SqliteStorage>>> {
    let storage = match SqliteStorage::new(&config.cache.path) {
        Ok(s) => s,
        Err(e) => {
            warn!("Cache disabled, cannot open {}: {}", config.cache.path.display(), e);
            return None;
        }
    };
    match storage.purge_expired(cache_max_age(config)) {
        Ok(0) => {}
        Ok(n) => info!("Purged {} stale cache entries", n),
        Err(e) => warn!("Cache purge failed: {}", e),
    }
    Some(Arc::new(Mutex::new(storage)))
}

fn cache_max_age(config: &AppConfig) -> chrono::Duration {
    chrono::Duration::seconds(i64::try_from(config.cache.max_age_seconds).unwrap_or(i64::MAX))
}

/// Scrapes every retailer for one item and returns its best deals.
async fn process_item(
    item: &str,
    scraper: &ScraperImpl,
    parsers: &[(&RetailerConfig, RetailerParser)],
    engine: Arc<MatchEngine>,
    cache: Option<Arc<Mutex<SqliteStorage>>>,
    config: &AppConfig,
) -> Vec<Deal> {
    let cache_key = item.to_lowercase();

    if let Some(cache) = &cache {
        match cache.lock().await.get_cached(&cache_key, cache_max_age(config)) {
            Ok(Some(deals)) => {
                info!("Cache hit for '{}' ({} deals)", item, deals.len());
                return deals;
            }
            Ok(None) => {}
            Err(e) => warn!("Cache read failed for '{}': {}", item, e),
        }
    }

    info!("Fetching '{}' from {} retailers...", item, parsers.len());
    let tasks: Vec<_> = parsers
        .iter()
        .map(|(retailer, parser)| fetch_retailer(item, retailer, parser, scraper))
        .collect();
    let raw: Vec<RawCandidate> = join_all(tasks).await.into_iter().flatten().collect();
    info!("Parsed {} candidates for '{}'", raw.len(), item);

    let candidates = normalize_all(raw);
    let threshold = config.matching.threshold();
    let query = item.to_string();
    let matches = match tokio::task::spawn_blocking(move || {
        engine.find_matches(&query, &candidates, threshold)
    })
    .await
    {
        Ok(m) => m,
        Err(e) => {
            error!("Matching task for '{}' failed: {}", item, e);
            return Vec::new();
        }
    };

    let top: Vec<_> = matches.into_iter().take(config.match_limit).collect();
    let deals = best_per_retailer(item, &top);
    info!("'{}': {} matches, {} deals", item, top.len(), deals.len());

    if let Some(cache) = cache.as_ref().filter(|_| !deals.is_empty()) {
        if let Err(e) = cache.lock().await.save(&cache_key, &deals) {
            warn!("Cache write failed for '{}': {}", item, e);
        }
    }

    deals
}

async fn fetch_retailer(
    item: &str,
    retailer: &RetailerConfig,
    parser: &RetailerParser,
    scraper: &ScraperImpl,
) -> Vec<RawCandidate> {
    let request = ScrapeRequest {
        query: item.to_string(),
        retailer: retailer.name.clone(),
    };

    let html = match scraper.fetch(&request).await {
        Ok(html) => html,
        Err(e) => {
            warn!("{}: scraper error for '{}': {}", retailer.name, item, e);
            return Vec::new();
        }
    };

    match parser.parse(&html) {
        Ok(candidates) => {
            info!("{}: {} candidates", retailer.name, candidates.len());
            candidates
        }
        Err(e) => {
            warn!("{}: parse error for '{}': {}", retailer.name, item, e);
            Vec::new()
        }
    }
}
