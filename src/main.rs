//! news-agent - Ranked digest of Hacker News stories and trending GitHub repositories
//!
//! Fetches the configured sources through a shared TTL cache with retries,
//! ranks the results and prints them as text or JSON.

use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use news_agent::cache::ExpiringStore;
use news_agent::cli::{Cli, RunOptions};
use news_agent::config::Config;
use news_agent::digest::Digest;
use news_agent::fetch::FetchOrchestrator;
use news_agent::retry::BackoffExecutor;

/// Installs the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default_directive = if verbose { "news_agent=debug" } else { "news_agent=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Opens the store in the platform cache directory, or under the system temp
/// directory when no home directory can be determined.
fn open_store(config: &Config) -> ExpiringStore {
    let settings = config.cache_settings();
    ExpiringStore::new(settings).unwrap_or_else(|| {
        let fallback = std::env::temp_dir().join("news-agent");
        debug!(dir = %fallback.display(), "No platform cache directory; using temp dir");
        ExpiringStore::with_dir(fallback, settings)
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let options = RunOptions::from_cli(&cli)?;
    init_logging(options.verbose);

    let mut config = match &options.config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    options.apply(&mut config);

    let store = Arc::new(open_store(&config));

    if options.clear_cache {
        let removed = store.wipe();
        println!(
            "Cleared cache at {} ({} files removed)",
            store.cache_dir().display(),
            removed
        );
        if !store.settings().enabled {
            println!("Note: caching is disabled in the current config");
        }
        return Ok(());
    }

    let orchestrator = FetchOrchestrator::new(store.clone(), BackoffExecutor::new(config.retry));
    let digest = Digest::new(config, orchestrator)?;
    let sources = options.sources.as_deref();

    if options.dry_run {
        for target in digest.plan(sources) {
            println!("{}  [cache key: {}]", target, target.cache_key());
        }
        return Ok(());
    }

    let purged = store.purge_expired();
    if purged > 0 {
        info!(purged, "Removed expired cache entries");
    }

    let report = digest.run(sources, options.force_refresh).await;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }

    Ok(())
}
