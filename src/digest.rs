//! The fetch, score and rank pipeline behind a digest run
//!
//! A run plans one [`FetchTarget`] per enabled source (and per Hacker News
//! endpoint), fetches them concurrently through a shared [`FetchOrchestrator`],
//! normalizes popularity within each batch, scores relevance, ranks everything
//! together and keeps the top `analysis.top_n` items.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{join_all, BoxFuture, FutureExt};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{Config, ConfigError};
use crate::fetch::{FetchOrchestrator, Origin};
use crate::ranking::{score_items, Ranker, RankingStrategy, RelevanceScorer, TopicRelevance};
use crate::sources::{FetchError, GitHubClient, HackerNewsClient, HnEndpoint, NewsItem, SourceKind};

/// One upstream request the pipeline will make
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTarget {
    GitHubTrending { window_days: u32, limit: usize },
    HackerNews { endpoint: HnEndpoint, limit: usize },
}

impl FetchTarget {
    pub fn source(&self) -> SourceKind {
        match self {
            FetchTarget::GitHubTrending { .. } => SourceKind::GitHub,
            FetchTarget::HackerNews { .. } => SourceKind::HackerNews,
        }
    }

    /// Key under which this target's items are cached. Parameters are part of
    /// the key so a config change never serves items fetched for other settings.
    pub fn cache_key(&self) -> String {
        match self {
            FetchTarget::GitHubTrending { window_days, limit } => {
                format!("github_trending:{}d:{}", window_days, limit)
            }
            FetchTarget::HackerNews { endpoint, limit } => {
                format!("hn_{}:{}", endpoint.as_str(), limit)
            }
        }
    }
}

impl fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchTarget::GitHubTrending { window_days, limit } => write!(
                f,
                "GitHub trending (created in the last {} days, up to {})",
                window_days, limit
            ),
            FetchTarget::HackerNews { endpoint, limit } => {
                write!(f, "Hacker News {} (up to {})", endpoint.as_str(), limit)
            }
        }
    }
}

/// Performs the upstream request for a [`FetchTarget`]
pub trait Fetcher: Send + Sync {
    fn fetch(&self, target: FetchTarget) -> BoxFuture<'_, Result<Vec<NewsItem>, FetchError>>;
}

/// Fetcher backed by the real HTTP clients
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    pub hackernews: HackerNewsClient,
    pub github: GitHubClient,
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, target: FetchTarget) -> BoxFuture<'_, Result<Vec<NewsItem>, FetchError>> {
        match target {
            FetchTarget::GitHubTrending { window_days, limit } => {
                self.github.fetch_trending(window_days, limit).boxed()
            }
            FetchTarget::HackerNews { endpoint, limit } => {
                self.hackernews.fetch_stories(endpoint, limit).boxed()
            }
        }
    }
}

/// What happened to one fetch target during a run
#[derive(Debug, Clone, Serialize)]
pub struct SourceOutcome {
    pub source: SourceKind,
    pub target: String,
    pub cache_key: String,
    /// `None` when the fetch failed in strict mode
    pub origin: Option<Origin>,
    pub items: usize,
    pub error: Option<String>,
}

/// One ranked item in the digest
#[derive(Debug, Clone, Serialize)]
pub struct DigestEntry {
    /// 1-based position
    pub rank: usize,
    pub item: NewsItem,
    pub relevance_score: Option<f64>,
    pub popularity_normalized: Option<f64>,
    pub composite_score: f64,
}

/// Result of a digest run
#[derive(Debug, Clone, Serialize)]
pub struct DigestReport {
    pub generated_at: DateTime<Utc>,
    pub strategy: RankingStrategy,
    pub entries: Vec<DigestEntry>,
    pub sources: Vec<SourceOutcome>,
}

impl fmt::Display for DigestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.sources {
            match (&outcome.origin, &outcome.error) {
                (Some(origin), _) => writeln!(f, "# {}: {} items ({})", outcome.target, outcome.items, origin)?,
                (None, Some(error)) => writeln!(f, "# {}: failed: {}", outcome.target, error)?,
                (None, None) => writeln!(f, "# {}: no result", outcome.target)?,
            }
        }
        writeln!(f)?;

        if self.entries.is_empty() {
            return writeln!(f, "No items.");
        }
        for entry in &self.entries {
            writeln!(
                f,
                "{:>3}. [{:.3}] {} ({})",
                entry.rank,
                entry.composite_score,
                entry.item.title,
                entry.item.source.label()
            )?;
            if let Some(url) = &entry.item.url {
                writeln!(f, "     {}", url)?;
            }
        }
        Ok(())
    }
}

/// Runs digests for a fixed configuration
pub struct Digest {
    orchestrator: FetchOrchestrator,
    fetcher: Arc<dyn Fetcher>,
    relevance: Arc<dyn RelevanceScorer>,
    ranker: Ranker,
    config: Config,
}

impl Digest {
    /// Creates a digest using the HTTP fetcher and topic-based relevance
    pub fn new(config: Config, orchestrator: FetchOrchestrator) -> Result<Self, ConfigError> {
        let ranker = Ranker::new(config.ranking)?;
        let relevance = Arc::new(TopicRelevance::new(&config.analysis.topics));
        Ok(Self {
            orchestrator,
            fetcher: Arc::new(HttpFetcher::default()),
            relevance,
            ranker,
            config,
        })
    }

    /// Replaces the fetcher
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Replaces the relevance scorer
    pub fn with_relevance(mut self, relevance: Arc<dyn RelevanceScorer>) -> Self {
        self.relevance = relevance;
        self
    }

    /// Lists the targets a run would fetch.
    ///
    /// With `sources` given, exactly those sources are used; otherwise the
    /// sources enabled in the config.
    pub fn plan(&self, sources: Option<&[SourceKind]>) -> Vec<FetchTarget> {
        let sources_config = &self.config.sources;
        let selected = |kind: SourceKind, enabled: bool| match sources {
            Some(list) => list.contains(&kind),
            None => enabled,
        };

        let mut targets = Vec::new();
        for kind in SourceKind::ALL {
            match kind {
                SourceKind::GitHub => {
                    if selected(kind, sources_config.github.enabled) {
                        targets.push(FetchTarget::GitHubTrending {
                            window_days: sources_config.github.window_days,
                            limit: sources_config.github.limit,
                        });
                    }
                }
                SourceKind::HackerNews => {
                    if selected(kind, sources_config.hackernews.enabled) {
                        targets.extend(sources_config.hackernews.endpoints.iter().map(|&endpoint| {
                            FetchTarget::HackerNews {
                                endpoint,
                                limit: sources_config.hackernews.limit,
                            }
                        }));
                    }
                }
            }
        }
        targets
    }

    /// Fetches, scores and ranks. Failing sources are reported in the result
    /// and do not stop the others.
    pub async fn run(&self, sources: Option<&[SourceKind]>, force_refresh: bool) -> DigestReport {
        let targets = self.plan(sources);

        let fetches = targets.iter().map(|&target| async move {
            let key = target.cache_key();
            let result = self
                .orchestrator
                .fetch_with_cache(&key, force_refresh, || self.fetcher.fetch(target))
                .await;
            (target, key, result)
        });
        let results = join_all(fetches).await;

        let mut outcomes = Vec::with_capacity(results.len());
        let mut batches = Vec::with_capacity(results.len());
        for (target, cache_key, result) in results {
            let outcome = match result {
                Ok(fetched) => {
                    info!(fetch = %target, origin = %fetched.origin, items = fetched.data.len(), "Fetched source");
                    let outcome = SourceOutcome {
                        source: target.source(),
                        target: target.to_string(),
                        cache_key,
                        origin: Some(fetched.origin),
                        items: fetched.data.len(),
                        error: None,
                    };
                    batches.push(fetched.data);
                    outcome
                }
                Err(e) => {
                    warn!(fetch = %target, error = %e, "Source failed");
                    SourceOutcome {
                        source: target.source(),
                        target: target.to_string(),
                        cache_key,
                        origin: None,
                        items: 0,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        DigestReport {
            generated_at: Utc::now(),
            strategy: self.ranker.strategy(),
            entries: self.rank_batches(&batches),
            sources: outcomes,
        }
    }

    /// Ranks items from several batches together.
    ///
    /// Popularity is normalized per batch because star counts and points are
    /// not comparable. Items appearing in more than one batch (a story on both
    /// `top` and `best`) are kept once, at their best position.
    pub fn rank_batches(&self, batches: &[Vec<NewsItem>]) -> Vec<DigestEntry> {
        let mut scored = Vec::new();
        for batch in batches {
            scored.extend(score_items(batch, |item| self.relevance.score(item), |item| item.popularity));
        }

        let mut seen = HashSet::new();
        self.ranker
            .rank(scored)
            .into_iter()
            .filter(|s| seen.insert((s.item.source, s.item.id.clone())))
            .take(self.config.analysis.top_n)
            .enumerate()
            .map(|(i, s)| DigestEntry {
                rank: i + 1,
                item: s.item.clone(),
                relevance_score: s.relevance_score,
                popularity_normalized: s.popularity_normalized,
                composite_score: s.composite_score,
            })
            .collect()
    }
}
