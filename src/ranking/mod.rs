//! Ranking of fetched items by relevance and popularity
//!
//! Scores from different sources are first normalized to `[0, 1]`
//! ([`normalize`], [`score_items`]), then combined by a [`Ranker`] according to
//! the configured [`RankingStrategy`].

pub mod relevance;
mod scoring;

pub use relevance::{RelevanceScorer, TopicRelevance};
pub use scoring::{normalize, score_items, ScoredItem, MIDPOINT};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Allowed deviation of the weight sum from 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// Which signals decide the order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingStrategy {
    /// Popularity only
    Popularity,
    /// Relevance only
    Relevance,
    /// Weighted sum of both
    #[default]
    Balanced,
}

impl RankingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankingStrategy::Popularity => "popularity",
            RankingStrategy::Relevance => "relevance",
            RankingStrategy::Balanced => "balanced",
        }
    }
}

impl fmt::Display for RankingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankingStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "popularity" => Ok(RankingStrategy::Popularity),
            "relevance" => Ok(RankingStrategy::Relevance),
            "balanced" => Ok(RankingStrategy::Balanced),
            other => Err(ConfigError::InvalidValue {
                field: "ranking.strategy",
                reason: format!(
                    "unknown strategy '{}' (expected popularity, relevance or balanced)",
                    other
                ),
            }),
        }
    }
}

/// Weights of the balanced strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RankingWeights {
    pub relevance: f64,
    pub popularity: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            relevance: 0.7,
            popularity: 0.3,
        }
    }
}

impl RankingWeights {
    /// Creates weights, rejecting values outside `[0, 1]` or not summing to 1.0
    pub fn new(relevance: f64, popularity: f64) -> Result<Self, ConfigError> {
        let weights = Self {
            relevance,
            popularity,
        };
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("ranking.weights.relevance", self.relevance),
            ("ranking.weights.popularity", self.popularity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("must be between 0.0 and 1.0, got {}", value),
                });
            }
        }

        let sum = self.relevance + self.popularity;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::InvalidValue {
                field: "ranking.weights",
                reason: format!("weights must sum to 1.0, got {}", sum),
            });
        }

        Ok(())
    }
}

/// The `[ranking]` config section
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RankingConfig {
    pub strategy: RankingStrategy,
    pub weights: RankingWeights,
}

/// Orders score records according to a validated [`RankingConfig`]
#[derive(Debug, Clone)]
pub struct Ranker {
    config: RankingConfig,
}

impl Ranker {
    /// Creates a ranker, failing fast on invalid weights
    pub fn new(config: RankingConfig) -> Result<Self, ConfigError> {
        config.weights.validate()?;
        Ok(Self { config })
    }

    pub fn strategy(&self) -> RankingStrategy {
        self.config.strategy
    }

    /// Score of one record under the configured strategy. Missing signals count as 0.
    pub fn composite_score<T>(&self, item: &ScoredItem<'_, T>) -> f64 {
        let relevance = item.relevance_signal();
        let popularity = item.popularity_signal();

        match self.config.strategy {
            RankingStrategy::Popularity => popularity,
            RankingStrategy::Relevance => relevance,
            RankingStrategy::Balanced => {
                let weights = &self.config.weights;
                relevance * weights.relevance + popularity * weights.popularity
            }
        }
    }

    /// Fills in every record's composite score and returns the records in
    /// descending score order.
    ///
    /// The sort is stable, so records with equal scores keep their input order.
    pub fn rank<'a, T>(&self, mut items: Vec<ScoredItem<'a, T>>) -> Vec<ScoredItem<'a, T>> {
        for item in items.iter_mut() {
            item.composite_score = self.composite_score(item);
        }
        items.sort_by(|a, b| b.composite_score.total_cmp(&a.composite_score));
        items
    }
}
