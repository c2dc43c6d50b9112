//! Relevance signals for fetched items
//!
//! Relevance comes from outside the ranking core: anything implementing
//! [`RelevanceScorer`] can supply it. [`TopicRelevance`] is the built-in scorer,
//! matching items against a list of topics of interest.

use crate::sources::NewsItem;

/// Supplies a relevance score in `[0, 1]` per item, or `None` for "no opinion"
pub trait RelevanceScorer: Send + Sync {
    fn score(&self, item: &NewsItem) -> Option<f64>;
}

/// Scores items by the share of configured topics mentioned in their title or
/// description (case-insensitive)
#[derive(Debug, Clone, Default)]
pub struct TopicRelevance {
    topics: Vec<String>,
}

impl TopicRelevance {
    pub fn new<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let topics = topics
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { topics }
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }
}

impl RelevanceScorer for TopicRelevance {
    fn score(&self, item: &NewsItem) -> Option<f64> {
        if self.topics.is_empty() {
            return None;
        }

        let mut text = item.title.to_lowercase();
        if let Some(description) = &item.description {
            text.push(' ');
            text.push_str(&description.to_lowercase());
        }

        let matched = self.topics.iter().filter(|topic| text.contains(topic.as_str())).count();
        Some(matched as f64 / self.topics.len() as f64)
    }
}
