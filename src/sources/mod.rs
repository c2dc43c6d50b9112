//! Fetch collaborators for external news sources
//!
//! Each source turns an upstream API into a list of [`NewsItem`]s and reports
//! failures as [`FetchError`], already classified as transient or permanent so
//! the retry loop knows what is worth another attempt.

pub mod github;
pub mod hackernews;

pub use github::GitHubClient;
pub use hackernews::{HackerNewsClient, HnEndpoint};

use reqwest::{RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::retry::{Classify, ErrorClass};

/// The data sources this tool knows how to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    HackerNews,
    GitHub,
}

impl SourceKind {
    /// All sources, in the order they are fetched and reported
    pub const ALL: [SourceKind; 2] = [SourceKind::GitHub, SourceKind::HackerNews];

    /// Parses a source name as used on the command line
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "hn" | "hackernews" | "hacker-news" => Some(SourceKind::HackerNews),
            "gh" | "github" => Some(SourceKind::GitHub),
            _ => None,
        }
    }

    /// Human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::HackerNews => "Hacker News",
            SourceKind::GitHub => "GitHub",
        }
    }
}

/// A single item fetched from any source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Identifier unique within the source
    pub id: String,
    pub source: SourceKind,
    pub title: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    /// Raw popularity as reported by the source: stars for GitHub, points for HN
    pub popularity: Option<f64>,
}

/// Errors that can occur when fetching from a source
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    /// Network trouble, rate limiting or a server-side error; worth retrying
    #[error("Transient fetch error: {0}")]
    Transient(String),

    /// Rejected request or unusable response; retrying will not help
    #[error("Permanent fetch error: {0}")]
    Permanent(String),
}

impl FetchError {
    /// Classifies a non-success HTTP status.
    ///
    /// Rate limiting (429) and server errors (5xx) are transient; every other
    /// failure status is permanent.
    pub fn from_status(status: StatusCode, context: &str) -> Self {
        let message = format!("{} returned HTTP {}", context, status);
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            FetchError::Transient(message)
        } else {
            FetchError::Permanent(message)
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            let context = e.url().map(|u| u.to_string()).unwrap_or_else(|| "request".to_string());
            return FetchError::from_status(status, &context);
        }
        if e.is_decode() || e.is_builder() {
            FetchError::Permanent(e.to_string())
        } else {
            // Timeouts, connection failures and truncated bodies
            FetchError::Transient(e.to_string())
        }
    }
}

impl Classify for FetchError {
    fn classify(&self) -> ErrorClass {
        match self {
            FetchError::Transient(_) => ErrorClass::Transient,
            FetchError::Permanent(_) => ErrorClass::Permanent,
        }
    }
}

/// Sends `request` and decodes a JSON body, classifying every failure.
///
/// `context` names the resource in error messages.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    context: &str,
) -> Result<T, FetchError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::from_status(status, context));
    }

    let text = response.text().await?;
    serde_json::from_str(&text)
        .map_err(|e| FetchError::Permanent(format!("Malformed response from {}: {}", context, e)))
}
