//! GitHub "trending" repositories via the search API
//!
//! GitHub has no official trending endpoint, so trending is approximated as the
//! most-starred repositories created within a recent window.

use chrono::{Duration, NaiveDate, Utc};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;

use super::{send_json, FetchError, NewsItem, SourceKind};

/// Base URL for the GitHub REST API
const GITHUB_API_URL: &str = "https://api.github.com";

/// GitHub rejects requests without a User-Agent
const CLIENT_USER_AGENT: &str = concat!("news-agent/", env!("CARGO_PKG_VERSION"));

/// Largest page the search API serves
const MAX_PER_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Vec<Repository>,
}

#[derive(Debug, Deserialize)]
struct Repository {
    id: u64,
    full_name: String,
    html_url: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    language: Option<String>,
    owner: Owner,
}

#[derive(Debug, Deserialize)]
struct Owner {
    login: String,
}

/// Client for fetching recently popular repositories from GitHub
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http_client: Client,
    /// Base URL for the API (allows override for testing)
    base_url: String,
}

impl Default for GitHubClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GitHubClient {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Create a new GitHubClient with a custom HTTP client
    pub fn with_client(http_client: Client) -> Self {
        Self {
            http_client,
            base_url: GITHUB_API_URL.to_string(),
        }
    }

    /// Points the client at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetches the most-starred repositories created in the last `window_days` days
    ///
    /// # Arguments
    /// * `window_days` - How far back a repository's creation date may lie
    /// * `limit` - Maximum number of repositories (capped at 100)
    pub async fn fetch_trending(
        &self,
        window_days: u32,
        limit: usize,
    ) -> Result<Vec<NewsItem>, FetchError> {
        let since = window_start(Utc::now().date_naive(), window_days)?;
        let url = format!("{}/search/repositories", self.base_url);

        let request = self
            .http_client
            .get(&url)
            .query(&[
                ("q", search_query(since)),
                ("sort", "stars".to_string()),
                ("order", "desc".to_string()),
                ("per_page", limit.clamp(1, MAX_PER_PAGE).to_string()),
            ])
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(ACCEPT, "application/vnd.github+json");

        let response: SearchResponse = send_json(request, &url).await?;
        Ok(parse_search_response(response, limit))
    }
}

/// First day of the search window, or a permanent error if it predates the calendar
fn window_start(today: NaiveDate, window_days: u32) -> Result<NaiveDate, FetchError> {
    today
        .checked_sub_signed(Duration::days(i64::from(window_days)))
        .ok_or_else(|| {
            FetchError::Permanent(format!("search window of {} days is out of range", window_days))
        })
}

fn search_query(since: NaiveDate) -> String {
    format!("created:>{}", since.format("%Y-%m-%d"))
}

/// Converts search results, keeping at most `limit` repositories
fn parse_search_response(response: SearchResponse, limit: usize) -> Vec<NewsItem> {
    response
        .items
        .into_iter()
        .take(limit)
        .map(|repo| {
            let description = match (repo.description, repo.language) {
                (Some(description), Some(language)) => Some(format!("{} [{}]", description, language)),
                (Some(description), None) => Some(description),
                (None, Some(language)) => Some(format!("[{}]", language)),
                (None, None) => None,
            };
            NewsItem {
                id: repo.id.to_string(),
                source: SourceKind::GitHub,
                title: repo.full_name,
                url: Some(repo.html_url),
                author: Some(repo.owner.login),
                description,
                popularity: Some(repo.stargazers_count as f64),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "total_count": 2,
        "incomplete_results": false,
        "items": [
            {
                "id": 1296269,
                "full_name": "octocat/Hello-World",
                "html_url": "https://github.com/octocat/Hello-World",
                "description": "This your first repo!",
                "stargazers_count": 80,
                "language": "Rust",
                "owner": { "login": "octocat", "id": 1 }
            },
            {
                "id": 42,
                "full_name": "someone/untitled",
                "html_url": "https://github.com/someone/untitled",
                "description": null,
                "stargazers_count": 3,
                "language": null,
                "owner": { "login": "someone", "id": 2 }
            }
        ]
    }"#;

    fn fixture() -> SearchResponse {
        serde_json::from_str(FIXTURE).expect("fixture should deserialize")
    }

    #[test]
    fn test_parse_search_response() {
        let items = parse_search_response(fixture(), 10);

        assert_eq!(items.len(), 2);
        let first = &items[0];
        assert_eq!(first.id, "1296269");
        assert_eq!(first.source, SourceKind::GitHub);
        assert_eq!(first.title, "octocat/Hello-World");
        assert_eq!(first.url.as_deref(), Some("https://github.com/octocat/Hello-World"));
        assert_eq!(first.author.as_deref(), Some("octocat"));
        assert_eq!(first.description.as_deref(), Some("This your first repo! [Rust]"));
        assert_eq!(first.popularity, Some(80.0));

        assert!(items[1].description.is_none());
    }

    #[test]
    fn test_parse_search_response_respects_limit() {
        let items = parse_search_response(fixture(), 1);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "octocat/Hello-World");
    }

    #[test]
    fn test_search_query_format() {
        let since = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert_eq!(search_query(since), "created:>2026-01-05");
    }

    #[test]
    fn test_window_start() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 8).unwrap();
        assert_eq!(
            window_start(today, 7).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_window_start_out_of_range_is_permanent() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 8).unwrap();
        let err = window_start(today, 200_000_000).unwrap_err();
        assert!(matches!(err, FetchError::Permanent(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_fetch_trending_with_huge_window_fails_without_request() {
        // Nothing listens on the discard port; the window check must fail first.
        let client = GitHubClient::new().with_base_url("http://127.0.0.1:9");

        let err = client.fetch_trending(u32::MAX, 5).await.unwrap_err();

        assert!(matches!(err, FetchError::Permanent(_)), "got {:?}", err);
    }

    #[test]
    fn test_malformed_response_fails_to_parse() {
        let result: Result<SearchResponse, _> = serde_json::from_str(r#"{"message": "Bad credentials"}"#);
        assert!(result.is_err());
    }
}
