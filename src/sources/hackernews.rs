//! Hacker News API client
//!
//! Uses the public Firebase API: one request for the list of story ids of an
//! endpoint, then one request per story, issued concurrently.

use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{send_json, FetchError, NewsItem, SourceKind};

/// Base URL for the Hacker News Firebase API
const HN_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0";

/// Discussion page for items without an external link
const HN_ITEM_URL: &str = "https://news.ycombinator.com/item?id=";

/// Story lists published by Hacker News
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HnEndpoint {
    Top,
    #[serde(alias = "newest")]
    New,
    Best,
    Ask,
    Show,
    Job,
}

impl HnEndpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            HnEndpoint::Top => "top",
            HnEndpoint::New => "new",
            HnEndpoint::Best => "best",
            HnEndpoint::Ask => "ask",
            HnEndpoint::Show => "show",
            HnEndpoint::Job => "job",
        }
    }

    /// Path of the id list, e.g. `topstories.json`
    fn list_path(&self) -> String {
        format!("{}stories.json", self.as_str())
    }
}

/// A raw item from `/item/<id>.json`
#[derive(Debug, Deserialize)]
struct HnItem {
    id: u64,
    #[serde(default)]
    by: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    score: Option<i64>,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    dead: bool,
}

/// Client for fetching stories from Hacker News
#[derive(Debug, Clone)]
pub struct HackerNewsClient {
    http_client: Client,
    /// Base URL for the API (allows override for testing)
    base_url: String,
}

impl Default for HackerNewsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HackerNewsClient {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Create a new HackerNewsClient with a custom HTTP client
    pub fn with_client(http_client: Client) -> Self {
        Self {
            http_client,
            base_url: HN_BASE_URL.to_string(),
        }
    }

    /// Points the client at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetches up to `limit` stories from `endpoint`, in the order Hacker News lists them.
    ///
    /// Deleted, dead and untitled items are skipped, so fewer than `limit`
    /// stories may come back. Any failed request fails the whole fetch.
    pub async fn fetch_stories(
        &self,
        endpoint: HnEndpoint,
        limit: usize,
    ) -> Result<Vec<NewsItem>, FetchError> {
        let list_url = format!("{}/{}", self.base_url, endpoint.list_path());
        let ids: Vec<u64> = send_json(self.http_client.get(&list_url), &list_url).await?;

        let requests = ids.into_iter().take(limit).map(|id| self.fetch_item(id));
        let mut stories = Vec::new();
        for result in join_all(requests).await {
            if let Some(item) = result? {
                stories.push(item);
            }
        }
        Ok(stories)
    }

    /// Fetches one item; the API answers `null` for ids that do not exist
    async fn fetch_item(&self, id: u64) -> Result<Option<NewsItem>, FetchError> {
        let url = format!("{}/item/{}.json", self.base_url, id);
        let raw: Option<HnItem> = send_json(self.http_client.get(&url), &url).await?;
        Ok(raw.and_then(parse_item))
    }
}

/// Converts a raw item, dropping the ones that are not readable stories
fn parse_item(raw: HnItem) -> Option<NewsItem> {
    if raw.deleted || raw.dead {
        return None;
    }
    let title = raw.title.filter(|t| !t.trim().is_empty())?;
    let url = raw
        .url
        .unwrap_or_else(|| format!("{}{}", HN_ITEM_URL, raw.id));

    Some(NewsItem {
        id: raw.id.to_string(),
        source: SourceKind::HackerNews,
        title,
        url: Some(url),
        author: raw.by,
        description: raw.text,
        popularity: raw.score.map(|s| s as f64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Option<NewsItem> {
        let raw: HnItem = serde_json::from_str(json).expect("fixture should deserialize");
        parse_item(raw)
    }

    #[test]
    fn test_parse_story_with_link() {
        let item = parse(
            r#"{"by":"dhouston","descendants":71,"id":8863,"score":111,"time":1175714200,
                "title":"My YC app: Dropbox","type":"story","url":"http://www.getdropbox.com/u/2/screencast.html"}"#,
        )
        .expect("story should parse");

        assert_eq!(item.id, "8863");
        assert_eq!(item.source, SourceKind::HackerNews);
        assert_eq!(item.title, "My YC app: Dropbox");
        assert_eq!(item.url.as_deref(), Some("http://www.getdropbox.com/u/2/screencast.html"));
        assert_eq!(item.author.as_deref(), Some("dhouston"));
        assert_eq!(item.popularity, Some(111.0));
    }

    #[test]
    fn test_parse_ask_hn_links_to_discussion() {
        let item = parse(
            r#"{"by":"tel","id":121003,"score":25,"text":"Is there any?","title":"Ask HN: The Arc Effect","type":"story"}"#,
        )
        .expect("ask story should parse");

        assert_eq!(item.url.as_deref(), Some("https://news.ycombinator.com/item?id=121003"));
        assert_eq!(item.description.as_deref(), Some("Is there any?"));
    }

    #[test]
    fn test_parse_skips_deleted_and_dead_items() {
        assert!(parse(r#"{"id":1,"deleted":true,"type":"story"}"#).is_none());
        assert!(parse(r#"{"id":2,"dead":true,"title":"spam","type":"story"}"#).is_none());
    }

    #[test]
    fn test_parse_skips_untitled_items() {
        assert!(parse(r#"{"id":3,"by":"someone","text":"a comment","type":"comment"}"#).is_none());
    }

    #[test]
    fn test_endpoint_list_paths() {
        assert_eq!(HnEndpoint::Top.list_path(), "topstories.json");
        assert_eq!(HnEndpoint::New.list_path(), "newstories.json");
        assert_eq!(HnEndpoint::Job.list_path(), "jobstories.json");
    }

    #[test]
    fn test_endpoint_deserializes_newest_alias() {
        let endpoints: Vec<HnEndpoint> = serde_json::from_str(r#"["newest", "show", "top"]"#).unwrap();
        assert_eq!(endpoints, vec![HnEndpoint::New, HnEndpoint::Show, HnEndpoint::Top]);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transient() {
        // Port 9 on localhost is the discard port; nothing should be listening.
        let client = HackerNewsClient::new().with_base_url("http://127.0.0.1:9");

        let err = client.fetch_stories(HnEndpoint::Top, 5).await.unwrap_err();

        assert!(matches!(err, FetchError::Transient(_)), "got {:?}", err);
    }
}
