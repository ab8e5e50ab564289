//! Trailer lookup (YouTube Data API `search` query shape).

use std::fmt;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{LookupError, build_client, fetch_json};

/// Text shown in place of a link when no trailer was found.
pub const NOT_FOUND_SENTINEL: &str = "Trailer not found";

/// Result of a successful search. Failures are [`LookupError`]s, so
/// "searched and found nothing" stays distinct from "search failed".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrailerLink {
    Found(String),
    NotFound,
}

impl fmt::Display for TrailerLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrailerLink::Found(url) => f.write_str(url),
            TrailerLink::NotFound => f.write_str(NOT_FOUND_SENTINEL),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrailerClient {
    client: Client,
    api_base_url: String,
    watch_base_url: String,
    api_key: String,
}

impl TrailerClient {
    pub fn new(
        api_base_url: String,
        watch_base_url: String,
        api_key: String,
        timeout_seconds: u64,
    ) -> Result<Self, LookupError> {
        Ok(Self { client: build_client(timeout_seconds)?, api_base_url, watch_base_url, api_key })
    }

    /// Search for `<title> trailer` and link the first video hit.
    pub async fn find(&self, title: &str) -> Result<TrailerLink, LookupError> {
        let query = format!("{title} trailer");
        let req = self.client.get(&self.api_base_url).query(&[
            ("part", "snippet"),
            ("type", "video"),
            ("maxResults", "1"),
            ("q", query.as_str()),
            ("key", self.api_key.as_str()),
        ]);

        let results: SearchResults = fetch_json(req).await?;
        let link = match results.items.into_iter().find_map(|item| item.id.video_id) {
            Some(id) => TrailerLink::Found(format!("{}{id}", self.watch_base_url)),
            None => TrailerLink::NotFound,
        };
        debug!(%title, trailer = %link, "trailer lookup done");
        Ok(link)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    id: ItemId,
}

#[derive(Debug, Default, Deserialize)]
struct ItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_displays_sentinel() {
        assert_eq!(TrailerLink::NotFound.to_string(), NOT_FOUND_SENTINEL);
    }

    #[test]
    fn found_displays_url() {
        let link = TrailerLink::Found("https://www.youtube.com/watch?v=abc".into());
        assert_eq!(link.to_string(), "https://www.youtube.com/watch?v=abc");
    }

    #[test]
    fn items_without_video_ids_are_skipped() {
        let raw = r#"{"items":[{"id":{"kind":"youtube#channel","channelId":"c1"}},{"id":{"videoId":"v2"}}]}"#;
        let parsed: SearchResults = serde_json::from_str(raw).unwrap();
        let first = parsed.items.into_iter().find_map(|i| i.id.video_id);
        assert_eq!(first.as_deref(), Some("v2"));
    }

    #[test]
    fn missing_items_decode_as_empty() {
        let parsed: SearchResults = serde_json::from_str("{}").unwrap();
        assert!(parsed.items.is_empty());
    }
}
