//! Movie metadata lookup (OMDb `?t=<title>&apikey=<key>` query shape).

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{LookupError, build_client, fetch_json};

/// Value substituted for every field the service leaves out.
pub const PLACEHOLDER: &str = "N/A";

/// One title's metadata. Every field is always populated, with
/// [`PLACEHOLDER`] standing in for missing values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieRecord {
    pub title: String,
    pub year: String,
    pub rating: String,
    pub genre: String,
    pub plot: String,
    pub poster: String,
}

impl MovieRecord {
    /// Poster URL, unless the service had none.
    pub fn poster_url(&self) -> Option<&str> {
        known(&self.poster).filter(|p| p.starts_with("http://") || p.starts_with("https://"))
    }
}

/// `Some(value)` unless `value` is empty or the placeholder.
pub fn known(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty() && value != PLACEHOLDER).then_some(value)
}

#[derive(Debug, Clone)]
pub struct MetadataClient {
    client: Client,
    api_base_url: String,
    api_key: String,
}

impl MetadataClient {
    pub fn new(api_base_url: String, api_key: String, timeout_seconds: u64) -> Result<Self, LookupError> {
        Ok(Self { client: build_client(timeout_seconds)?, api_base_url, api_key })
    }

    /// Look up one title. `Ok(None)` means the service reported it unknown.
    pub async fn lookup(&self, title: &str) -> Result<Option<MovieRecord>, LookupError> {
        let req = self
            .client
            .get(&self.api_base_url)
            .query(&[("t", title), ("apikey", self.api_key.as_str())]);

        let raw: RawRecord = fetch_json(req).await?;

        if raw.response.as_deref().is_some_and(|r| r.eq_ignore_ascii_case("false")) {
            let reason = raw.error.unwrap_or_default();
            if reason.to_ascii_lowercase().contains("not found") {
                debug!(%title, "metadata: title not found");
                return Ok(None);
            }
            return Err(LookupError::Upstream(reason));
        }

        let record = MovieRecord {
            title: or_placeholder(raw.title),
            year: or_placeholder(raw.year),
            rating: or_placeholder(raw.imdb_rating),
            genre: or_placeholder(raw.genre),
            plot: or_placeholder(raw.plot),
            poster: or_placeholder(raw.poster),
        };
        debug!(%title, found = %record.title, "metadata: record found");
        Ok(Some(record))
    }
}

fn or_placeholder(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "imdbRating")]
    imdb_rating: Option<String>,
    #[serde(rename = "Genre")]
    genre: Option<String>,
    #[serde(rename = "Plot")]
    plot: Option<String>,
    #[serde(rename = "Poster")]
    poster: Option<String>,
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Error")]
    error: Option<String>,
}
