//! Shared fixtures: an in-process fake of the generator, metadata and trailer
//! services, and a reply sink that records what the bot would have sent.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use cinebot::config::RecommendConfig;
use cinebot::llm::LlmProvider;
use cinebot::llm::providers::openai_compatible::OpenAiCompatibleProvider;
use cinebot::lookup::{MetadataClient, TrailerClient};
use cinebot::subsystems::comms::{DeliveryError, ReplySink};
use cinebot::subsystems::recommend::{Orchestrator, Reply};

pub const WATCH_BASE: &str = "https://watch.test/?v=";

/// How the fake services answer. Fixed once the server starts.
#[derive(Default)]
pub struct Upstream {
    /// Generator answer text.
    pub answer: String,
    /// When set, the generator answers with this HTTP status instead.
    pub llm_status: Option<u16>,
    /// Metadata records by exact title.
    pub movies: HashMap<String, Value>,
    /// Titles whose metadata lookup answers HTTP 500.
    pub failing_titles: HashSet<String>,
    /// Titles whose metadata lookup stalls past any client timeout.
    pub slow_titles: HashSet<String>,
    /// Trailer video ids by title.
    pub trailers: HashMap<String, String>,
    /// Every trailer search answers HTTP 403.
    pub trailer_outage: bool,
}

impl Upstream {
    pub fn answering(answer: &str) -> Self {
        Self { answer: answer.to_string(), ..Self::default() }
    }

    pub fn with_movie(mut self, title: &str, year: &str, poster: &str) -> Self {
        self.movies.insert(title.to_string(), movie(title, year, poster));
        self
    }

    pub fn with_failing(mut self, title: &str) -> Self {
        self.failing_titles.insert(title.to_string());
        self
    }

    pub fn with_slow(mut self, title: &str) -> Self {
        self.slow_titles.insert(title.to_string());
        self
    }

    pub fn with_trailer(mut self, title: &str, video_id: &str) -> Self {
        self.trailers.insert(title.to_string(), video_id.to_string());
        self
    }
}

/// An OMDb-shaped success body.
pub fn movie(title: &str, year: &str, poster: &str) -> Value {
    json!({
        "Title": title,
        "Year": year,
        "imdbRating": "7.9",
        "Genre": "Drama",
        "Plot": format!("The plot of {title}."),
        "Poster": poster,
        "Response": "True",
    })
}

/// Requests the fake services saw, in arrival order.
#[derive(Default, Debug, Clone)]
pub struct Recorded {
    pub prompts: Vec<String>,
    pub metadata_titles: Vec<String>,
    pub metadata_keys: Vec<String>,
    pub trailer_queries: Vec<String>,
}

struct Shared {
    upstream: Upstream,
    recorded: Mutex<Recorded>,
}

pub struct FakeServer {
    pub base: String,
    shared: Arc<Shared>,
}

impl FakeServer {
    pub async fn start(upstream: Upstream) -> Self {
        let shared = Arc::new(Shared { upstream, recorded: Mutex::new(Recorded::default()) });

        let app = Router::new()
            .route("/v1/chat/completions", post(chat))
            .route("/omdb", get(omdb))
            .route("/youtube", get(youtube))
            .with_state(shared.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base: format!("http://{addr}"), shared }
    }

    pub fn recorded(&self) -> Recorded {
        self.shared.recorded.lock().unwrap().clone()
    }

    pub fn generator(&self) -> LlmProvider {
        LlmProvider::OpenAiCompatible(
            OpenAiCompatibleProvider::new(
                format!("{}/v1/chat/completions", self.base),
                "test-model".into(),
                0.0,
                5,
                Some("llm-key".into()),
            )
            .unwrap(),
        )
    }

    pub fn metadata(&self, timeout_seconds: u64) -> MetadataClient {
        MetadataClient::new(format!("{}/omdb", self.base), "omdb-key".into(), timeout_seconds).unwrap()
    }

    pub fn trailer(&self) -> TrailerClient {
        TrailerClient::new(format!("{}/youtube", self.base), WATCH_BASE.into(), "yt-key".into(), 5).unwrap()
    }

    /// Orchestrator wired to this server with metadata and, optionally, trailers.
    pub fn orchestrator(&self, settings: RecommendConfig, trailers: bool) -> Orchestrator {
        let trailer = trailers.then(|| self.trailer());
        Orchestrator::new(self.generator(), Some(self.metadata(5)), trailer, settings)
    }
}

async fn chat(State(shared): State<Arc<Shared>>, Json(body): Json<Value>) -> Response {
    let prompt = body["messages"][0]["content"].as_str().unwrap_or_default().to_string();
    shared.recorded.lock().unwrap().prompts.push(prompt);

    if let Some(status) = shared.upstream.llm_status {
        let status = StatusCode::from_u16(status).unwrap();
        return (status, Json(json!({ "error": { "message": "model is overloaded" } }))).into_response();
    }

    Json(json!({
        "choices": [{ "message": { "role": "assistant", "content": shared.upstream.answer } }]
    }))
    .into_response()
}

async fn omdb(State(shared): State<Arc<Shared>>, Query(params): Query<HashMap<String, String>>) -> Response {
    let title = params.get("t").cloned().unwrap_or_default();
    {
        let mut recorded = shared.recorded.lock().unwrap();
        recorded.metadata_titles.push(title.clone());
        recorded.metadata_keys.push(params.get("apikey").cloned().unwrap_or_default());
    }

    if shared.upstream.slow_titles.contains(&title) {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }
    if shared.upstream.failing_titles.contains(&title) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "database on fire").into_response();
    }

    match shared.upstream.movies.get(&title) {
        Some(record) => Json(record.clone()).into_response(),
        None => Json(json!({ "Response": "False", "Error": "Movie not found!" })).into_response(),
    }
}

async fn youtube(State(shared): State<Arc<Shared>>, Query(params): Query<HashMap<String, String>>) -> Response {
    let query = params.get("q").cloned().unwrap_or_default();
    shared.recorded.lock().unwrap().trailer_queries.push(query.clone());

    if shared.upstream.trailer_outage {
        return (StatusCode::FORBIDDEN, Json(json!({ "error": { "message": "quota exceeded" } }))).into_response();
    }

    let title = query.strip_suffix(" trailer").unwrap_or(&query);
    match shared.upstream.trailers.get(title) {
        Some(id) => Json(json!({ "items": [{ "id": { "kind": "youtube#video", "videoId": id } }] })).into_response(),
        None => Json(json!({ "items": [] })).into_response(),
    }
}

/// Collects replies in order. Can be told to refuse photos, or to accept
/// them and then fail their follow-up text.
#[derive(Default)]
pub struct RecordingSink {
    pub replies: Vec<Reply>,
    pub reject_photos: bool,
    pub fail_follow_ups: bool,
}

impl RecordingSink {
    pub fn rejecting_photos() -> Self {
        Self { reject_photos: true, ..Self::default() }
    }

    pub fn failing_follow_ups() -> Self {
        Self { fail_follow_ups: true, ..Self::default() }
    }

    pub fn texts(&self) -> Vec<&str> {
        self.replies
            .iter()
            .filter_map(|r| match r {
                Reply::Text(t) => Some(t.as_str()),
                Reply::Photo { .. } => None,
            })
            .collect()
    }

    pub fn photo_urls(&self) -> Vec<&str> {
        self.replies
            .iter()
            .filter_map(|r| match r {
                Reply::Photo { url, .. } => Some(url.as_str()),
                Reply::Text(_) => None,
            })
            .collect()
    }
}

impl ReplySink for RecordingSink {
    async fn send(&mut self, reply: Reply) -> Result<(), DeliveryError> {
        if self.reject_photos && matches!(reply, Reply::Photo { .. }) {
            return Err(DeliveryError::Failed("photo rejected".into()));
        }
        let is_photo = matches!(reply, Reply::Photo { .. });
        self.replies.push(reply);
        if self.fail_follow_ups && is_photo {
            return Err(DeliveryError::FollowUp("caption overflow rejected".into()));
        }
        Ok(())
    }
}

/// A template-format generator answer for `titles`.
pub fn template_answer(titles: &[&str]) -> String {
    titles
        .iter()
        .map(|t| format!("Title: {t}\nYear: 2000\nGenre: Drama\nRating: 7.5\nWhy: Because it shares the tone."))
        .collect::<Vec<_>>()
        .join("\n\n")
}
