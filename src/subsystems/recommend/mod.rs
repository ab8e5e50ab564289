//! Recommendation orchestrator: one inbound message in, one reply sequence out.
//!
//! Per message, strictly in order:
//! 1. optional acknowledgment reply
//! 2. one generator call with the user text embedded in the prompt
//! 3. parsing, then metadata and trailer lookups per recovered title
//! 4. the combined text reply, then poster photos in entry order
//!
//! Failures become exactly one generic error reply. What happens to output
//! computed before a failing metadata lookup is the configured
//! [`FailurePolicy`]. Nothing is retried and no state outlives the message.

pub mod parse;
pub mod prompt;
pub mod reply;

pub use parse::{ParseOutcome, RecommendationEntry};
pub use reply::{Enriched, Reply};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{Config, FailurePolicy, ParseStrategy, RecommendConfig, RecommendMode};
use crate::error::AppError;
use crate::llm::{LlmProvider, ProviderError, providers};
use crate::lookup::{LookupError, MetadataClient, TrailerClient, TrailerLink};
use crate::subsystems::comms::{DeliveryError, ReplySink};

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error(transparent)]
    Generator(#[from] ProviderError),
    #[error("lookup for \"{title}\" failed: {source}")]
    Metadata {
        title: String,
        #[source]
        source: LookupError,
    },
    #[error("no recommendations could be read from the answer ({unparsed} unreadable lines)")]
    NoEntries { unparsed: usize },
}

/// Replies to deliver, plus the error that cut the sequence short, if any.
struct Outcome {
    replies: Vec<Reply>,
    error: Option<RecommendError>,
}

impl Outcome {
    fn done(replies: Vec<Reply>) -> Self {
        Self { replies, error: None }
    }

    fn failed(error: impl Into<RecommendError>) -> Self {
        Self { replies: Vec::new(), error: Some(error.into()) }
    }
}

/// Stateless between messages; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    generator: LlmProvider,
    metadata: Option<MetadataClient>,
    trailer: Option<TrailerClient>,
    settings: RecommendConfig,
}

impl Orchestrator {
    pub fn new(
        generator: LlmProvider,
        metadata: Option<MetadataClient>,
        trailer: Option<TrailerClient>,
        settings: RecommendConfig,
    ) -> Self {
        Self { generator, metadata, trailer, settings }
    }

    /// Build every adapter from the resolved config. Lookups without a
    /// credential are left out rather than failing startup.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let creds = &config.credentials;

        let generator = providers::build(&config.llm, creds.llm_api_key.clone())
            .map_err(|e| AppError::Config(format!("llm: {e}")))?;

        let metadata = match &creds.omdb_api_key {
            Some(key) => Some(
                MetadataClient::new(config.metadata.api_base_url.clone(), key.clone(), config.metadata.timeout_seconds)
                    .map_err(|e| AppError::Config(format!("metadata: {e}")))?,
            ),
            None => {
                warn!("OMDB_API_KEY not set, metadata lookups disabled");
                None
            }
        };

        let trailer = match (&creds.youtube_api_key, config.trailer.enabled) {
            (Some(key), true) => Some(
                TrailerClient::new(
                    config.trailer.api_base_url.clone(),
                    config.trailer.watch_base_url.clone(),
                    key.clone(),
                    config.trailer.timeout_seconds,
                )
                .map_err(|e| AppError::Config(format!("trailer: {e}")))?,
            ),
            (None, true) => {
                warn!("YOUTUBE_API_KEY not set, trailer lookups disabled");
                None
            }
            (_, false) => None,
        };

        info!(
            generator = generator.name(),
            mode = ?config.recommend.mode,
            metadata = metadata.is_some(),
            trailer = trailer.is_some(),
            "orchestrator ready"
        );
        Ok(Self::new(generator, metadata, trailer, config.recommend.clone()))
    }

    /// Handle one inbound message end to end.
    ///
    /// Recommendation failures are reported to the chat and logged here; only
    /// a failure to deliver text replies is returned to the channel.
    pub async fn handle<S: ReplySink>(&self, text: &str, sink: &mut S) -> Result<(), DeliveryError> {
        let query = text.trim();
        if query.is_empty() {
            return Ok(());
        }

        if let Some(command) = query.strip_prefix('/') {
            // `/start@SomeBot` in group chats.
            let name = command.split_whitespace().next().unwrap_or_default();
            let name = name.split('@').next().unwrap_or_default();
            if name == "start" {
                return sink.send(Reply::Text(reply::WELCOME.to_string())).await;
            }
            debug!(command = %name, "ignoring unknown command");
            return Ok(());
        }

        if self.settings.acknowledge {
            sink.send(Reply::Text(reply::acknowledgment(query))).await?;
        }

        let outcome = match self.settings.mode {
            RecommendMode::Single => self.single(query).await,
            RecommendMode::List => self.list(query).await,
            RecommendMode::Lookup => self.lookup(query).await,
        };

        deliver(sink, outcome.replies).await?;

        if let Some(err) = outcome.error {
            warn!(%query, error = %err, "recommendation failed");
            sink.send(Reply::Text(reply::error(&err))).await?;
        }
        Ok(())
    }

    async fn generate(&self, query: &str) -> Result<String, ProviderError> {
        let prompt = prompt::recommendation_prompt(&self.settings, query);
        debug!(provider = self.generator.name(), %query, "requesting recommendations");
        self.generator.complete(&prompt).await
    }

    /// One title cut from the first line; the whole answer is the message.
    async fn single(&self, query: &str) -> Outcome {
        let answer = match self.generate(query).await {
            Ok(answer) => answer,
            Err(e) => return Outcome::failed(e),
        };

        let parsed = parse::parse(ParseStrategy::FirstLine, &answer);
        let Some(entry) = parsed.entries.into_iter().next() else {
            return Outcome::failed(RecommendError::NoEntries { unparsed: parsed.unparsed });
        };
        let message = reply::single_message(&answer);

        let record = match &self.metadata {
            Some(metadata) => match metadata.lookup(&entry.title).await {
                Ok(record) => record,
                Err(source) => {
                    let partial = match self.settings.on_failure {
                        FailurePolicy::Flush => vec![Reply::Text(message)],
                        FailurePolicy::Abandon => Vec::new(),
                    };
                    return Outcome {
                        replies: partial,
                        error: Some(RecommendError::Metadata { title: entry.title, source }),
                    };
                }
            },
            None => None,
        };

        match record.as_ref().and_then(|r| r.poster_url()) {
            Some(url) => Outcome::done(vec![Reply::Photo { url: url.to_string(), caption: Some(message) }]),
            None => Outcome::done(vec![Reply::Text(message)]),
        }
    }

    /// Several titles, each looked up in turn, then one combined message
    /// followed by the posters.
    async fn list(&self, query: &str) -> Outcome {
        let answer = match self.generate(query).await {
            Ok(answer) => answer,
            Err(e) => return Outcome::failed(e),
        };

        let parsed = parse::parse(self.settings.parser, &answer);
        debug!(entries = parsed.entries.len(), unparsed = parsed.unparsed, "parsed generator answer");
        if parsed.entries.is_empty() {
            return Outcome::failed(RecommendError::NoEntries { unparsed: parsed.unparsed });
        }

        let mut items = Vec::with_capacity(parsed.entries.len());
        let mut failure = None;

        for entry in parsed.entries {
            let record = match &self.metadata {
                Some(metadata) => match metadata.lookup(&entry.title).await {
                    Ok(record) => record,
                    Err(source) => {
                        failure = Some(RecommendError::Metadata { title: entry.title, source });
                        break;
                    }
                },
                None => None,
            };
            let trailer = self.find_trailer(&entry.title).await;
            items.push(Enriched { entry, record, trailer });
        }

        let keep_partial = failure.is_none() || self.settings.on_failure == FailurePolicy::Flush;
        let replies = if keep_partial && !items.is_empty() {
            let mut replies = vec![Reply::Text(reply::list_message(query, &items))];
            replies.extend(reply::poster_replies(&items));
            replies
        } else {
            Vec::new()
        };

        Outcome { replies, error: failure }
    }

    /// The requested title itself, with the generator's suggestions attached.
    async fn lookup(&self, query: &str) -> Outcome {
        let similar = match self.generate(query).await {
            Ok(answer) => answer,
            Err(e) => return Outcome::failed(e),
        };

        let Some(metadata) = &self.metadata else {
            return Outcome::done(vec![Reply::Text(reply::single_message(&similar))]);
        };

        let record = match metadata.lookup(query).await {
            Ok(Some(record)) => record,
            Ok(None) => return Outcome::done(vec![Reply::Text(reply::not_found(query))]),
            Err(source) => {
                return Outcome::failed(RecommendError::Metadata { title: query.to_string(), source });
            }
        };

        let trailer = self.find_trailer(query).await;
        let mut replies = Vec::new();
        if let Some(url) = record.poster_url() {
            replies.push(Reply::Photo {
                url: url.to_string(),
                caption: Some(format!("<b>{}</b>", reply::escape(&record.title))),
            });
        }
        replies.push(Reply::Text(reply::lookup_card(&record, trailer.as_ref(), &similar)));
        Outcome::done(replies)
    }

    /// Trailer failures only cost the link: they render as not found.
    async fn find_trailer(&self, title: &str) -> Option<TrailerLink> {
        let trailer = self.trailer.as_ref()?;
        match trailer.find(title).await {
            Ok(link) => Some(link),
            Err(e) => {
                warn!(%title, error = %e, "trailer lookup failed");
                Some(TrailerLink::NotFound)
            }
        }
    }
}

/// Send replies in order. A photo that cannot be delivered is logged and,
/// when it carried a caption, replaced by that caption as text. A photo
/// that went out with a failed follow-up is only logged.
async fn deliver<S: ReplySink>(sink: &mut S, replies: Vec<Reply>) -> Result<(), DeliveryError> {
    for reply in replies {
        match reply {
            Reply::Text(_) => sink.send(reply).await?,
            Reply::Photo { ref url, ref caption } => {
                let (url, caption) = (url.clone(), caption.clone());
                match sink.send(reply).await {
                    Ok(()) => {}
                    Err(e @ DeliveryError::FollowUp(_)) => {
                        warn!(%url, error = %e, "photo caption follow-up failed");
                    }
                    Err(e) => {
                        warn!(%url, error = %e, "photo delivery failed");
                        if let Some(caption) = caption {
                            sink.send(Reply::Text(caption)).await?;
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
