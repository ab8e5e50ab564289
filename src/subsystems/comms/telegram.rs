//! Telegram comms channel. Long-polls the Bot API, runs the orchestrator per
//! text message, and sends replies back to the originating chat.
//!
//! teloxide's dispatcher handles updates from one chat in order and
//! different chats concurrently; the orchestrator adds no locking of its own.

use std::sync::Arc;

use teloxide::payloads::{SendMessageSetters, SendPhotoSetters};
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::subsystems::recommend::{Orchestrator, Reply};
use crate::subsystems::runtime::{Component, ComponentFuture};

use super::{Chunk, DeliveryError, ReplySink, chunk_lines};

/// Telegram rejects messages over 4096 characters; chunk below that.
const MAX_MESSAGE_LENGTH: usize = 4000;

/// Telegram's photo caption limit.
const MAX_CAPTION_LENGTH: usize = 1024;

pub struct TelegramChannel {
    channel_id: String,
    orchestrator: Arc<Orchestrator>,
    token: String,
}

impl TelegramChannel {
    pub fn new(channel_id: impl Into<String>, orchestrator: Arc<Orchestrator>, token: String) -> Self {
        Self { channel_id: channel_id.into(), orchestrator, token }
    }
}

impl Component for TelegramChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_telegram(self.channel_id, self.orchestrator, self.token, shutdown))
    }
}

/// Replies for one chat.
pub struct TelegramSink {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramSink {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }

    async fn send_text(&self, text: &str) -> Result<(), DeliveryError> {
        for chunk in chunk_lines(text, MAX_MESSAGE_LENGTH) {
            let request = match chunk {
                Chunk::Html(html) => self.bot.send_message(self.chat_id, html).parse_mode(ParseMode::Html),
                Chunk::Plain(plain) => self.bot.send_message(self.chat_id, plain),
            };
            request.await.map_err(|e| DeliveryError::Failed(e.to_string()))?;
        }
        Ok(())
    }
}

impl ReplySink for TelegramSink {
    async fn send(&mut self, reply: Reply) -> Result<(), DeliveryError> {
        match reply {
            Reply::Text(text) => self.send_text(&text).await,
            Reply::Photo { url, caption } => {
                let url = reqwest::Url::parse(&url)
                    .map_err(|e| DeliveryError::Failed(format!("invalid poster url '{url}': {e}")))?;

                // Over-long captions go out as a follow-up message instead.
                let (inline, overflow) = match caption {
                    Some(c) if c.chars().count() > MAX_CAPTION_LENGTH => (None, Some(c)),
                    other => (other, None),
                };

                let mut request = self.bot.send_photo(self.chat_id, InputFile::url(url));
                if let Some(caption) = inline {
                    request = request.caption(caption).parse_mode(ParseMode::Html);
                }
                request.await.map_err(|e| DeliveryError::Failed(e.to_string()))?;

                // The photo is out; a failed overflow must not make it look unsent.
                match overflow {
                    Some(text) => self.send_text(&text).await.map_err(|e| DeliveryError::FollowUp(e.to_string())),
                    None => Ok(()),
                }
            }
        }
    }
}

async fn run_telegram(
    channel_id: String,
    orchestrator: Arc<Orchestrator>,
    token: String,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    info!(%channel_id, "telegram channel starting");

    let bot = Bot::new(token);
    let handler_channel_id = channel_id.clone();

    let handler = Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
        let orchestrator = orchestrator.clone();
        let channel_id = handler_channel_id.clone();
        async move {
            if let Some(text) = msg.text() {
                let chat_id = msg.chat.id;
                debug!(
                    %channel_id,
                    chat_id = chat_id.0,
                    from = ?msg.from.as_ref().and_then(|u| u.username.as_ref()),
                    "telegram received message"
                );
                let mut sink = TelegramSink::new(bot, chat_id);
                if let Err(e) = orchestrator.handle(text, &mut sink).await {
                    warn!(%channel_id, chat_id = chat_id.0, "failed to send telegram reply: {e}");
                }
            }
            respond(())
        }
    });

    let mut dispatcher = Dispatcher::builder(bot, handler).build();

    tokio::select! {
        biased;

        _ = shutdown.cancelled() => {
            info!(%channel_id, "shutdown signal received, closing telegram channel");
        }
        _ = dispatcher.dispatch() => {
            warn!(%channel_id, "telegram dispatcher exited unexpectedly");
        }
    }

    Ok(())
}
