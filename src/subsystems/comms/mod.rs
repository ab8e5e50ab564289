//! Comms subsystem: the chat gateways.
//!
//! # Architecture
//!
//! Each channel (console, Telegram) implements [`Component`] and is spawned
//! as an independent task by [`start`]. Channels capture an
//! `Arc<Orchestrator>` at construction time and, per inbound message, hand
//! it the text plus a [`ReplySink`] bound to the originating chat.
//!
//! # Starting
//!
//! [`start`] is synchronous: it returns a [`SubsystemHandle`] as soon as the
//! tasks are spawned. The caller decides when (or whether) to await it.

#[cfg(feature = "channel-console")]
pub mod console;
#[cfg(feature = "channel-telegram")]
pub mod telegram;

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::subsystems::recommend::{Orchestrator, Reply, reply};
use crate::subsystems::runtime::{Component, SubsystemHandle, spawn_components};

// ── ReplySink ─────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("reply delivery failed: {0}")]
    Failed(String),
    /// A photo went out but its follow-up text did not.
    #[error("follow-up delivery failed: {0}")]
    FollowUp(String),
}

/// Outbound side of one chat. Replies are delivered in call order.
pub trait ReplySink: Send {
    fn send(&mut self, reply: Reply) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// One piece of an outbound text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Whole lines of HTML; every tag opened in the chunk is closed in it.
    Html(String),
    /// Part of a line too long to send whole, markup already stripped.
    Plain(String),
}

/// Split `text` into pieces of at most `max_chars` characters, breaking on
/// line boundaries so markup opened on a line is closed in the same piece.
/// A single line longer than `max_chars` cannot keep its markup intact, so
/// it is reduced to plain text and cut on character boundaries.
pub fn chunk_lines(text: &str, max_chars: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        let line_len = line.chars().count();

        if line_len > max_chars {
            if !current.is_empty() {
                chunks.push(Chunk::Html(std::mem::take(&mut current)));
                current_len = 0;
            }
            let chars: Vec<char> = reply::plain_text(line).chars().collect();
            chunks.extend(chars.chunks(max_chars).map(|c| Chunk::Plain(c.iter().collect())));
            continue;
        }

        if !current.is_empty() && current_len + 1 + line_len > max_chars {
            chunks.push(Chunk::Html(std::mem::take(&mut current)));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        chunks.push(Chunk::Html(current));
    }
    chunks
}

// ── start ─────────────────────────────────────────────────────────────────────

/// Spawn all configured channels and return a [`SubsystemHandle`].
///
/// Telegram is skipped (with a warning) when no bot token is set. The console
/// channel loads when enabled, or as a fallback when nothing else did.
pub fn start(
    config: &Config,
    orchestrator: Arc<Orchestrator>,
    shutdown: CancellationToken,
) -> SubsystemHandle {
    let mut components: Vec<Box<dyn Component>> = Vec::new();

    #[cfg(feature = "channel-telegram")]
    {
        if config.comms_telegram_should_load() {
            match config.credentials.telegram_bot_token.clone() {
                Some(token) => {
                    info!("loading telegram channel");
                    components.push(Box::new(telegram::TelegramChannel::new(
                        "telegram0",
                        orchestrator.clone(),
                        token,
                    )));
                }
                None => warn!("TELEGRAM_BOT_TOKEN not set, telegram channel skipped"),
            }
        }
    }

    #[cfg(feature = "channel-console")]
    {
        if config.comms_console_should_load() || components.is_empty() {
            info!("loading console channel");
            components.push(Box::new(console::ConsoleChannel::new("console0", orchestrator.clone())));
        }
    }

    if components.is_empty() {
        warn!("no comms channels available, nothing to do");
    }

    spawn_components(components, shutdown)
}
