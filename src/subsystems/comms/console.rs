//! Console comms channel. Reads lines from stdin, runs the orchestrator,
//! prints replies to stdout.
//!
//! Loaded when `[comms.console] enabled = true`, or as the fallback when no
//! other channel could start. Runs until `shutdown` is cancelled (Ctrl-C)
//! or stdin is closed.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::subsystems::recommend::{Orchestrator, Reply, reply};
use crate::subsystems::runtime::{Component, ComponentFuture};

use super::{DeliveryError, ReplySink};

pub struct ConsoleChannel {
    channel_id: String,
    orchestrator: Arc<Orchestrator>,
}

impl ConsoleChannel {
    pub fn new(channel_id: impl Into<String>, orchestrator: Arc<Orchestrator>) -> Self {
        Self { channel_id: channel_id.into(), orchestrator }
    }
}

impl Component for ConsoleChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_console(self.channel_id, self.orchestrator, shutdown))
    }
}

/// Writes replies as plain text; photos become `[poster] <url>` lines.
pub struct ConsoleSink<W> {
    out: W,
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_reply(&mut self, reply: Reply) -> std::io::Result<()> {
        match reply {
            Reply::Text(html) => writeln!(self.out, "{}", reply::plain_text(&html))?,
            Reply::Photo { url, caption } => {
                writeln!(self.out, "[poster] {url}")?;
                if let Some(caption) = caption {
                    writeln!(self.out, "{}", reply::plain_text(&caption))?;
                }
            }
        }
        self.out.flush()
    }
}

impl<W: Write + Send> ReplySink for ConsoleSink<W> {
    async fn send(&mut self, reply: Reply) -> Result<(), DeliveryError> {
        self.write_reply(reply).map_err(|e| DeliveryError::Failed(e.to_string()))
    }
}

async fn run_console(
    channel_id: String,
    orchestrator: Arc<Orchestrator>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    info!(%channel_id, "console channel started");
    println!("─────────────────────────────────────────────");
    println!(" Movie bot console: type a movie name (Ctrl-C to quit)");
    println!("─────────────────────────────────────────────");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut sink = ConsoleSink::new(std::io::stdout());

    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!(%channel_id, "shutdown signal received, closing console channel");
                break;
            }

            line = lines.next_line() => {
                match line {
                    Err(e) => {
                        warn!(%channel_id, "console read error: {e}");
                        break;
                    }
                    Ok(None) => {
                        info!(%channel_id, "console stdin closed");
                        break;
                    }
                    Ok(Some(input)) => {
                        debug!(%channel_id, input = %input, "console received line");
                        if let Err(e) = orchestrator.handle(&input, &mut sink).await {
                            warn!(%channel_id, "console reply failed: {e}");
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
