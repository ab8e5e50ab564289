//! Cinebot entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Build the recommendation orchestrator
//!   6. Spawn Ctrl-C → shutdown signal watcher
//!   7. Run comms channels until shutdown

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use cinebot::config::{self, Config};
use cinebot::error::AppError;
use cinebot::logger;
use cinebot::subsystems::comms;
use cinebot::subsystems::recommend::Orchestrator;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present; errors are ignored (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let config = config::load(args.config_path.as_deref())?;

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    logger::init(effective_log_level, args.log_level.is_some())?;

    info!(
        bot_name = %config.bot_name,
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        credentials = ?config.credentials,
        "config loaded"
    );

    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);

    let shutdown = CancellationToken::new();

    // Ctrl-C handler cancels the token so all channels shut down.
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    print_startup_summary(&config);

    let channels = comms::start(&config, orchestrator, shutdown.clone());
    channels.join().await?;

    // Console exits on EOF without Ctrl-C; stop the rest too.
    shutdown.cancel();

    info!("bye");
    Ok(())
}

fn print_startup_summary(config: &Config) {
    let fit = |text: String| -> String {
        const WIDTH: usize = 58;
        let char_count = text.chars().count();
        if char_count >= WIDTH {
            let mut out = text.chars().take(WIDTH - 1).collect::<String>();
            out.push('…');
            out
        } else {
            format!("{text:<WIDTH$}")
        }
    };

    let enabled = |on: bool| if on { "enabled" } else { "disabled" };

    let rec = &config.recommend;
    let llm_line = format!(
        "provider={} model={} timeout={}s",
        config.llm.provider, config.llm.openai.model, config.llm.openai.timeout_seconds
    );
    let recommend_line = format!(
        "mode={:?} count={} parser={:?} on_failure={:?}",
        rec.mode, rec.count, rec.parser, rec.on_failure
    );
    let telegram = config.comms_telegram_should_load() && config.credentials.telegram_bot_token.is_some();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ 🎬 Cinebot Status                                            ║");
    println!("╟──────────────────────────────────────────────────────────────╢");
    println!("║ 🧾 Bot: {:<52}║", config.bot_name);
    println!("║ 🧠 PID: {:<52}║", std::process::id());
    println!("╟──────────────────────────────────────────────────────────────╢");
    println!("║   {}║", fit(format!("🧠 llm: {llm_line}")));
    println!("║   {}║", fit(format!("🍿 recommend: {recommend_line}")));
    println!("║   {}║", fit(format!("🎞️  metadata: {}", enabled(config.metadata_enabled()))));
    println!("║   {}║", fit(format!("▶️  trailers: {}", enabled(config.trailer_enabled()))));
    println!("║   {}║", fit(format!("✈️  telegram: {}", enabled(telegram))));
    println!("║   {}║", fit(format!("⌨️  console: {}", enabled(config.comms_console_should_load() || !telegram))));
    println!("╚══════════════════════════════════════════════════════════════╝");
}

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: cinebot [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    // -v warn, -vv info, -vvv debug, -vvvv+ trace.
    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs { log_level, config_path }
}
