//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory (or
//! the file named by `CINEBOT_CONFIG`), then applies the `CINEBOT_LOG_LEVEL`
//! override. Credentials come from the environment only and are never read
//! from TOML.

use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;
use crate::logger;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Upper bound on `[recommend] count`; keeps one reply within Telegram limits.
pub const MAX_RECOMMENDATIONS: usize = 10;

// ── Public config types ───────────────────────────────────────────────────────

/// Console (stdin/stdout) channel configuration.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub enabled: bool,
}

/// Telegram channel configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct CommsConfig {
    pub console: ConsoleConfig,
    pub telegram: TelegramConfig,
}

/// OpenAI / OpenAI-compatible provider configuration (`[llm.openai]`).
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    pub model: String,
    /// Sampling temperature (ignored for models that forbid it).
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Active provider (`"dummy"`, `"openai"`). Named `default` in TOML.
    pub provider: String,
    pub openai: OpenAiConfig,
}

/// Movie metadata service (`[metadata]`), OMDb query shape.
#[derive(Debug, Clone)]
pub struct MetadataConfig {
    pub api_base_url: String,
    pub timeout_seconds: u64,
}

/// Video search service (`[trailer]`), YouTube Data API search shape.
#[derive(Debug, Clone)]
pub struct TrailerConfig {
    pub enabled: bool,
    pub api_base_url: String,
    /// Prefix joined with the video id to form the playback link.
    pub watch_base_url: String,
    pub timeout_seconds: u64,
}

/// How a message is turned into replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendMode {
    /// One recommendation; title cut from the first line; poster as photo caption.
    Single,
    /// Several recommendations, each enriched with metadata and a trailer.
    #[default]
    List,
    /// Look up the requested title itself, with similar titles appended.
    Lookup,
}

/// Strategy used to recover entries from generator text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStrategy {
    FirstLine,
    Numbered,
    Blocks,
    #[default]
    Template,
}

/// What to do with already-computed entries when a metadata lookup fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Send the entries completed so far, then the error reply.
    #[default]
    Flush,
    /// Drop everything and send only the error reply.
    Abandon,
}

/// Orchestrator settings (`[recommend]`).
#[derive(Debug, Clone)]
pub struct RecommendConfig {
    pub mode: RecommendMode,
    /// Number of recommendations requested in list mode.
    pub count: usize,
    pub parser: ParseStrategy,
    /// Send an acknowledgment before calling the generator.
    pub acknowledge: bool,
    pub on_failure: FailurePolicy,
    /// Directory holding prompt overrides; built-in templates are used for
    /// any file missing there.
    pub prompts_dir: Option<PathBuf>,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            mode: RecommendMode::default(),
            count: default_count(),
            parser: ParseStrategy::default(),
            acknowledge: true,
            on_failure: FailurePolicy::default(),
            prompts_dir: None,
        }
    }
}

/// Service credentials, sourced from the environment once at startup.
#[derive(Clone, Default)]
pub struct Credentials {
    pub telegram_bot_token: Option<String>,
    /// `LLM_API_KEY`, falling back to `OPENAI_API_KEY`. `None` for keyless local models.
    pub llm_api_key: Option<String>,
    pub omdb_api_key: Option<String>,
    pub youtube_api_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            telegram_bot_token: non_empty_var("TELEGRAM_BOT_TOKEN"),
            llm_api_key: non_empty_var("LLM_API_KEY").or_else(|| non_empty_var("OPENAI_API_KEY")),
            omdb_api_key: non_empty_var("OMDB_API_KEY"),
            youtube_api_key: non_empty_var("YOUTUBE_API_KEY"),
        }
    }
}

// Secrets never reach the logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn state(v: &Option<String>) -> &'static str {
            if v.is_some() { "set" } else { "unset" }
        }
        f.debug_struct("Credentials")
            .field("telegram_bot_token", &state(&self.telegram_bot_token))
            .field("llm_api_key", &state(&self.llm_api_key))
            .field("omdb_api_key", &state(&self.omdb_api_key))
            .field("youtube_api_key", &state(&self.youtube_api_key))
            .finish()
    }
}

/// Fully-resolved bot configuration. Immutable after [`load`].
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    pub log_level: String,
    pub comms: CommsConfig,
    pub llm: LlmConfig,
    pub metadata: MetadataConfig,
    pub trailer: TrailerConfig,
    pub recommend: RecommendConfig,
    pub credentials: Credentials,
}

impl Config {
    pub fn comms_console_should_load(&self) -> bool {
        self.comms.console.enabled
    }

    pub fn comms_telegram_should_load(&self) -> bool {
        self.comms.telegram.enabled
    }

    /// Metadata lookups run only when an OMDb key is available.
    pub fn metadata_enabled(&self) -> bool {
        self.credentials.omdb_api_key.is_some()
    }

    /// Trailer lookups need both the config switch and a YouTube key.
    pub fn trailer_enabled(&self) -> bool {
        self.trailer.enabled && self.credentials.youtube_api_key.is_some()
    }
}

// ── Raw TOML shape ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawConfig {
    bot: RawBot,
    #[serde(default)]
    comms: RawComms,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    metadata: RawMetadata,
    #[serde(default)]
    trailer: RawTrailer,
    #[serde(default)]
    recommend: RawRecommend,
}

#[derive(Deserialize)]
struct RawBot {
    name: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

#[derive(Deserialize, Default)]
struct RawComms {
    #[serde(default)]
    console: RawConsole,
    #[serde(default)]
    telegram: RawTelegram,
}

#[derive(Deserialize)]
struct RawConsole {
    /// Defaults to `false`; auto-enabled at startup when no other channel is.
    #[serde(default = "default_false")]
    enabled: bool,
}

#[derive(Deserialize)]
struct RawTelegram {
    #[serde(default = "default_true")]
    enabled: bool,
}

#[derive(Deserialize)]
struct RawLlm {
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    openai: RawOpenAi,
}

#[derive(Deserialize)]
struct RawOpenAi {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_openai_model")]
    model: String,
    #[serde(default = "default_openai_temperature")]
    temperature: f32,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

#[derive(Deserialize)]
struct RawMetadata {
    #[serde(default = "default_metadata_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_lookup_timeout_seconds")]
    timeout_seconds: u64,
}

#[derive(Deserialize)]
struct RawTrailer {
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "default_trailer_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_watch_base_url")]
    watch_base_url: String,
    #[serde(default = "default_lookup_timeout_seconds")]
    timeout_seconds: u64,
}

#[derive(Deserialize)]
struct RawRecommend {
    #[serde(default)]
    mode: RecommendMode,
    #[serde(default = "default_count")]
    count: usize,
    #[serde(default)]
    parser: ParseStrategy,
    #[serde(default = "default_true")]
    acknowledge: bool,
    #[serde(default)]
    on_failure: FailurePolicy,
    #[serde(default)]
    prompts_dir: Option<String>,
}

impl Default for RawConsole {
    fn default() -> Self {
        Self { enabled: false }
    }
}

impl Default for RawTelegram {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for RawLlm {
    fn default() -> Self {
        Self { provider: default_llm_provider(), openai: RawOpenAi::default() }
    }
}

impl Default for RawOpenAi {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for RawMetadata {
    fn default() -> Self {
        Self {
            api_base_url: default_metadata_api_base_url(),
            timeout_seconds: default_lookup_timeout_seconds(),
        }
    }
}

impl Default for RawTrailer {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base_url: default_trailer_api_base_url(),
            watch_base_url: default_watch_base_url(),
            timeout_seconds: default_lookup_timeout_seconds(),
        }
    }
}

impl Default for RawRecommend {
    fn default() -> Self {
        Self {
            mode: RecommendMode::default(),
            count: default_count(),
            parser: ParseStrategy::default(),
            acknowledge: true,
            on_failure: FailurePolicy::default(),
            prompts_dir: None,
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_llm_provider() -> String { "openai".to_string() }
fn default_openai_api_base_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_openai_model() -> String { "gpt-4o-mini".to_string() }
fn default_openai_temperature() -> f32 { 0.7 }
fn default_timeout_seconds() -> u64 { 60 }
fn default_metadata_api_base_url() -> String { "https://www.omdbapi.com/".to_string() }
fn default_trailer_api_base_url() -> String { "https://www.googleapis.com/youtube/v3/search".to_string() }
fn default_watch_base_url() -> String { "https://www.youtube.com/watch?v=".to_string() }
fn default_lookup_timeout_seconds() -> u64 { 15 }
fn default_count() -> usize { 5 }
fn default_true() -> bool { true }
fn default_false() -> bool { false }

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Load config from `config_path`, else `CINEBOT_CONFIG`, else
/// `config/default.toml`. Applies the log level override and attaches
/// credentials from the environment.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let path = match config_path {
        Some(p) => p.to_string(),
        None => env::var("CINEBOT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
    };
    let log_level_override = env::var("CINEBOT_LOG_LEVEL").ok();
    load_from(Path::new(&path), log_level_override.as_deref(), Credentials::from_env())
}

/// Internal loader. Accepts an explicit path, override and credentials.
/// Tests pass these directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    log_level_override: Option<&str>,
    credentials: Credentials,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let log_level = log_level_override.unwrap_or(&parsed.bot.log_level).to_string();
    // Bare levels are checked here; full filter directives are left to EnvFilter.
    if !log_level.contains(['=', ',']) {
        logger::parse_level(&log_level).map_err(|e| AppError::Config(e.to_string()))?;
    }

    let rec = parsed.recommend;
    if rec.count == 0 || rec.count > MAX_RECOMMENDATIONS {
        return Err(AppError::Config(format!(
            "recommend.count must be between 1 and {MAX_RECOMMENDATIONS}, got {}",
            rec.count
        )));
    }

    Ok(Config {
        bot_name: parsed.bot.name,
        log_level,
        comms: CommsConfig {
            console: ConsoleConfig { enabled: parsed.comms.console.enabled },
            telegram: TelegramConfig { enabled: parsed.comms.telegram.enabled },
        },
        llm: LlmConfig {
            provider: parsed.llm.provider,
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url,
                model: parsed.llm.openai.model,
                temperature: parsed.llm.openai.temperature,
                timeout_seconds: parsed.llm.openai.timeout_seconds,
            },
        },
        metadata: MetadataConfig {
            api_base_url: parsed.metadata.api_base_url,
            timeout_seconds: parsed.metadata.timeout_seconds,
        },
        trailer: TrailerConfig {
            enabled: parsed.trailer.enabled,
            api_base_url: parsed.trailer.api_base_url,
            watch_base_url: parsed.trailer.watch_base_url,
            timeout_seconds: parsed.trailer.timeout_seconds,
        },
        recommend: RecommendConfig {
            mode: rec.mode,
            count: rec.count,
            parser: rec.parser,
            acknowledge: rec.acknowledge,
            on_failure: rec.on_failure,
            prompts_dir: rec.prompts_dir.map(PathBuf::from),
        },
        credentials,
    })
}
