//! Runtime configuration.
//!
//! [`Settings`] is built once at startup and passed by reference to the
//! components that need it. Every key has a default, so an empty environment
//! yields a working local setup with synchronous dispatch.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::pipeline::RetryPolicy;
use crate::state::Depth;

/// Slide count used when a request leaves it out.
pub const DEFAULT_SLIDE_COUNT: u32 = 7;

/// Minimum topic length after trimming.
pub const MIN_TOPIC_LEN: usize = 3;

/// Fonts the renderer knows about.
pub const SUPPORTED_FONTS: [&str; 4] = ["Arial", "Calibri", "Times New Roman", "Consolas"];

/// Font used when a request leaves it out.
pub const DEFAULT_FONT: &str = "Calibri";

/// Depth used when a request leaves it out.
pub const DEFAULT_DEPTH: Depth = Depth::Concise;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `deckflow=debug`.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Process-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory of the on-disk result cache.
    pub cache_dir: PathBuf,
    /// Broker URL; `None` means jobs run inline.
    pub broker_url: Option<String>,
    /// Queue name on the broker.
    pub queue: String,
    /// Directory rendered documents are written to.
    pub output_dir: PathBuf,
    /// Retry policy for external service calls.
    pub retry: RetryPolicy,
    /// How long the broker probe may take.
    pub broker_timeout_ms: u64,
    /// Logging settings.
    pub log: LogConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".cache"),
            broker_url: None,
            queue: "deckflow".to_string(),
            output_dir: PathBuf::from("outputs"),
            retry: RetryPolicy::default(),
            broker_timeout_ms: 1000,
            log: LogConfig::default(),
        }
    }
}

impl Settings {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "Failed to load .env file"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let retry = RetryPolicy::default()
            .with_max_attempts(parse_or(&get, "DECKFLOW_RETRY_ATTEMPTS", defaults.retry.max_attempts)?)
            .with_initial_delay(Duration::from_millis(parse_or(
                &get,
                "DECKFLOW_RETRY_DELAY_MS",
                defaults.retry.initial_delay_ms,
            )?))
            .with_multiplier(parse_or(&get, "DECKFLOW_RETRY_MULTIPLIER", defaults.retry.multiplier)?)
            .with_max_delay(Some(Duration::from_millis(parse_or(
                &get,
                "DECKFLOW_RETRY_MAX_DELAY_MS",
                defaults.retry.max_delay_ms.unwrap_or(10_000),
            )?)));

        Ok(Self {
            cache_dir: get("DECKFLOW_CACHE_DIR").map_or(defaults.cache_dir, PathBuf::from),
            broker_url: get("DECKFLOW_BROKER_URL").or_else(|| get("REDIS_URL")),
            queue: get("DECKFLOW_QUEUE").unwrap_or(defaults.queue),
            output_dir: get("DECKFLOW_OUTPUT_DIR").map_or(defaults.output_dir, PathBuf::from),
            retry,
            broker_timeout_ms: parse_or(&get, "DECKFLOW_BROKER_TIMEOUT_MS", defaults.broker_timeout_ms)?,
            log: LogConfig {
                filter: get("DECKFLOW_LOG").unwrap_or(defaults.log.filter),
                format: parse_or(&get, "DECKFLOW_LOG_FORMAT", defaults.log.format)?,
            },
        })
    }

    /// Broker probe timeout.
    #[must_use]
    pub fn broker_timeout(&self) -> Duration {
        Duration::from_millis(self.broker_timeout_ms)
    }
}

/// Returns true if the font is one the renderer supports.
#[must_use]
pub fn is_supported_font(font: &str) -> bool {
    SUPPORTED_FONTS.contains(&font)
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
    }
}
