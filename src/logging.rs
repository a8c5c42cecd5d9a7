//! Diagnostics for validation and build runs
//!
//! Reports own stdout, so diagnostics go to stderr unless `LOG_OUTPUT`
//! says otherwise. CI and production environments get one JSON object per
//! event; everywhere else gets compact human-readable lines.
//!
//! Environment:
//! - `LOG_FORMAT`: `json` or `pretty`
//! - `LOG_OUTPUT`: `stderr`, `stdout` or `file`
//! - `LOG_DIR`: directory for daily log files (default `logs`)
//! - `ENVIRONMENT`: selects the default format
//! - `RUST_LOG`: replaces the level directives entirely

use anyhow::{Context, Result};
use std::env;
use std::io;
use std::path::PathBuf;
use strum::{Display, EnumString};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const LOG_FILE_NAME: &str = "semantic-conformance.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogSink {
    Stderr,
    Stdout,
    /// Daily rolling files under [`LoggingConfig::directory`].
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub sink: LogSink,
    pub directory: PathBuf,
    /// Level directive used when `RUST_LOG` is unset.
    pub level: String,
    pub environment: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::from_vars(|_| None)
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Build from a variable lookup. Unparsable values fall back to the
    /// defaults.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let environment = var("ENVIRONMENT").unwrap_or_else(|| "development".to_string());
        let default_format = match environment.as_str() {
            "ci" | "prod" | "production" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Self {
            format: var("LOG_FORMAT")
                .and_then(|value| value.parse().ok())
                .unwrap_or(default_format),
            sink: var("LOG_OUTPUT")
                .and_then(|value| value.parse().ok())
                .unwrap_or(LogSink::Stderr),
            directory: var("LOG_DIR").map_or_else(|| PathBuf::from("logs"), PathBuf::from),
            level: "warn".to_string(),
            environment,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        if debug {
            self.level = "debug".to_string();
        }
        self
    }

    fn filter(&self) -> Result<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(format!("{},reqwest=warn,hyper=warn", self.level))
                .with_context(|| format!("invalid log level {:?}", self.level)),
        }
    }

    fn writer(&self) -> Result<(NonBlocking, WorkerGuard)> {
        Ok(match self.sink {
            LogSink::Stderr => tracing_appender::non_blocking(io::stderr()),
            LogSink::Stdout => tracing_appender::non_blocking(io::stdout()),
            LogSink::File => {
                std::fs::create_dir_all(&self.directory).with_context(|| {
                    format!("cannot create log directory {}", self.directory.display())
                })?;
                tracing_appender::non_blocking(tracing_appender::rolling::daily(
                    &self.directory,
                    LOG_FILE_NAME,
                ))
            }
        })
    }
}

/// Install the global subscriber. Keep the returned guard alive until exit;
/// dropping it flushes buffered events.
pub fn init_logging(config: LoggingConfig) -> Result<WorkerGuard> {
    let (writer, guard) = config.writer()?;
    let filter = config.filter()?;

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .compact()
            .with_target(false)
            .with_ansi(config.sink != LogSink::File)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
    };
    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .context("a global subscriber is already installed")?;

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        format = %config.format,
        sink = %config.sink,
        "logging ready"
    );
    Ok(guard)
}

/// Warn when `$elapsed` exceeds `$limit_ms`, otherwise log at debug.
#[macro_export]
macro_rules! log_slow_operation {
    ($elapsed:expr, $limit_ms:expr, $($field:tt)*) => {{
        let elapsed_ms = $elapsed.as_millis() as u64;
        if elapsed_ms > $limit_ms {
            tracing::warn!(elapsed_ms, limit_ms = $limit_ms, $($field)*);
        } else {
            tracing::debug!(elapsed_ms, $($field)*);
        }
    }};
}

/// `log_cache_operation!(hit | miss, key, fields...)`
#[macro_export]
macro_rules! log_cache_operation {
    ($outcome:ident, $key:expr, $($field:tt)*) => {
        tracing::debug!(key = %$key, outcome = stringify!($outcome), $($field)*)
    };
}

/// Span covering every check run against one asset.
pub fn asset_span(relative_path: &str) -> tracing::Span {
    tracing::info_span!("asset", path = relative_path)
}

/// Span covering one pool run.
pub fn run_span(operation: &'static str, files: usize) -> tracing::Span {
    tracing::info_span!("run", operation, files)
}
