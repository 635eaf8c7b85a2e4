//! # Logging Utilities
//!
//! Subscriber setup for the `tracing` events emitted by `stacklens-core`.
//!
//! The library only emits events: a warning when an image or an address cannot
//! be resolved, an error when the capture backend cannot start. This module
//! installs the subscriber that receives them:
//! - Pretty or JSON output on stderr (stdout is left to the report itself)
//! - `RUST_LOG` style filtering, overridable with an explicit level
//! - An optional plain-text or JSON log file
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stacklens_utils::init_logging;
//!
//! // Reads RUST_LOG, STACKLENS_LOG_FORMAT and STACKLENS_LOG_FILE
//! let _guard = init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: filter directives (e.g. `RUST_LOG=debug`, `RUST_LOG=stacklens_core=trace`)
//! - `STACKLENS_LOG_FORMAT`: `pretty` (default) or `json`
//! - `STACKLENS_LOG_FILE`: optional log file; a directory gets a dated file name

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Environment variable selecting the output format
pub const FORMAT_ENV: &str = "STACKLENS_LOG_FORMAT";

/// Environment variable naming the optional log file
pub const FILE_ENV: &str = "STACKLENS_LOG_FILE";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat
{
    /// Human-readable lines (default)
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(format!("{s} (use 'pretty' or 'json')"))),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.trim().to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(format!(
                "{s} (use 'error', 'warn', 'info', 'debug', or 'trace')"
            ))),
        }
    }
}

/// Resolved logging configuration
///
/// Filter priority when the subscriber is built:
/// 1. `level`, if set (e.g. from a `--log-level` flag)
/// 2. `RUST_LOG`, if set and valid
/// 3. `warn`, so a healthy run prints nothing but the report
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig
{
    /// Output format of the stderr layer, from `STACKLENS_LOG_FORMAT`.
    pub format: LogFormat,
    /// Explicit level. Takes precedence over `RUST_LOG` when set.
    pub level: Option<LogLevel>,
    /// Extra log file, from `STACKLENS_LOG_FILE`. A directory gets a dated file name.
    pub file: Option<PathBuf>,
}

impl LogConfig
{
    /// Read the configuration from the process environment.
    ///
    /// ## Errors
    ///
    /// Returns `InvalidFormat` if `STACKLENS_LOG_FORMAT` is set to an unknown
    /// format.
    pub fn from_env() -> Result<Self, LoggingError>
    {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration through `lookup` instead of the environment.
    ///
    /// Empty values count as unset.
    ///
    /// ## Errors
    ///
    /// Returns `InvalidFormat` if the format variable holds an unknown format.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LoggingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let format = match value(FORMAT_ENV) {
            Some(format) => format.parse()?,
            None => LogFormat::default(),
        };
        let file = value(FILE_ENV).map(PathBuf::from);

        Ok(Self {
            format,
            level: None,
            file,
        })
    }

    /// Override the level filter.
    #[must_use]
    pub fn with_level(mut self, level: Option<LogLevel>) -> Self
    {
        self.level = level.or(self.level);
        self
    }

    fn filter(&self) -> EnvFilter
    {
        match self.level {
            Some(level) => EnvFilter::new(Level::from(level).to_string()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string())),
        }
    }
}

/// Path of the log file for a configured `STACKLENS_LOG_FILE` value.
///
/// A directory gets a file named after today's date, e.g.
/// `2025-01-31-stacklens.log`.
pub fn log_file_path(configured: &Path) -> PathBuf
{
    if configured.is_dir() {
        let today = Utc::now().format("%Y-%m-%d");
        configured.join(format!("{today}-stacklens.log"))
    } else {
        configured.to_path_buf()
    }
}

/// Initialize logging from the environment
///
/// ## Example
///
/// ```rust,no_run
/// use stacklens_utils::init_logging;
///
/// let _guard = init_logging().expect("Failed to initialize logging");
/// tracing::warn!("visible by default");
/// ```
///
/// ## Errors
///
/// Returns an error if:
/// - `STACKLENS_LOG_FORMAT` is invalid
/// - A global subscriber is already installed
/// - The log file's directory cannot be created
pub fn init_logging() -> Result<Option<WorkerGuard>, LoggingError>
{
    init_logging_with(&LogConfig::from_env()?)
}

/// Initialize logging with an explicit configuration
///
/// When a log file is configured, the returned guard flushes it on drop and
/// must be kept alive for as long as events should reach the file.
///
/// ## Example
///
/// ```rust,no_run
/// use stacklens_utils::{LogConfig, LogFormat, LogLevel, init_logging_with};
///
/// let config = LogConfig {
///     format: LogFormat::Json,
///     level: Some(LogLevel::Debug),
///     file: None,
/// };
/// let _guard = init_logging_with(&config).expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed or the log
/// file's directory cannot be created.
pub fn init_logging_with(config: &LogConfig) -> Result<Option<WorkerGuard>, LoggingError>
{
    let mut layers = vec![console_layer(config)];
    let mut guard = None;

    if let Some(configured) = &config.file {
        let path = log_file_path(configured);
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&directory)?;

        let file_name = path.file_name().unwrap_or_default();
        let appender = tracing_appender::rolling::never(&directory, file_name);
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        guard = Some(file_guard);

        let layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false); // No ANSI in files

        layers.push(match config.format {
            LogFormat::Pretty => layer.with_filter(config.filter()).boxed(),
            LogFormat::Json => layer
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_filter(config.filter())
                .boxed(),
        });
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;

    Ok(guard)
}

fn console_layer(config: &LogConfig) -> BoxedLayer
{
    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_thread_names(true)
        .with_timer(ChronoUtc::rfc_3339());

    match config.format {
        LogFormat::Pretty => layer.with_ansi(true).with_filter(config.filter()).boxed(),
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(config.filter())
            .boxed(),
    }
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// A global subscriber could not be installed
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}

#[cfg(test)]
mod tests
{
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String>
    {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_log_format_from_str()
    {
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str(" text ").unwrap(), LogFormat::Pretty);
        assert!(matches!(LogFormat::from_str("xml"), Err(LoggingError::InvalidFormat(_))));
    }

    #[test]
    fn test_log_level_from_str()
    {
        assert_eq!(LogLevel::from_str("error").unwrap(), LogLevel::Error);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("dbg").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
        assert!(matches!(LogLevel::from_str("loud"), Err(LoggingError::InvalidLevel(_))));
    }

    #[test]
    fn test_log_level_to_tracing_level()
    {
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
    }

    #[test]
    fn test_config_defaults()
    {
        let config = LogConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn test_config_reads_variables()
    {
        let config = LogConfig::from_lookup(lookup(&[(FORMAT_ENV, "json"), (FILE_ENV, "/tmp/stacklens.log")])).unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file, Some(PathBuf::from("/tmp/stacklens.log")));
    }

    #[test]
    fn test_config_ignores_empty_values()
    {
        let config = LogConfig::from_lookup(lookup(&[(FORMAT_ENV, ""), (FILE_ENV, "  ")])).unwrap();
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn test_config_rejects_unknown_format()
    {
        let result = LogConfig::from_lookup(lookup(&[(FORMAT_ENV, "yaml")]));
        assert!(matches!(result, Err(LoggingError::InvalidFormat(_))));
    }

    #[test]
    fn test_with_level_keeps_existing_when_none()
    {
        let config = LogConfig::default().with_level(Some(LogLevel::Debug)).with_level(None);
        assert_eq!(config.level, Some(LogLevel::Debug));
    }

    #[test]
    fn test_log_file_path_for_directory_is_dated()
    {
        let path = log_file_path(&env::temp_dir());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("-stacklens.log"));
        assert_eq!(path.parent(), Some(env::temp_dir().as_path()));
    }

    #[test]
    fn test_log_file_path_for_file_is_unchanged()
    {
        let path = PathBuf::from("/nonexistent/dir/stacklens.log");
        assert_eq!(log_file_path(&path), path);
    }
}
