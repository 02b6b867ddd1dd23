//! Structured logging using tracing.
//!
//! Log events go to two places:
//! - stderr, human readable, filtered by `RUST_LOG` when set
//! - a JSON log file, rotated and pruned by `tracing-appender`
//!
//! Playlist output itself goes to stdout, so logs never mix with it.

use std::path::PathBuf;

use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Logging configuration options.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory where log files are stored.
    pub log_directory: PathBuf,
    /// Log file name prefix (e.g., "relpm" -> "relpm.2024-01-15.log").
    pub log_file_prefix: String,
    /// Maximum log level for console output.
    pub console_level: Level,
    /// Maximum log level for file output.
    pub file_level: Level,
    /// How often to rotate log files.
    pub rotation: LogRotation,
    /// Number of rotated files to keep (0 = keep forever).
    pub max_log_files: usize,
    /// Whether to include file/line info in console logs.
    pub include_file_line: bool,
    /// Whether to log span events (enter/exit).
    pub log_span_events: bool,
}

/// Log rotation frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    /// Create a new log file every hour.
    Hourly,
    /// Create a new log file every day.
    Daily,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Hourly => Self::HOURLY,
            LogRotation::Daily => Self::DAILY,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LoggingConfig {
    /// Verbose logging, selected by `--verbose`.
    #[must_use]
    pub fn development() -> Self {
        Self {
            log_directory: default_log_directory(),
            log_file_prefix: "relpm".to_string(),
            console_level: Level::DEBUG,
            file_level: Level::TRACE,
            rotation: LogRotation::Hourly,
            max_log_files: 24,
            include_file_line: true,
            log_span_events: true,
        }
    }

    /// Quiet console, informative log file.
    #[must_use]
    pub fn production() -> Self {
        Self {
            log_directory: default_log_directory(),
            log_file_prefix: "relpm".to_string(),
            console_level: Level::WARN,
            file_level: Level::DEBUG,
            rotation: LogRotation::Daily,
            max_log_files: 7,
            include_file_line: false,
            log_span_events: false,
        }
    }

    /// Set the log directory.
    #[must_use]
    pub fn with_log_directory(mut self, path: PathBuf) -> Self {
        self.log_directory = path;
        self
    }
}

/// Guard that keeps file logging active. Drop this to flush and close log files.
#[derive(Debug)]
pub struct LoggingGuard {
    _file_guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Initialize the logging system with the given configuration.
///
/// Returns a guard that must be kept alive for the duration of the program.
/// When the guard is dropped, any pending log entries are flushed to disk.
///
/// # Errors
///
/// Returns an error if the log directory or file appender cannot be set up,
/// or if a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    if !config.log_directory.exists() {
        std::fs::create_dir_all(&config.log_directory).map_err(|e| {
            LoggingError::DirectoryCreationFailed {
                path: config.log_directory.clone(),
                reason: e.to_string(),
            }
        })?;
    }

    let file_appender = RollingFileAppender::builder()
        .rotation(config.rotation.into())
        .filename_prefix(&config.log_file_prefix)
        .filename_suffix("log")
        .max_log_files(config.max_log_files.max(1))
        .build(&config.log_directory)
        .map_err(|e| LoggingError::AppenderFailed(e.to_string()))?;

    let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

    // RUST_LOG overrides the console filter.
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(crate_directives(config.console_level)))
        .map_err(|e| LoggingError::InvalidFilter(e.to_string()))?;

    let file_filter = EnvFilter::try_new(crate_directives(config.file_level))
        .map_err(|e| LoggingError::InvalidFilter(e.to_string()))?;

    let span_events = if config.log_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.include_file_line)
        .with_file(config.include_file_line)
        .with_line_number(config.include_file_line)
        .with_span_events(span_events.clone())
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .json()
        .with_filter(file_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Get the default log directory.
#[must_use]
pub fn default_log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("relpm")
        .join("logs")
}

/// Filter directives: warnings from dependencies, `level` for our crates.
fn crate_directives(level: Level) -> String {
    let level = level_to_directive(level);
    format!("warn,relpm={level},relpm_core={level}")
}

/// Convert a tracing Level to a filter directive string.
const fn level_to_directive(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Errors that can occur during logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Failed to create the log directory.
    #[error("Failed to create log directory {path}: {reason}")]
    DirectoryCreationFailed {
        /// The path that could not be created.
        path: PathBuf,
        /// The reason for the failure.
        reason: String,
    },

    /// The rolling file appender could not be built.
    #[error("Failed to open log file: {0}")]
    AppenderFailed(String),

    /// A filter directive did not parse.
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    /// Another subscriber was installed first.
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}
