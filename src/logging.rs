//! File logging for the EasyTL client.
//!
//! Diagnostics go to a daily rotated file under the XDG data directory
//! (`~/.local/share/easytl/logs/` on Linux), keeping stdout free for the
//! translation itself. The `EASYTL_LOG` environment variable overrides the
//! configured level with a full `tracing` filter directive.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer as _;

/// Environment variable holding a filter directive, e.g. `easytl=trace`.
pub const LOG_ENV_VAR: &str = "EASYTL_LOG";

/// Logging configuration, the `[logging]` table of the config file.
///
/// # Example
///
/// ```rust
/// use easytl::logging::{LogLevel, LoggingConfig};
///
/// let config = LoggingConfig::new()
///     .with_log_dir("/tmp/easytl-logs")
///     .with_level(LogLevel::Debug);
///
/// assert!(config.enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether file logging is enabled
    pub enabled: bool,
    /// Log file stem; files are named `{file_name}.log.YYYY-MM-DD`
    pub file_name: String,
    /// Custom log directory, XDG data dir + `easytl/logs` when unset
    pub log_dir: Option<PathBuf>,
    /// Level filter
    pub level: LogLevel,
    /// Mirror warnings and errors to stderr
    pub stderr: bool,
}

impl LoggingConfig {
    /// Creates a LoggingConfig with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a disabled logging configuration.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Sets a custom log directory.
    #[must_use]
    pub fn with_log_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(path.into());
        self
    }

    /// Sets the level filter.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Enables or disables the stderr mirror.
    #[must_use]
    pub fn with_stderr(mut self, stderr: bool) -> Self {
        self.stderr = stderr;
        self
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file_name: "easytl".to_string(),
            log_dir: None,
            level: LogLevel::default(),
            stderr: false,
        }
    }
}

/// Log level filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose
    Trace,
    /// Frame-level detail
    Debug,
    /// Session lifecycle
    #[default]
    Info,
    /// Skipped frames and recoverable problems
    Warn,
    /// Failures only
    Error,
}

impl LogLevel {
    /// Converts to a tracing_subscriber LevelFilter.
    #[must_use]
    pub fn to_filter(self) -> LevelFilter {
        match self {
            Self::Trace => LevelFilter::TRACE,
            Self::Debug => LevelFilter::DEBUG,
            Self::Info => LevelFilter::INFO,
            Self::Warn => LevelFilter::WARN,
            Self::Error => LevelFilter::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(LoggingError::unknown_level(other)),
        }
    }
}

/// Keeps the non-blocking file writer alive; pending lines flush on drop.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

impl fmt::Debug for LoggingGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingGuard").finish_non_exhaustive()
    }
}

static LOGGING_GUARD: OnceLock<LoggingGuard> = OnceLock::new();

/// Errors that can occur during logging initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingError {
    /// The specific error that occurred
    pub kind: LoggingErrorKind,
}

/// Specific logging error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingErrorKind {
    /// No XDG data directory and no custom log_dir
    NoDataDir,
    /// The log directory could not be created
    CreateDirFailed {
        /// The path that could not be created
        path: PathBuf,
        /// The reason for failure
        reason: String,
    },
    /// A global subscriber was already installed
    SubscriberInitFailed {
        /// The reason for failure
        reason: String,
    },
    /// A level name that is not one of trace/debug/info/warn/error
    UnknownLevel {
        /// The rejected input
        level: String,
    },
}

impl LoggingError {
    /// Creates a new LoggingError with the given kind.
    #[must_use]
    pub fn new(kind: LoggingErrorKind) -> Self {
        Self { kind }
    }

    /// Creates an error for a missing XDG data directory.
    #[must_use]
    pub fn no_data_dir() -> Self {
        Self::new(LoggingErrorKind::NoDataDir)
    }

    /// Creates an error for failed directory creation.
    #[must_use]
    pub fn create_dir_failed(path: PathBuf, reason: impl Into<String>) -> Self {
        Self::new(LoggingErrorKind::CreateDirFailed {
            path,
            reason: reason.into(),
        })
    }

    /// Creates an error for subscriber initialization failure.
    #[must_use]
    pub fn subscriber_init_failed(reason: impl Into<String>) -> Self {
        Self::new(LoggingErrorKind::SubscriberInitFailed {
            reason: reason.into(),
        })
    }

    /// Creates an error for an unrecognized level name.
    #[must_use]
    pub fn unknown_level(level: impl Into<String>) -> Self {
        Self::new(LoggingErrorKind::UnknownLevel {
            level: level.into(),
        })
    }

    /// Returns true if this is a missing data directory error.
    #[must_use]
    pub fn is_no_data_dir(&self) -> bool {
        matches!(self.kind, LoggingErrorKind::NoDataDir)
    }
}

impl fmt::Display for LoggingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LoggingErrorKind::NoDataDir => write!(
                f,
                "could not determine XDG data directory; \
                 set XDG_DATA_HOME or configure logging.log_dir"
            ),
            LoggingErrorKind::CreateDirFailed { path, reason } => write!(
                f,
                "failed to create log directory '{}': {}; check permissions",
                path.display(),
                reason
            ),
            LoggingErrorKind::SubscriberInitFailed { reason } => write!(
                f,
                "failed to initialize tracing subscriber: {}; \
                 a subscriber may already be set",
                reason
            ),
            LoggingErrorKind::UnknownLevel { level } => write!(
                f,
                "unknown log level '{}'; expected trace, debug, info, warn, or error",
                level
            ),
        }
    }
}

impl std::error::Error for LoggingError {}

fn resolve_log_dir(config: &LoggingConfig) -> Result<PathBuf, LoggingError> {
    if let Some(ref custom_dir) = config.log_dir {
        return Ok(custom_dir.clone());
    }

    dirs::data_local_dir()
        .map(|dir| dir.join("easytl").join("logs"))
        .ok_or_else(LoggingError::no_data_dir)
}

fn build_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.to_filter().into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy()
}

/// Initializes file logging with the given configuration.
///
/// Returns `Ok(None)` when logging is disabled. The returned guard must be
/// held for as long as logging should stay active.
///
/// # Errors
///
/// Fails if the log directory cannot be resolved or created, or if a global
/// subscriber is already installed.
pub fn init_file_logging(config: &LoggingConfig) -> Result<Option<LoggingGuard>, LoggingError> {
    if !config.enabled {
        return Ok(None);
    }

    let log_dir = resolve_log_dir(config)?;
    std::fs::create_dir_all(&log_dir)
        .map_err(|e| LoggingError::create_dir_failed(log_dir.clone(), e.to_string()))?;

    let file_appender =
        tracing_appender::rolling::daily(&log_dir, format!("{}.log", config.file_name));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = config.stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .with_filter(LevelFilter::WARN)
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false)
                .with_filter(build_filter(config.level)),
        )
        .with(stderr_layer)
        .try_init()
        .map_err(|e| LoggingError::subscriber_init_failed(e.to_string()))?;

    Ok(Some(LoggingGuard { _guard: guard }))
}

/// Initializes file logging once per process and keeps the guard in a
/// global.
///
/// Returns `Ok(false)` when logging is disabled or already initialized.
///
/// # Errors
///
/// See [`init_file_logging`].
pub fn init_and_store_logging(config: &LoggingConfig) -> Result<bool, LoggingError> {
    if LOGGING_GUARD.get().is_some() {
        return Ok(false);
    }

    match init_file_logging(config)? {
        Some(guard) => {
            // A concurrent initializer may have won; its guard is the one kept.
            let _ = LOGGING_GUARD.set(guard);
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Returns the directory logs are written to for `config`.
///
/// # Errors
///
/// Fails when no custom directory is set and the XDG data dir is unknown.
pub fn get_log_dir(config: &LoggingConfig) -> Result<PathBuf, LoggingError> {
    resolve_log_dir(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = LoggingConfig::default();
        assert!(config.enabled);
        assert_eq!(config.file_name, "easytl");
        assert!(config.log_dir.is_none());
        assert_eq!(config.level, LogLevel::Info);
        assert!(!config.stderr);
        assert_eq!(LoggingConfig::new(), config);
    }

    #[test]
    fn builder_methods() {
        let config = LoggingConfig::new()
            .with_log_dir("/tmp/logs")
            .with_level(LogLevel::Debug)
            .with_stderr(true);

        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/logs")));
        assert_eq!(config.level, LogLevel::Debug);
        assert!(config.stderr);
    }

    #[test]
    fn level_parsing() {
        assert_eq!("TRACE".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert_eq!(" warning ".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        let err = "loud".parse::<LogLevel>().unwrap_err();
        assert!(err.to_string().contains("loud"));
    }

    #[test]
    fn level_to_filter_mapping() {
        assert_eq!(LogLevel::Trace.to_filter(), LevelFilter::TRACE);
        assert_eq!(LogLevel::Info.to_filter(), LevelFilter::INFO);
        assert_eq!(LogLevel::Error.to_filter(), LevelFilter::ERROR);
    }

    #[test]
    fn partial_toml_table_fills_defaults() {
        let config: LoggingConfig = toml::from_str("level = \"debug\"").unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert!(config.enabled);
        assert_eq!(config.file_name, "easytl");
    }

    #[test]
    fn error_display() {
        let error = LoggingError::no_data_dir();
        assert!(error.is_no_data_dir());
        assert!(error.to_string().contains("XDG"));

        let error = LoggingError::create_dir_failed(PathBuf::from("/nonexistent"), "denied");
        assert!(error.to_string().contains("/nonexistent"));
        assert_ne!(error, LoggingError::no_data_dir());
    }

    #[test]
    fn resolve_log_dir_prefers_custom() {
        let config = LoggingConfig::default().with_log_dir("/custom/logs");
        assert_eq!(
            resolve_log_dir(&config).unwrap(),
            PathBuf::from("/custom/logs")
        );
    }

    #[test]
    fn resolve_log_dir_falls_back_to_xdg() {
        if let Ok(resolved) = get_log_dir(&LoggingConfig::default()) {
            assert!(resolved.ends_with("easytl/logs"));
        }
    }

    #[test]
    fn disabled_config_installs_nothing() {
        let result = init_file_logging(&LoggingConfig::disabled());
        assert!(result.unwrap().is_none());
        assert!(!init_and_store_logging(&LoggingConfig::disabled()).unwrap());
    }
}
