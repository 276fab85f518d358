use std::cmp::Ordering;
use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static LOGGING_INIT: Once = Once::new();

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn severity(&self) -> u8 {
        match self {
            LogLevel::Error => 0,
            LogLevel::Warn => 1,
            LogLevel::Info => 2,
            LogLevel::Debug => 3,
            LogLevel::Trace => 4,
        }
    }
}

impl PartialOrd for LogLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LogLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher severity = lower number
        self.severity().cmp(&other.severity())
    }
}

impl From<Level> for LogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::ERROR => LogLevel::Error,
            Level::WARN => LogLevel::Warn,
            Level::INFO => LogLevel::Info,
            Level::DEBUG => LogLevel::Debug,
            Level::TRACE => LogLevel::Trace,
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// Output format of log lines
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

/// Logging section of the configuration file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` does not say otherwise
    pub level: LogLevel,
    pub format: LogFormat,
    /// Colored output
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::default(),
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// Level actually used, `verbose` forces at least DEBUG
    pub fn effective_level(&self, verbose: bool) -> LogLevel {
        if verbose {
            self.level.max(LogLevel::Debug)
        } else {
            self.level
        }
    }
}

/// Filter for the global subscriber.
///
/// `directives` (normally `RUST_LOG`) win over the configured level, which
/// only applies when they are absent. `verbose` adds an explicit `debug`
/// directive unless the directives already ask for more.
pub fn build_filter(config: &LoggingConfig, verbose: bool, directives: Option<&str>) -> EnvFilter {
    let level: Level = config.effective_level(verbose).into();
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(directives.unwrap_or_default());

    let below_debug = filter
        .max_level_hint()
        .map_or(true, |hint| hint < LevelFilter::DEBUG);
    if verbose && below_debug {
        filter.add_directive(LevelFilter::DEBUG.into())
    } else {
        filter
    }
}

/// Install the global subscriber. Logs go to stderr so stdout only carries
/// the report. Later calls are no-ops.
pub fn init_logging(config: &LoggingConfig, verbose: bool) {
    LOGGING_INIT.call_once(|| {
        let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
        let builder = tracing_subscriber::fmt()
            .with_env_filter(build_filter(config, verbose, directives.as_deref()))
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(config.ansi);

        let _ = match config.format {
            LogFormat::Pretty => builder.pretty().try_init(),
            LogFormat::Compact => builder.compact().try_init(),
            LogFormat::Json => builder.json().try_init(),
        };
    });
}
