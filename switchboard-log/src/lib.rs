//! Switchboard Logging
//!
//! Installs a `tracing` subscriber configured from `SWITCHBOARD_*`
//! environment variables. Every Switchboard crate logs through `tracing`;
//! this crate only decides where those events go.
//!
//! # Usage
//!
//! ```rust
//! // Reads the environment; a second call is a no-op.
//! switchboard_log::init();
//! tracing::info!(switch = "checkout", "Switch saved");
//! ```
//!
//! # Environment Variables
//!
//! - `SWITCHBOARD_DEBUG=1` - Enable debug logging
//! - `SWITCHBOARD_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `SWITCHBOARD_LOG_FORMAT=pretty|compact|json` - Set output format
//! - `SWITCHBOARD_LOG_COLOR=1|0` - Enable/disable colors
//! - `RUST_LOG` - Full filter directives, overriding the level

use std::env;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::TryInitError;

// ============================================================================
// Log Levels
// ============================================================================

/// Minimum severity to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl Level {
    /// Get level from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Filter directive for this level
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line human readable output
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for structured logging
    Json,
}

impl Format {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether colors are enabled
    pub color: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            color: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |name: &str| {
            lookup(name).map(|v| {
                let v = v.trim().to_lowercase();
                v == "1" || v == "true"
            })
        };

        let debug = flag("SWITCHBOARD_DEBUG").unwrap_or(false);

        let level = lookup("SWITCHBOARD_LOG_LEVEL")
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = lookup("SWITCHBOARD_LOG_FORMAT")
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Json);

        let color = flag("SWITCHBOARD_LOG_COLOR")
            .unwrap_or_else(|| lookup("NO_COLOR").is_none() && lookup("TERM").is_some());

        Self {
            debug,
            level,
            format,
            color,
        }
    }

    /// Use the given level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Use the given format
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// `RUST_LOG` when set, otherwise the configured level.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Install the global subscriber from the environment.
///
/// Returns `false` when a subscriber was already installed.
pub fn init() -> bool {
    init_with(LogConfig::from_env())
}

/// Install the global subscriber from an explicit configuration.
///
/// Returns `false` when a subscriber was already installed.
pub fn init_with(config: LogConfig) -> bool {
    match try_init(&config) {
        Ok(()) => {
            tracing::debug!(level = %config.level, format = ?config.format, "Logging initialized");
            true
        }
        Err(err) => {
            tracing::debug!(error = %err, "Logging already initialized");
            false
        }
    }
}

fn try_init(config: &LogConfig) -> Result<(), TryInitError> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::fmt;

    let registry = tracing_subscriber::registry().with(config.filter());

    match config.format {
        Format::Json => registry.with(fmt::layer().json()).try_init(),
        Format::Compact => registry
            .with(fmt::layer().compact().with_ansi(config.color))
            .try_init(),
        Format::Pretty => registry
            .with(fmt::layer().pretty().with_ansi(config.color))
            .try_init(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> LogConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Off);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse("DEBUG"), Some(Level::Debug));
        assert_eq!(Level::parse("warning"), Some(Level::Warn));
        assert_eq!(Level::parse("invalid"), None);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(Format::parse("pretty"), Some(Format::Pretty));
        assert_eq!(Format::parse("Compact"), Some(Format::Compact));
        assert_eq!(Format::parse("xml"), None);
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert!(!config.debug);
        assert_eq!(config.level, Level::Info);
        assert_eq!(config.format, Format::Json);
        assert!(!config.color);
    }

    #[test]
    fn test_debug_flag_lowers_level() {
        let config = config_from(&[("SWITCHBOARD_DEBUG", "true")]);
        assert!(config.debug);
        assert_eq!(config.level, Level::Debug);

        let config = config_from(&[("SWITCHBOARD_DEBUG", "1"), ("SWITCHBOARD_LOG_LEVEL", "warn")]);
        assert_eq!(config.level, Level::Warn);
    }

    #[test]
    fn test_format_and_color() {
        let config = config_from(&[
            ("SWITCHBOARD_LOG_FORMAT", "compact"),
            ("TERM", "xterm"),
        ]);
        assert_eq!(config.format, Format::Compact);
        assert!(config.color);

        let config = config_from(&[("TERM", "xterm"), ("SWITCHBOARD_LOG_COLOR", "0")]);
        assert!(!config.color);
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = LogConfig::default().with_level(Level::Off);
        init_with(config.clone());

        assert!(!init_with(config));
    }
}
