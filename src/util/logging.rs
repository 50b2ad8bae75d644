//! Structured logging setup for xambuild
//!
//! Logs go to stderr so that stdout stays reserved for command output.
//! Output lines of the supervised build tools are logged under the
//! `xambuild::tool` target and can be silenced separately, e.g.
//! `RUST_LOG=xambuild::tool=warn`.
//!
//! ```no_run
//! use xambuild::util::logging;
//!
//! logging::init_from_env();
//! tracing::info!(solution = "App.sln", "Analyzing solution");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for the `xambuild` targets
    pub level: Level,

    /// One JSON object per event instead of console lines
    pub use_json: bool,

    /// Include the module target (e.g. `xambuild::supervisor`) in logs
    pub include_target: bool,

    pub include_location: bool,

    pub include_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
            include_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Level selection for the command line: an explicit `--log-level` wins,
    /// then `-v`/`-q`, then `XAMBUILD_LOG_LEVEL`.
    pub fn from_cli(log_level: Option<&str>, verbose: bool, quiet: bool) -> Self {
        let level = match log_level {
            Some(level) => parse_level(level),
            None if verbose => Level::DEBUG,
            None if quiet => Level::ERROR,
            None => level_from_env(),
        };

        Self {
            level,
            use_json: json_from_env(),
            ..Default::default()
        }
    }
}

/// Parses a level name case-insensitively, falling back to INFO
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

fn level_from_env() -> Level {
    env::var("XAMBUILD_LOG_LEVEL")
        .map(|level| parse_level(&level))
        .unwrap_or(Level::INFO)
}

fn json_from_env() -> bool {
    env::var("XAMBUILD_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false)
}

/// Installs the global subscriber; only the first call has any effect
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut filter = EnvFilter::from_default_env();
        if env::var("RUST_LOG").is_err() {
            if let Ok(directive) = format!("xambuild={}", config.level).parse() {
                filter = filter.add_directive(directive);
            }
        }

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    });
}

pub fn init_default() {
    init_logging(LoggingConfig::default());
}

/// Reads `XAMBUILD_LOG_LEVEL` and `XAMBUILD_LOG_JSON`
pub fn init_from_env() {
    init_logging(LoggingConfig {
        level: level_from_env(),
        use_json: json_from_env(),
        ..Default::default()
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("Debug"), Level::DEBUG);
        assert_eq!(parse_level("INFO"), Level::INFO);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("error"), Level::ERROR);
    }

    #[test]
    fn test_parse_level_invalid() {
        assert_eq!(parse_level("verbose"), Level::INFO);
        assert_eq!(parse_level(""), Level::INFO);
    }

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.use_json);
        assert!(config.include_target);
    }

    #[test]
    #[serial]
    fn test_cli_level_precedence() {
        env::set_var("XAMBUILD_LOG_LEVEL", "warn");

        assert_eq!(
            LoggingConfig::from_cli(Some("trace"), true, false).level,
            Level::TRACE
        );
        assert_eq!(LoggingConfig::from_cli(None, true, false).level, Level::DEBUG);
        assert_eq!(LoggingConfig::from_cli(None, false, true).level, Level::ERROR);
        assert_eq!(LoggingConfig::from_cli(None, false, false).level, Level::WARN);

        env::remove_var("XAMBUILD_LOG_LEVEL");
        assert_eq!(LoggingConfig::from_cli(None, false, false).level, Level::INFO);
    }

    #[test]
    #[serial]
    fn test_json_from_env() {
        env::set_var("XAMBUILD_LOG_JSON", "true");
        assert!(LoggingConfig::from_cli(None, false, false).use_json);

        env::set_var("XAMBUILD_LOG_JSON", "yes");
        assert!(!LoggingConfig::from_cli(None, false, false).use_json);

        env::remove_var("XAMBUILD_LOG_JSON");
    }
}
