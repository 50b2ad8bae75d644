//! Configuration management for xambuild
//!
//! Settings are loaded from environment variables with sensible defaults.
//!
//! # Environment Variables
//!
//! - `XAMBUILD_MDTOOL_PATH`: IDE build tool - default: Xamarin Studio's bundled `mdtool`
//! - `XAMBUILD_XBUILD_PATH`: MSBuild-compatible tool used for android packaging
//! - `XAMBUILD_ARCHIVE_DIR`: Xcode archive root - default: `~/Library/Developer/Xcode/Archives`
//! - `XAMBUILD_STALL_MARKER`: output line that arms the hang timer - default: "Loading projects"
//! - `XAMBUILD_GRACE_TIMEOUT`: seconds of silence after the marker before interrupting - default: "300"
//! - `XAMBUILD_FORCE_TIMEOUT`: seconds after the interrupt before killing - default: "60"
//! - `XAMBUILD_RETRY_ON_HANG`: retry a hung action once (true|false) - default: "true"
//! - `XAMBUILD_LOG_LEVEL`: Logging level - default: "info"

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MDTOOL_PATH: &str = "/Applications/Xamarin Studio.app/Contents/MacOS/mdtool";
const DEFAULT_XBUILD_PATH: &str = "/Library/Frameworks/Mono.framework/Commands/xbuild";
const DEFAULT_STALL_MARKER: &str = "Loading projects";
const DEFAULT_GRACE_TIMEOUT_SECS: u64 = 300;
const DEFAULT_FORCE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_RETRY_ON_HANG: bool = true;
const DEFAULT_LOG_LEVEL: &str = "info";
const MAX_GRACE_TIMEOUT_SECS: u64 = 3600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

#[derive(Debug, Clone)]
pub struct XambuildConfig {
    pub mdtool_path: PathBuf,
    pub xbuild_path: PathBuf,
    pub archive_dir: PathBuf,
    pub stall_marker: String,
    pub grace_timeout_secs: u64,
    pub force_timeout_secs: u64,
    pub retry_on_hang: bool,
    pub log_level: String,
}

impl Default for XambuildConfig {
    fn default() -> Self {
        let mdtool_path = env::var("XAMBUILD_MDTOOL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_MDTOOL_PATH));

        let xbuild_path = env::var("XAMBUILD_XBUILD_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_XBUILD_PATH));

        let archive_dir = env::var("XAMBUILD_ARCHIVE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_archive_dir());

        let stall_marker =
            env::var("XAMBUILD_STALL_MARKER").unwrap_or_else(|_| DEFAULT_STALL_MARKER.to_string());

        let grace_timeout_secs = env::var("XAMBUILD_GRACE_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_GRACE_TIMEOUT_SECS);

        let force_timeout_secs = env::var("XAMBUILD_FORCE_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_FORCE_TIMEOUT_SECS);

        let retry_on_hang = env::var("XAMBUILD_RETRY_ON_HANG")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(DEFAULT_RETRY_ON_HANG);

        let log_level = env::var("XAMBUILD_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            mdtool_path,
            xbuild_path,
            archive_dir,
            stall_marker,
            grace_timeout_secs,
            force_timeout_secs,
            retry_on_hang,
            log_level,
        }
    }
}

/// Per-user archive directory Xcode writes `.xcarchive` bundles into
fn default_archive_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("~"))
        .join("Library/Developer/Xcode/Archives")
}

impl XambuildConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grace_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Grace timeout must be at least 1 second".to_string(),
            ));
        }
        if self.grace_timeout_secs > MAX_GRACE_TIMEOUT_SECS {
            return Err(ConfigError::ValidationFailed(format!(
                "Grace timeout cannot exceed {} seconds",
                MAX_GRACE_TIMEOUT_SECS
            )));
        }
        if self.force_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Force timeout must be at least 1 second".to_string(),
            ));
        }

        if self.stall_marker.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Stall marker cannot be empty".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn grace_timeout(&self) -> Duration {
        Duration::from_secs(self.grace_timeout_secs)
    }

    pub fn force_timeout(&self) -> Duration {
        Duration::from_secs(self.force_timeout_secs)
    }
}

impl fmt::Display for XambuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Xambuild Configuration:")?;
        writeln!(f, "  mdtool: {}", self.mdtool_path.display())?;
        writeln!(f, "  xbuild: {}", self.xbuild_path.display())?;
        writeln!(f, "  Archive Dir: {}", self.archive_dir.display())?;
        writeln!(f, "  Stall Marker: {}", self.stall_marker)?;
        writeln!(f, "  Grace Timeout: {}s", self.grace_timeout_secs)?;
        writeln!(f, "  Force Timeout: {}s", self.force_timeout_secs)?;
        writeln!(f, "  Retry On Hang: {}", self.retry_on_hang)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
