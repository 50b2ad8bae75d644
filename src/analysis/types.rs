//! Solution and project model produced by analysis

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Platform API a project builds against, taken from its assembly references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Api {
    Ios,
    Android,
    #[serde(rename = "uitest")]
    UiTest,
}

impl Api {
    pub fn as_str(&self) -> &'static str {
        match self {
            Api::Ios => "ios",
            Api::Android => "android",
            Api::UiTest => "uitest",
        }
    }

    /// Filter used when the caller does not restrict project types
    pub fn default_filter() -> Vec<Api> {
        vec![Api::Ios, Api::Android]
    }
}

impl fmt::Display for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Api {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ios" => Ok(Api::Ios),
            "android" => Ok(Api::Android),
            "uitest" => Ok(Api::UiTest),
            other => Err(format!(
                "Invalid project type: {}. Valid options: ios, android, uitest",
                other
            )),
        }
    }
}

/// Build properties of one project-local `Config|Platform`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigProperties {
    /// Relative output directory with forward slashes and no trailing slash
    pub output_path: Option<String>,
    pub ipa_package: bool,
    pub build_ipa: bool,
    pub sign_android: bool,
    pub mtouch_architectures: Vec<String>,
}

impl ConfigProperties {
    /// True when every configured architecture is a device (`arm*`) target.
    /// An empty list says nothing about the target.
    pub fn targets_device(&self) -> bool {
        !self.mtouch_architectures.is_empty()
            && self
                .mtouch_architectures
                .iter()
                .all(|arch| arch.to_lowercase().starts_with("arm"))
    }

    /// Whether an iOS build of this configuration should produce an archive.
    ///
    /// Device-only architectures, an `IpaPackageName` or `BuildIpa` each
    /// independently select archiving.
    pub fn wants_archive(&self) -> bool {
        self.targets_device() || self.ipa_package || self.build_ipa
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    /// Lowercased `<OutputType>`, e.g. "exe" or "library"
    pub output_type: Option<String>,
    pub assembly_name: Option<String>,
    pub api: Option<Api>,
    pub android_application: bool,
    /// Solution `Config|Platform` to project-local `Config|Platform`
    pub mappings: BTreeMap<String, String>,
    /// Project-local `Config|Platform` to its properties
    pub configs: BTreeMap<String, ConfigProperties>,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            path: path.into(),
            output_type: None,
            assembly_name: None,
            api: None,
            android_application: false,
            mappings: BTreeMap::new(),
            configs: BTreeMap::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn is_executable(&self) -> bool {
        self.output_type.as_deref() == Some("exe")
    }

    /// Whether the project produces something the planner can act on:
    /// an iOS executable or an android application.
    pub fn is_application(&self) -> bool {
        match self.api {
            Some(Api::Ios) => self.is_executable(),
            Some(Api::Android) => self.android_application,
            _ => false,
        }
    }

    pub fn mapped_config(&self, solution_config: &str) -> Option<&str> {
        self.mappings.get(solution_config).map(String::as_str)
    }

    pub fn config(&self, mapped_config: &str) -> Option<&ConfigProperties> {
        self.configs.get(mapped_config)
    }

    /// Absolute output directory of a project-local configuration
    pub fn output_dir(&self, mapped_config: &str) -> Option<PathBuf> {
        self.config(mapped_config)?
            .output_path
            .as_deref()
            .map(|relative| self.directory().join(relative))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub path: PathBuf,
    pub base_directory: PathBuf,
    pub projects: Vec<Project>,
    /// Solution-level `Config|Platform` entries, informational only
    pub configurations: Vec<String>,
    /// Referenced project files that were missing on disk
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_references: Vec<PathBuf>,
}

impl Solution {
    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }
}

/// Builds the `Config|Platform` key used by every lookup table.
///
/// The platform loses all whitespace, so `"Release", " Any CPU"` becomes
/// `"Release|AnyCPU"`. Trimming the configuration only drops the padding the
/// `[^|]*` captures pick up around the `|`; inner whitespace is kept.
pub fn config_key(config: &str, platform: &str) -> String {
    let platform: String = platform.chars().filter(|c| !c.is_whitespace()).collect();
    format!("{}|{}", config.trim(), platform)
}

/// Splits a `Config|Platform` key back into its two parts
pub fn split_config_key(key: &str) -> (&str, &str) {
    key.split_once('|').unwrap_or((key, ""))
}
