//! Summary of a test-runner log
//!
//! Only the `Tests run: N Passed: N ... Failed: N` lines are interpreted.
//! Everything else is echoed and otherwise ignored.

use super::BuildError;
use crate::fs::FileSystem;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::info;

const SUMMARY_PREFIX: &str = "Tests run";

fn counter_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"([A-Za-z]+): ([0-9]+)").expect("test counter pattern is valid"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestLogSummary {
    /// Counter name (`run`, `Passed`, `Failed`, ...) to its value; later
    /// summary lines overwrite earlier ones
    pub counts: BTreeMap<String, u64>,
}

impl TestLogSummary {
    pub fn from_file(fs: &dyn FileSystem, path: &Path) -> Result<Self, BuildError> {
        if !fs.is_file(path) {
            return Err(BuildError::TestLogMissing(path.to_path_buf()));
        }

        let content = fs
            .read_to_string(path)
            .map_err(|e| BuildError::TestLogRead {
                path: path.to_path_buf(),
                reason: format!("{:#}", e),
            })?;

        for line in content.lines() {
            info!(target: "xambuild::tool", "{}", line);
        }

        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let mut counts = BTreeMap::new();

        for line in content.lines().filter(|l| l.starts_with(SUMMARY_PREFIX)) {
            for captures in counter_regex().captures_iter(line) {
                if let Ok(value) = captures[2].parse::<u64>() {
                    counts.insert(captures[1].to_string(), value);
                }
            }
        }

        Self { counts }
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.counts.get(name).copied()
    }

    pub fn failed(&self) -> Option<u64> {
        self.get("Failed")
    }

    /// A log without a `Failed` counter is not a success
    pub fn is_success(&self) -> bool {
        self.failed() == Some(0)
    }
}
