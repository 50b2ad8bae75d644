//! Artifact discovery after a plan has run
//!
//! Output directories are only read, never created. Missing artifacts are
//! reported as absence; only a missing archive root is an error.

use crate::analysis::{Api, ConfigProperties, Project, ProjectGraph};
use crate::fs::{DirEntry, FileSystem};
use chrono::NaiveDateTime;
use glob::Pattern;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::{debug, warn};

const ARCHIVE_TIMESTAMP_FORMAT: &str = "%m-%d-%y %I.%M %p";

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Archive directory does not exist: {}", .0.display())]
    ArchiveRootMissing(PathBuf),
    #[error("Failed to list {}: {reason}", .path.display())]
    Io { path: PathBuf, reason: String },
}

impl ArtifactError {
    fn io(path: &Path, err: anyhow::Error) -> Self {
        ArtifactError::Io {
            path: path.to_path_buf(),
            reason: format!("{:#}", err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    App,
    Xcarchive,
    Apk,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::App => "app",
            ArtifactKind::Xcarchive => "xcarchive",
            ArtifactKind::Apk => "apk",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectArtifacts {
    pub api: Api,
    pub artifacts: BTreeMap<ArtifactKind, PathBuf>,
}

/// Project name to the artifacts found for it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GeneratedFiles(BTreeMap<String, ProjectArtifacts>);

impl GeneratedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, project: &str, api: Api, artifact: Option<Artifact>) {
        let entry = self
            .0
            .entry(project.to_string())
            .or_insert_with(|| ProjectArtifacts {
                api,
                artifacts: BTreeMap::new(),
            });
        if let Some(artifact) = artifact {
            entry.artifacts.insert(artifact.kind, artifact.path);
        }
    }

    pub fn get(&self, project: &str) -> Option<&ProjectArtifacts> {
        self.0.get(project)
    }

    pub fn path(&self, project: &str, kind: ArtifactKind) -> Option<&Path> {
        self.get(project)?.artifacts.get(&kind).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ProjectArtifacts)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub struct ArtifactResolver {
    fs: Arc<dyn FileSystem>,
    archive_root: PathBuf,
}

impl ArtifactResolver {
    pub fn new(fs: Arc<dyn FileSystem>, archive_root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            archive_root: archive_root.into(),
        }
    }

    pub fn archive_root(&self) -> &Path {
        &self.archive_root
    }

    /// Locates the artifact a built project-local configuration produced
    pub fn resolve(&self, project: &Project, mapped: &str) -> Result<Option<Artifact>, ArtifactError> {
        let default_properties = ConfigProperties::default();
        let properties = project.config(mapped).unwrap_or(&default_properties);

        let artifact = match project.api {
            Some(Api::Ios) if properties.wants_archive() => self
                .latest_archive(&project.name)?
                .map(|path| Artifact {
                    kind: ArtifactKind::Xcarchive,
                    path,
                }),
            Some(Api::Ios) => self.app_bundle(project, mapped).map(|path| Artifact {
                kind: ArtifactKind::App,
                path,
            }),
            Some(Api::Android) => self.first_apk(project, mapped)?.map(|path| Artifact {
                kind: ArtifactKind::Apk,
                path,
            }),
            _ => None,
        };

        if artifact.is_none() {
            debug!(project = %project.name, configuration = mapped, "No artifact found");
        }

        Ok(artifact)
    }

    /// Resolves every in-scope application mapped for `configuration|platform`
    pub fn collect(
        &self,
        graph: &ProjectGraph,
        configuration: &str,
        platform: &str,
        filter: &[Api],
    ) -> Result<GeneratedFiles, ArtifactError> {
        let mut generated = GeneratedFiles::new();

        for (project, mapped) in graph.projects_for_configuration(configuration, platform) {
            let Some(api) = project.api.filter(|api| filter.contains(api)) else {
                continue;
            };
            if !project.is_application() {
                continue;
            }

            let artifact = self.resolve(project, mapped)?;
            generated.record(&project.name, api, artifact);
        }

        Ok(generated)
    }

    fn app_bundle(&self, project: &Project, mapped: &str) -> Option<PathBuf> {
        let assembly_name = project.assembly_name.as_deref()?;
        let path = project
            .output_dir(mapped)?
            .join(format!("{}.app", assembly_name));
        self.fs.exists(&path).then_some(path)
    }

    fn first_apk(&self, project: &Project, mapped: &str) -> Result<Option<PathBuf>, ArtifactError> {
        let Some(output_dir) = project.output_dir(mapped) else {
            return Ok(None);
        };
        if !self.fs.is_dir(&output_dir) {
            return Ok(None);
        }

        let entries = self
            .fs
            .list_matching(&output_dir, "*.apk")
            .map_err(|e| ArtifactError::io(&output_dir, e))?;

        Ok(entries
            .into_iter()
            .find(|entry| self.fs.is_file(entry.path()))
            .map(|entry| entry.path))
    }

    /// Newest `<project>*.xcarchive` under the archive root or one of its
    /// dated subdirectories
    fn latest_archive(&self, project_name: &str) -> Result<Option<PathBuf>, ArtifactError> {
        if !self.fs.is_dir(&self.archive_root) {
            return Err(ArtifactError::ArchiveRootMissing(self.archive_root.clone()));
        }

        let pattern = format!("{}*.xcarchive", Pattern::escape(project_name));
        let mut candidates = self.archives_in(&self.archive_root, &pattern)?;

        let subdirs = self
            .fs
            .read_dir(&self.archive_root)
            .map_err(|e| ArtifactError::io(&self.archive_root, e))?;
        let mut subdirs: Vec<DirEntry> = subdirs
            .into_iter()
            .filter(|entry| self.fs.is_dir(entry.path()) && !entry.name.ends_with(".xcarchive"))
            .collect();
        subdirs.sort_by(|a, b| a.name.cmp(&b.name));

        for dir in subdirs {
            candidates.extend(self.archives_in(dir.path(), &pattern)?);
        }

        Ok(select_latest(candidates))
    }

    fn archives_in(&self, dir: &Path, pattern: &str) -> Result<Vec<DirEntry>, ArtifactError> {
        self.fs
            .list_matching(dir, pattern)
            .map_err(|e| ArtifactError::io(dir, e))
    }
}

fn timestamp_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(\d{1,2}-\d{1,2}-\d{2}) (\d{1,2}\.\d{2} [AP]M)")
            .expect("archive timestamp pattern is valid")
    })
}

/// Parses the `M-D-YY H.MM AM` stamp Xcode embeds in archive names
pub fn archive_timestamp(name: &str) -> Option<NaiveDateTime> {
    let captures = timestamp_regex().captures(name)?;
    let stamp = format!("{} {}", &captures[1], &captures[2]);
    NaiveDateTime::parse_from_str(&stamp, ARCHIVE_TIMESTAMP_FORMAT).ok()
}

/// Latest entry by embedded timestamp; the first seen wins a tie
fn select_latest(entries: Vec<DirEntry>) -> Option<PathBuf> {
    let mut latest: Option<(NaiveDateTime, PathBuf)> = None;

    for entry in entries {
        let Some(stamp) = archive_timestamp(&entry.name) else {
            warn!(archive = %entry.path.display(), "Archive name carries no timestamp, ignoring");
            continue;
        };
        if latest.as_ref().map_or(true, |(best, _)| stamp > *best) {
            latest = Some((stamp, entry.path));
        }
    }

    latest.map(|(_, path)| path)
}
