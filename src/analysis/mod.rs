//! Solution and project file analysis
//!
//! Solution (`.sln`) and project (`.csproj`) files are read line by line with a
//! shared [`scanner::Scanner`] and folded into an immutable [`graph::ProjectGraph`].
//! Every call re-reads the files; nothing is cached between analyses.

pub mod graph;
pub mod project;
pub mod scanner;
pub mod solution;
pub mod types;

use std::path::PathBuf;
use thiserror::Error;

pub use graph::{Analyzer, ProjectGraph};
pub use project::ProjectFileParser;
pub use solution::{ProjectReference, SolutionFileParser};
pub use types::{config_key, split_config_key, Api, ConfigProperties, Project, Solution};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),
    #[error("Unsupported path, expected a .sln file: {}", .0.display())]
    UnsupportedPath(PathBuf),
    #[error("Failed to read {}: {reason}", .path.display())]
    FileRead { path: PathBuf, reason: String },
    #[error(
        "Invalid id found in project: {} (expected {expected}, found {found})",
        .path.display()
    )]
    IdentityMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
}

impl AnalysisError {
    pub(crate) fn file_read(path: &std::path::Path, err: anyhow::Error) -> Self {
        AnalysisError::FileRead {
            path: path.to_path_buf(),
            reason: format!("{:#}", err),
        }
    }
}
