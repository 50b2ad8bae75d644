//! xambuild - analysis, planning and supervised builds of Xamarin solutions
//!
//! A solution (`.sln`) and the projects it references are parsed into a
//! [`ProjectGraph`]. For a requested `Config|Platform` the [`BuildPlanner`]
//! derives the mdtool/xbuild invocations for every iOS and android
//! application, the [`ProcessSupervisor`] runs them one at a time while
//! guarding against the tool hanging on "Loading projects", and the
//! [`ArtifactResolver`] finds the `.app`, `.xcarchive` and `.apk` outputs.
//!
//! # Example Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use xambuild::{BuildRequest, Builder, RealFileSystem, XambuildConfig};
//!
//! async fn build() -> Result<(), xambuild::BuildError> {
//!     let config = XambuildConfig::default();
//!     let request = BuildRequest::new("App.sln", "Release", "iPhone");
//!     let mut builder = Builder::new(request, &config, Arc::new(RealFileSystem))?;
//!
//!     for (project, output) in builder.build(true).await?.iter() {
//!         println!("{}: {:?}", project, output.artifacts);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Project Structure
//!
//! - [`analysis`]: solution and project file parsing
//! - [`planner`]: build action composition
//! - [`supervisor`]: hang-aware process execution
//! - [`artifacts`]: generated file discovery
//! - [`builder`]: the orchestration of the above

pub mod analysis;
pub mod artifacts;
pub mod builder;
pub mod cli;
pub mod config;
pub mod fs;
pub mod planner;
pub mod supervisor;
pub mod util;

pub use analysis::{
    AnalysisError, Analyzer, Api, ConfigProperties, Project, ProjectGraph, Solution,
};
pub use artifacts::{ArtifactError, ArtifactKind, ArtifactResolver, GeneratedFiles};
pub use builder::{BuildError, BuildRequest, Builder, TestLogSummary};
pub use config::{ConfigError, XambuildConfig};
pub use fs::{FileSystem, MockFileSystem, RealFileSystem};
pub use planner::{ActionKind, BuildAction, BuildPlanner, PlanError, ToolPaths};
pub use supervisor::{ProcessSupervisor, RunReport, SupervisorConfig, SupervisorError};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
