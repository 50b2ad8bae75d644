//! Build orchestration: analyze, plan, run each action under supervision and
//! collect what was produced.
//!
//! Actions run strictly one after another and the first failure aborts the
//! rest of the plan.

mod test_log;

pub use test_log::TestLogSummary;

use crate::analysis::{AnalysisError, Analyzer, Api, ProjectGraph};
use crate::artifacts::{ArtifactError, ArtifactResolver, GeneratedFiles};
use crate::config::XambuildConfig;
use crate::fs::FileSystem;
use crate::planner::{BuildAction, BuildPlanner, PlanError, ToolPaths};
use crate::supervisor::{
    NixSignaller, ProcessSupervisor, Signaller, SupervisorConfig, SupervisorError,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Empty path provided")]
    EmptyPath,
    #[error("File ({}) does not exist", .0.display())]
    MissingFile(PathBuf),
    #[error("No configuration provided")]
    MissingConfiguration,
    #[error("No platform provided")]
    MissingPlatform,
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("Can't find test log file: {}", .0.display())]
    TestLogMissing(PathBuf),
    #[error("Failed to read test log {}: {reason}", .path.display())]
    TestLogRead { path: PathBuf, reason: String },
    #[error("Tests failed (Failed: {})", failed_count(.failed))]
    TestsFailed { failed: Option<u64> },
}

fn failed_count(failed: &Option<u64>) -> String {
    failed.map_or_else(|| "missing".to_string(), |n| n.to_string())
}

/// What to build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub path: PathBuf,
    pub configuration: String,
    pub platform: String,
    /// Project types to act on; `None` means iOS and android
    pub filter: Option<Vec<Api>>,
}

impl BuildRequest {
    pub fn new(
        path: impl Into<PathBuf>,
        configuration: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            configuration: configuration.into(),
            platform: platform.into(),
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: Vec<Api>) -> Self {
        self.filter = Some(filter);
        self
    }

    fn validate(&self, fs: &dyn FileSystem) -> Result<(), BuildError> {
        if self.path.as_os_str().is_empty() {
            return Err(BuildError::EmptyPath);
        }
        if !fs.exists(&self.path) {
            return Err(BuildError::MissingFile(self.path.clone()));
        }
        if self.configuration.trim().is_empty() {
            return Err(BuildError::MissingConfiguration);
        }
        if self.platform.trim().is_empty() {
            return Err(BuildError::MissingPlatform);
        }
        Ok(())
    }
}

pub struct Builder {
    request: BuildRequest,
    filter: Vec<Api>,
    graph: ProjectGraph,
    planner: BuildPlanner,
    resolver: ArtifactResolver,
    supervisor_config: SupervisorConfig,
    signaller: Arc<dyn Signaller>,
    generated_files: Option<GeneratedFiles>,
}

impl Builder {
    /// Validates the request and analyzes the solution it names
    pub fn new(
        request: BuildRequest,
        config: &XambuildConfig,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self, BuildError> {
        request.validate(fs.as_ref())?;

        let graph = Analyzer::new(fs.clone()).analyze(&request.path)?;
        let filter = request.filter.clone().unwrap_or_else(Api::default_filter);

        Ok(Self {
            filter,
            graph,
            planner: BuildPlanner::new(ToolPaths::from(config)),
            resolver: ArtifactResolver::new(fs, config.archive_dir.clone()),
            supervisor_config: SupervisorConfig::from(config),
            signaller: Arc::new(NixSignaller),
            generated_files: None,
            request,
        })
    }

    pub fn with_signaller(mut self, signaller: Arc<dyn Signaller>) -> Self {
        self.signaller = signaller;
        self
    }

    pub fn graph(&self) -> &ProjectGraph {
        &self.graph
    }

    pub fn filter(&self) -> &[Api] {
        &self.filter
    }

    /// Per-project plan, or a single whole-solution build when no project
    /// is actionable
    pub fn plan(&self) -> Result<Vec<BuildAction>, BuildError> {
        let actions = self.planner.plan(
            &self.graph,
            &self.request.configuration,
            &self.request.platform,
            &self.filter,
        )?;

        if !actions.is_empty() {
            return Ok(actions);
        }

        info!("No application project to build, building the whole solution");
        Ok(vec![self.planner.solution_action(
            &self.graph,
            &self.request.configuration,
            &self.request.platform,
        )])
    }

    /// Runs the plan and collects the generated files.
    ///
    /// Planning errors surface before any process is started.
    pub async fn build(&mut self, retry_on_hang: bool) -> Result<&GeneratedFiles, BuildError> {
        let actions = self.plan()?;
        let supervisor = ProcessSupervisor::with_signaller(
            SupervisorConfig {
                retry_on_hang,
                ..self.supervisor_config.clone()
            },
            self.signaller.clone(),
        );

        for (index, action) in actions.iter().enumerate() {
            info!(
                step = index + 1,
                total = actions.len(),
                kind = %action.kind,
                project = action.project.as_deref().unwrap_or("<solution>"),
                "Starting build action"
            );
            let report = supervisor.run(action).await?;
            if report.attempts > 1 {
                warn!(command = %action, attempts = report.attempts, "Build action needed a retry");
            }
        }

        let generated = self.resolver.collect(
            &self.graph,
            &self.request.configuration,
            &self.request.platform,
            &self.filter,
        )?;
        info!(projects = generated.len(), "Collected generated files");

        Ok(self.generated_files.insert(generated))
    }

    /// Files collected by the last successful [`Builder::build`]
    pub fn generated_files(&self) -> Option<&GeneratedFiles> {
        self.generated_files.as_ref()
    }

    /// Reads a test-runner log and fails unless it reports zero failures
    pub fn check_test_log(fs: &dyn FileSystem, path: &Path) -> Result<TestLogSummary, BuildError> {
        let summary = TestLogSummary::from_file(fs, path)?;
        if !summary.is_success() {
            return Err(BuildError::TestsFailed {
                failed: summary.failed(),
            });
        }
        Ok(summary)
    }
}
