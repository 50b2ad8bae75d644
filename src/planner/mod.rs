//! Build planning
//!
//! Walks the project graph in solution order and turns every in-scope
//! application project into one or more [`BuildAction`]s. The planner decides
//! composition and ordering only; what the tools do with their arguments is
//! their business.

use crate::analysis::{config_key, split_config_key, Api, ConfigProperties, Project, ProjectGraph};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const SIGNED_PACKAGE_TARGET: &str = "/t:SignAndroidPackage";
const UNSIGNED_PACKAGE_TARGET: &str = "/t:PackageForAndroid";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("No configuration mapping found for project `{project}` ({configuration})")]
    NoMappingForConfiguration {
        project: String,
        configuration: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Build,
    Archive,
    SignedPackage,
    UnsignedPackage,
    SolutionBuild,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Build => "build",
            ActionKind::Archive => "archive",
            ActionKind::SignedPackage => "signed package",
            ActionKind::UnsignedPackage => "unsigned package",
            ActionKind::SolutionBuild => "solution build",
        };
        f.write_str(name)
    }
}

/// One external tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildAction {
    pub kind: ActionKind,
    /// Project the action builds; `None` for a whole-solution build
    pub project: Option<String>,
    pub tool: PathBuf,
    pub subcommand: String,
    pub args: Vec<String>,
}

impl BuildAction {
    /// Everything after the tool itself, in invocation order
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.subcommand.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    pub fn command_line(&self) -> String {
        std::iter::once(quote(&self.tool.to_string_lossy()))
            .chain(self.argv().iter().map(|arg| quote(arg)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for BuildAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

fn quote(arg: &str) -> String {
    if arg.contains(char::is_whitespace) {
        format!("\"{}\"", arg)
    } else {
        arg.to_string()
    }
}

/// Locations of the external tools actions are composed for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub mdtool: PathBuf,
    pub xbuild: PathBuf,
}

impl From<&crate::config::XambuildConfig> for ToolPaths {
    fn from(config: &crate::config::XambuildConfig) -> Self {
        Self {
            mdtool: config.mdtool_path.clone(),
            xbuild: config.xbuild_path.clone(),
        }
    }
}

pub struct BuildPlanner {
    tools: ToolPaths,
}

impl BuildPlanner {
    pub fn new(tools: ToolPaths) -> Self {
        Self { tools }
    }

    /// Plans the per-project actions for `configuration|platform`.
    ///
    /// An empty plan is a valid answer; substituting a whole-solution build is
    /// up to the caller.
    pub fn plan(
        &self,
        graph: &ProjectGraph,
        configuration: &str,
        platform: &str,
        filter: &[Api],
    ) -> Result<Vec<BuildAction>, PlanError> {
        let key = config_key(configuration, platform);
        let solution_config = format!("{}|{}", configuration, platform);
        let solution_path = &graph.solution().path;
        let mut actions = Vec::new();

        for project in graph.projects() {
            if project.mappings.is_empty() {
                continue;
            }

            let Some(api) = project.api.filter(|api| filter.contains(api)) else {
                continue;
            };

            if !project.is_application() {
                debug!(project = %project.name, api = %api, "Not an application project, skipping");
                continue;
            }

            let mapped = project.mapped_config(&key).ok_or_else(|| {
                PlanError::NoMappingForConfiguration {
                    project: project.name.clone(),
                    configuration: key.clone(),
                }
            })?;
            let default_properties = ConfigProperties::default();
            let properties = project.config(mapped).unwrap_or(&default_properties);

            match api {
                Api::Ios => {
                    let kind = if properties.wants_archive() {
                        ActionKind::Archive
                    } else {
                        ActionKind::Build
                    };
                    actions.push(self.mdtool_action(kind, project, &solution_config, solution_path));
                }
                Api::Android => {
                    actions.push(self.mdtool_action(
                        ActionKind::Build,
                        project,
                        &solution_config,
                        solution_path,
                    ));
                    actions.push(self.package_action(project, mapped, properties.sign_android));
                }
                Api::UiTest => {}
            }
        }

        info!(
            configuration = %key,
            actions = actions.len(),
            "Planned build actions"
        );

        Ok(actions)
    }

    /// Action that builds every project of the solution
    pub fn solution_action(&self, graph: &ProjectGraph, configuration: &str, platform: &str) -> BuildAction {
        BuildAction {
            kind: ActionKind::SolutionBuild,
            project: None,
            tool: self.tools.mdtool.clone(),
            subcommand: "build".to_string(),
            args: vec![
                format!("-c:{}|{}", configuration, platform),
                graph.solution().path.to_string_lossy().to_string(),
            ],
        }
    }

    fn mdtool_action(
        &self,
        kind: ActionKind,
        project: &Project,
        solution_config: &str,
        solution_path: &Path,
    ) -> BuildAction {
        let subcommand = match kind {
            ActionKind::Archive => "archive",
            _ => "build",
        };

        BuildAction {
            kind,
            project: Some(project.name.clone()),
            tool: self.tools.mdtool.clone(),
            subcommand: subcommand.to_string(),
            args: vec![
                format!("-c:{}", solution_config),
                solution_path.to_string_lossy().to_string(),
                format!("-p:{}", project.name),
            ],
        }
    }

    fn package_action(&self, project: &Project, mapped: &str, signed: bool) -> BuildAction {
        let (configuration, platform) = split_config_key(mapped);
        let (kind, target) = if signed {
            (ActionKind::SignedPackage, SIGNED_PACKAGE_TARGET)
        } else {
            (ActionKind::UnsignedPackage, UNSIGNED_PACKAGE_TARGET)
        };

        BuildAction {
            kind,
            project: Some(project.name.clone()),
            tool: self.tools.xbuild.clone(),
            subcommand: target.to_string(),
            args: vec![
                format!("/p:Configuration={}", configuration),
                format!("/p:Platform={}", platform),
                project.path.to_string_lossy().to_string(),
            ],
        }
    }
}
