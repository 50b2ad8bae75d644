//! Output formatting for multiple formats
//!
//! JSON and YAML render the library types through serde. The human format is
//! laid out by hand.
//!
//! # Example
//!
//! ```ignore
//! use xambuild::cli::output::{OutputFormat, OutputFormatter};
//!
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! let output = formatter.format_plan(&actions)?;
//! println!("{}", output);
//! ```

use anyhow::{Context, Result};
use serde::Serialize;

use crate::analysis::{ConfigProperties, Project, Solution};
use crate::artifacts::GeneratedFiles;
use crate::builder::TestLogSummary;
use crate::planner::BuildAction;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";
const BRANCH: &str = "\u{251C}\u{2500}";
const LAST_BRANCH: &str = "\u{2514}\u{2500}";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format (human-friendly, version-control friendly)
    Yaml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_solution(&self, solution: &Solution) -> Result<String> {
        self.render(solution, "solution", human_solution)
    }

    pub fn format_plan(&self, actions: &[BuildAction]) -> Result<String> {
        self.render(actions, "build plan", human_plan)
    }

    pub fn format_generated_files(&self, generated: &GeneratedFiles) -> Result<String> {
        self.render(generated, "generated files", human_generated_files)
    }

    pub fn format_test_summary(&self, summary: &TestLogSummary) -> Result<String> {
        self.render(summary, "test summary", human_test_summary)
    }

    fn render<T: Serialize + ?Sized>(
        &self,
        value: &T,
        what: &str,
        human: fn(&T) -> String,
    ) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(value)
                .with_context(|| format!("Failed to serialize {} to JSON", what)),
            OutputFormat::Yaml => serde_yaml::to_string(value)
                .with_context(|| format!("Failed to serialize {} to YAML", what)),
            OutputFormat::Human => Ok(human(value)),
        }
    }
}

fn header(title: &str) -> String {
    format!("{}\n{}\n\n", title, RULE)
}

fn human_solution(solution: &Solution) -> String {
    let mut output = header("Solution Analysis");

    output.push_str(&format!("Solution:  {}\n", solution.path.display()));
    if solution.configurations.is_empty() {
        output.push_str("Configurations: (none declared)\n\n");
    } else {
        output.push_str(&format!(
            "Configurations: {}\n\n",
            solution.configurations.join(", ")
        ));
    }

    output.push_str(&format!("Projects ({}):\n", solution.projects.len()));
    for project in &solution.projects {
        output.push_str(&human_project(project));
    }

    if !solution.skipped_references.is_empty() {
        output.push_str("\n\u{26A0} Skipped references (file missing):\n");
        for path in &solution.skipped_references {
            output.push_str(&format!("  - {}\n", path.display()));
        }
    }

    output
}

fn human_project(project: &Project) -> String {
    let api = project.api.map_or("none", |api| api.as_str());
    let output_type = project.output_type.as_deref().unwrap_or("unknown");

    let mut output = format!("\n{} [{}, {}] {}\n", project.name, api, output_type, project.id);
    output.push_str(&format!("{} Path: {}\n", BRANCH, project.path.display()));
    if let Some(assembly) = &project.assembly_name {
        output.push_str(&format!("{} Assembly: {}\n", BRANCH, assembly));
    }
    if project.android_application {
        output.push_str(&format!("{} Android application\n", BRANCH));
    }

    output.push_str(&format!("{} Mappings:\n", BRANCH));
    if project.mappings.is_empty() {
        output.push_str("\u{2502}    (none)\n");
    }
    for (solution_config, mapped) in &project.mappings {
        output.push_str(&format!("\u{2502}    {} -> {}\n", solution_config, mapped));
    }

    output.push_str(&format!("{} Configurations:\n", LAST_BRANCH));
    if project.configs.is_empty() {
        output.push_str("     (none)\n");
    }
    for (key, properties) in &project.configs {
        output.push_str(&format!("     {}: {}\n", key, describe_properties(properties)));
    }

    output
}

fn describe_properties(properties: &ConfigProperties) -> String {
    let mut parts = vec![format!(
        "output {}",
        properties.output_path.as_deref().unwrap_or("(unknown)")
    )];
    if !properties.mtouch_architectures.is_empty() {
        parts.push(format!("archs {}", properties.mtouch_architectures.join(",")));
    }
    if properties.ipa_package {
        parts.push("ipa".to_string());
    }
    if properties.build_ipa {
        parts.push("build-ipa".to_string());
    }
    if properties.sign_android {
        parts.push("signed".to_string());
    }
    parts.join(", ")
}

fn human_plan(actions: &[BuildAction]) -> String {
    let mut output = header("Build Plan");

    if actions.is_empty() {
        output.push_str("(no actions)\n");
        return output;
    }

    for (index, action) in actions.iter().enumerate() {
        let project = action.project.as_deref().unwrap_or("<solution>");
        output.push_str(&format!("{}. {} [{}]\n", index + 1, project, action.kind));
        output.push_str(&format!("   {}\n", action.command_line()));
    }

    output
}

fn human_generated_files(generated: &GeneratedFiles) -> String {
    let mut output = header("\u{2713} Generated Files");

    if generated.is_empty() {
        output.push_str("(no application projects)\n");
        return output;
    }

    for (project, artifacts) in generated.iter() {
        output.push_str(&format!("{} ({})\n", project, artifacts.api));
        if artifacts.artifacts.is_empty() {
            output.push_str(&format!("{} (nothing found)\n", LAST_BRANCH));
        }
        let count = artifacts.artifacts.len();
        for (i, (kind, path)) in artifacts.artifacts.iter().enumerate() {
            let connector = if i + 1 == count { LAST_BRANCH } else { BRANCH };
            output.push_str(&format!("{} {}: {}\n", connector, kind, path.display()));
        }
    }

    output
}

fn human_test_summary(summary: &TestLogSummary) -> String {
    let title = if summary.is_success() {
        "\u{2713} Test Results"
    } else {
        "\u{2717} Test Results"
    };
    let mut output = header(title);

    if summary.counts.is_empty() {
        output.push_str("No `Tests run:` summary found\n");
        return output;
    }

    for (name, count) in &summary.counts {
        output.push_str(&format!("{:<14}{}\n", format!("{}:", name), count));
    }

    output
}
