//! Project file (`.csproj`) parser
//!
//! Single pass over the file. A conditional `<PropertyGroup>` opens a
//! configuration scope that the next `</PropertyGroup>` closes; output path,
//! packaging and architecture properties only count inside such a scope.
//! Identity, output type, assembly name and API references count anywhere.

use super::scanner::Scanner;
use super::types::{config_key, Api, ConfigProperties, Project};
use super::AnalysisError;
use crate::fs::FileSystem;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProjectMarker {
    Guid,
    OutputType,
    AssemblyName,
    AndroidApplication,
    PropertyGroupStart,
    PropertyGroupEnd,
    OutputPath,
    IpaPackageName,
    BuildIpa,
    AndroidKeyStore,
    MtouchArch,
    ReferenceIos,
    ReferenceAndroid,
    ReferenceUiTest,
}

fn scanner() -> &'static Scanner<ProjectMarker> {
    static SCANNER: OnceLock<Scanner<ProjectMarker>> = OnceLock::new();
    SCANNER.get_or_init(|| {
        Scanner::new(&[
            (ProjectMarker::Guid, r"<ProjectGuid>(?P<id>.*)</ProjectGuid>"),
            (ProjectMarker::OutputType, r"<OutputType>(?P<value>.*)</OutputType>"),
            (ProjectMarker::AssemblyName, r"<AssemblyName>(?P<value>.*)</AssemblyName>"),
            (
                ProjectMarker::AndroidApplication,
                r"<AndroidApplication>\s*true\s*</AndroidApplication>",
            ),
            (
                ProjectMarker::PropertyGroupStart,
                r#"<PropertyGroup Condition="\s*'\$\(Configuration\)\|\$\(Platform\)'\s*==\s*'(?P<config>[^|']*)\|(?P<platform>[^']*)'\s*">"#,
            ),
            (ProjectMarker::PropertyGroupEnd, r"</PropertyGroup>"),
            (ProjectMarker::OutputPath, r"<OutputPath>(?P<value>.*)</OutputPath>"),
            (ProjectMarker::IpaPackageName, r"<IpaPackageName>"),
            (ProjectMarker::BuildIpa, r"<BuildIpa>\s*true\s*</BuildIpa>"),
            (ProjectMarker::AndroidKeyStore, r"<AndroidKeyStore>\s*true\s*</AndroidKeyStore>"),
            (ProjectMarker::MtouchArch, r"<MtouchArch>(?P<value>.*)</MtouchArch>"),
            (ProjectMarker::ReferenceIos, r#"Include="Xamarin\.iOS""#),
            (ProjectMarker::ReferenceAndroid, r#"Include="Mono\.Android""#),
            (ProjectMarker::ReferenceUiTest, r#"Include="Xamarin\.UITest""#),
        ])
        .expect("Invalid project file patterns")
    })
}

pub struct ProjectFileParser<'a> {
    fs: &'a dyn FileSystem,
}

impl<'a> ProjectFileParser<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs }
    }

    /// Parses the project at `path`, which the solution references as `expected_id`.
    ///
    /// The project name defaults to the file stem; callers holding a solution
    /// reference replace it with the referenced name.
    pub fn parse(&self, path: &Path, expected_id: &str) -> Result<Project, AnalysisError> {
        let content = self
            .fs
            .read_to_string(path)
            .map_err(|e| AnalysisError::file_read(path, e))?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        parse_project(&content, Project::new(expected_id, name, path))
    }
}

/// Folds project file `content` into `project`, whose id is the one the
/// identity marker must agree with.
pub fn parse_project(content: &str, mut project: Project) -> Result<Project, AnalysisError> {
    let mut scope: Option<String> = None;

    for line in scanner().scan(content) {
        if let Some(found) = line.capture(ProjectMarker::Guid, "id") {
            if found != project.id {
                return Err(AnalysisError::IdentityMismatch {
                    path: project.path.clone(),
                    expected: project.id.clone(),
                    found: found.to_string(),
                });
            }
        }

        if let Some(output_type) = line.capture(ProjectMarker::OutputType, "value") {
            project.output_type = Some(output_type.trim().to_lowercase());
        }

        if let Some(assembly_name) = line.capture(ProjectMarker::AssemblyName, "value") {
            project.assembly_name = Some(assembly_name.trim().to_string());
        }

        if line.has(ProjectMarker::AndroidApplication) {
            project.android_application = true;
        }

        if line.has(ProjectMarker::PropertyGroupEnd) {
            scope = None;
        }

        if let Some(properties) = scope.as_ref().and_then(|key| project.configs.get_mut(key)) {
            if let Some(output_path) = line.capture(ProjectMarker::OutputPath, "value") {
                properties.output_path = Some(normalize_output_path(output_path));
            }
            if line.has(ProjectMarker::IpaPackageName) {
                properties.ipa_package = true;
            }
            if line.has(ProjectMarker::BuildIpa) {
                properties.build_ipa = true;
            }
            if line.has(ProjectMarker::AndroidKeyStore) {
                properties.sign_android = true;
            }
            if let Some(archs) = line.capture(ProjectMarker::MtouchArch, "value") {
                properties.mtouch_architectures = archs
                    .split(',')
                    .map(str::trim)
                    .filter(|arch| !arch.is_empty())
                    .map(str::to_string)
                    .collect();
            }
        }

        if let Some(caps) = line.get(ProjectMarker::PropertyGroupStart) {
            let key = config_key(&caps["config"], &caps["platform"]);
            project.configs.entry(key.clone()).or_default();
            scope = Some(key);
        }

        // Every reference marker overwrites the classification; the last one
        // in file order decides.
        if line.has(ProjectMarker::ReferenceIos) {
            project.api = Some(Api::Ios);
        }
        if line.has(ProjectMarker::ReferenceAndroid) {
            project.api = Some(Api::Android);
        }
        if line.has(ProjectMarker::ReferenceUiTest) {
            project.api = Some(Api::UiTest);
        }
    }

    debug!(
        project = %project.name,
        api = ?project.api,
        output_type = ?project.output_type,
        configs = project.configs.len(),
        "Parsed project file"
    );

    Ok(project)
}

/// `bin\iPhone\Release\` becomes `bin/iPhone/Release`
fn normalize_output_path(raw: &str) -> String {
    raw.trim()
        .replace('\\', "/")
        .trim_end_matches('/')
        .to_string()
}
