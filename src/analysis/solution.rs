//! Solution file (`.sln`) parser
//!
//! Project references are recognised on every line. The two `GlobalSection`
//! blocks are tracked by a small state machine; both end on the same
//! `EndGlobalSection` marker, so sections are expected to be well-formed and
//! never nested.

use super::project::ProjectFileParser;
use super::scanner::{LineMatches, Scanner};
use super::types::{config_key, Solution};
use super::AnalysisError;
use crate::fs::FileSystem;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SolutionMarker {
    ProjectReference,
    SolutionConfigStart,
    SolutionConfigEntry,
    ProjectConfigStart,
    ProjectConfigEntry,
    SectionEnd,
}

fn scanner() -> &'static Scanner<SolutionMarker> {
    static SCANNER: OnceLock<Scanner<SolutionMarker>> = OnceLock::new();
    SCANNER.get_or_init(|| {
        Scanner::new(&[
            (
                SolutionMarker::ProjectReference,
                r#"Project\("(?P<type_id>[^"]*)"\)\s*=\s*"(?P<name>[^"]*)",\s*"(?P<path>[^"]*)",\s*"(?P<id>[^"]*)""#,
            ),
            (
                SolutionMarker::SolutionConfigStart,
                r"GlobalSection\(SolutionConfigurationPlatforms\)\s*=\s*preSolution",
            ),
            (
                SolutionMarker::SolutionConfigEntry,
                r"^\s*(?P<config>[^|]*)\|(?P<platform>[^|]*) =",
            ),
            (
                SolutionMarker::ProjectConfigStart,
                r"GlobalSection\(ProjectConfigurationPlatforms\)\s*=\s*postSolution",
            ),
            (
                SolutionMarker::ProjectConfigEntry,
                r"(?P<id>\{[^}]*\})\.(?P<config>[^|]*)\|(?P<platform>[^.=]*)\.\S*\s*=\s*(?P<mapped_config>[^|]*)\|(?P<mapped_platform>.*)",
            ),
            (SolutionMarker::SectionEnd, r"EndGlobalSection"),
        ])
        .expect("Invalid solution file patterns")
    })
}

/// A `Project(...)` line whose file exists on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectReference {
    /// Project type GUID as written in `Project("{...}")`
    pub type_id: String,
    pub name: String,
    pub path: PathBuf,
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Section {
    #[default]
    Outside,
    SolutionConfigurations,
    ProjectConfigurations,
}

/// Result of scanning the solution file itself, before any project is read
#[derive(Debug, Default)]
struct SolutionScan {
    references: Vec<ProjectReference>,
    configurations: Vec<String>,
    mappings: HashMap<String, BTreeMap<String, String>>,
    skipped: Vec<PathBuf>,
}

impl SolutionScan {
    fn knows(&self, id: &str) -> bool {
        self.references.iter().any(|r| r.id == id)
    }

    fn record_reference(&mut self, line: &LineMatches<'_, SolutionMarker>, base_dir: &Path, fs: &dyn FileSystem) {
        let (Some(type_id), Some(name), Some(relative), Some(id)) = (
            line.capture(SolutionMarker::ProjectReference, "type_id"),
            line.capture(SolutionMarker::ProjectReference, "name"),
            line.capture(SolutionMarker::ProjectReference, "path"),
            line.capture(SolutionMarker::ProjectReference, "id"),
        ) else {
            return;
        };

        let path = resolve_reference_path(base_dir, relative);
        if !fs.is_file(&path) {
            warn!(
                "Skipping {}: directory or not found on file system",
                path.display()
            );
            self.skipped.push(path);
            return;
        }

        if self.knows(id) {
            warn!(project = name, id, "Skipping duplicate project reference");
            return;
        }

        self.references.push(ProjectReference {
            type_id: type_id.to_string(),
            name: name.to_string(),
            path,
            id: id.to_string(),
        });
    }

    fn record_configuration(&mut self, line: &LineMatches<'_, SolutionMarker>) {
        if let Some(caps) = line.get(SolutionMarker::SolutionConfigEntry) {
            self.configurations
                .push(config_key(&caps["config"], &caps["platform"]));
        }
    }

    fn record_mapping(&mut self, line: &LineMatches<'_, SolutionMarker>) {
        let Some(caps) = line.get(SolutionMarker::ProjectConfigEntry) else {
            return;
        };

        let id = &caps["id"];
        if !self.knows(id) {
            debug!(id, "Ignoring configuration mapping for unknown project");
            return;
        }

        let key = config_key(&caps["config"], &caps["platform"]);
        let mapped = config_key(&caps["mapped_config"], caps["mapped_platform"].trim());
        self.mappings
            .entry(id.to_string())
            .or_default()
            .insert(key, mapped);
    }
}

/// Joins a solution-relative path, treating backslashes as separators
fn resolve_reference_path(base_dir: &Path, relative: &str) -> PathBuf {
    relative
        .split(['\\', '/'])
        .filter(|component| !component.is_empty())
        .fold(base_dir.to_path_buf(), |path, component| path.join(component))
}

fn scan_solution(content: &str, base_dir: &Path, fs: &dyn FileSystem) -> SolutionScan {
    let mut scan = SolutionScan::default();
    let mut section = Section::Outside;

    for line in scanner().scan(content) {
        if line.has(SolutionMarker::ProjectReference) {
            scan.record_reference(&line, base_dir, fs);
        }

        if line.has(SolutionMarker::SectionEnd) {
            section = Section::Outside;
            continue;
        }

        section = match section {
            Section::Outside if line.has(SolutionMarker::SolutionConfigStart) => {
                Section::SolutionConfigurations
            }
            Section::Outside if line.has(SolutionMarker::ProjectConfigStart) => {
                Section::ProjectConfigurations
            }
            Section::Outside => Section::Outside,
            Section::SolutionConfigurations => {
                scan.record_configuration(&line);
                Section::SolutionConfigurations
            }
            Section::ProjectConfigurations => {
                scan.record_mapping(&line);
                Section::ProjectConfigurations
            }
        };
    }

    scan
}

pub struct SolutionFileParser<'a> {
    fs: &'a dyn FileSystem,
}

impl<'a> SolutionFileParser<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs }
    }

    /// Parses the solution and every project file it references
    pub fn parse(&self, path: &Path) -> Result<Solution, AnalysisError> {
        let content = self
            .fs
            .read_to_string(path)
            .map_err(|e| AnalysisError::file_read(path, e))?;

        let base_directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut scan = scan_solution(&content, &base_directory, self.fs);

        let project_parser = ProjectFileParser::new(self.fs);
        let mut projects = Vec::with_capacity(scan.references.len());
        for reference in &scan.references {
            let mut project = project_parser.parse(&reference.path, &reference.id)?;
            project.name = reference.name.clone();
            project.mappings = scan.mappings.remove(&reference.id).unwrap_or_default();
            projects.push(project);
        }

        info!(
            solution = %path.display(),
            projects = projects.len(),
            configurations = scan.configurations.len(),
            "Analyzed solution"
        );

        Ok(Solution {
            path: path.to_path_buf(),
            base_directory,
            projects,
            configurations: scan.configurations,
            skipped_references: scan.skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::Api;
    use crate::fs::MockFileSystem;

    const IOS_ID: &str = "{90F3C584-FD69-4926-9903-6B9771847782}";
    const DROID_ID: &str = "{C9A0AC39-0D1D-4D5B-9D73-3E1E1F7A6D2B}";

    fn solution_text() -> String {
        format!(
            r#"
Microsoft Visual Studio Solution File, Format Version 12.00
# Visual Studio 2012
Project("{{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}}") = "Sample.iOS", "Sample.iOS\Sample.iOS.csproj", "{ios}"
EndProject
Project("{{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}}") = "Sample.Droid", "Sample.Droid\Sample.Droid.csproj", "{droid}"
EndProject
Project("{{2150E333-8FDC-42A3-9474-1A3956D46DE8}}") = "Solution Items", "Solution Items", "{{0D6A62D9-0B0B-4F1A-9D7E-3E2C2B1A0F00}}"
EndProject
Global
	GlobalSection(SolutionConfigurationPlatforms) = preSolution
		Debug|Any CPU = Debug|Any CPU
		Release|iPhone = Release|iPhone
	EndGlobalSection
	GlobalSection(ProjectConfigurationPlatforms) = postSolution
		{ios}.Debug|Any CPU.ActiveCfg = Debug|iPhoneSimulator
		{ios}.Release|iPhone.ActiveCfg = Release|iPhone
		{ios}.Release|iPhone.Build.0 = Release|iPhone
		{droid}.Debug|Any CPU.ActiveCfg = Debug|Any CPU
		{droid}.Release|iPhone.ActiveCfg = Release|Any CPU
		{{FFFFFFFF-0000-0000-0000-000000000000}}.Release|iPhone.ActiveCfg = Release|iPhone
	EndGlobalSection
EndGlobal
"#,
            ios = IOS_ID,
            droid = DROID_ID
        )
    }

    fn add_projects(fs: &MockFileSystem) {
        fs.add_file(
            "src/Sample.iOS/Sample.iOS.csproj",
            &format!(
                "<ProjectGuid>{}</ProjectGuid>\n<OutputType>Exe</OutputType>\n<Reference Include=\"Xamarin.iOS\" />\n",
                IOS_ID
            ),
        );
        fs.add_file(
            "src/Sample.Droid/Sample.Droid.csproj",
            &format!(
                "<ProjectGuid>{}</ProjectGuid>\n<AndroidApplication>True</AndroidApplication>\n<Reference Include=\"Mono.Android\" />\n",
                DROID_ID
            ),
        );
    }

    #[test]
    fn test_parse_solution() {
        let fs = MockFileSystem::new();
        fs.add_file("src/Sample.sln", &solution_text());
        fs.add_dir("src/Solution Items");
        add_projects(&fs);

        let solution = SolutionFileParser::new(&fs)
            .parse(Path::new("/mock/src/Sample.sln"))
            .unwrap();

        assert_eq!(solution.base_directory, PathBuf::from("/mock/src"));
        assert_eq!(solution.configurations, vec!["Debug|AnyCPU", "Release|iPhone"]);

        let names: Vec<&str> = solution.projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Sample.iOS", "Sample.Droid"]);

        let ios = solution.project(IOS_ID).unwrap();
        assert_eq!(ios.api, Some(Api::Ios));
        assert_eq!(
            ios.path,
            PathBuf::from("/mock/src/Sample.iOS/Sample.iOS.csproj")
        );
        assert_eq!(ios.mapped_config("Debug|AnyCPU"), Some("Debug|iPhoneSimulator"));
        assert_eq!(ios.mapped_config("Release|iPhone"), Some("Release|iPhone"));

        let droid = solution.project(DROID_ID).unwrap();
        assert_eq!(droid.mapped_config("Release|iPhone"), Some("Release|AnyCPU"));
        assert_eq!(droid.mappings.len(), 2);
    }

    #[test]
    fn test_missing_project_file_is_skipped() {
        let fs = MockFileSystem::new();
        fs.add_file("src/Sample.sln", &solution_text());
        fs.add_file(
            "src/Sample.iOS/Sample.iOS.csproj",
            &format!("<ProjectGuid>{}</ProjectGuid>\n", IOS_ID),
        );

        let solution = SolutionFileParser::new(&fs)
            .parse(Path::new("/mock/src/Sample.sln"))
            .unwrap();

        assert_eq!(solution.projects.len(), 1);
        assert_eq!(solution.projects[0].id, IOS_ID);
        assert!(solution.project(DROID_ID).is_none());
        assert!(solution
            .skipped_references
            .contains(&PathBuf::from("/mock/src/Sample.Droid/Sample.Droid.csproj")));
        assert!(solution
            .projects
            .iter()
            .all(|p| !p.mappings.values().any(|v| v == "Release|AnyCPU")));
    }

    #[test]
    fn test_identity_mismatch_aborts_analysis() {
        let fs = MockFileSystem::new();
        fs.add_file("src/Sample.sln", &solution_text());
        add_projects(&fs);
        fs.add_file(
            "src/Sample.iOS/Sample.iOS.csproj",
            "<ProjectGuid>{ABC}</ProjectGuid>\n",
        );

        let err = SolutionFileParser::new(&fs)
            .parse(Path::new("/mock/src/Sample.sln"))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::IdentityMismatch { .. }));
    }

    #[test]
    fn test_mapping_before_reference_is_dropped() {
        let content = format!(
            r#"Global
	GlobalSection(ProjectConfigurationPlatforms) = postSolution
		{id}.Debug|iPhone.ActiveCfg = Debug|iPhone
	EndGlobalSection
EndGlobal
Project("{{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}}") = "Late", "Late.csproj", "{id}"
EndProject
"#,
            id = IOS_ID
        );
        let fs = MockFileSystem::new();
        fs.add_file("Late.csproj", "");

        let scan = scan_solution(&content, Path::new("/mock"), &fs);
        assert_eq!(scan.references.len(), 1);
        assert!(scan.mappings.is_empty());
    }

    #[test]
    fn test_entries_outside_sections_are_ignored() {
        let content = format!(
            "Project(\"{{T}}\") = \"App\", \"App.csproj\", \"{id}\"\n\
             \t\tDebug|iPhone = Debug|iPhone\n\
             \t\t{id}.Debug|iPhone.ActiveCfg = Debug|iPhone\n",
            id = IOS_ID
        );
        let fs = MockFileSystem::new();
        fs.add_file("App.csproj", "");

        let scan = scan_solution(&content, Path::new("/mock"), &fs);
        assert!(scan.configurations.is_empty());
        assert!(scan.mappings.is_empty());
    }

    #[test]
    fn test_section_end_closes_either_section() {
        let content = "GlobalSection(SolutionConfigurationPlatforms) = preSolution\n\
                       \tDebug|iPhone = Debug|iPhone\n\
                       EndGlobalSection\n\
                       \tRelease|iPhone = Release|iPhone\n";
        let fs = MockFileSystem::new();

        let scan = scan_solution(content, Path::new("/mock"), &fs);
        assert_eq!(scan.configurations, vec!["Debug|iPhone"]);
    }

    #[test]
    fn test_resolve_reference_path() {
        assert_eq!(
            resolve_reference_path(Path::new("/repo"), r"src\App\App.csproj"),
            PathBuf::from("/repo/src/App/App.csproj")
        );
        assert_eq!(
            resolve_reference_path(Path::new("/repo"), "App/App.csproj"),
            PathBuf::from("/repo/App/App.csproj")
        );
    }

    #[test]
    fn test_reparse_is_structurally_equal() {
        let fs = MockFileSystem::new();
        fs.add_file("src/Sample.sln", &solution_text());
        add_projects(&fs);
        let parser = SolutionFileParser::new(&fs);

        let first = parser.parse(Path::new("/mock/src/Sample.sln")).unwrap();
        let second = parser.parse(Path::new("/mock/src/Sample.sln")).unwrap();
        assert_eq!(first, second);
    }
}
