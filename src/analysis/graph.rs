//! Analysis entry point and the read-only project graph used for planning

use super::solution::SolutionFileParser;
use super::types::{config_key, Api, Project, Solution};
use super::AnalysisError;
use crate::fs::FileSystem;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const SOLUTION_EXT: &str = "sln";

/// Parsed solution plus its projects; immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectGraph {
    solution: Solution,
}

impl ProjectGraph {
    pub fn new(solution: Solution) -> Self {
        Self { solution }
    }

    pub fn solution(&self) -> &Solution {
        &self.solution
    }

    pub fn projects(&self) -> &[Project] {
        &self.solution.projects
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.solution.project(id)
    }

    pub fn project_by_name(&self, name: &str) -> Option<&Project> {
        self.solution.projects.iter().find(|p| p.name == name)
    }

    /// Projects, in solution order, whose classification is in `filter`
    pub fn projects_with_api<'a>(&'a self, filter: &'a [Api]) -> impl Iterator<Item = &'a Project> {
        self.solution
            .projects
            .iter()
            .filter(move |p| p.api.is_some_and(|api| filter.contains(&api)))
    }

    /// Projects mapped for a solution configuration, with their project-local key
    pub fn projects_for_configuration<'a>(
        &'a self,
        configuration: &str,
        platform: &str,
    ) -> impl Iterator<Item = (&'a Project, &'a str)> {
        let key = config_key(configuration, platform);
        self.solution
            .projects
            .iter()
            .filter_map(move |p| p.mapped_config(&key).map(|mapped| (p, mapped)))
    }
}

/// Reads a solution and all of its projects from the file system
pub struct Analyzer {
    fs: Arc<dyn FileSystem>,
}

impl Analyzer {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    pub fn analyze(&self, path: &Path) -> Result<ProjectGraph, AnalysisError> {
        let is_solution = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(SOLUTION_EXT));
        if !is_solution {
            return Err(AnalysisError::UnsupportedPath(path.to_path_buf()));
        }

        if !self.fs.is_file(path) {
            return Err(AnalysisError::PathNotFound(path.to_path_buf()));
        }

        debug!(path = %path.display(), "Analyzing solution");
        let solution = SolutionFileParser::new(self.fs.as_ref()).parse(path)?;
        Ok(ProjectGraph::new(solution))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use std::path::PathBuf;

    fn sample_fs() -> Arc<MockFileSystem> {
        let fs = MockFileSystem::new();
        fs.add_file(
            "App.sln",
            "Project(\"{T}\") = \"App.iOS\", \"iOS\\App.iOS.csproj\", \"{I}\"\n\
             Project(\"{T}\") = \"App.Droid\", \"Droid\\App.Droid.csproj\", \"{D}\"\n\
             Project(\"{T}\") = \"App.Core\", \"Core\\App.Core.csproj\", \"{C}\"\n\
             GlobalSection(ProjectConfigurationPlatforms) = postSolution\n\
             \t{I}.Release|iPhone.ActiveCfg = Release|iPhone\n\
             \t{D}.Release|iPhone.ActiveCfg = Release|Any CPU\n\
             EndGlobalSection\n",
        );
        fs.add_file(
            "iOS/App.iOS.csproj",
            "<ProjectGuid>{I}</ProjectGuid>\n<Reference Include=\"Xamarin.iOS\" />\n",
        );
        fs.add_file(
            "Droid/App.Droid.csproj",
            "<ProjectGuid>{D}</ProjectGuid>\n<Reference Include=\"Mono.Android\" />\n",
        );
        fs.add_file("Core/App.Core.csproj", "<ProjectGuid>{C}</ProjectGuid>\n");
        Arc::new(fs)
    }

    #[test]
    fn test_analyze_builds_graph() {
        let graph = Analyzer::new(sample_fs())
            .analyze(Path::new("/mock/App.sln"))
            .unwrap();

        assert_eq!(graph.projects().len(), 3);
        assert_eq!(graph.project("{D}").unwrap().name, "App.Droid");
        assert_eq!(graph.project_by_name("App.Core").unwrap().id, "{C}");
        assert!(graph.project("{X}").is_none());
    }

    #[test]
    fn test_projects_with_api() {
        let graph = Analyzer::new(sample_fs())
            .analyze(Path::new("/mock/App.sln"))
            .unwrap();

        let filter = [Api::Android];
        let names: Vec<&str> = graph
            .projects_with_api(&filter)
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["App.Droid"]);
    }

    #[test]
    fn test_projects_for_configuration() {
        let graph = Analyzer::new(sample_fs())
            .analyze(Path::new("/mock/App.sln"))
            .unwrap();

        let mapped: Vec<(&str, &str)> = graph
            .projects_for_configuration("Release", "iPhone")
            .map(|(p, m)| (p.name.as_str(), m))
            .collect();
        assert_eq!(
            mapped,
            vec![("App.iOS", "Release|iPhone"), ("App.Droid", "Release|AnyCPU")]
        );
        assert_eq!(graph.projects_for_configuration("Debug", "iPhone").count(), 0);
    }

    #[test]
    fn test_analyze_rejects_non_solution() {
        let err = Analyzer::new(sample_fs())
            .analyze(Path::new("/mock/iOS/App.iOS.csproj"))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedPath(_)));
    }

    #[test]
    fn test_analyze_accepts_uppercase_extension() {
        let fs = MockFileSystem::new();
        fs.add_file("APP.SLN", "");
        let graph = Analyzer::new(Arc::new(fs))
            .analyze(Path::new("/mock/APP.SLN"))
            .unwrap();
        assert!(graph.projects().is_empty());
    }

    #[test]
    fn test_analyze_missing_solution() {
        let err = Analyzer::new(sample_fs())
            .analyze(&PathBuf::from("/mock/Missing.sln"))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::PathNotFound(_)));
    }
}
