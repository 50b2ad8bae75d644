//! FileSystem trait definition

use anyhow::{Context, Result};
use glob::Pattern;
use std::path::{Path, PathBuf};

/// Type of file system entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
    Symlink,
}

/// A directory entry returned by read_dir
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub path: PathBuf,
    pub name: String,
    pub file_type: FileType,
}

impl DirEntry {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.name
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }
}

/// Abstraction over file system operations for testability
pub trait FileSystem: Send + Sync {
    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Check if path is a file
    fn is_file(&self, path: &Path) -> bool;

    /// Read file contents as string
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// List directory contents
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;

    /// List the entries of `dir` whose name matches a glob pattern, sorted by
    /// name.
    fn list_matching(&self, dir: &Path, pattern: &str) -> Result<Vec<DirEntry>> {
        let glob_pattern = Pattern::new(pattern).context("Invalid glob pattern")?;

        let mut entries: Vec<DirEntry> = self
            .read_dir(dir)?
            .into_iter()
            .filter(|entry| glob_pattern.matches(entry.file_name()))
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    #[test]
    fn test_dir_entry() {
        let entry = DirEntry {
            path: PathBuf::from("/test/App.apk"),
            name: "App.apk".to_string(),
            file_type: FileType::File,
        };
        assert_eq!(entry.path(), Path::new("/test/App.apk"));
        assert_eq!(entry.file_name(), "App.apk");
        assert_eq!(entry.file_type(), FileType::File);
    }

    #[test]
    fn test_list_matching_filters_and_sorts() {
        let fs = MockFileSystem::with_root(PathBuf::from("/"));
        fs.add_file("/out/com.sample.app.apk", "");
        fs.add_file("/out/com.sample.app-Signed.apk", "");
        fs.add_file("/out/com.sample.app.apk.mdb", "");
        fs.add_file("/out/App.dll", "");

        let names: Vec<String> = fs
            .list_matching(Path::new("/out"), "*.apk")
            .unwrap()
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(
            names,
            vec!["com.sample.app-Signed.apk", "com.sample.app.apk"]
        );
    }

    #[test]
    fn test_list_matching_prefix_and_question_mark() {
        let fs = MockFileSystem::with_root(PathBuf::from("/"));
        fs.add_dir("/archives/MyApp 01-02-20 3.00 PM.xcarchive");
        fs.add_dir("/archives/Other 01-02-20.xcarchive");
        fs.add_file("/archives/abc", "");
        fs.add_file("/archives/ac", "");

        let archives = fs
            .list_matching(Path::new("/archives"), "MyApp*.xcarchive")
            .unwrap();
        assert_eq!(archives.len(), 1);
        assert_eq!(archives[0].name, "MyApp 01-02-20 3.00 PM.xcarchive");

        let single = fs.list_matching(Path::new("/archives"), "a?c").unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].name, "abc");
    }

    #[test]
    fn test_list_matching_rejects_invalid_pattern() {
        let fs = MockFileSystem::with_root(PathBuf::from("/"));
        fs.add_dir("/archives");

        assert!(fs.list_matching(Path::new("/archives"), "App[*.xcarchive").is_err());
    }
}
