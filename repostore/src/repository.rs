//! Repository snapshot and the file-store seam used by the agent loop

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;

/// Unique identifier for an imported repository
pub type RepositoryId = String;

/// A single file held in a repository snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFile {
    /// Path relative to the repository root, unique within a repository
    pub path: String,
    /// Full UTF-8 content
    pub content: String,
}

impl CodeFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// An imported repository: an ordered set of files keyed by path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: RepositoryId,
    pub name: String,
    /// Files in import order
    pub files: Vec<CodeFile>,
}

impl Repository {
    /// Create an empty repository with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        debug!(%name, "Repository::new: called");
        Self {
            id: Uuid::now_v7().to_string(),
            name,
            files: Vec::new(),
        }
    }

    /// Build a repository from files, keeping the first occurrence of each path
    pub fn with_files(name: impl Into<String>, files: impl IntoIterator<Item = CodeFile>) -> Self {
        let mut repo = Self::new(name);
        for file in files {
            repo.insert(file);
        }
        debug!(id = %repo.id, file_count = repo.files.len(), "Repository::with_files: built");
        repo
    }

    /// Add a file during import. Duplicate paths are ignored.
    pub fn insert(&mut self, file: CodeFile) -> bool {
        if self.position(&file.path).is_some() {
            debug!(path = %file.path, "Repository::insert: duplicate path ignored");
            return false;
        }
        self.files.push(file);
        true
    }

    pub fn get(&self, path: &str) -> Option<&CodeFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.position(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn position(&self, path: &str) -> Option<usize> {
        self.files.iter().position(|f| f.path == path)
    }
}

/// File operations the agent loop performs against a repository snapshot
///
/// The loop never touches a real filesystem; everything goes through this
/// trait. Writes only replace existing files, they never create new ones.
pub trait FileStore: Send {
    /// Id of the repository behind this store (for task records)
    fn repository_id(&self) -> &str;

    /// Human-readable name shown to the model
    fn repository_name(&self) -> &str {
        self.repository_id()
    }

    /// Content of a known file
    fn read_file(&self, path: &str) -> Result<&str, StoreError>;

    /// Replace a known file's content, returning the previous content
    fn write_file(&mut self, path: &str, content: &str) -> Result<String, StoreError>;

    /// All known paths in import order
    fn list_files(&self) -> Vec<String>;
}

impl FileStore for Repository {
    fn repository_id(&self) -> &str {
        &self.id
    }

    fn repository_name(&self) -> &str {
        &self.name
    }

    fn read_file(&self, path: &str) -> Result<&str, StoreError> {
        debug!(%path, "Repository::read_file: called");
        self.get(path)
            .map(|f| f.content.as_str())
            .ok_or_else(|| StoreError::FileNotFound { path: path.to_string() })
    }

    fn write_file(&mut self, path: &str, content: &str) -> Result<String, StoreError> {
        debug!(%path, content_len = content.len(), "Repository::write_file: called");
        match self.position(path) {
            Some(idx) => {
                let previous = std::mem::replace(&mut self.files[idx].content, content.to_string());
                debug!(%path, "Repository::write_file: replaced");
                Ok(previous)
            }
            None => {
                debug!(%path, "Repository::write_file: unknown path");
                Err(StoreError::FileNotFound { path: path.to_string() })
            }
        }
    }

    fn list_files(&self) -> Vec<String> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Repository {
        Repository::with_files(
            "sample",
            vec![
                CodeFile::new("src/a.ts", "export const a = 1;"),
                CodeFile::new("README.md", "# Sample"),
            ],
        )
    }

    #[test]
    fn test_read_known_file() {
        let repo = sample();
        assert_eq!(repo.read_file("README.md").unwrap(), "# Sample");
    }

    #[test]
    fn test_read_unknown_file() {
        let repo = sample();
        let err = repo.read_file("missing.rs").unwrap_err();
        assert!(matches!(err, StoreError::FileNotFound { ref path } if path == "missing.rs"));
    }

    #[test]
    fn test_write_replaces_and_returns_previous() {
        let mut repo = sample();
        let previous = repo.write_file("src/a.ts", "export const a = 2;").unwrap();

        assert_eq!(previous, "export const a = 1;");
        assert_eq!(repo.read_file("src/a.ts").unwrap(), "export const a = 2;");
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn test_write_unknown_does_not_create() {
        let mut repo = sample();
        assert!(repo.write_file("new.rs", "fn main() {}").is_err());
        assert_eq!(repo.len(), 2);
        assert!(!repo.contains("new.rs"));
    }

    #[test]
    fn test_list_files_keeps_import_order() {
        let repo = sample();
        assert_eq!(repo.list_files(), vec!["src/a.ts".to_string(), "README.md".to_string()]);
    }

    #[test]
    fn test_duplicate_paths_keep_first() {
        let repo = Repository::with_files("dup", vec![CodeFile::new("a", "first"), CodeFile::new("a", "second")]);
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.read_file("a").unwrap(), "first");
    }
}
