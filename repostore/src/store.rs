//! Core RepoStore implementation
//!
//! ```text
//! {store_path}/
//! ├── repositories/{repo_id}.json     # full snapshot
//! ├── conversations/{repo_id}.jsonl   # one ConversationMessage per line
//! ├── locks/{repo_id}.lock            # advisory lock for the active session
//! └── tasks.json                      # task log, most recent first
//! ```

use eyre::{Context, Result};
use fs2::FileExt;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::conversation::ConversationMessage;
use crate::error::StoreError;
use crate::repository::{CodeFile, Repository, RepositoryId};
use crate::task_log::{TaskLog, TaskRecord};

/// Options for importing a local directory
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Files larger than this are skipped
    pub max_file_bytes: u64,
    /// Directory names never descended into
    pub skip_dirs: Vec<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            max_file_bytes: crate::DEFAULT_MAX_FILE_BYTES,
            skip_dirs: vec!["target".to_string(), "node_modules".to_string(), "dist".to_string()],
        }
    }
}

/// Listing entry for a stored repository
#[derive(Debug, Clone)]
pub struct RepositorySummary {
    pub id: RepositoryId,
    pub name: String,
    pub file_count: usize,
}

/// Exclusive hold on one repository, released on drop
#[derive(Debug)]
pub struct RepoLock {
    file: fs::File,
    id: RepositoryId,
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        debug!(id = %self.id, "RepoLock::drop: releasing");
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(id = %self.id, error = %e, "Failed to release repository lock");
        }
    }
}

/// The on-disk repository mirror
pub struct RepoStore {
    base_path: PathBuf,
    task_log_capacity: usize,
}

impl RepoStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        for sub in ["repositories", "conversations", "locks"] {
            fs::create_dir_all(base_path.join(sub)).context("Failed to create store directory")?;
        }
        debug!(?base_path, "Opened repository store");
        Ok(Self {
            base_path,
            task_log_capacity: crate::task_log::DEFAULT_TASK_LOG_CAPACITY,
        })
    }

    /// Set the task log capacity used by `load_task_log`
    pub fn with_task_log_capacity(mut self, capacity: usize) -> Self {
        self.task_log_capacity = capacity;
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Import a local directory as a new repository
    pub fn import_dir(&self, root: &Path, name: Option<&str>, options: &ImportOptions) -> Result<Repository> {
        debug!(?root, ?name, "RepoStore::import_dir: called");
        if !root.is_dir() {
            return Err(eyre::eyre!("Not a directory: {}", root.display()));
        }

        let name = name
            .map(String::from)
            .or_else(|| root.file_name().map(|n| n.to_string_lossy().to_string()))
            .unwrap_or_else(|| "repository".to_string());

        let mut repo = Repository::new(name);
        let mut skipped = 0usize;

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e, &options.skip_dirs));

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let size = entry.metadata()?.len();
            if size > options.max_file_bytes {
                debug!(path = ?entry.path(), size, "RepoStore::import_dir: skipping large file");
                skipped += 1;
                continue;
            }

            let content = match fs::read_to_string(entry.path()) {
                Ok(c) => c,
                Err(e) => {
                    debug!(path = ?entry.path(), error = %e, "RepoStore::import_dir: skipping unreadable file");
                    skipped += 1;
                    continue;
                }
            };

            let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let path = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            repo.insert(CodeFile::new(path, content));
        }

        self.save_repository(&repo)?;
        info!(id = %repo.id, files = repo.len(), skipped, "Import complete");
        Ok(repo)
    }

    /// Persist a repository snapshot, replacing any previous version
    pub fn save_repository(&self, repo: &Repository) -> Result<()> {
        debug!(id = %repo.id, "RepoStore::save_repository: called");
        let path = self.repository_path(&repo.id);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(repo)?;
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path).context(format!("Failed to save repository {}", repo.id))?;
        Ok(())
    }

    /// Load a repository by exact id
    pub fn load_repository(&self, id: &str) -> Result<Repository> {
        debug!(%id, "RepoStore::load_repository: called");
        let path = self.repository_path(id);
        if !path.exists() {
            return Err(StoreError::RepositoryNotFound { id: id.to_string() }.into());
        }
        let content = fs::read_to_string(&path)?;
        let repo: Repository = serde_json::from_str(&content).context(format!("Corrupt repository file: {}", id))?;
        Ok(repo)
    }

    /// Find a repository by id, name, or unique id prefix
    pub fn resolve(&self, name_or_id: &str) -> Result<Repository> {
        debug!(%name_or_id, "RepoStore::resolve: called");
        if self.repository_path(name_or_id).exists() {
            return self.load_repository(name_or_id);
        }

        let summaries = self.list_repositories()?;
        if let Some(s) = summaries.iter().find(|s| s.name == name_or_id) {
            return self.load_repository(&s.id);
        }

        let prefixed: Vec<_> = summaries.iter().filter(|s| s.id.starts_with(name_or_id)).collect();
        match prefixed.as_slice() {
            [only] => self.load_repository(&only.id),
            [] => Err(StoreError::RepositoryNotFound {
                id: name_or_id.to_string(),
            }
            .into()),
            many => Err(eyre::eyre!(
                "Ambiguous repository '{}' matches {} repositories",
                name_or_id,
                many.len()
            )),
        }
    }

    /// List all stored repositories
    pub fn list_repositories(&self) -> Result<Vec<RepositorySummary>> {
        let mut summaries = Vec::new();

        for entry in fs::read_dir(self.base_path.join("repositories"))? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                let content = fs::read_to_string(&path)?;
                match serde_json::from_str::<Repository>(&content) {
                    Ok(repo) => summaries.push(RepositorySummary {
                        file_count: repo.len(),
                        id: repo.id,
                        name: repo.name,
                    }),
                    Err(e) => warn!(?path, error = %e, "Skipping corrupt repository file"),
                }
            }
        }

        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }

    /// Delete a repository, its transcript and its lock file
    pub fn delete(&self, id: &str) -> Result<()> {
        let repo_path = self.repository_path(id);
        if !repo_path.exists() {
            return Err(StoreError::RepositoryNotFound { id: id.to_string() }.into());
        }
        fs::remove_file(&repo_path)?;
        for path in [self.conversation_path(id), self.lock_path(id)] {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        info!(id, "Deleted repository");
        Ok(())
    }

    /// Take the exclusive session lock for a repository
    pub fn lock(&self, id: &str) -> Result<RepoLock> {
        debug!(%id, "RepoStore::lock: called");
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path(id))?;

        if file.try_lock_exclusive().is_err() {
            debug!(%id, "RepoStore::lock: already held");
            return Err(StoreError::Locked { id: id.to_string() }.into());
        }

        Ok(RepoLock {
            file,
            id: id.to_string(),
        })
    }

    /// Load the task log (empty if none saved yet)
    pub fn load_task_log(&self) -> Result<TaskLog> {
        let path = self.base_path.join("tasks.json");
        if !path.exists() {
            return Ok(TaskLog::new(self.task_log_capacity));
        }
        let content = fs::read_to_string(&path)?;
        let records: Vec<TaskRecord> = serde_json::from_str(&content).context("Corrupt task log")?;
        Ok(TaskLog::from_records(self.task_log_capacity, records))
    }

    pub fn save_task_log(&self, log: &TaskLog) -> Result<()> {
        debug!(records = log.len(), "RepoStore::save_task_log: called");
        let path = self.base_path.join("tasks.json");
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&log.to_vec())?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Append messages to a repository's transcript
    pub fn append_conversation(&self, id: &str, messages: &[ConversationMessage]) -> Result<()> {
        debug!(%id, count = messages.len(), "RepoStore::append_conversation: called");
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.conversation_path(id))?;

        for msg in messages {
            writeln!(file, "{}", serde_json::to_string(msg)?)?;
        }
        Ok(())
    }

    /// Full transcript for a repository, oldest first
    pub fn load_conversation(&self, id: &str) -> Result<Vec<ConversationMessage>> {
        let path = self.conversation_path(id);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(fs::File::open(&path)?);
        let mut messages = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            messages.push(serde_json::from_str(&line)?);
        }
        Ok(messages)
    }

    fn repository_path(&self, id: &str) -> PathBuf {
        self.base_path.join("repositories").join(format!("{}.json", id))
    }

    fn conversation_path(&self, id: &str) -> PathBuf {
        self.base_path.join("conversations").join(format!("{}.jsonl", id))
    }

    fn lock_path(&self, id: &str) -> PathBuf {
        self.base_path.join("locks").join(format!("{}.lock", id))
    }
}

fn is_skipped_dir(entry: &walkdir::DirEntry, skip_dirs: &[String]) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || skip_dirs.iter().any(|s| *s == name)
}
