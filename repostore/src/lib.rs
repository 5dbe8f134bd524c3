//! RepoStore - local mirror of imported repositories
//!
//! Holds repository snapshots, chat transcripts and the task log on local
//! disk. The agent loop only ever mutates these snapshots through the
//! [`FileStore`] trait, never a real working tree.
//!
//! # Architecture
//!
//! ```text
//! .weaver/
//! ├── repositories/{repo_id}.json
//! ├── conversations/{repo_id}.jsonl
//! ├── locks/{repo_id}.lock
//! └── tasks.json
//! ```
//!
//! # Example
//!
//! ```ignore
//! use repostore::{FileStore, ImportOptions, RepoStore};
//!
//! let store = RepoStore::open(".weaver")?;
//! let repo = store.import_dir(Path::new("."), None, &ImportOptions::default())?;
//! println!("{}", repo.read_file("src/main.rs")?);
//! ```

pub mod cli;
pub mod config;
mod conversation;
mod error;
mod repository;
mod store;
mod task_log;

pub use conversation::{CodeChange, ConversationMessage, Role};
pub use error::StoreError;
pub use repository::{CodeFile, FileStore, Repository, RepositoryId};
pub use store::{ImportOptions, RepoLock, RepoStore, RepositorySummary};
pub use task_log::{DEFAULT_TASK_LOG_CAPACITY, TaskLog, TaskRecord, TaskStatus};

/// Files above this size are not imported (512KB)
pub const DEFAULT_MAX_FILE_BYTES: u64 = 512 * 1024;
