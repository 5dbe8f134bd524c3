//! Store error types

use thiserror::Error;

/// Errors that can occur in the repository store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Repository not found: {id}")]
    RepositoryNotFound { id: String },

    #[error("Repository {id} is locked by another session")]
    Locked { id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Check if this is a missing-file error
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::FileNotFound { .. })
    }
}
