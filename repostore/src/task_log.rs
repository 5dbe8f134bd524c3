//! Task log - audit trail of applied file changes
//!
//! Append-only, most-recent-first, bounded. When full, the oldest record is
//! evicted.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Status of a task record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Completed,
}

/// One applied change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub repository_id: String,
    /// The user request that led to this change
    pub prompt: String,
    pub status: TaskStatus,
    /// Creation timestamp (unix ms)
    pub created_at: i64,
    pub path: String,
    pub original_code: String,
    pub modified_code: String,
}

impl TaskRecord {
    pub fn completed(
        repository_id: impl Into<String>,
        prompt: impl Into<String>,
        path: impl Into<String>,
        original_code: impl Into<String>,
        modified_code: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            repository_id: repository_id.into(),
            prompt: prompt.into(),
            status: TaskStatus::Completed,
            created_at: chrono::Utc::now().timestamp_millis(),
            path: path.into(),
            original_code: original_code.into(),
            modified_code: modified_code.into(),
        }
    }
}

/// Default number of records kept
pub const DEFAULT_TASK_LOG_CAPACITY: usize = 100;

/// Bounded, most-recent-first list of task records
#[derive(Debug, Clone)]
pub struct TaskLog {
    capacity: usize,
    records: VecDeque<TaskRecord>,
}

impl TaskLog {
    pub fn new(capacity: usize) -> Self {
        debug!(%capacity, "TaskLog::new: called");
        Self {
            capacity: capacity.max(1),
            records: VecDeque::new(),
        }
    }

    /// Rebuild a log from persisted records (already most-recent-first)
    pub fn from_records(capacity: usize, records: Vec<TaskRecord>) -> Self {
        let mut log = Self::new(capacity);
        log.records = records.into_iter().take(log.capacity).collect();
        log
    }

    /// Add a record at the front, evicting the oldest when over capacity
    pub fn push(&mut self, record: TaskRecord) {
        debug!(id = %record.id, path = %record.path, "TaskLog::push: called");
        self.records.push_front(record);
        while self.records.len() > self.capacity {
            if let Some(evicted) = self.records.pop_back() {
                debug!(id = %evicted.id, "TaskLog::push: evicted oldest record");
            }
        }
    }

    /// Records, most recent first
    pub fn iter(&self) -> impl Iterator<Item = &TaskRecord> {
        self.records.iter()
    }

    pub fn for_repository<'a>(&'a self, repository_id: &'a str) -> impl Iterator<Item = &'a TaskRecord> {
        self.records.iter().filter(move |r| r.repository_id == repository_id)
    }

    pub fn latest(&self) -> Option<&TaskRecord> {
        self.records.front()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn to_vec(&self) -> Vec<TaskRecord> {
        self.records.iter().cloned().collect()
    }
}

impl Default for TaskLog {
    fn default() -> Self {
        Self::new(DEFAULT_TASK_LOG_CAPACITY)
    }
}
