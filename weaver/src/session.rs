//! Store-backed chat session for one repository
//!
//! Opens a repository from the local mirror, holds its cross-process lock,
//! runs the agent loop for each user message and persists the results:
//! the updated snapshot, the task log and the transcript.

use std::sync::Arc;

use eyre::{Context, Result};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use repostore::{ConversationMessage, FileStore, RepoLock, RepoStore, Repository, TaskRecord};

use crate::agent::{AgentEngine, AgentEvent, AgentRun};
use crate::config::Config;
use crate::llm::LlmClient;

/// A repository opened for chatting
pub struct RepoSession {
    store: RepoStore,
    repo: Mutex<Repository>,
    repository_id: String,
    repository_name: String,
    history: Vec<ConversationMessage>,
    engine: AgentEngine,
    _lock: RepoLock,
}

impl RepoSession {
    /// Open `name_or_id` from the store configured in `config`
    pub fn open(config: &Config, name_or_id: &str, llm: Arc<dyn LlmClient>) -> Result<Self> {
        debug!(%name_or_id, "RepoSession::open: called");
        let store = RepoStore::open(&config.storage.store_dir)?.with_task_log_capacity(config.storage.task_log_capacity);
        Self::with_store(store, name_or_id, AgentEngine::new(llm, config.agent.clone()))
    }

    /// Open a repository from an existing store with a prepared engine
    pub fn with_store(store: RepoStore, name_or_id: &str, engine: AgentEngine) -> Result<Self> {
        let repo = store.resolve(name_or_id)?;
        let lock = store.lock(&repo.id)?;
        let history = store
            .load_conversation(&repo.id)
            .context("Failed to load conversation")?;
        info!("Opened repository {} ({} files, {} messages)", repo.name, repo.len(), history.len());

        Ok(Self {
            repository_id: repo.id.clone(),
            repository_name: repo.name.clone(),
            store,
            repo: Mutex::new(repo),
            history,
            engine,
            _lock: lock,
        })
    }

    /// Send progress events to `tx`
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<AgentEvent>) -> Self {
        self.engine = self.engine.with_events(tx);
        self
    }

    /// Replace or clear the event sender between messages
    pub fn set_events(&mut self, tx: Option<mpsc::UnboundedSender<AgentEvent>>) {
        self.engine.set_events(tx);
    }

    /// Override the turn budget
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.engine = self.engine.with_max_turns(max_turns);
        self
    }

    pub fn repository_id(&self) -> &str {
        &self.repository_id
    }

    pub fn repository_name(&self) -> &str {
        &self.repository_name
    }

    /// Transcript so far, oldest first
    pub fn history(&self) -> &[ConversationMessage] {
        &self.history
    }

    /// Paths of the repository in import order
    pub async fn files(&self) -> Vec<String> {
        self.repo.lock().await.list_files()
    }

    /// Task records for this repository, most recent first
    pub fn tasks(&self) -> Result<Vec<TaskRecord>> {
        let log = self.store.load_task_log()?;
        Ok(log.for_repository(&self.repository_id).cloned().collect())
    }

    /// Run the agent loop for one message and persist the outcome
    ///
    /// The transcript is written even when saving the snapshot fails.
    pub async fn send(&mut self, message: &str, cancel: &CancellationToken) -> Result<AgentRun> {
        debug!(repository_id = %self.repository_id, "RepoSession::send: called");
        let mut task_log = self.store.load_task_log()?;
        let run = self
            .engine
            .run(&self.repo, &self.history, message, &mut task_log, cancel)
            .await;

        let transcript = self
            .store
            .append_conversation(&self.repository_id, &run.transcript)
            .context("Failed to save conversation");
        self.history.extend(run.transcript.iter().cloned());

        if !run.tasks.is_empty() {
            debug!(task_count = run.tasks.len(), "RepoSession::send: saving changes");
            let snapshot = self.repo.lock().await.clone();
            self.store
                .save_repository(&snapshot)
                .context("Failed to save repository")?;
            self.store.save_task_log(&task_log).context("Failed to save task log")?;
        }
        transcript?;

        Ok(run)
    }
}
