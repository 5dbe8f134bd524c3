//! Agent control loop
//!
//! Drives one user request to completion: render the system prompt, call
//! the model, parse exactly one action from the reply, execute it against
//! the repository snapshot, feed the observation back and repeat. Each turn
//! makes one model call (a natural-language edit makes a second call inside
//! the same turn). The loop ends when the model finishes, on a terminal
//! error, or when the turn budget runs out.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use repostore::{CodeChange, ConversationMessage, FileStore, TaskLog, TaskRecord};

use super::action::{AgentAction, extract_code, normalize_path, parse_action};
use super::error::{ActionError, AgentError};
use super::events::AgentEvent;
use crate::config::AgentConfig;
use crate::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, Message};
use crate::prompts::{AgentPromptContext, EditPromptContext, PromptLoader};

/// How a run ended
#[derive(Debug)]
pub enum LoopOutcome {
    /// The model issued `finish`; `message` is surfaced verbatim
    Finished { message: String },
    /// A terminal error ended the run
    Failed { error: AgentError },
}

/// Result of one `AgentEngine::run` call
#[derive(Debug)]
pub struct AgentRun {
    pub run_id: String,
    pub outcome: LoopOutcome,
    /// New transcript entries, in order: the user message, model replies,
    /// observations and the final assistant message
    pub transcript: Vec<ConversationMessage>,
    /// Model turns used
    pub turns: u32,
    /// Task records appended during the run, oldest first
    pub tasks: Vec<TaskRecord>,
}

impl AgentRun {
    pub fn is_finished(&self) -> bool {
        matches!(self.outcome, LoopOutcome::Finished { .. })
    }

    /// The final assistant message (carries the last change, if any)
    pub fn final_message(&self) -> Option<&ConversationMessage> {
        self.transcript.last()
    }

    /// The last change applied during the run
    pub fn last_change(&self) -> Option<&CodeChange> {
        self.final_message().and_then(|m| m.attached_change.as_ref())
    }
}

/// What to do after an action
enum Step {
    Continue,
    Finish(String),
}

/// Per-run loop state
struct LoopState {
    /// Model context: history plus everything added this run
    messages: Vec<Message>,
    /// Entries added this run
    transcript: Vec<ConversationMessage>,
    turn: u32,
    max_turns: u32,
    terminated: bool,
    /// Paths successfully read this run
    read_paths: HashSet<String>,
    last_change: Option<CodeChange>,
    tasks: Vec<TaskRecord>,
}

impl LoopState {
    fn new(history: &[ConversationMessage], user_message: &str, max_turns: u32) -> Self {
        let mut messages: Vec<Message> = history.iter().map(Message::from).collect();
        messages.push(Message::user(user_message));
        Self {
            messages,
            transcript: vec![ConversationMessage::user(user_message)],
            turn: 0,
            max_turns,
            terminated: false,
            read_paths: HashSet::new(),
            last_change: None,
            tasks: Vec::new(),
        }
    }

    fn record_reply(&mut self, text: &str) {
        self.messages.push(Message::assistant(text));
        self.transcript.push(ConversationMessage::assistant(text));
    }

    fn observe(&mut self, text: &str) {
        self.messages.push(Message::system(text));
        self.transcript.push(ConversationMessage::system(text));
    }
}

/// The agent loop engine
pub struct AgentEngine {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    config: AgentConfig,
    events: Option<mpsc::UnboundedSender<AgentEvent>>,
}

impl AgentEngine {
    /// Create an engine with embedded prompts
    pub fn new(llm: Arc<dyn LlmClient>, config: AgentConfig) -> Self {
        debug!(max_turns = config.max_turns, "AgentEngine::new: called");
        let prompts = Arc::new(PromptLoader::new(config.prompts_dir.as_deref()));
        Self {
            llm,
            prompts,
            config,
            events: None,
        }
    }

    /// Send progress events to `tx`
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<AgentEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Replace or clear the event sender between runs
    pub fn set_events(&mut self, tx: Option<mpsc::UnboundedSender<AgentEvent>>) {
        self.events = tx;
    }

    /// Override the turn budget
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.config.max_turns = max_turns;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.events {
            debug!(event_type = event.event_type(), "emit: sending event");
            // Receiver gone is fine
            let _ = tx.send(event);
        }
    }

    /// Run the loop for one user message
    ///
    /// The repository stays locked for the whole run; a repository that is
    /// already locked fails fast with `AgentError::RepositoryBusy`. Applied
    /// writes are pushed onto `task_log` as they happen.
    pub async fn run<S>(
        &self,
        repo: &Mutex<S>,
        history: &[ConversationMessage],
        user_message: &str,
        task_log: &mut TaskLog,
        cancel: &CancellationToken,
    ) -> AgentRun
    where
        S: FileStore + ?Sized,
    {
        let run_id = Uuid::now_v7().to_string();
        debug!(%run_id, history_len = history.len(), max_turns = self.config.max_turns, "run: called");
        let mut state = LoopState::new(history, user_message, self.config.max_turns);

        let result = match repo.try_lock() {
            Ok(mut guard) => {
                info!("Starting agent run {} (max_turns: {})", run_id, state.max_turns);
                self.drive(&mut *guard, &mut state, user_message, task_log, cancel, &run_id)
                    .await
            }
            Err(_) => {
                debug!(%run_id, "run: repository busy");
                Err(AgentError::RepositoryBusy)
            }
        };
        state.terminated = true;

        let (outcome, text) = match result {
            Ok(message) => {
                info!("Agent run {} finished after {} turns", run_id, state.turn);
                self.emit(AgentEvent::Finished {
                    message: message.clone(),
                });
                let text = message.clone();
                (LoopOutcome::Finished { message }, text)
            }
            Err(error) => {
                warn!("Agent run {} failed after {} turns: {}", run_id, state.turn, error);
                let text = error.user_message();
                self.emit(AgentEvent::Failed { message: text.clone() });
                (LoopOutcome::Failed { error }, text)
            }
        };

        let mut final_message = ConversationMessage::assistant(text);
        if let Some(change) = state.last_change.take() {
            final_message = final_message.with_change(change);
        }
        state.transcript.push(final_message);

        AgentRun {
            run_id,
            outcome,
            transcript: state.transcript,
            turns: state.turn,
            tasks: state.tasks,
        }
    }

    async fn drive<S>(
        &self,
        store: &mut S,
        state: &mut LoopState,
        user_message: &str,
        task_log: &mut TaskLog,
        cancel: &CancellationToken,
        run_id: &str,
    ) -> Result<String, AgentError>
    where
        S: FileStore + ?Sized,
    {
        let system_prompt = self.system_prompt(store)?;

        while !state.terminated && state.turn < state.max_turns {
            if cancel.is_cancelled() {
                debug!(%run_id, "drive: cancelled before turn");
                return Err(AgentError::Cancelled);
            }

            state.turn += 1;
            info!("Agent run {} turn {}/{}", run_id, state.turn, state.max_turns);
            self.emit(AgentEvent::TurnStarted {
                turn: state.turn,
                max_turns: state.max_turns,
            });

            let request = CompletionRequest::new(system_prompt.clone(), state.messages.clone());
            let response = self.call_model(request, cancel).await?;
            state.record_reply(&response.content);

            let action = parse_action(&response.content).map_err(|source| {
                debug!(%run_id, error = %source, "drive: parse failed");
                AgentError::Parse {
                    raw: response.content.clone(),
                    source,
                }
            })?;
            debug!(%run_id, action = %action.summary(), "drive: action parsed");
            self.emit(AgentEvent::ActionParsed {
                turn: state.turn,
                summary: action.summary(),
            });

            match self
                .execute(action, store, state, user_message, task_log, cancel)
                .await?
            {
                Step::Finish(message) => {
                    debug!(%run_id, "drive: finish action");
                    state.terminated = true;
                    return Ok(message);
                }
                Step::Continue => {
                    debug!(%run_id, turn = state.turn, "drive: continuing");
                }
            }
        }

        debug!(%run_id, max_turns = state.max_turns, "drive: turn budget exhausted");
        Err(AgentError::TurnBudgetExhausted {
            max_turns: state.max_turns,
        })
    }

    fn system_prompt<S>(&self, store: &S) -> Result<String, AgentError>
    where
        S: FileStore + ?Sized,
    {
        let mut context =
            AgentPromptContext::new(store.repository_name(), store.list_files(), self.config.max_turns);
        context.require_read_before_write = self.config.require_read_before_write;
        context.natural_language_edits = self.config.natural_language_edits;
        self.prompts
            .agent_prompt(&context)
            .map_err(|e| AgentError::Prompt(e.to_string()))
    }

    /// One model call, raced against cancellation
    async fn call_model(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<CompletionResponse, AgentError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("call_model: cancelled");
                Err(AgentError::Cancelled)
            }
            result = self.llm.complete(request, cancel) => match result {
                Ok(response) => Ok(response),
                Err(LlmError::Cancelled) => Err(AgentError::Cancelled),
                Err(e) => Err(AgentError::Llm(e)),
            }
        }
    }

    async fn execute<S>(
        &self,
        action: AgentAction,
        store: &mut S,
        state: &mut LoopState,
        user_message: &str,
        task_log: &mut TaskLog,
        cancel: &CancellationToken,
    ) -> Result<Step, AgentError>
    where
        S: FileStore + ?Sized,
    {
        match action {
            AgentAction::ReadFile { path } => {
                let path = normalize_path(&path);
                let observation = match store.read_file(path) {
                    Ok(content) => {
                        debug!(%path, "execute: read file");
                        state.read_paths.insert(path.to_string());
                        format!("Content of {}:\n```\n{}\n```", path, content)
                    }
                    Err(e) if e.is_not_found() => {
                        debug!(%path, "execute: read of unknown path");
                        not_found_observation(path, store)
                    }
                    Err(e) => format!("Failed to read {}: {}", path, e),
                };
                self.push_observation(state, &observation);
                Ok(Step::Continue)
            }
            AgentAction::WriteFile { path, content } => {
                let path = normalize_path(&path).to_string();
                match self.writable(store, state, &path) {
                    Ok(_) => {
                        self.apply_write(store, state, &path, content, user_message, task_log, cancel)?;
                    }
                    Err(e) => self.reject(store, state, e),
                }
                Ok(Step::Continue)
            }
            AgentAction::NaturalLanguageEdit {
                path,
                instruction,
                selected_content,
            } => {
                if !self.config.natural_language_edits {
                    debug!("execute: natural language edits disabled");
                    return Err(AgentError::UnknownAction {
                        action: "naturalLanguageWriteFile".to_string(),
                    });
                }
                let path = normalize_path(&path).to_string();
                let original = match self.writable(store, state, &path) {
                    Ok(original) => original,
                    Err(e) => {
                        self.reject(store, state, e);
                        return Ok(Step::Continue);
                    }
                };

                let snippet = selected_content.filter(|s| !s.is_empty());
                if let Some(ref snippet) = snippet
                    && !original.contains(snippet.as_str())
                {
                    self.reject(store, state, ActionError::SnippetNotFound { path });
                    return Ok(Step::Continue);
                }

                if cancel.is_cancelled() {
                    return Err(AgentError::Cancelled);
                }
                let context = EditPromptContext {
                    path: path.clone(),
                    instruction: instruction.clone(),
                    content: snippet.clone().unwrap_or_else(|| original.clone()),
                    is_snippet: snippet.is_some(),
                };
                let prompt = self
                    .prompts
                    .edit_prompt(&context)
                    .map_err(|e| AgentError::Prompt(e.to_string()))?;
                let reply = self
                    .call_model(CompletionRequest::new(prompt, vec![Message::user(instruction)]), cancel)
                    .await?;

                if reply.content.trim().is_empty() {
                    self.reject(store, state, ActionError::EmptyEdit { path });
                    return Ok(Step::Continue);
                }
                let replacement = extract_code(&reply.content);
                let modified = match snippet {
                    Some(snippet) => original.replacen(&snippet, &replacement, 1),
                    None => replacement,
                };
                self.apply_write(store, state, &path, modified, user_message, task_log, cancel)?;
                Ok(Step::Continue)
            }
            AgentAction::Finish { message } => Ok(Step::Finish(message)),
            AgentAction::Unknown { action } => {
                debug!(%action, "execute: unknown action");
                Err(AgentError::UnknownAction { action })
            }
        }
    }

    /// Current content of `path` if it may be modified
    fn writable<S>(&self, store: &S, state: &LoopState, path: &str) -> Result<String, ActionError>
    where
        S: FileStore + ?Sized,
    {
        let content = store.read_file(path).map_err(|_| ActionError::FileNotFound {
            path: path.to_string(),
        })?;
        if self.config.require_read_before_write && !state.read_paths.contains(path) {
            return Err(ActionError::NotRead { path: path.to_string() });
        }
        Ok(content.to_string())
    }

    fn reject<S>(&self, store: &S, state: &mut LoopState, error: ActionError)
    where
        S: FileStore + ?Sized,
    {
        debug!(error = %error, "reject: action rejected");
        let observation = match &error {
            ActionError::FileNotFound { path } => not_found_observation(path, store),
            other => other.to_string(),
        };
        self.push_observation(state, &observation);
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_write<S>(
        &self,
        store: &mut S,
        state: &mut LoopState,
        path: &str,
        modified: String,
        user_message: &str,
        task_log: &mut TaskLog,
        cancel: &CancellationToken,
    ) -> Result<(), AgentError>
    where
        S: FileStore + ?Sized,
    {
        if cancel.is_cancelled() {
            debug!(%path, "apply_write: cancelled before mutation");
            return Err(AgentError::Cancelled);
        }

        match store.write_file(path, &modified) {
            Ok(original) => {
                info!("Wrote {} ({} bytes)", path, modified.len());
                let record = TaskRecord::completed(
                    store.repository_id(),
                    user_message,
                    path,
                    original.clone(),
                    modified.clone(),
                );
                task_log.push(record.clone());
                state.tasks.push(record);

                let change = CodeChange {
                    path: path.to_string(),
                    original,
                    modified,
                };
                self.emit(AgentEvent::FileWritten { change: change.clone() });
                state.last_change = Some(change);
                self.push_observation(state, &format!("Successfully wrote {}.", path));
            }
            Err(e) => {
                warn!("Write to {} failed: {}", path, e);
                let observation = if e.is_not_found() {
                    not_found_observation(path, store)
                } else {
                    format!("Failed to write {}: {}", path, e)
                };
                self.push_observation(state, &observation);
            }
        }
        Ok(())
    }

    fn push_observation(&self, state: &mut LoopState, observation: &str) {
        state.observe(observation);
        self.emit(AgentEvent::Observation {
            turn: state.turn,
            content: observation.to_string(),
        });
    }
}

fn not_found_observation<S>(path: &str, store: &S) -> String
where
    S: FileStore + ?Sized,
{
    format!(
        "{} Known files: {}",
        ActionError::FileNotFound { path: path.to_string() },
        store.list_files().join(", ")
    )
}
