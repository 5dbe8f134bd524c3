//! Weaver - agent loop for editing repository snapshots
//!
//! Weaver sends a user request about a stored repository to a locally
//! hosted model (Ollama, usually behind an ngrok tunnel), parses the single
//! JSON action in each reply, executes it against the in-memory snapshot and
//! feeds the observation back until the model finishes or the turn budget
//! runs out. Applied writes are recorded in the task log and rendered as
//! line diffs.
//!
//! # Modules
//!
//! - [`agent`] - Action parsing and the control loop
//! - [`diff`] - Myers line diff and diff statistics
//! - [`llm`] - Model client trait and the Ollama adapter
//! - [`prompts`] - Handlebars prompt templates with user overrides
//! - [`session`] - Store-backed chat session for one repository
//! - [`repl`] - Interactive chat
//! - [`render`] - Terminal output for progress and diff cards
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod agent;
pub mod cli;
pub mod config;
pub mod diff;
pub mod llm;
pub mod prompts;
pub mod render;
pub mod repl;
pub mod session;

// Re-export commonly used types
pub use agent::{AgentAction, AgentEngine, AgentError, AgentEvent, AgentRun, LoopOutcome, parse_action};
pub use config::{AgentConfig, ApiMode, Config, LlmConfig};
pub use diff::{DiffLine, DiffStats, diff_lines};
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, OllamaClient, create_client};
pub use session::RepoSession;
