//! Interactive chat REPL for Weaver
//!
//! One agent run per input line, with slash commands for inspecting the
//! repository snapshot, transcript and task log.

mod session;

pub use session::{ReplSession, SlashResult};

use std::sync::Arc;

use eyre::Result;

use crate::config::Config;
use crate::llm::LlmClient;
use crate::session::RepoSession;

/// Run the interactive REPL
///
/// This is the main entry point for `weaver chat`.
pub async fn run_interactive(config: &Config, repo: &str, llm: Arc<dyn LlmClient>) -> Result<()> {
    let session = RepoSession::open(config, repo, llm)?;
    let mut repl = ReplSession::new(session);
    repl.run().await
}
