//! Progress events emitted while an agent run is in flight

use repostore::CodeChange;

/// What happened during a run, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// A model call is about to be made
    TurnStarted { turn: u32, max_turns: u32 },

    /// The model reply parsed into an action
    ActionParsed { turn: u32, summary: String },

    /// An observation was fed back to the model
    Observation { turn: u32, content: String },

    /// A file in the snapshot was replaced
    FileWritten { change: CodeChange },

    /// The run finished with a message for the user
    Finished { message: String },

    /// The run ended with an error
    Failed { message: String },
}

impl AgentEvent {
    /// Short name for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            AgentEvent::TurnStarted { .. } => "turn_started",
            AgentEvent::ActionParsed { .. } => "action_parsed",
            AgentEvent::Observation { .. } => "observation",
            AgentEvent::FileWritten { .. } => "file_written",
            AgentEvent::Finished { .. } => "finished",
            AgentEvent::Failed { .. } => "failed",
        }
    }
}
