//! Agent control loop
//!
//! Prompt the model, parse one action, execute it against the repository
//! snapshot, feed the observation back, repeat until `finish`, a terminal
//! error or the turn budget.

mod action;
mod engine;
mod error;
mod events;

pub use action::{AgentAction, extract_code, fenced_blocks, normalize_path, parse_action};
pub use engine::{AgentEngine, AgentRun, LoopOutcome};
pub use error::{ActionError, ActionParseError, AgentError};
pub use events::AgentEvent;
