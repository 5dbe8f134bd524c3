//! Agent error types

use thiserror::Error;

use crate::llm::LlmError;

/// Why a model reply could not be turned into an action
#[derive(Debug, Error)]
pub enum ActionParseError {
    #[error("response was empty")]
    Empty,

    #[error("no JSON object found in response")]
    NoJson,

    #[error("JSON object has no string \"action\" field")]
    MissingTag,

    #[error("invalid {action} action: {reason}")]
    InvalidFields { action: String, reason: String },
}

/// Problems with a single action; reported back to the model as an
/// observation and the loop continues
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("File {path} must be read with readFile before it can be modified")]
    NotRead { path: String },

    #[error("Selected content was not found in {path}")]
    SnippetNotFound { path: String },

    #[error("Edit of {path} produced no content")]
    EmptyEdit { path: String },
}

/// Terminal failures of an agent run
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Could not parse the model response: {source}")]
    Parse {
        raw: String,
        #[source]
        source: ActionParseError,
    },

    #[error("Unknown action: {action}")]
    UnknownAction { action: String },

    #[error("Exceeded the turn budget ({max_turns} turns)")]
    TurnBudgetExhausted { max_turns: u32 },

    #[error("Run cancelled")]
    Cancelled,

    #[error("Repository is busy with another request")]
    RepositoryBusy,

    #[error("Prompt rendering failed: {0}")]
    Prompt(String),

    #[error("Model request failed: {0}")]
    Llm(#[from] LlmError),
}

impl AgentError {
    /// Text shown to the user as the final assistant message
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Parse { raw, .. } => {
                format!("I couldn't understand the model's response as an action. Raw response:\n{}", raw)
            }
            AgentError::UnknownAction { action } => {
                format!("The model requested an unknown action \"{}\".", action)
            }
            AgentError::TurnBudgetExhausted { max_turns } => {
                format!(
                    "The assistant took too many steps ({} turns) without finishing. Try a more specific request.",
                    max_turns
                )
            }
            AgentError::Cancelled => "The request was cancelled.".to_string(),
            AgentError::RepositoryBusy => {
                "This repository is already handling another request. Try again when it finishes.".to_string()
            }
            AgentError::Prompt(e) => format!("Failed to build the prompt: {}", e),
            AgentError::Llm(LlmError::Cancelled) => "The request was cancelled.".to_string(),
            AgentError::Llm(e) => format!("{} {}", e, e.remedy()),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AgentError::Cancelled | AgentError::Llm(LlmError::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_quotes_raw() {
        let err = AgentError::Parse {
            raw: "Sure! Here's my plan...".to_string(),
            source: ActionParseError::NoJson,
        };
        assert!(err.user_message().contains("Sure! Here's my plan..."));
        assert!(err.to_string().contains("no JSON object"));
    }

    #[test]
    fn test_turn_budget_message() {
        let err = AgentError::TurnBudgetExhausted { max_turns: 10 };
        assert!(err.user_message().contains("too many steps"));
    }

    #[test]
    fn test_llm_error_includes_remedy() {
        let err = AgentError::from(LlmError::TunnelInterstitial { status: 200 });
        assert!(err.user_message().contains("tunnel"));
    }

    #[test]
    fn test_is_cancelled() {
        assert!(AgentError::Cancelled.is_cancelled());
        assert!(AgentError::Llm(LlmError::Cancelled).is_cancelled());
        assert!(!AgentError::UnknownAction { action: "x".to_string() }.is_cancelled());
    }

    #[test]
    fn test_action_error_messages() {
        let err = ActionError::FileNotFound {
            path: "src/missing.rs".to_string(),
        };
        assert_eq!(err.to_string(), "File not found: src/missing.rs");
    }
}
