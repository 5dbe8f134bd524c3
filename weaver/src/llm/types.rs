//! LLM request/response types for Weaver
//!
//! Model replies are plain text; structure (actions) is parsed out of the
//! text by the agent loop, not by the provider.

use serde::{Deserialize, Serialize};
use tracing::debug;

use repostore::ConversationMessage;

/// A completion request - everything needed for one model call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt (rendered from Handlebars template)
    pub system_prompt: String,

    /// Conversation so far, oldest first
    pub messages: Vec<Message>,
}

impl CompletionRequest {
    pub fn new(system_prompt: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages,
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        debug!("Message::user: called");
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        debug!("Message::assistant: called");
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }

    /// Create a system message (observations fed back to the model)
    pub fn system(text: impl Into<String>) -> Self {
        debug!("Message::system: called");
        Self {
            role: Role::System,
            content: text.into(),
        }
    }
}

impl From<&ConversationMessage> for Message {
    fn from(msg: &ConversationMessage) -> Self {
        Self {
            role: msg.role.into(),
            content: msg.content.clone(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Label used when a history is flattened into a single prompt
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => "System",
        }
    }
}

impl From<repostore::Role> for Role {
    fn from(role: repostore::Role) -> Self {
        match role {
            repostore::Role::User => Role::User,
            repostore::Role::Assistant => Role::Assistant,
            repostore::Role::System => Role::System,
        }
    }
}

/// Response from a completion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    /// Full text of the model reply
    pub content: String,

    /// Tokens evaluated for the prompt, if reported
    pub prompt_tokens: Option<u64>,

    /// Tokens generated, if reported
    pub completion_tokens: Option<u64>,
}

impl CompletionResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            prompt_tokens: None,
            completion_tokens: None,
        }
    }
}
