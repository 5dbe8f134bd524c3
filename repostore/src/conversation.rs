//! Conversation transcript types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Observations fed back to the model (file contents, write results)
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A change applied to one file, shown to the user as a diff card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeChange {
    pub path: String,
    pub original: String,
    pub modified: String,
}

/// One entry of a chat transcript. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_change: Option<CodeChange>,
    /// Creation timestamp (unix ms)
    pub created_at: i64,
}

impl ConversationMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            role,
            content: content.into(),
            attached_change: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn with_change(mut self, change: CodeChange) -> Self {
        self.attached_change = Some(change);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_message_without_change_omits_field() {
        let msg = ConversationMessage::user("hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("attached_change").is_none());
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = ConversationMessage::system("a");
        let b = ConversationMessage::system("b");
        assert_ne!(a.id, b.id);
    }
}
