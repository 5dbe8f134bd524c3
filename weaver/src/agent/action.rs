//! Agent actions and the parse gate that extracts them from model text
//!
//! The model answers in free text that should contain one JSON object
//! tagged by an `action` field. Fenced code blocks are tried in order and
//! the first one holding a JSON object wins; otherwise the whole trimmed
//! reply must be a JSON object. Fences open and close at the start of a
//! line, so backticks inside a JSON string never end a block.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use super::error::ActionParseError;

/// Fence line with optional info string, body, then a line holding only a fence
static FENCE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?ms)^[ \t]*```[^\n`]*\n(.*?)^[ \t]*```[ \t]*\r?$"));

/// Opening fence line, info string included
static OPEN_FENCE: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*```[^\n`]*\n"));

/// A line holding only a closing fence
static CLOSE_FENCE: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*```[ \t]*\r?$"));

/// One step requested by the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentAction {
    /// `{"action":"readFile","path":P}`
    ReadFile { path: String },

    /// `{"action":"writeFile","path":P,"content":C}`
    WriteFile { path: String, content: String },

    /// `{"action":"naturalLanguageWriteFile","path":P,"instruction":I,"selectedContent"?:S}`
    NaturalLanguageEdit {
        path: String,
        instruction: String,
        selected_content: Option<String>,
    },

    /// `{"action":"finish","message":M}`
    Finish { message: String },

    /// Any other tag
    Unknown { action: String },
}

impl AgentAction {
    /// Wire name of the action
    pub fn name(&self) -> &str {
        match self {
            AgentAction::ReadFile { .. } => "readFile",
            AgentAction::WriteFile { .. } => "writeFile",
            AgentAction::NaturalLanguageEdit { .. } => "naturalLanguageWriteFile",
            AgentAction::Finish { .. } => "finish",
            AgentAction::Unknown { action } => action,
        }
    }

    /// Target path for file actions
    pub fn path(&self) -> Option<&str> {
        match self {
            AgentAction::ReadFile { path }
            | AgentAction::WriteFile { path, .. }
            | AgentAction::NaturalLanguageEdit { path, .. } => Some(path),
            AgentAction::Finish { .. } | AgentAction::Unknown { .. } => None,
        }
    }

    /// One-line description for progress output
    pub fn summary(&self) -> String {
        match self.path() {
            Some(path) => format!("{} {}", self.name(), path),
            None => self.name().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action")]
enum KnownAction {
    #[serde(rename = "readFile")]
    ReadFile { path: String },

    #[serde(rename = "writeFile")]
    WriteFile { path: String, content: String },

    #[serde(rename = "naturalLanguageWriteFile")]
    NaturalLanguageEdit {
        path: String,
        instruction: String,
        #[serde(rename = "selectedContent", default)]
        selected_content: Option<String>,
    },

    #[serde(rename = "finish")]
    Finish { message: String },
}

impl From<KnownAction> for AgentAction {
    fn from(action: KnownAction) -> Self {
        match action {
            KnownAction::ReadFile { path } => AgentAction::ReadFile { path },
            KnownAction::WriteFile { path, content } => AgentAction::WriteFile { path, content },
            KnownAction::NaturalLanguageEdit {
                path,
                instruction,
                selected_content,
            } => AgentAction::NaturalLanguageEdit {
                path,
                instruction,
                selected_content,
            },
            KnownAction::Finish { message } => AgentAction::Finish { message },
        }
    }
}

const KNOWN_TAGS: [&str; 4] = ["readFile", "writeFile", "naturalLanguageWriteFile", "finish"];

/// Bodies of all fenced code blocks, in order
pub fn fenced_blocks(text: &str) -> Vec<&str> {
    match FENCE.as_ref() {
        Ok(re) => re
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .collect(),
        Err(e) => {
            warn!(error = %e, "fenced_blocks: fence pattern failed to compile");
            Vec::new()
        }
    }
}

/// Extract the single action from a model reply
pub fn parse_action(text: &str) -> Result<AgentAction, ActionParseError> {
    debug!(text_len = text.len(), "parse_action: called");
    let trimmed = text.trim();
    if trimmed.is_empty() {
        debug!("parse_action: empty response");
        return Err(ActionParseError::Empty);
    }

    let object = fenced_blocks(trimmed)
        .into_iter()
        .find_map(|body| json_object(body.trim()))
        .or_else(|| json_object(trimmed))
        .ok_or(ActionParseError::NoJson)?;

    let tag = match object.get("action") {
        Some(serde_json::Value::String(tag)) => tag.clone(),
        _ => {
            debug!("parse_action: missing action tag");
            return Err(ActionParseError::MissingTag);
        }
    };

    if !KNOWN_TAGS.contains(&tag.as_str()) {
        debug!(%tag, "parse_action: unknown tag");
        return Ok(AgentAction::Unknown { action: tag });
    }

    let known: KnownAction =
        serde_json::from_value(serde_json::Value::Object(object)).map_err(|e| ActionParseError::InvalidFields {
            action: tag.clone(),
            reason: e.to_string(),
        })?;
    debug!(%tag, "parse_action: parsed");
    Ok(known.into())
}

fn json_object(text: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Replacement text from an edit reply
///
/// The body runs from the first opening fence to the last closing fence, so
/// code blocks nested in the returned file survive. Without a fence the
/// trimmed reply is used.
pub fn extract_code(reply: &str) -> String {
    let (Ok(open), Ok(close)) = (OPEN_FENCE.as_ref(), CLOSE_FENCE.as_ref()) else {
        warn!("extract_code: fence pattern failed to compile");
        return reply.trim().to_string();
    };
    let Some(start) = open.find(reply) else {
        debug!("extract_code: no fence, using whole reply");
        return reply.trim().to_string();
    };

    let rest = &reply[start.end()..];
    let body = match close.find_iter(rest).last() {
        Some(end) => &rest[..end.start()],
        None => {
            debug!("extract_code: unterminated fence");
            rest
        }
    };
    let body = body.strip_suffix('\n').unwrap_or(body);
    body.strip_suffix('\r').unwrap_or(body).to_string()
}

/// Normalize a model-supplied path: trim whitespace and leading "./" segments
pub fn normalize_path(path: &str) -> &str {
    let mut path = path.trim();
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_finish_bare_json() {
        let action = parse_action(r#"{"action":"finish","message":"Done!"}"#).unwrap();
        assert_eq!(
            action,
            AgentAction::Finish {
                message: "Done!".to_string()
            }
        );
    }

    #[test]
    fn test_parse_fenced_json_with_prose() {
        let text = "I'll read the file first.\n```json\n{\"action\": \"readFile\", \"path\": \"src/a.ts\"}\n```\nThen edit.";
        let action = parse_action(text).unwrap();
        assert_eq!(
            action,
            AgentAction::ReadFile {
                path: "src/a.ts".to_string()
            }
        );
    }

    #[test]
    fn test_parse_fenced_write_with_backticks_in_content() {
        let text = "```json\n{\"action\":\"writeFile\",\"path\":\"README.md\",\"content\":\"# T\\n```rust\\nfn main() {}\\n```\\n\"}\n```";
        assert_eq!(
            parse_action(text).unwrap(),
            AgentAction::WriteFile {
                path: "README.md".to_string(),
                content: "# T\n```rust\nfn main() {}\n```\n".to_string()
            }
        );
    }

    #[test]
    fn test_fence_must_close_on_its_own_line() {
        let text = "```json\n{\"action\":\"finish\",\"message\":\"use ``` fences\"}\n```\n";
        assert_eq!(fenced_blocks(text).len(), 1);
        assert_eq!(
            parse_action(text).unwrap(),
            AgentAction::Finish {
                message: "use ``` fences".to_string()
            }
        );
    }

    #[test]
    fn test_parse_bare_fence() {
        let text = "```\n{\"action\":\"finish\",\"message\":\"ok\"}\n```";
        assert!(matches!(parse_action(text).unwrap(), AgentAction::Finish { .. }));
    }

    #[test]
    fn test_first_json_block_wins() {
        let text = "```rust\nfn main() {}\n```\n```json\n{\"action\":\"readFile\",\"path\":\"a\"}\n```\n```json\n{\"action\":\"readFile\",\"path\":\"b\"}\n```";
        assert_eq!(
            parse_action(text).unwrap(),
            AgentAction::ReadFile { path: "a".to_string() }
        );
    }

    #[test]
    fn test_parse_write_file() {
        let text = r#"{"action":"writeFile","path":"a.txt","content":"line1\nline2"}"#;
        assert_eq!(
            parse_action(text).unwrap(),
            AgentAction::WriteFile {
                path: "a.txt".to_string(),
                content: "line1\nline2".to_string()
            }
        );
    }

    #[test]
    fn test_parse_natural_language_edit() {
        let text = r#"{"action":"naturalLanguageWriteFile","path":"a.ts","instruction":"add types","selectedContent":"let x = 1"}"#;
        assert_eq!(
            parse_action(text).unwrap(),
            AgentAction::NaturalLanguageEdit {
                path: "a.ts".to_string(),
                instruction: "add types".to_string(),
                selected_content: Some("let x = 1".to_string())
            }
        );

        let text = r#"{"action":"naturalLanguageWriteFile","path":"a.ts","instruction":"add types"}"#;
        assert!(matches!(
            parse_action(text).unwrap(),
            AgentAction::NaturalLanguageEdit {
                selected_content: None,
                ..
            }
        ));
    }

    #[test]
    fn test_prose_only_is_no_json() {
        let result = parse_action("Sure! Here's my plan...");
        assert!(matches!(result, Err(ActionParseError::NoJson)));
    }

    #[test]
    fn test_empty_is_error_not_finish() {
        assert!(matches!(parse_action(""), Err(ActionParseError::Empty)));
        assert!(matches!(parse_action("   \n"), Err(ActionParseError::Empty)));
    }

    #[test]
    fn test_missing_tag() {
        assert!(matches!(
            parse_action(r#"{"path":"a"}"#),
            Err(ActionParseError::MissingTag)
        ));
        assert!(matches!(
            parse_action(r#"{"action":5}"#),
            Err(ActionParseError::MissingTag)
        ));
    }

    #[test]
    fn test_known_tag_missing_fields() {
        match parse_action(r#"{"action":"writeFile","path":"a"}"#) {
            Err(ActionParseError::InvalidFields { action, reason }) => {
                assert_eq!(action, "writeFile");
                assert!(reason.contains("content"));
            }
            other => panic!("Expected InvalidFields, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(
            parse_action(r#"{"action":"deleteFile","path":"a"}"#).unwrap(),
            AgentAction::Unknown {
                action: "deleteFile".to_string()
            }
        );
    }

    #[test]
    fn test_json_array_is_not_an_action() {
        assert!(matches!(parse_action("[1, 2]"), Err(ActionParseError::NoJson)));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("./src/a.ts"), "src/a.ts");
        assert_eq!(normalize_path("  ././src/a.ts \n"), "src/a.ts");
        assert_eq!(normalize_path("src/a.ts"), "src/a.ts");
        assert_eq!(normalize_path("../a.ts"), "../a.ts");
    }

    #[test]
    fn test_extract_code_prefers_fence() {
        let reply = "Here you go:\n```ts\n  const x: number = 1;\n```\nDone.";
        assert_eq!(extract_code(reply), "  const x: number = 1;");
    }

    #[test]
    fn test_extract_code_keeps_nested_fences() {
        let reply = "```markdown\n# Title\n\n```rust\nfn main() {}\n```\n\nMore text.\n```";
        assert_eq!(extract_code(reply), "# Title\n\n```rust\nfn main() {}\n```\n\nMore text.");
    }

    #[test]
    fn test_extract_code_ignores_prose_after_last_fence() {
        let reply = "Updated:\n```md\nA\n```sh\nls\n```\nB\n```\nHope this helps.";
        assert_eq!(extract_code(reply), "A\n```sh\nls\n```\nB");
    }

    #[test]
    fn test_extract_code_unterminated_fence() {
        assert_eq!(extract_code("```ts\nlet x = 1;\n"), "let x = 1;");
    }

    #[test]
    fn test_extract_code_falls_back_to_text() {
        assert_eq!(extract_code("  plain text  \n"), "plain text");
    }

    #[test]
    fn test_summary() {
        let action = AgentAction::ReadFile { path: "a".to_string() };
        assert_eq!(action.summary(), "readFile a");
        assert_eq!(
            AgentAction::Finish {
                message: "m".to_string()
            }
            .summary(),
            "finish"
        );
    }
}
