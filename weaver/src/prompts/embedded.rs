//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Agent system prompt: action schema, rules and file list
pub const AGENT: &str = include_str!("../../prompts/agent.pmt");

/// Natural-language edit prompt
pub const EDIT: &str = include_str!("../../prompts/edit.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "agent" => {
            debug!("get_embedded: matched agent");
            Some(AGENT)
        }
        "edit" => {
            debug!("get_embedded: matched edit");
            Some(EDIT)
        }
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
