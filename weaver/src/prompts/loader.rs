//! Prompt Loader
//!
//! Loads prompt templates from an override directory or falls back to
//! embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;

/// Context for the agent system prompt
#[derive(Debug, Clone, Serialize)]
pub struct AgentPromptContext {
    pub repository_name: String,
    pub files: Vec<String>,
    pub file_count: usize,
    pub max_turns: u32,
    pub require_read_before_write: bool,
    pub natural_language_edits: bool,
}

impl AgentPromptContext {
    pub fn new(repository_name: impl Into<String>, files: Vec<String>, max_turns: u32) -> Self {
        let file_count = files.len();
        Self {
            repository_name: repository_name.into(),
            files,
            file_count,
            max_turns,
            require_read_before_write: true,
            natural_language_edits: true,
        }
    }
}

/// Context for the natural-language edit prompt
#[derive(Debug, Clone, Serialize)]
pub struct EditPromptContext {
    pub path: String,
    pub instruction: String,
    /// Whole file, or the selected snippet when `is_snippet`
    pub content: String,
    pub is_snippet: bool,
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (`agent.prompts-dir`)
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader that checks `user_dir` before the embedded prompts
    pub fn new(user_dir: Option<&Path>) -> Self {
        debug!(?user_dir, "PromptLoader::new: called");
        let user_dir = user_dir.filter(|dir| dir.exists()).map(Path::to_path_buf);
        if user_dir.is_none() {
            debug!("PromptLoader::new: no user override directory");
        }
        Self {
            hbs: Self::engine(),
            user_dir,
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            user_dir: None,
        }
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        // Prompts are plain text; file contents must reach the model unescaped
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks `{user_dir}/{name}.pmt` first, then the embedded fallback.
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in user override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
            debug!(?path, "PromptLoader::load_template: not found in user override");
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: found in embedded");
            return Ok(content.to_string());
        }

        Err(eyre!("Prompt template not found: {}", name))
    }

    fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        let template = self.load_template(template_name)?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }

    /// Render the agent system prompt
    pub fn agent_prompt(&self, context: &AgentPromptContext) -> Result<String> {
        debug!(file_count = context.file_count, "PromptLoader::agent_prompt: called");
        self.render("agent", context)
    }

    /// Render the natural-language edit prompt
    pub fn edit_prompt(&self, context: &EditPromptContext) -> Result<String> {
        debug!(path = %context.path, is_snippet = context.is_snippet, "PromptLoader::edit_prompt: called");
        self.render("edit", context)
    }
}

impl Default for PromptLoader {
    fn default() -> Self {
        Self::embedded_only()
    }
}
