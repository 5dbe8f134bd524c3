//! Weaver configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding `llm.base-url`
pub const BASE_URL_ENV: &str = "WEAVER_BASE_URL";

/// Environment variable overriding `llm.model`
pub const MODEL_ENV: &str = "WEAVER_MODEL";

/// Main Weaver configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Model server configuration
    pub llm: LlmConfig,

    /// Agent loop configuration
    pub agent: AgentConfig,

    /// Storage configuration
    pub storage: StorageConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.llm.base_url.trim().is_empty() {
            return Err(eyre::eyre!(
                "Model server URL is empty. Set llm.base-url or the {} environment variable.",
                BASE_URL_ENV
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(eyre::eyre!(
                "Model name is empty. Set llm.model or the {} environment variable.",
                MODEL_ENV
            ));
        }
        if self.agent.max_turns == 0 {
            return Err(eyre::eyre!("agent.max-turns must be at least 1"));
        }
        if self.storage.task_log_capacity == 0 {
            return Err(eyre::eyre!("storage.task-log-capacity must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain, then apply environment overrides
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_files(config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read only the log level, before logging is initialized
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load_files(config_path).ok().and_then(|c| c.log_level)
    }

    fn load_files(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .weaver.yml
        let local_config = PathBuf::from(".weaver.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/weaver/weaver.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("weaver").join("weaver.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply `WEAVER_BASE_URL` / `WEAVER_MODEL` style overrides
    ///
    /// `lookup` maps a variable name to its value; empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::debug!(%url, "apply_overrides: base url from environment");
            self.llm.base_url = url;
        }
        if let Some(model) = lookup(MODEL_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::debug!(%model, "apply_overrides: model from environment");
            self.llm.model = model;
        }
    }
}

/// Which Ollama endpoint shape to use for completions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiMode {
    /// `POST /api/chat` with a message list
    #[default]
    Chat,
    /// `POST /api/generate` with a single flattened prompt
    Generate,
}

/// Model server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (only "ollama" is supported)
    pub provider: String,

    /// Endpoint shape
    pub api: ApiMode,

    /// Base URL of the server, often an ngrok tunnel
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Model tag, e.g. "qwen2.5-coder:7b"
    pub model: String,

    /// Timeout for completion requests in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Timeout for the connection probe in milliseconds
    #[serde(rename = "probe-timeout-ms")]
    pub probe_timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            api: ApiMode::default(),
            base_url: "http://localhost:11434".to_string(),
            model: "qwen2.5-coder:7b".to_string(),
            timeout_ms: 120_000,
            probe_timeout_ms: 10_000,
        }
    }
}

/// Agent loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum model calls per user message
    #[serde(rename = "max-turns")]
    pub max_turns: u32,

    /// Reject writes to files not read earlier in the same session
    #[serde(rename = "require-read-before-write")]
    pub require_read_before_write: bool,

    /// Allow the naturalLanguageWriteFile action
    #[serde(rename = "natural-language-edits")]
    pub natural_language_edits: bool,

    /// Directory with agent.pmt / edit.pmt overrides
    #[serde(rename = "prompts-dir")]
    pub prompts_dir: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: 10,
            require_read_before_write: true,
            natural_language_edits: true,
            prompts_dir: None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding repositories, transcripts and the task log
    #[serde(rename = "store-dir")]
    pub store_dir: PathBuf,

    /// Maximum number of task records kept
    #[serde(rename = "task-log-capacity")]
    pub task_log_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_dir: repostore::config::default_store_path(),
            task_log_capacity: repostore::DEFAULT_TASK_LOG_CAPACITY,
        }
    }
}
