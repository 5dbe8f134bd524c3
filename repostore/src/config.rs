//! Configuration for repostore

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the store directory
    #[serde(rename = "store-dir", default = "default_store_path")]
    pub store_path: PathBuf,

    /// Maximum number of task records kept
    #[serde(rename = "task-log-capacity", default = "default_task_log_capacity")]
    pub task_log_capacity: usize,

    /// Maximum size of an imported file in bytes
    #[serde(rename = "max-file-bytes", default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

pub fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("weaver")
}

fn default_task_log_capacity() -> usize {
    crate::DEFAULT_TASK_LOG_CAPACITY
}

fn default_max_file_bytes() -> u64 {
    crate::DEFAULT_MAX_FILE_BYTES
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            task_log_capacity: default_task_log_capacity(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            return Ok(config);
        }

        // Try default locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("weaver").join("repostore.yml")),
            Some(PathBuf::from("repostore.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                return Ok(config);
            }
        }

        Ok(Config::default())
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
