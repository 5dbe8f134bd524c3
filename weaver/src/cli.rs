//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// Weaver - chat with a local model about a repository snapshot
#[derive(Parser)]
#[command(
    name = "weaver",
    about = "Chat with a locally hosted model about a repository snapshot and apply its edits",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the agent once for a single request
    Ask {
        /// Repository name or id (see `repostore list`)
        repo: String,

        /// What to ask or change
        prompt: String,

        /// Maximum model turns for this request
        #[arg(short, long)]
        max_turns: Option<u32>,
    },

    /// Interactive chat about a repository
    Chat {
        /// Repository name or id (see `repostore list`)
        repo: String,
    },

    /// Show a line diff of two local files
    Diff {
        /// Original file
        original: PathBuf,

        /// Modified file
        modified: PathBuf,

        /// Print the diff as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the model server is reachable and list its models
    Probe,
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("weaver")
        .join("logs")
        .join("weaver.log")
}
