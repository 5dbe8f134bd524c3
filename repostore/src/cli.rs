//! CLI argument parsing for repostore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "repostore")]
#[command(author, version, about = "Local mirror of imported repositories", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import a local directory as a repository snapshot
    Import {
        /// Directory to import
        #[arg(required = true)]
        path: PathBuf,

        /// Name for the repository (default: directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List stored repositories
    List,

    /// List the files of a repository
    Files {
        /// Repository name or id
        #[arg(required = true)]
        repo: String,
    },

    /// Print one file of a repository
    Cat {
        /// Repository name or id
        #[arg(required = true)]
        repo: String,

        /// File path within the repository
        #[arg(required = true)]
        path: String,
    },

    /// Show the task log
    Tasks {
        /// Only show tasks for this repository
        #[arg(short, long)]
        repo: Option<String>,
    },

    /// Show the chat transcript of a repository
    History {
        /// Repository name or id
        #[arg(required = true)]
        repo: String,
    },

    /// Delete a repository and its transcript
    Delete {
        /// Repository name or id
        #[arg(required = true)]
        repo: String,
    },
}
