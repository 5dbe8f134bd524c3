//! Weaver - agent loop for editing repository snapshots
//!
//! CLI entry point for one-shot requests, interactive chat, local diffs and
//! model server probes.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use weaver::agent::AgentEvent;
use weaver::cli::{Cli, Command};
use weaver::config::Config;
use weaver::diff::{DiffStats, diff_lines};
use weaver::llm::create_client;
use weaver::session::RepoSession;
use weaver::{render, repl};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("weaver")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("weaver.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!("Weaver loaded config: model={} base-url={}", config.llm.model, config.llm.base_url);

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Ask { repo, prompt, max_turns } => {
            debug!(%repo, ?max_turns, "main: matched Ask command");
            cmd_ask(&config, &repo, &prompt, max_turns).await
        }
        Command::Chat { repo } => {
            debug!(%repo, "main: matched Chat command");
            cmd_chat(&config, &repo).await
        }
        Command::Diff {
            original,
            modified,
            json,
        } => {
            debug!(?original, ?modified, json, "main: matched Diff command");
            cmd_diff(&original, &modified, json)
        }
        Command::Probe => {
            debug!("main: matched Probe command");
            cmd_probe(&config).await
        }
    }
}

/// Run the agent once and print progress plus the final summary
async fn cmd_ask(config: &Config, repo: &str, prompt: &str, max_turns: Option<u32>) -> Result<()> {
    config.validate()?;
    let llm = create_client(&config.llm)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<AgentEvent>();
    let mut session = RepoSession::open(config, repo, llm)?.with_events(tx);
    if let Some(max_turns) = max_turns {
        debug!(max_turns, "cmd_ask: overriding turn budget");
        session = session.with_max_turns(max_turns);
    }

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Some(line) = render::event_line(&event) {
                println!("{}", line);
            }
        }
    });

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let result = session.send(prompt, &cancel).await;
    watcher.abort();
    drop(session);
    let _ = printer.await;

    let run = result?;
    println!();
    println!("{}", render::run_summary(&run));
    if !run.is_finished() {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_chat(config: &Config, repo: &str) -> Result<()> {
    config.validate()?;
    let llm = create_client(&config.llm)?;
    repl::run_interactive(config, repo, llm).await
}

/// Diff two local files, colored or as JSON
fn cmd_diff(original: &Path, modified: &Path, json: bool) -> Result<()> {
    let before = fs::read_to_string(original).context(format!("Failed to read {}", original.display()))?;
    let after = fs::read_to_string(modified).context(format!("Failed to read {}", modified.display()))?;
    let lines = diff_lines(&before, &after);

    if json {
        println!("{}", serde_json::to_string_pretty(&lines)?);
        return Ok(());
    }

    let stats = DiffStats::from_lines(&lines);
    println!("{} {} → {} ({})", "───".dimmed(), original.display(), modified.display(), stats);
    if stats.is_identical() {
        println!("{}", "(no changes)".dimmed());
    } else {
        println!("{}", render::colorize_diff(&lines));
    }
    Ok(())
}

/// Check the model server and list its models
async fn cmd_probe(config: &Config) -> Result<()> {
    let llm = create_client(&config.llm)?;
    println!("Probing {} ...", config.llm.base_url);

    match llm.list_models().await {
        Ok(models) => {
            println!("{} Connected ({} models)", "✓".green(), models.len());
            for model in &models {
                let marker = if model == llm.model() { "*" } else { " " };
                println!("  {} {}", marker.green(), model);
            }
            if !models.iter().any(|m| m == llm.model()) {
                println!(
                    "{} Configured model '{}' is not installed on the server",
                    "!".yellow(),
                    llm.model()
                );
            }
            Ok(())
        }
        Err(e) => {
            println!("{}", render::llm_failure(&e));
            Err(e.into())
        }
    }
}
