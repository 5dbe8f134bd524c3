use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use repostore::cli::{Cli, Command};
use repostore::config::Config;
use repostore::{FileStore, ImportOptions, RepoStore, Role};

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("repostore starting");

    let store = RepoStore::open(&config.store_path)?.with_task_log_capacity(config.task_log_capacity);

    match cli.command {
        Command::Import { path, name } => {
            let options = ImportOptions {
                max_file_bytes: config.max_file_bytes,
                ..Default::default()
            };
            let repo = store.import_dir(&path, name.as_deref(), &options)?;
            println!(
                "{} Imported {} files as {} ({})",
                "✓".green(),
                repo.len(),
                repo.name.cyan(),
                repo.id.dimmed()
            );
        }
        Command::List => {
            let repos = store.list_repositories()?;
            if repos.is_empty() {
                println!("No repositories found");
            } else {
                for repo in repos {
                    println!("{} {} ({} files)", repo.id.dimmed(), repo.name.cyan(), repo.file_count);
                }
            }
        }
        Command::Files { repo } => {
            let repo = store.resolve(&repo)?;
            for path in repo.list_files() {
                println!("{}", path);
            }
        }
        Command::Cat { repo, path } => {
            let repo = store.resolve(&repo)?;
            println!("{}", repo.read_file(&path)?);
        }
        Command::Tasks { repo } => {
            let log = store.load_task_log()?;
            let repo_id = match repo {
                Some(r) => Some(store.resolve(&r)?.id),
                None => None,
            };
            let records: Vec<_> = log
                .iter()
                .filter(|r| repo_id.as_deref().is_none_or(|id| r.repository_id == id))
                .collect();
            if records.is_empty() {
                println!("No tasks found");
            }
            for record in records {
                let when = chrono::DateTime::from_timestamp_millis(record.created_at)
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default();
                println!(
                    "{} {} {} {}",
                    when.dimmed(),
                    record.path.yellow(),
                    "·".dimmed(),
                    record.prompt
                );
            }
        }
        Command::History { repo } => {
            let repo = store.resolve(&repo)?;
            for msg in store.load_conversation(&repo.id)? {
                let role = match msg.role {
                    Role::User => "user".bright_green(),
                    Role::Assistant => "assistant".bright_blue(),
                    Role::System => "system".dimmed(),
                };
                println!("{}: {}", role, msg.content);
            }
        }
        Command::Delete { repo } => {
            let repo = store.resolve(&repo)?;
            store.delete(&repo.id)?;
            println!("{} Deleted repository: {}", "✓".green(), repo.name);
        }
    }

    Ok(())
}
