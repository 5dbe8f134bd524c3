//! Chat loop over one repository session

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use repostore::Role;

use crate::agent::AgentEvent;
use crate::render;
use crate::session::RepoSession;

/// Result of handling a slash command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashResult {
    Continue,
    Quit,
}

/// Interactive chat session over one repository
pub struct ReplSession {
    session: RepoSession,
}

impl ReplSession {
    pub fn new(session: RepoSession) -> Self {
        Self { session }
    }

    /// Read lines until `/quit` or Ctrl+D
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&format!("{}{} ", self.session.repository_name().cyan(), ">".bright_green()));

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }

                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(input).await? {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    } else {
                        self.process_user_input(input).await?;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C at the prompt only clears the line
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D - exit
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Run one agent loop, printing progress; Ctrl+C cancels the run
    async fn process_user_input(&mut self, input: &str) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel::<AgentEvent>();
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

        self.session.set_events(Some(tx));
        let result = self.session.send(input, &cancel).await;
        watcher.abort();
        // Dropping the sender ends the printer task
        self.session.set_events(None);
        let _ = printer.await;

        match result {
            Ok(run) => {
                println!();
                println!("{}", render::run_summary(&run));
                println!();
            }
            Err(e) => {
                println!("{} {:#}", "Error:".red(), e);
            }
        }
        Ok(())
    }

    /// Handle slash commands
    pub async fn handle_slash_command(&mut self, input: &str) -> Result<SlashResult> {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let cmd = parts.first().copied().unwrap_or("");

        let result = match cmd {
            "/help" | "/h" => {
                self.print_help();
                SlashResult::Continue
            }
            "/quit" | "/q" | "/exit" => SlashResult::Quit,
            "/files" | "/f" => {
                for path in self.session.files().await {
                    println!("  {}", path);
                }
                SlashResult::Continue
            }
            "/history" => {
                self.print_history();
                SlashResult::Continue
            }
            "/tasks" => {
                self.print_tasks()?;
                SlashResult::Continue
            }
            _ => {
                println!("{} Unknown command {} (try {})", "?".yellow(), cmd, "/help".yellow());
                SlashResult::Continue
            }
        };
        Ok(result)
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "Weaver".bright_cyan().bold());
        println!("Repository: {}", self.session.repository_name().cyan());
        println!("{} for commands, {} or Ctrl+D to leave", "/help".yellow(), "/quit".yellow());
        println!();
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Commands:".bright_cyan());
        println!("  {:10} This list", "/help".yellow());
        println!("  {:10} Leave the chat", "/quit".yellow());
        println!("  {:10} Files in the repository", "/files".yellow());
        println!("  {:10} Transcript so far", "/history".yellow());
        println!("  {:10} Changes applied to this repository", "/tasks".yellow());
        println!();
        println!("Anything else is sent to the assistant. Ctrl+C cancels a running request.");
        println!();
    }

    fn print_history(&self) {
        let history = self.session.history();
        if history.is_empty() {
            println!("{}", "Nothing said yet.".dimmed());
            return;
        }

        println!();
        println!("{}", "Transcript:".bright_cyan());
        for (i, msg) in history.iter().enumerate() {
            let role = match msg.role {
                Role::User => "User".bright_green(),
                Role::Assistant => "Assistant".bright_blue(),
                Role::System => "System".dimmed(),
            };
            let preview: String = msg.content.chars().take(50).collect();
            let preview = if msg.content.chars().count() > 50 {
                format!("{}...", preview)
            } else {
                preview
            };
            println!("  {}. {}: {}", i + 1, role, preview.replace('\n', " "));
        }
        println!();
    }

    fn print_tasks(&self) -> Result<()> {
        let tasks = self.session.tasks()?;
        if tasks.is_empty() {
            println!("{}", "No changes applied yet.".dimmed());
            return Ok(());
        }
        for task in tasks {
            println!("  {} {}", task.path.yellow(), task.prompt.dimmed());
        }
        Ok(())
    }
}
