//! Terminal rendering for agent progress, final messages and diff cards

use colored::Colorize;

use repostore::CodeChange;

use crate::agent::{AgentError, AgentEvent, AgentRun, LoopOutcome};
use crate::diff::{DiffLine, DiffStats, diff_lines};
use crate::llm::LlmError;

/// Longest observation preview shown in progress output
const PREVIEW_CHARS: usize = 80;

/// Colored diff lines, one per entry
pub fn colorize_diff(lines: &[DiffLine]) -> String {
    lines
        .iter()
        .map(|line| {
            let text = line.to_string();
            if line.added {
                text.green().to_string()
            } else if line.removed {
                text.red().to_string()
            } else {
                text.dimmed().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Header plus colored diff for a change
pub fn diff_card(change: &CodeChange) -> String {
    let lines = diff_lines(&change.original, &change.modified);
    let stats = DiffStats::from_lines(&lines);
    let header = format!(
        "{} {} {}",
        "───".dimmed(),
        change.path.cyan().bold(),
        format!("({}, {})", format!("+{}", stats.added).green(), format!("-{}", stats.removed).red()).dimmed()
    );
    if stats.is_identical() {
        return format!("{}\n{}", header, "(no changes)".dimmed());
    }
    format!("{}\n{}", header, colorize_diff(&lines))
}

/// One progress line for an event, or None for events shown elsewhere
pub fn event_line(event: &AgentEvent) -> Option<String> {
    match event {
        AgentEvent::TurnStarted { turn, max_turns } => {
            Some(format!("[turn {}/{}]", turn, max_turns).dimmed().to_string())
        }
        AgentEvent::ActionParsed { summary, .. } => Some(format!("  {} {}", "→".cyan(), summary)),
        AgentEvent::Observation { content, .. } => Some(format!("  {} {}", "·".dimmed(), preview(content).dimmed())),
        AgentEvent::FileWritten { change } => Some(format!("  {} wrote {}", "✓".green(), change.path)),
        AgentEvent::Finished { .. } | AgentEvent::Failed { .. } => None,
    }
}

/// Final message followed by the diff card of the last change
pub fn run_summary(run: &AgentRun) -> String {
    let mut out = String::new();
    match &run.outcome {
        LoopOutcome::Finished { message } => {
            out.push_str(message);
        }
        LoopOutcome::Failed {
            error: AgentError::Llm(e),
        } => {
            out.push_str(&llm_failure(e));
        }
        LoopOutcome::Failed { error } => {
            out.push_str(&format!("{} {}", "✗".red(), error.user_message()));
        }
    }
    if let Some(change) = run.last_change() {
        out.push_str("\n\n");
        out.push_str(&diff_card(change));
    }
    out
}

/// Model server failure with its remedy and a retry hint when it is transient
pub fn llm_failure(error: &LlmError) -> String {
    let kind = if error.is_network() {
        "Connection problem"
    } else {
        "Model server error"
    };
    let mut out = format!("{} {}: {}\n  {}", "✗".red(), kind, error, error.remedy());
    if error.is_retryable() {
        out.push_str(&format!("\n  {}", "This is usually temporary; try again.".dimmed()));
    }
    out
}

fn preview(text: &str) -> String {
    let first = text.lines().next().unwrap_or("");
    if first.chars().count() > PREVIEW_CHARS || text.lines().nth(1).is_some() {
        let head: String = first.chars().take(PREVIEW_CHARS).collect();
        format!("{}…", head)
    } else {
        first.to_string()
    }
}
