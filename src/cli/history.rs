//! History CLI subcommands.
//!
//! Provides commands to:
//! - `list`: Show recent cases, most recent first
//! - `show`: Display a case with its analysis and answer
//! - `delete`: Remove one entry
//! - `clear`: Remove all entries

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::config;
use crate::domain::{CaseStatus, HistoryEntry};
use crate::history::{History, JsonFileStorage};

use super::render;

/// History-related subcommands
#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// List recent cases
    List {
        /// Maximum number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show a case with its analysis
    Show {
        /// Entry ID or unique prefix
        entry_id: String,
    },

    /// Delete an entry
    Delete {
        /// Entry ID or unique prefix
        entry_id: String,
    },

    /// Delete all entries
    Clear,
}

/// Open the configured history file
pub fn open_history() -> Result<History<JsonFileStorage>> {
    let cfg = config::config()?;
    let storage = cfg.history_storage();
    let path = storage.path().to_path_buf();
    History::open(storage, cfg.history.max_entries)
        .with_context(|| format!("Failed to open history: {}", path.display()))
}

/// Execute a history subcommand
pub async fn execute(command: HistoryCommands) -> Result<()> {
    match command {
        HistoryCommands::List { limit } => list(limit),
        HistoryCommands::Show { entry_id } => show(&entry_id),
        HistoryCommands::Delete { entry_id } => delete(&entry_id),
        HistoryCommands::Clear => clear(),
    }
}

fn status_label(entry: &HistoryEntry) -> &'static str {
    match entry.case.status {
        CaseStatus::Pending => "pending",
        CaseStatus::Analyzing => "analyzing",
        CaseStatus::Completed => "completed",
        CaseStatus::Error => "error",
    }
}

fn answer_label(entry: &HistoryEntry) -> &'static str {
    match &entry.user_answer {
        Some(answer) if answer.is_correct => "correct",
        Some(_) => "wrong",
        None => "-",
    }
}

fn list(limit: usize) -> Result<()> {
    let history = open_history()?;

    if history.is_empty() {
        println!("No cases in history");
        return Ok(());
    }

    println!(
        "{:<10} {:<17} {:<10} {:<10} {:<8} {}",
        "ID", "CREATED", "SUBJECT", "STATUS", "ANSWER", "CASE"
    );
    println!("{}", "-".repeat(90));

    for entry in history.entries().iter().take(limit) {
        let subject = entry
            .case
            .subject_area
            .map(|s| s.label().to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<10} {:<17} {:<10} {:<10} {:<8} {}",
            render::short_id(entry.id()),
            entry.case.created_at.format("%Y-%m-%d %H:%M"),
            subject,
            status_label(entry),
            answer_label(entry),
            render::preview(&entry.case.content, 30)
        );
    }

    if history.len() > limit {
        println!("\n({} more, use --limit to show them)", history.len() - limit);
    }

    Ok(())
}

fn show(entry_id: &str) -> Result<()> {
    let history = open_history()?;
    let entry = history.find_by_prefix(entry_id)?;

    println!("ID:      {}", entry.id());
    println!("Created: {}", entry.case.created_at);
    if let Some(subject) = entry.case.subject_area {
        println!("Subject: {}", subject);
    }
    println!("Status:  {}", status_label(entry));
    println!();
    println!("{}", entry.case.content);
    println!();

    match &entry.analysis {
        Some(record) => {
            let answered = entry.user_answer.is_some();
            print!("{}", render::analysis(record, &[], answered));
        }
        None => println!("(no analysis)"),
    }

    if let Some(answer) = &entry.user_answer {
        println!();
        println!(
            "Your answer: {} ({}), {:.1}s, {}",
            answer.selected_option,
            answer_label(entry),
            answer.time_spent_ms as f64 / 1000.0,
            answer.answered_at.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}

fn delete(entry_id: &str) -> Result<()> {
    let mut history = open_history()?;
    let id = history.find_by_prefix(entry_id)?.id();
    history.delete(id)?;
    println!("Deleted {}", id);
    Ok(())
}

fn clear() -> Result<()> {
    let mut history = open_history()?;
    let count = history.len();
    history.clear()?;
    println!("Cleared {} entr{}", count, if count == 1 { "y" } else { "ies" });
    Ok(())
}
