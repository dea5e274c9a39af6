//! Command-line interface for fakao.
//!
//! Provides commands for analyzing cases, answering the generated question,
//! browsing history, listing presets, and checking configuration.

use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{deepseek, DeepSeekClient};
use crate::config::{self, API_KEY_VARS};
use crate::core::{grade, AnalyzeError, Session};
use crate::domain::{AssemblyEvent, AssemblyFailure, CaseInput, CaseStatus, StreamChunk, SubjectArea};
use crate::presets;

pub mod history;
pub mod render;

/// fakao - legal case analysis and exam question generator
#[derive(Parser, Debug)]
#[command(name = "fakao")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a case and generate a practice question
    Analyze {
        /// Case file (reads from stdin if neither --input nor --preset is given)
        #[arg(short, long, conflicts_with = "preset")]
        input: Option<PathBuf>,

        /// Built-in case id (see `fakao presets`)
        #[arg(short, long)]
        preset: Option<String>,

        /// Subject hint
        #[arg(short, long, value_enum)]
        subject: Option<SubjectArea>,

        /// Write events to stdout as newline-delimited JSON
        #[arg(long)]
        ndjson: bool,

        /// Do not store the case in history
        #[arg(long)]
        no_save: bool,
    },

    /// Answer the question generated for a history entry
    Answer {
        /// Entry ID or unique prefix
        entry_id: String,

        /// Selected option(s), e.g. "B" or "AC". Prompts if omitted.
        option: Option<String>,
    },

    /// Browse and manage analysis history
    History {
        #[command(subcommand)]
        command: history::HistoryCommands,
    },

    /// List built-in sample cases
    Presets,

    /// Show resolved configuration
    Config,

    /// Report API key and endpoint status
    Health,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Analyze {
                input,
                preset,
                subject,
                ndjson,
                no_save,
            } => analyze(input, preset, subject, ndjson, no_save).await,
            Commands::Answer { entry_id, option } => answer(&entry_id, option).await,
            Commands::History { command } => history::execute(command).await,
            Commands::Presets => list_presets().await,
            Commands::Config => show_config().await,
            Commands::Health => health().await,
        }
    }
}

/// Build the case from a preset, a file, or stdin
fn read_case(
    input_file: Option<PathBuf>,
    preset: Option<String>,
    subject: Option<SubjectArea>,
) -> Result<CaseInput> {
    if let Some(id) = preset {
        let preset = presets::get(&id).with_context(|| {
            format!("Unknown preset '{}'. Run `fakao presets` to list them", id)
        })?;
        let mut case = preset.to_case();
        if subject.is_some() {
            case.subject_area = subject;
        }
        return Ok(case);
    }

    let content = if let Some(path) = input_file {
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    } else {
        anyhow::bail!("No case provided. Use --input <file>, --preset <id>, or pipe to stdin");
    };

    Ok(CaseInput::new(content, subject))
}

fn write_chunk(out: &mut impl Write, chunk: &StreamChunk) {
    let written = chunk
        .to_line()
        .map_err(io::Error::from)
        .and_then(|line| {
            out.write_all(line.as_bytes())?;
            out.flush()
        });
    if let Err(e) = written {
        tracing::warn!(error = %e, "Failed to write NDJSON chunk");
    }
}

/// Report an analysis error and exit non-zero
fn exit_with(error: AnalyzeError, relay: bool, stdout: &mut io::Stdout) -> ! {
    if relay {
        write_chunk(
            stdout,
            &StreamChunk::Error {
                error: error.user_message(),
            },
        );
    }
    eprintln!("Error: {}", error.user_message());
    std::process::exit(1);
}

/// Analyze a case, streaming reasoning as it arrives
async fn analyze(
    input_file: Option<PathBuf>,
    preset: Option<String>,
    subject: Option<SubjectArea>,
    ndjson: bool,
    no_save: bool,
) -> Result<()> {
    let cfg = config::config()?;
    let case = read_case(input_file, preset, subject)?;
    let mut stdout = io::stdout();

    // Validation happens before the client is built so it never needs a key
    if let Err(violation) = cfg.limits.validate(&case) {
        exit_with(violation.into(), ndjson, &mut stdout);
    }

    let client = match DeepSeekClient::new(cfg.api_key.as_ref().map(|k| k.expose()), &cfg.provider) {
        Ok(client) => client,
        Err(e) => exit_with(e.into(), ndjson, &mut stdout),
    };

    let mut session = Session::new(cfg.limits, cfg.boundary)
        .with_timeout(Duration::from_secs(cfg.provider.request_timeout_seconds));

    if !ndjson {
        eprintln!("Analyzing case ({} characters)...\n", case.char_count());
    }

    let mut stderr = io::stderr();
    let result = session
        .analyze(&client, case, |event| {
            if ndjson {
                write_chunk(&mut stdout, &StreamChunk::from(event));
            } else if let AssemblyEvent::ThinkingFragment(text) = event {
                let _ = write!(stderr, "{}", text);
                let _ = stderr.flush();
            }
        })
        .await;

    if !ndjson && !session.thinking().is_empty() {
        eprintln!("\n");
    }

    // Keep failed attempts too, so they can be resubmitted from history
    let entry = session.to_history_entry();
    if !no_save {
        if let Some(entry) = entry.as_ref().filter(|e| e.case.status != CaseStatus::Pending) {
            let mut history = history::open_history()?;
            history.push(entry.clone())?;
            tracing::debug!(id = %entry.id(), "Saved case to history");
        }
    }

    match result {
        Ok(()) => {
            if let (Some(record), false) = (session.current_analysis(), ndjson) {
                print!("{}", render::analysis(record, session.issues(), false));
                if let Some(entry) = entry.filter(|_| !no_save) {
                    eprintln!(
                        "\n[Saved as {}. Answer with: fakao answer {} <option>]",
                        render::short_id(entry.id()),
                        render::short_id(entry.id())
                    );
                }
            }
            Ok(())
        }
        Err(error) => {
            // Unparsable results were already relayed as an error event
            let relayed = matches!(
                error,
                AnalyzeError::Assembly(AssemblyFailure::Unparsable { .. })
            );
            exit_with(error, ndjson && !relayed, &mut stdout)
        }
    }
}

/// Grade an answer to a stored question
async fn answer(entry_id: &str, option: Option<String>) -> Result<()> {
    let mut history = history::open_history()?;
    let entry = history.find_by_prefix(entry_id)?.clone();

    let record = entry
        .analysis
        .as_ref()
        .with_context(|| format!("Entry {} has no analysis to answer", render::short_id(entry.id())))?;
    let question = &record.generated_question;

    let started = Instant::now();
    let selected = match option {
        Some(option) => option,
        None => {
            print!("{}", render::question(question));
            print!("\nYour answer: ");
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read answer")?;
            line
        }
    };

    if selected.trim().is_empty() {
        anyhow::bail!("No option selected");
    }
    if question.is_choice() {
        let unknown: Vec<char> = selected
            .chars()
            .filter(|c| c.is_ascii_alphabetic() && question.option(&c.to_string()).is_none())
            .collect();
        if !unknown.is_empty() {
            anyhow::bail!("Unknown option(s): {}", unknown.iter().collect::<String>());
        }
    }

    let (user_answer, feedback) = grade(entry.id(), question, &selected, started.elapsed());
    print!("{}", render::feedback(&feedback));

    history.record_answer(entry.id(), user_answer)?;
    Ok(())
}

/// List built-in presets
async fn list_presets() -> Result<()> {
    println!("{:<24} {:<12} {:<8} {}", "ID", "SUBJECT", "LEVEL", "TITLE");
    println!("{}", "-".repeat(75));

    for preset in presets::PRESETS.iter() {
        println!(
            "{:<24} {:<12} {:<8} {} - {}",
            preset.id,
            preset.subject.label(),
            preset.difficulty.to_string(),
            preset.title,
            preset.description
        );
    }

    println!("\nAnalyze one with: fakao analyze --preset <id>");
    Ok(())
}

/// Print the resolved configuration
async fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("{}", "═".repeat(60));
    println!("  fakao Configuration");
    println!("{}", "═".repeat(60));
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Provider:");
    println!("  Base URL:    {}", cfg.provider.base_url);
    println!("  Model:       {}", cfg.provider.model);
    println!("  Temperature: {}", cfg.provider.temperature);
    println!("  Timeout:     {}s", cfg.provider.request_timeout_seconds);
    match &cfg.api_key {
        Some(key) => println!("  API key:     {} ({}, {} chars)", key.redacted(), key.var, key.len()),
        None => println!("  API key:     (not set)"),
    }
    println!();
    println!("Case limits:");
    println!("  Min chars:   {}", cfg.limits.min_case_chars);
    println!("  Max chars:   {}", cfg.limits.max_case_chars);
    println!();
    println!("Assembly:");
    println!("  Boundary:    {:?}", cfg.boundary);
    println!();
    println!("History:");
    println!("  Home:        {}", cfg.home.display());
    println!("  File:        {}", cfg.history_storage().path().display());
    println!("  Max entries: {}", cfg.history.max_entries);

    Ok(())
}

/// Report which key variables are set and whether the active key is usable
async fn health() -> Result<()> {
    let cfg = config::config()?;

    println!("Key variables:");
    for var in API_KEY_VARS {
        match std::env::var(var) {
            Ok(value) if !value.is_empty() => println!("  {:<18} set ({} chars)", var, value.len()),
            _ => println!("  {:<18} not set", var),
        }
    }
    println!();

    let status = match &cfg.api_key {
        Some(key) => {
            let valid = deepseek::check_api_key(Some(key.expose())).is_ok();
            println!("Active key:  {} from {}", key.redacted(), key.var);
            println!("  Length:       {}", key.len());
            println!(
                "  Valid format: {}",
                if valid { "yes" } else { "no (expected prefix \"sk-\")" }
            );
            valid
        }
        None => {
            println!("Active key:  none");
            println!("  Set DEEPSEEK_API_KEY to a key starting with \"sk-\"");
            false
        }
    };

    println!();
    println!("Endpoint:    {}/chat/completions", cfg.provider.base_url.trim_end_matches('/'));
    println!("Model:       {}", cfg.provider.model);
    println!("Status:      {}", if status { "ok" } else { "not configured" });

    Ok(())
}
