//! fakao - legal case analysis over a streaming reasoning model
//!
//! Submits a case narrative to a chat-completions endpoint, separates the
//! model's reasoning stream from its final answer, and assembles the answer
//! into a structured analysis with a generated practice question.
//!
//! # Architecture
//!
//! The upstream response is a stream of `data:` records:
//! - Reasoning fragments are relayed as they arrive
//! - The answer channel is accumulated from its first `{`
//! - At end of stream the buffer is parsed into an [`AnalysisRecord`]
//!
//! # Modules
//!
//! - `adapters`: Completion endpoint integrations (DeepSeek)
//! - `core`: Assembler, event stream, validation, session, quiz grading
//! - `domain`: Data structures (CaseInput, AnalysisRecord, AssemblyEvent)
//! - `history`: Capped most-recent-first history with pluggable storage
//! - `presets`: Built-in sample cases
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Analyze a case from a file
//! fakao analyze --input case.txt --subject criminal-law
//!
//! # Analyze a built-in case, relaying events as NDJSON
//! fakao analyze --preset criminal-law-1 --ndjson
//!
//! # Answer the generated question
//! fakao answer 1a2b3c4d B
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod history;
pub mod presets;

// Re-export main types at crate root for convenience
pub use crate::adapters::{AnalysisRequest, CompletionSource, DeepSeekClient, TransportError};
pub use crate::core::{Assembler, AnalyzeError, BoundaryMode, EventStream, Session};
pub use crate::domain::{AnalysisRecord, AssemblyEvent, AssemblyFailure, CaseInput, HistoryEntry, SubjectArea};
pub use crate::history::{History, HistoryError, HistoryStorage};
