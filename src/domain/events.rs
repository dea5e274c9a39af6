//! Event contract between the stream assembler and its consumers.
//!
//! The assembler emits zero or more [`AssemblyEvent::ThinkingFragment`]
//! events followed by at most one terminal event
//! ([`AssemblyEvent::AnalysisReady`] or [`AssemblyEvent::AssemblyFailed`]).
//! A stream whose final channel stayed empty ends with no terminal event.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::analysis::{AnalysisRecord, ShapeIssue};

/// Decoded content of one upstream record, tagged by channel.
///
/// A record carries a fragment for at most one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelDelta {
    /// Free-text reasoning fragment
    Reasoning(String),

    /// Fragment of the answer channel that should eventually hold the JSON object
    Final(String),
}

/// Why a non-empty final buffer could not be turned into a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyFailure {
    /// The final-channel buffer was not well-formed JSON
    #[error("unparsable final content: {reason}")]
    Unparsable { reason: String },

    /// The stream ended without any final-channel content.
    ///
    /// Never emitted by the assembler itself; consumers raise it when the
    /// event sequence ends without a terminal event.
    #[error("stream ended without an analysis result")]
    Empty,
}

/// Events produced by the assembler, in stream order
#[derive(Debug, Clone, PartialEq)]
pub enum AssemblyEvent {
    /// One reasoning-channel record's fragment, unmerged
    ThinkingFragment(String),

    /// The final buffer parsed. `issues` lists fields that did not match the
    /// expected shape; they never prevent this event.
    AnalysisReady {
        record: Box<AnalysisRecord>,
        issues: Vec<ShapeIssue>,
    },

    /// The final buffer was non-empty but did not parse
    AssemblyFailed(AssemblyFailure),
}

impl AssemblyEvent {
    /// Returns true for `AnalysisReady` and `AssemblyFailed`
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::ThinkingFragment(_))
    }
}

/// Newline-delimited JSON relay encoding of the event sequence.
///
/// One chunk per line: `{"type":"thinking","content":...}`,
/// `{"type":"analysis","data":...}` or `{"type":"error","error":...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    Thinking { content: String },
    Analysis { data: Box<AnalysisRecord> },
    Error { error: String },
}

impl StreamChunk {
    /// Encode as a single NDJSON line, including the trailing newline
    pub fn to_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

impl From<&AssemblyEvent> for StreamChunk {
    fn from(event: &AssemblyEvent) -> Self {
        match event {
            AssemblyEvent::ThinkingFragment(text) => StreamChunk::Thinking {
                content: text.clone(),
            },
            AssemblyEvent::AnalysisReady { record, .. } => StreamChunk::Analysis {
                data: record.clone(),
            },
            AssemblyEvent::AssemblyFailed(failure) => StreamChunk::Error {
                error: failure.to_string(),
            },
        }
    }
}
