//! Stream demultiplexer and final-answer assembler.
//!
//! Consumes the upstream byte stream chunk by chunk, reassembles lines across
//! chunk boundaries, decodes `data:` records, separates the reasoning channel
//! from the final-answer channel and accumulates the final channel until the
//! stream ends. Only then is the final buffer parsed as JSON.
//!
//! The final buffer starts at the first `{` seen in the final channel;
//! anything the model wrote before it is dropped. No attempt is made to find
//! the matching `}` unless [`BoundaryMode::Balanced`] is selected.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::domain::{AnalysisRecord, AssemblyEvent, AssemblyFailure, ChannelDelta};

use super::envelope::{ChatCompletionsEnvelope, EnvelopeDecoder};

/// Literal marker that starts every record line
pub const RECORD_PREFIX: &str = "data:";

/// Payload that marks the end of the upstream stream
pub const END_SENTINEL: &str = "[DONE]";

/// How the end of the JSON object is located in the final buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryMode {
    /// Everything from the first `{` to end of stream, minus code fences
    Lenient,

    /// Cut after the first complete, balanced object
    Balanced,
}

impl Default for BoundaryMode {
    fn default() -> Self {
        Self::Lenient
    }
}

/// Per-stream mutable state. Created fresh for each request, never shared.
#[derive(Debug, Default)]
pub struct AssemblyState {
    /// All reasoning fragments, in order
    pub reasoning: String,

    /// Final-channel text from the first `{` onward
    pub final_buffer: String,

    /// Set once the first `{` has been seen; never reset
    pub inside_json: bool,

    /// Incomplete trailing line from the previous chunk
    line_remainder: Vec<u8>,
}

/// Synchronous stream assembler.
///
/// Feed it chunks with [`Assembler::feed`], then call [`Assembler::finish`]
/// at end of stream.
pub struct Assembler<D = ChatCompletionsEnvelope> {
    state: AssemblyState,
    decoder: D,
    boundary: BoundaryMode,
    skipped_records: usize,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    /// Create an assembler for the chat-completions envelope
    pub fn new() -> Self {
        Self::with_decoder(ChatCompletionsEnvelope)
    }
}

impl<D: EnvelopeDecoder> Assembler<D> {
    /// Create an assembler for a custom provider envelope
    pub fn with_decoder(decoder: D) -> Self {
        Self {
            state: AssemblyState::default(),
            decoder,
            boundary: BoundaryMode::default(),
            skipped_records: 0,
        }
    }

    /// Select how the end of the JSON object is located
    pub fn with_boundary(mut self, boundary: BoundaryMode) -> Self {
        self.boundary = boundary;
        self
    }

    /// Current assembly state
    pub fn state(&self) -> &AssemblyState {
        &self.state
    }

    /// Number of record lines whose payload was not valid JSON
    pub fn skipped_records(&self) -> usize {
        self.skipped_records
    }

    /// Process one chunk, returning the events it produced in order.
    ///
    /// Only complete lines are processed; a trailing partial line is kept
    /// until the next chunk completes it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<AssemblyEvent> {
        self.state.line_remainder.extend_from_slice(chunk);

        let Some(last_newline) = self.state.line_remainder.iter().rposition(|&b| b == b'\n')
        else {
            return Vec::new();
        };

        // '\n' never occurs inside a multi-byte UTF-8 sequence, so splitting
        // on it before decoding keeps characters intact across chunks.
        let rest = self.state.line_remainder.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.state.line_remainder, rest);

        let mut events = Vec::new();
        for line in complete.split(|&b| b == b'\n') {
            let line = String::from_utf8_lossy(line);
            if let Some(event) = self.process_line(line.trim_end_matches('\r')) {
                events.push(event);
            }
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<AssemblyEvent> {
        let payload = line.strip_prefix(RECORD_PREFIX)?;
        let payload = payload.strip_prefix(' ').unwrap_or(payload);

        if payload.trim() == END_SENTINEL {
            trace!("end sentinel received");
            return None;
        }

        let value: Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(e) => {
                self.skipped_records += 1;
                debug!(error = %e, "skipping malformed record");
                return None;
            }
        };

        match self.decoder.decode(&value)? {
            ChannelDelta::Reasoning(text) => {
                self.state.reasoning.push_str(&text);
                Some(AssemblyEvent::ThinkingFragment(text))
            }
            ChannelDelta::Final(text) => {
                self.accept_final(&text);
                None
            }
        }
    }

    fn accept_final(&mut self, fragment: &str) {
        if self.state.inside_json {
            self.state.final_buffer.push_str(fragment);
        } else if let Some(start) = fragment.find('{') {
            self.state.inside_json = true;
            self.state.final_buffer.push_str(&fragment[start..]);
        } else {
            trace!(len = fragment.len(), "discarding final-channel text before JSON start");
        }
    }

    /// Signal end of stream.
    ///
    /// Returns the terminal event, or `None` when no final-channel content
    /// was ever collected. Any unterminated trailing line is dropped.
    pub fn finish(self) -> Option<AssemblyEvent> {
        if !self.state.line_remainder.is_empty() {
            debug!(
                len = self.state.line_remainder.len(),
                "dropping unterminated trailing line"
            );
        }
        debug!(
            reasoning_len = self.state.reasoning.len(),
            final_len = self.state.final_buffer.len(),
            skipped = self.skipped_records,
            "stream ended"
        );

        if self.state.final_buffer.is_empty() {
            return None;
        }
        Some(parse_final(&self.state.final_buffer, self.boundary))
    }
}

/// Parse an accumulated final buffer into a terminal event
pub fn parse_final(buffer: &str, boundary: BoundaryMode) -> AssemblyEvent {
    let mut candidate = strip_code_fences(buffer);
    if boundary == BoundaryMode::Balanced {
        if let Some(object) = first_balanced_object(candidate) {
            candidate = object;
        }
    }

    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => {
            let (record, issues) = AnalysisRecord::from_value(value);
            if !issues.is_empty() {
                warn!(count = issues.len(), "analysis record shape issues");
                for issue in &issues {
                    debug!(%issue, "shape issue");
                }
            }
            AssemblyEvent::AnalysisReady {
                record: Box::new(record),
                issues,
            }
        }
        Err(e) => {
            warn!(error = %e, len = candidate.len(), "final content is not valid JSON");
            AssemblyEvent::AssemblyFailed(AssemblyFailure::Unparsable {
                reason: e.to_string(),
            })
        }
    }
}

/// Remove a leading ```` ```lang ```` fence line, a trailing ```` ``` ````
/// fence and surrounding whitespace.
pub fn strip_code_fences(text: &str) -> &str {
    let mut s = text.trim();

    if let Some(rest) = s.strip_prefix("```") {
        s = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
        };
    }

    let s = s.trim_end();
    s.strip_suffix("```").unwrap_or(s).trim()
}

/// Find the first complete `{...}` object, honouring JSON string escapes.
///
/// Returns `None` if the text does not start an object or it never closes.
pub fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
