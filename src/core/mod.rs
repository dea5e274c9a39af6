//! Core analysis logic.
//!
//! This module contains:
//! - Envelope: provider payload decoding into channel deltas
//! - Assembler: record splitting, channel accumulation and final parsing
//! - Demux: async pull loop turning a byte-chunk stream into events
//! - Validation: case length limits
//! - Session: the request/stream/state consumer
//! - Quiz: grading answers to the generated question

pub mod assembler;
pub mod demux;
pub mod envelope;
pub mod quiz;
pub mod session;
pub mod validation;

// Re-export commonly used types
pub use assembler::{Assembler, AssemblyState, BoundaryMode};
pub use demux::EventStream;
pub use envelope::{ChatCompletionsEnvelope, EnvelopeDecoder};
pub use quiz::{grade, Feedback};
pub use session::{AnalyzeError, Session};
pub use validation::{CaseLimits, CaseViolation};
