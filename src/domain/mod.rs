//! Domain types for fakao.
//!
//! This module contains the core data structures:
//! - Case: submitted narratives, subjects, answers, history entries
//! - Analysis: the structured record assembled from the model output
//! - Events: the assembler's event contract and its NDJSON relay form

pub mod analysis;
pub mod case;
pub mod events;

// Re-export commonly used types
pub use analysis::{
    AnalysisRecord, Difficulty, DifficultyLevel, Explanation, GeneratedQuestion, KeyPoint,
    LegalCitation, QuestionOption, QuestionType, ShapeIssue, StructuredAdvice,
    StructuredExplanation, StudyAdvice,
};
pub use case::{CaseInput, CaseStatus, HistoryEntry, SubjectArea, UserAnswer};
pub use events::{AssemblyEvent, AssemblyFailure, ChannelDelta, StreamChunk};
